//! System-wide constants and default paths.

use std::path::PathBuf;
use std::sync::OnceLock;

/// Default base directory for rootlet data when no home directory is usable.
pub const SYSTEM_DATA_DIR: &str = "/var/lib/rootlet";

/// Organization prepended to image names that carry no namespace.
pub const DEFAULT_NAMESPACE: &str = "library";

/// Tag used when an image reference does not name one.
pub const DEFAULT_TAG: &str = "latest";

/// Token issuance endpoint of the default registry.
pub const DEFAULT_AUTH_URL: &str = "https://auth.docker.io/token";

/// Base URL of the default registry's v2 API.
pub const DEFAULT_REGISTRY_URL: &str = "https://registry.hub.docker.com";

/// Service name presented to the token endpoint.
pub const DEFAULT_REGISTRY_SERVICE: &str = "registry.docker.io";

/// Subdirectory of the cache root holding layer blobs.
pub const LAYERS_DIR: &str = "layers";

/// SHA-256 digest length in hex characters.
pub const SHA256_HEX_LENGTH: usize = 64;

/// Name of the command-line binary.
pub const APP_NAME: &str = "rootlet";

/// Returns the data directory, preferring `$HOME/.rootlet` and falling
/// back to `/var/lib/rootlet`.
fn resolve_data_dir() -> PathBuf {
    if let Ok(home) = std::env::var("HOME") {
        let user_dir = PathBuf::from(home).join(".rootlet");
        if std::fs::create_dir_all(&user_dir).is_ok() {
            return user_dir;
        }
    }
    PathBuf::from(SYSTEM_DATA_DIR)
}

static DATA_DIR: OnceLock<PathBuf> = OnceLock::new();

/// Returns the resolved data directory for this session.
pub fn data_dir() -> &'static PathBuf {
    DATA_DIR.get_or_init(resolve_data_dir)
}

/// Returns the default layer cache directory.
pub fn default_cache_dir() -> PathBuf {
    data_dir().join("cache")
}
