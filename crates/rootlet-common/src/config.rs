//! Configuration model for a rootlet run.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants;
use crate::error::{Result, RootletError};

/// Endpoints used to talk to the image registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Token issuance endpoint.
    pub auth_url: String,
    /// Base URL of the registry's v2 API (no trailing `/v2`).
    pub registry_url: String,
    /// Service name presented to the token endpoint.
    pub service: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            auth_url: constants::DEFAULT_AUTH_URL.into(),
            registry_url: constants::DEFAULT_REGISTRY_URL.into(),
            service: constants::DEFAULT_REGISTRY_SERVICE.into(),
        }
    }
}

/// Root configuration for rootlet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RootletConfig {
    /// Directory persisting downloaded layer blobs across runs.
    pub cache_dir: PathBuf,
    /// Registry endpoints.
    pub registry: RegistryConfig,
}

impl Default for RootletConfig {
    fn default() -> Self {
        Self {
            cache_dir: constants::default_cache_dir(),
            registry: RegistryConfig::default(),
        }
    }
}

impl RootletConfig {
    /// Loads a configuration from a JSON file. Missing fields take their
    /// default values.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid JSON.
    pub fn from_file(path: &Path) -> Result<Self> {
        tracing::debug!(path = %path.display(), "loading configuration");
        let content = std::fs::read_to_string(path).map_err(|e| RootletError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&content).map_err(|e| RootletError::Config {
            message: format!("{}: {e}", path.display()),
        })
    }
}
