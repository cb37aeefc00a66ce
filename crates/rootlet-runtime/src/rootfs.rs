//! One-way assembly of the isolated root.
//!
//! [`RootfsBuilder`] owns a fresh temporary directory and accumulates the
//! preparation steps. [`RootfsBuilder::commit`] is the single transition
//! into the isolated state: it consumes the builder, switches the process
//! root, and returns the [`Isolated`] token the process runner requires.
//! There is no way back.

use std::path::{Path, PathBuf};

use rootlet_common::error::{Result, RootletError};
use rootlet_core::filesystem::{chroot, rootfs};
use tempfile::TempDir;

/// Prefix of the per-run temporary root directory.
const ROOT_PREFIX: &str = "rootlet-root-";

/// Builder for the ephemeral root directory of one run.
#[derive(Debug)]
pub struct RootfsBuilder {
    root: TempDir,
    null_device: bool,
}

impl RootfsBuilder {
    /// Creates an empty root under the system temporary directory.
    ///
    /// # Errors
    ///
    /// Returns `RootletError::Rootfs` if the directory cannot be created.
    pub fn new() -> Result<Self> {
        Self::new_in(&std::env::temp_dir())
    }

    /// Creates an empty root inside `parent`.
    ///
    /// # Errors
    ///
    /// Returns `RootletError::Rootfs` if the directory cannot be created.
    pub fn new_in(parent: &Path) -> Result<Self> {
        let root = tempfile::Builder::new()
            .prefix(ROOT_PREFIX)
            .tempdir_in(parent)
            .map_err(|e| RootletError::Rootfs {
                path: parent.to_path_buf(),
                source: e,
            })?;
        tracing::debug!(path = %root.path().display(), "created root directory");
        Ok(Self {
            root,
            null_device: false,
        })
    }

    /// Returns the host path of the root being assembled.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.root.path()
    }

    /// Copies a host executable into the root at the same relative path.
    ///
    /// # Errors
    ///
    /// Returns `RootletError::Copy` if the executable cannot be copied.
    pub fn place_executable(self, executable: &Path) -> Result<Self> {
        let _ = rootfs::place_executable(self.root.path(), executable)?;
        Ok(self)
    }

    /// Extracts cached layer archives into the root, in the given order.
    ///
    /// # Errors
    ///
    /// Returns `RootletError::Extract` for the first archive that fails; the
    /// remaining layers are not applied.
    pub fn extract_layers(self, archives: &[PathBuf]) -> Result<Self> {
        rootlet_image::layer::extract_layers(self.root.path(), archives)?;
        Ok(self)
    }

    /// Creates `dev/null` inside the root.
    ///
    /// # Errors
    ///
    /// Returns `RootletError::Device` if the file cannot be created.
    pub fn create_null_device(mut self) -> Result<Self> {
        let _ = rootfs::create_null_device(self.root.path())?;
        self.null_device = true;
        Ok(self)
    }

    /// Makes the assembled directory the root of the calling process.
    ///
    /// Irreversible. On success every later path lookup in this process,
    /// including those of spawned children, resolves inside the new root.
    ///
    /// # Errors
    ///
    /// Returns `RootletError::Config` if `dev/null` was never created and
    /// `RootletError::Isolation` if the root cannot be switched.
    pub fn commit(self) -> Result<Isolated> {
        if !self.null_device {
            return Err(RootletError::Config {
                message: "root committed before dev/null was created".into(),
            });
        }
        chroot::enter_root(self.root.path())?;
        Ok(Isolated {
            host_path: self.root.path().to_path_buf(),
            _root: self.root,
        })
    }
}

/// Proof that the process runs inside an assembled root.
///
/// Only [`RootfsBuilder::commit`] produces this value.
#[derive(Debug)]
pub struct Isolated {
    host_path: PathBuf,
    // Unreachable once entered, so its drop-time removal is a no-op.
    _root: TempDir,
}

impl Isolated {
    /// Empties the root from inside once the command has finished.
    ///
    /// The root directory itself stays: it cannot be removed while it is
    /// the process root.
    ///
    /// # Errors
    ///
    /// Returns `RootletError::Rootfs` if an entry cannot be removed.
    pub fn clear(self) -> Result<()> {
        rootfs::clear_contents(Path::new("/"))?;
        tracing::debug!(path = %self.host_path.display(), "root contents removed");
        Ok(())
    }
}
