//! Digest-keyed layer cache.
//!
//! Blobs live at `<root>/layers/<digest>`, a pure function of the cache
//! root and the digest, so every run and every duplicate digest within a
//! run resolves to the same file. A file at that path is authoritative:
//! hits are an existence check only and are never re-hashed.
//!
//! Misses are written into a per-run staging directory next to the layers
//! and renamed into place once complete, so an interrupted download never
//! leaves a file at the final path.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use rootlet_common::constants::LAYERS_DIR;
use rootlet_common::error::{Result, RootletError};
use rootlet_common::types::Digest;
use sha2::{Digest as _, Sha256};
use tempfile::TempDir;

/// A layer blob materialized in the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedLayer {
    /// Digest the blob is stored under.
    pub digest: Digest,
    /// Location of the blob on local storage.
    pub path: PathBuf,
}

/// Local cache of layer blobs shared across runs.
#[derive(Debug)]
pub struct LayerCache {
    /// Root directory for all cached data.
    root: PathBuf,
    /// Staging area for in-flight downloads, removed on drop.
    staging: TempDir,
}

impl LayerCache {
    /// Opens or initializes the cache at the given root and creates this
    /// run's staging directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the directories cannot be created.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let layers = root.join(LAYERS_DIR);
        std::fs::create_dir_all(&layers).map_err(|e| RootletError::Io {
            path: layers.clone(),
            source: e,
        })?;
        let staging = tempfile::Builder::new()
            .prefix(".staging-")
            .tempdir_in(&layers)
            .map_err(|e| RootletError::Io {
                path: layers.clone(),
                source: e,
            })?;
        tracing::info!(path = %root.display(), "opened layer cache");
        Ok(Self { root, staging })
    }

    /// Returns the path a layer with the given digest is stored at.
    #[must_use]
    pub fn layer_path(&self, digest: &Digest) -> PathBuf {
        self.root.join(LAYERS_DIR).join(digest.as_str())
    }

    /// Checks whether a layer exists in the cache.
    #[must_use]
    pub fn has_layer(&self, digest: &Digest) -> bool {
        self.layer_path(digest).exists()
    }

    /// Returns this run's staging directory.
    #[must_use]
    pub fn staging_dir(&self) -> &Path {
        self.staging.path()
    }

    /// Returns the cached blob for `digest`, downloading it on a miss.
    ///
    /// On a hit `fetch` is not called. On a miss `fetch` opens the blob
    /// stream, which is written to staging, verified against `sha256:`
    /// digests, and renamed to the final path.
    ///
    /// # Errors
    ///
    /// Returns `RootletError::Blob` if the digest is not usable as a file
    /// name or the stream fails, `RootletError::HashMismatch` if the bytes do
    /// not match the digest, `RootletError::Io` on local write failures, and
    /// any error returned by `fetch`.
    pub fn ensure<F, R>(&self, digest: &Digest, fetch: F) -> Result<CachedLayer>
    where
        F: FnOnce(&Digest) -> Result<R>,
        R: Read,
    {
        if !digest.is_path_safe() {
            return Err(RootletError::Blob {
                digest: digest.to_string(),
                message: "digest is not a valid cache key".into(),
            });
        }

        let path = self.layer_path(digest);
        tracing::debug!(path = %path.display(), "checking layer cache");
        if path.exists() {
            tracing::debug!(%digest, "layer cache hit");
            return Ok(CachedLayer {
                digest: digest.clone(),
                path,
            });
        }

        tracing::info!(%digest, "downloading layer");
        let reader = fetch(digest)?;
        let bytes = self.write_staged(digest, reader, &path)?;
        tracing::info!(%digest, bytes, "layer cached");

        Ok(CachedLayer {
            digest: digest.clone(),
            path,
        })
    }

    /// Streams `reader` into a staging file, checks its hash, and publishes
    /// it at `dest` with an atomic rename.
    fn write_staged<R: Read>(&self, digest: &Digest, mut reader: R, dest: &Path) -> Result<u64> {
        let staging = self.staging.path();
        let io_err = |path: &Path, source| RootletError::Io {
            path: path.to_path_buf(),
            source,
        };

        let mut staged = tempfile::NamedTempFile::new_in(staging).map_err(|e| io_err(staging, e))?;
        let mut hasher = Sha256::new();
        let mut buf = vec![0_u8; 64 * 1024];
        let mut total: u64 = 0;
        loop {
            let n = match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    return Err(RootletError::Blob {
                        digest: digest.to_string(),
                        message: format!("download interrupted after {total} bytes: {e}"),
                    });
                }
            };
            hasher.update(&buf[..n]);
            staged
                .write_all(&buf[..n])
                .map_err(|e| io_err(staged.path(), e))?;
            total += n as u64;
        }
        staged
            .as_file()
            .sync_all()
            .map_err(|e| io_err(staged.path(), e))?;

        crate::hash::check_digest(digest, &crate::hash::finish_hex(hasher))?;

        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
        }
        let _ = staged.persist(dest).map_err(|e| io_err(dest, e.error))?;
        Ok(total)
    }
}
