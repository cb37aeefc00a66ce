//! Unified error type for the rootlet workspace.
//!
//! Every variant is terminal for a run. The pipeline stage that produced an
//! error is available through [`RootletError::stage`] so the CLI can name it
//! when reporting.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum RootletError {
    /// The registry token exchange failed.
    #[error("registry authentication failed for {repository}: {message}")]
    Auth {
        /// Repository the token was requested for.
        repository: String,
        /// Description of the failure.
        message: String,
    },

    /// The image manifest could not be fetched or decoded.
    #[error("manifest fetch failed for {reference}: {message}")]
    Manifest {
        /// Image reference (`repository:tag`) being resolved.
        reference: String,
        /// Description of the failure.
        message: String,
    },

    /// A layer blob could not be fetched from the registry.
    #[error("blob fetch failed for {digest}: {message}")]
    Blob {
        /// Digest of the requested blob.
        digest: String,
        /// Description of the failure.
        message: String,
    },

    /// The target executable could not be copied into the new root.
    #[error("failed to copy {path} into the root filesystem: {source}")]
    Copy {
        /// Host path of the executable.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A layer archive could not be unpacked.
    #[error("failed to extract layer {path}: {source}")]
    Extract {
        /// Path of the layer archive.
        path: PathBuf,
        /// Underlying I/O error reported by the archive reader.
        source: std::io::Error,
    },

    /// The null device placeholder could not be created.
    #[error("failed to create device node {path}: {source}")]
    Device {
        /// Path of the device node inside the root.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The temporary root directory could not be created or emptied.
    #[error("failed to prepare root directory {path}: {source}")]
    Rootfs {
        /// Path of the root or the entry inside it.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Entering the isolated root or namespace failed.
    #[error("isolation failed: {message}")]
    Isolation {
        /// Description of the failed operation.
        message: String,
    },

    /// The command could not be found or started.
    #[error("failed to launch {command}: {source}")]
    Launch {
        /// Command path as given by the caller.
        command: String,
        /// Underlying spawn or wait error.
        source: std::io::Error,
    },

    /// An I/O operation outside a specific stage failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A configuration value or argument is invalid.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the invalid configuration.
        message: String,
    },

    /// Downloaded content does not match its digest.
    #[error("hash mismatch for {resource}: expected {expected}, got {actual}")]
    HashMismatch {
        /// Resource that failed validation.
        resource: String,
        /// Expected hash value.
        expected: String,
        /// Actual computed hash value.
        actual: String,
    },
}

impl RootletError {
    /// Returns the name of the pipeline stage this error belongs to.
    #[must_use]
    pub const fn stage(&self) -> &'static str {
        match self {
            Self::Auth { .. } | Self::Manifest { .. } | Self::Blob { .. } => "registry",
            Self::Io { .. } | Self::HashMismatch { .. } => "layer cache",
            Self::Copy { .. }
            | Self::Extract { .. }
            | Self::Device { .. }
            | Self::Rootfs { .. } => "assembly",
            Self::Isolation { .. } => "isolation",
            Self::Launch { .. } => "launch",
            Self::Config { .. } => "configuration",
        }
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, RootletError>;
