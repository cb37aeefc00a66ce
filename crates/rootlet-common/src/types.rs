//! Domain primitive types used across the rootlet workspace.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_NAMESPACE, DEFAULT_TAG};
use crate::error::RootletError;

/// A parsed image reference of the form `repository:tag`.
///
/// References without a namespace (`busybox`) are placed in the default
/// organization (`library/busybox`) and a missing tag becomes `latest`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageReference {
    repository: String,
    tag: String,
}

impl ImageReference {
    /// Returns the fully qualified repository name.
    #[must_use]
    pub fn repository(&self) -> &str {
        &self.repository
    }

    /// Returns the tag.
    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }
}

impl FromStr for ImageReference {
    type Err = RootletError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.contains('@') {
            return Err(RootletError::Config {
                message: format!("digest references are not supported: {s:?}"),
            });
        }
        let (name, tag) = match s.rsplit_once(':') {
            // A colon followed by a slash belongs to a registry host, not a tag.
            Some((name, tag)) if !tag.contains('/') => (name, tag),
            _ => (s, DEFAULT_TAG),
        };

        if name.is_empty() || name.contains(':') {
            return Err(RootletError::Config {
                message: format!("invalid image reference: {s:?}"),
            });
        }
        if tag.is_empty() {
            return Err(RootletError::Config {
                message: format!("empty tag in image reference: {s:?}"),
            });
        }

        let repository = if name.contains('/') {
            name.to_string()
        } else {
            format!("{DEFAULT_NAMESPACE}/{name}")
        };

        Ok(Self {
            repository,
            tag: tag.to_string(),
        })
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.repository, self.tag)
    }
}

/// Content-addressed blob identifier such as `sha256:<hex>`.
///
/// Used verbatim as the cache key and as the remote blob path segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Digest(String);

impl Digest {
    /// Creates a digest from its string form.
    #[must_use]
    pub fn new(digest: impl Into<String>) -> Self {
        Self(digest.into())
    }

    /// Returns the digest exactly as the registry reported it.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the hex portion of a well-formed `sha256:` digest.
    #[must_use]
    pub fn sha256_hex(&self) -> Option<&str> {
        self.0
            .strip_prefix("sha256:")
            .filter(|hex| hex.len() == crate::constants::SHA256_HEX_LENGTH)
            .filter(|hex| hex.chars().all(|c| c.is_ascii_hexdigit()))
    }

    /// Returns whether the digest is safe to use as a single path segment.
    #[must_use]
    pub fn is_path_safe(&self) -> bool {
        !self.0.is_empty()
            && self.0 != "."
            && self.0 != ".."
            && !self.0.contains('/')
            && !self.0.contains('\0')
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Final status of a launched command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Exit code of the command, or `128 + signal` when it was killed.
    pub exit_code: i32,
    /// Whether the command was terminated by a signal.
    pub signaled: bool,
}

impl ExecutionResult {
    /// Result of a command that exited on its own.
    #[must_use]
    pub const fn exited(code: i32) -> Self {
        Self {
            exit_code: code,
            signaled: false,
        }
    }

    /// Result of a command killed by `signal`, using the shell convention.
    #[must_use]
    pub const fn killed(signal: i32) -> Self {
        Self {
            exit_code: 128 + signal,
            signaled: true,
        }
    }

    /// Returns whether the command exited with status zero.
    #[must_use]
    pub const fn success(&self) -> bool {
        !self.signaled && self.exit_code == 0
    }
}
