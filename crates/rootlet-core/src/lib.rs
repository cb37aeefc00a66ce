//! # rootlet-core
//!
//! Low-level Linux isolation primitives for rootlet.
//!
//! This crate provides safe abstractions over:
//! - **Filesystem**: populating a root directory and switching the process
//!   root with `chroot(2)`.
//! - **Namespaces**: requesting a fresh PID namespace for the next child.
//!
//! Every syscall wrapper has a non-Linux stub that fails with a
//! configuration error.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod filesystem;
pub mod namespace;

/// Returns whether the current process runs with an effective UID of 0.
#[cfg(unix)]
#[must_use]
pub fn is_privileged() -> bool {
    nix::unistd::geteuid().is_root()
}

/// Stub for non-Unix platforms.
#[cfg(not(unix))]
#[must_use]
pub const fn is_privileged() -> bool {
    false
}
