//! Filesystem management for the isolated root.
//!
//! Provides helpers that populate a root directory from the host and the
//! `chroot(2)` wrapper that makes it the process root.

pub mod chroot;
pub mod rootfs;
