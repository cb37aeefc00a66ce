//! PID namespace isolation.
//!
//! Gives the launched command its own process ID space. The namespace is
//! attached to the next child, not to the caller.

use rootlet_common::error::{Result, RootletError};

/// Places the calling process's future children in a new PID namespace.
///
/// The caller keeps its own PID and namespace. The first child forked after
/// a successful call sees itself as PID 1; once that child exits no further
/// children can be created in the namespace.
///
/// # Errors
///
/// Returns `RootletError::Isolation` if the `unshare(CLONE_NEWPID)` syscall fails.
#[cfg(target_os = "linux")]
pub fn create_pid_namespace() -> Result<()> {
    use nix::sched::{CloneFlags, unshare};

    unshare(CloneFlags::CLONE_NEWPID).map_err(|e| RootletError::Isolation {
        message: format!("PID namespace creation failed: {e}"),
    })?;
    tracing::debug!("PID namespace created for next child");
    Ok(())
}

/// Stub for non-Linux platforms.
///
/// # Errors
///
/// Always returns an error: PID namespaces require Linux.
#[cfg(not(target_os = "linux"))]
pub fn create_pid_namespace() -> Result<()> {
    Err(RootletError::Config {
        message: "Linux required for isolated execution".into(),
    })
}
