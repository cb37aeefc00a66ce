//! Root filesystem switching via `chroot(2)`.
//!
//! The switch is one-way: once it succeeds the process can no longer name
//! any host path outside the new root.

use std::path::Path;

use rootlet_common::error::{Result, RootletError};

/// Makes `new_root` the root directory of the calling process and moves
/// the working directory to `/` inside it.
///
/// Requires `CAP_SYS_CHROOT`. There is no fallback when the privilege is
/// missing.
///
/// # Errors
///
/// Returns `RootletError::Isolation` if `chroot(2)` or `chdir(2)` fails.
#[cfg(target_os = "linux")]
pub fn enter_root(new_root: &Path) -> Result<()> {
    use nix::errno::Errno;
    use nix::unistd::{chdir, chroot};

    chroot(new_root).map_err(|e| RootletError::Isolation {
        message: match e {
            Errno::EPERM => format!(
                "chroot to {} requires CAP_SYS_CHROOT (run as root): {e}",
                new_root.display()
            ),
            _ => format!("chroot to {} failed: {e}", new_root.display()),
        },
    })?;
    chdir("/").map_err(|e| RootletError::Isolation {
        message: format!("chdir to new root failed: {e}"),
    })?;

    tracing::info!(root = %new_root.display(), "entered isolated root");
    Ok(())
}

/// Stub for non-Linux platforms.
///
/// # Errors
///
/// Always returns an error: root switching requires Linux.
#[cfg(not(target_os = "linux"))]
pub fn enter_root(_new_root: &Path) -> Result<()> {
    Err(RootletError::Config {
        message: "Linux required for isolated execution".into(),
    })
}

#[cfg(all(test, target_os = "linux"))]
mod tests {
    use super::*;

    #[test]
    fn enter_root_without_privilege_fails_fast() {
        if crate::is_privileged() {
            // Succeeding here would chroot the test harness itself.
            return;
        }
        let dir = tempfile::tempdir().expect("tempdir");
        let result = enter_root(dir.path());
        assert!(matches!(result, Err(RootletError::Isolation { .. })));
    }

    #[test]
    fn enter_root_missing_directory_fails() {
        if crate::is_privileged() {
            return;
        }
        let result = enter_root(Path::new("/nonexistent/rootlet-root"));
        assert!(matches!(result, Err(RootletError::Isolation { .. })));
    }
}
