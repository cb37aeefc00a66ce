//! Population of the isolated root directory from the host.

use std::path::{Component, Path, PathBuf};

use rootlet_common::error::{Result, RootletError};

/// Maps an absolute or relative host path to the same relative location
/// under `root`. Returns `None` if the path climbs out with `..`.
#[must_use]
pub fn path_in_root(root: &Path, path: &Path) -> Option<PathBuf> {
    let mut mapped = root.to_path_buf();
    for component in path.components() {
        match component {
            Component::Normal(part) => mapped.push(part),
            Component::RootDir | Component::CurDir | Component::Prefix(_) => {}
            Component::ParentDir => return None,
        }
    }
    Some(mapped)
}

/// Copies the host file at `executable` into `root` at the same relative
/// path, preserving its permission bits.
///
/// Intermediate directories are created as needed. Symlinks on the host are
/// followed, so the root receives the target's contents.
///
/// # Errors
///
/// Returns `RootletError::Copy` if the source is missing or unreadable, if
/// the path escapes the root, or if the destination cannot be written.
pub fn place_executable(root: &Path, executable: &Path) -> Result<PathBuf> {
    let copy_err = |source| RootletError::Copy {
        path: executable.to_path_buf(),
        source,
    };

    let dest = path_in_root(root, executable).ok_or_else(|| {
        copy_err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "executable path escapes the root",
        ))
    })?;

    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent).map_err(copy_err)?;
    }
    let bytes = std::fs::copy(executable, &dest).map_err(copy_err)?;

    tracing::debug!(
        source = %executable.display(),
        dest = %dest.display(),
        bytes,
        "executable placed in root"
    );
    Ok(dest)
}

/// Ensures `root/dev/null` exists as an empty regular file.
///
/// A regular file is enough for children that only redirect output there
/// and needs no privilege to create.
///
/// # Errors
///
/// Returns `RootletError::Device` if the directory or file cannot be created.
pub fn create_null_device(root: &Path) -> Result<PathBuf> {
    let dev = root.join("dev");
    std::fs::create_dir_all(&dev).map_err(|e| RootletError::Device {
        path: dev.clone(),
        source: e,
    })?;

    let null = dev.join("null");
    std::fs::write(&null, b"").map_err(|e| RootletError::Device {
        path: null.clone(),
        source: e,
    })?;

    tracing::debug!(path = %null.display(), "null device created");
    Ok(null)
}

/// Removes every entry inside `dir`, leaving `dir` itself in place.
///
/// # Errors
///
/// Returns `RootletError::Rootfs` on the first entry that cannot be removed.
pub fn clear_contents(dir: &Path) -> Result<()> {
    let io_err = |path: &Path, source| RootletError::Rootfs {
        path: path.to_path_buf(),
        source,
    };

    for entry in std::fs::read_dir(dir).map_err(|e| io_err(dir, e))? {
        let entry = entry.map_err(|e| io_err(dir, e))?;
        let path = entry.path();
        let file_type = entry.file_type().map_err(|e| io_err(&path, e))?;
        if file_type.is_dir() {
            std::fs::remove_dir_all(&path).map_err(|e| io_err(&path, e))?;
        } else {
            std::fs::remove_file(&path).map_err(|e| io_err(&path, e))?;
        }
    }
    Ok(())
}
