//! Filesystem layer extraction.
//!
//! Layers are unpacked one after another into a single flat tree. A file
//! written by a later layer replaces the same path from an earlier one;
//! whiteout entries are not interpreted.

use std::io::{BufRead, BufReader};
use std::path::{Component, Path, PathBuf};

use rootlet_common::error::{Result, RootletError};

/// Magic bytes opening every gzip stream.
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Extracts a tar archive into the target directory.
///
/// Both plain and gzip-compressed archives are accepted; compression is
/// detected from the stream header since registry blobs carry no file
/// extension.
///
/// # Errors
///
/// Returns `RootletError::Extract` if the archive cannot be opened or is
/// malformed.
pub fn extract_layer(archive_path: &Path, target: &Path) -> Result<()> {
    tracing::debug!(
        archive = %archive_path.display(),
        target = %target.display(),
        "extracting layer"
    );
    let extract_err = |e| RootletError::Extract {
        path: archive_path.to_path_buf(),
        source: e,
    };

    std::fs::create_dir_all(target).map_err(extract_err)?;
    let file = std::fs::File::open(archive_path).map_err(extract_err)?;
    let mut reader = BufReader::new(file);

    let unpacked = if is_gzip_stream(&mut reader).map_err(extract_err)? {
        unpack(tar::Archive::new(flate2::bufread::GzDecoder::new(reader)), target)
    } else {
        unpack(tar::Archive::new(reader), target)
    };
    unpacked.map_err(extract_err)
}

/// Extracts every archive into `target`, strictly in the given order.
///
/// The first failure aborts the remaining layers.
///
/// # Errors
///
/// Returns `RootletError::Extract` for the first archive that fails.
pub fn extract_layers(target: &Path, archives: &[PathBuf]) -> Result<()> {
    for (index, archive) in archives.iter().enumerate() {
        extract_layer(archive, target)?;
        tracing::info!(
            layer = index + 1,
            total = archives.len(),
            archive = %archive.display(),
            "layer extracted"
        );
    }
    Ok(())
}

/// Unpacks entries one by one, unlinking whatever non-directory already
/// occupies each destination first.
///
/// `tar` refuses to create a hard link over an existing path, and writing a
/// regular file over an existing hard link would modify every other name of
/// that inode.
fn unpack<R: std::io::Read>(mut archive: tar::Archive<R>, target: &Path) -> std::io::Result<()> {
    archive.set_preserve_permissions(true);
    archive.set_preserve_mtime(true);
    archive.set_overwrite(true);
    archive.set_unpack_xattrs(false);

    let target = target.canonicalize()?;
    for entry in archive.entries()? {
        let mut entry = entry?;
        if replaces_path(entry.header().entry_type()) {
            let dest = entry_destination(&target, &entry.path()?);
            if let Some(dest) = dest {
                remove_existing(&target, &dest)?;
            }
        }
        let _ = entry.unpack_in(&target)?;
    }
    Ok(())
}

fn replaces_path(kind: tar::EntryType) -> bool {
    kind.is_file()
        || kind.is_hard_link()
        || kind.is_symlink()
        || kind.is_character_special()
        || kind.is_block_special()
        || kind.is_fifo()
}

/// Maps an entry path under `target` the way `unpack_in` does. Returns
/// `None` for paths that climb out with `..`, which `unpack_in` skips.
fn entry_destination(target: &Path, path: &Path) -> Option<PathBuf> {
    let mut dest = target.to_path_buf();
    for component in path.components() {
        match component {
            Component::Normal(part) => dest.push(part),
            Component::RootDir | Component::CurDir => {}
            Component::Prefix(_) | Component::ParentDir => return None,
        }
    }
    (dest != target).then_some(dest)
}

/// Unlinks a non-directory at `dest`, but only when its parent resolves
/// inside `target`. A symlinked parent pointing at the host is left for
/// `unpack_in` to reject.
fn remove_existing(target: &Path, dest: &Path) -> std::io::Result<()> {
    let Some(parent) = dest.parent() else {
        return Ok(());
    };
    match parent.canonicalize() {
        Ok(resolved) if resolved.starts_with(target) => {}
        _ => return Ok(()),
    }
    match std::fs::symlink_metadata(dest) {
        Ok(meta) if !meta.is_dir() => std::fs::remove_file(dest),
        _ => Ok(()),
    }
}

/// Peeks at the buffered stream to see whether it starts with gzip magic.
fn is_gzip_stream<R: BufRead>(reader: &mut R) -> std::io::Result<bool> {
    let head = reader.fill_buf()?;
    Ok(head.starts_with(&GZIP_MAGIC))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_tar<W: std::io::Write>(writer: W, files: &[(&str, &[u8])]) -> W {
        let mut builder = tar::Builder::new(writer);
        for (name, data) in files {
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder
                .append_data(&mut header, name, *data)
                .expect("failed to append data");
        }
        builder.into_inner().expect("failed to finish tar")
    }

    fn create_test_tar(dir: &Path, name: &str, files: &[(&str, &[u8])]) -> PathBuf {
        let tar_path = dir.join(name);
        let file = std::fs::File::create(&tar_path).expect("failed to create tar file");
        let _ = write_tar(file, files);
        tar_path
    }

    fn create_test_tar_gz(dir: &Path, name: &str, files: &[(&str, &[u8])]) -> PathBuf {
        let tar_gz_path = dir.join(name);
        let file = std::fs::File::create(&tar_gz_path).expect("failed to create tar.gz");
        let encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
        let encoder = write_tar(encoder, files);
        let _ = encoder.finish().expect("failed to finish gzip");
        tar_gz_path
    }

    /// Writes a busybox-shaped archive: one regular `bin/busybox` and hard
    /// links to it for each applet.
    fn create_linked_tar(dir: &Path, name: &str, binary: &[u8], applets: &[&str]) -> PathBuf {
        let tar_path = dir.join(name);
        let file = std::fs::File::create(&tar_path).expect("failed to create tar file");
        let mut builder = tar::Builder::new(file);

        let mut header = tar::Header::new_gnu();
        header.set_size(binary.len() as u64);
        header.set_mode(0o755);
        header.set_cksum();
        builder
            .append_data(&mut header, "bin/busybox", binary)
            .expect("failed to append busybox");

        for applet in applets {
            let mut link = tar::Header::new_gnu();
            link.set_entry_type(tar::EntryType::Link);
            link.set_size(0);
            link.set_mode(0o755);
            builder
                .append_link(&mut link, applet, "bin/busybox")
                .expect("failed to append link");
        }
        let _ = builder.into_inner().expect("failed to finish tar");
        tar_path
    }

    #[test]
    fn hard_link_replaces_existing_file() {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        let target = dir.path().join("root");
        std::fs::create_dir_all(target.join("bin")).expect("mkdir");
        std::fs::write(target.join("bin/echo"), b"host echo").expect("write");
        let layer = create_linked_tar(dir.path(), "busybox", b"busybox binary", &["bin/echo"]);

        extract_layer(&layer, &target).expect("extract failed");
        assert_eq!(
            std::fs::read(target.join("bin/echo")).expect("read failed"),
            b"busybox binary"
        );
    }

    #[test]
    fn later_layer_hard_link_overrides_earlier_file() {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        let first = create_test_tar(dir.path(), "one", &[("bin/echo", b"layer one echo")]);
        let second = create_linked_tar(dir.path(), "two", b"layer two busybox", &["bin/echo"]);
        let target = dir.path().join("root");

        extract_layers(&target, &[first, second]).expect("extract failed");
        assert_eq!(
            std::fs::read(target.join("bin/echo")).expect("read failed"),
            b"layer two busybox"
        );
    }

    #[test]
    fn file_over_hard_link_leaves_link_source_intact() {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        let first = create_linked_tar(dir.path(), "one", b"busybox", &["bin/sh"]);
        let second = create_test_tar(dir.path(), "two", &[("bin/sh", b"real shell")]);
        let target = dir.path().join("root");

        extract_layers(&target, &[first, second]).expect("extract failed");
        assert_eq!(std::fs::read(target.join("bin/sh")).expect("read"), b"real shell");
        assert_eq!(std::fs::read(target.join("bin/busybox")).expect("read"), b"busybox");
    }

    #[test]
    fn entry_destination_rejects_parent_components() {
        let root = Path::new("/root");
        assert_eq!(
            entry_destination(root, Path::new("./bin/echo")),
            Some(PathBuf::from("/root/bin/echo"))
        );
        assert_eq!(entry_destination(root, Path::new("../escape")), None);
        assert_eq!(entry_destination(root, Path::new("./")), None);
    }

    #[test]
    fn extract_plain_tar_creates_expected_files() {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        let tar_path = create_test_tar(dir.path(), "plain", &[("hello.txt", b"hello from layer")]);
        let target = dir.path().join("extracted");

        extract_layer(&tar_path, &target).expect("extract failed");
        let content = std::fs::read_to_string(target.join("hello.txt")).expect("read failed");
        assert_eq!(content, "hello from layer");
    }

    #[test]
    fn extract_gzip_without_extension_is_detected() {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        let blob = create_test_tar_gz(
            dir.path(),
            "sha256:deadbeef",
            &[("bin/gzhello.txt", b"hello from gzipped layer")],
        );
        let target = dir.path().join("extracted_gz");

        extract_layer(&blob, &target).expect("extract failed");
        let content =
            std::fs::read_to_string(target.join("bin/gzhello.txt")).expect("read failed");
        assert_eq!(content, "hello from gzipped layer");
    }

    #[test]
    fn later_layer_overrides_earlier_layer() {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        let first = create_test_tar_gz(dir.path(), "one", &[("etc/motd", b"layer one")]);
        let second = create_test_tar_gz(dir.path(), "two", &[("etc/motd", b"layer two")]);
        let target = dir.path().join("root");

        extract_layers(&target, &[first, second]).expect("extract failed");
        let content = std::fs::read_to_string(target.join("etc/motd")).expect("read failed");
        assert_eq!(content, "layer two");
    }

    #[test]
    fn extraction_order_is_caller_order() {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        let first = create_test_tar(dir.path(), "one", &[("etc/motd", b"layer one")]);
        let second = create_test_tar(dir.path(), "two", &[("etc/motd", b"layer two")]);
        let target = dir.path().join("root");

        extract_layers(&target, &[second, first]).expect("extract failed");
        let content = std::fs::read_to_string(target.join("etc/motd")).expect("read failed");
        assert_eq!(content, "layer one");
    }

    #[test]
    fn layers_accumulate_distinct_files() {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        let first = create_test_tar(dir.path(), "one", &[("a.txt", b"a")]);
        let second = create_test_tar_gz(dir.path(), "two", &[("b.txt", b"b")]);
        let target = dir.path().join("root");

        extract_layers(&target, &[first, second]).expect("extract failed");
        assert!(target.join("a.txt").is_file());
        assert!(target.join("b.txt").is_file());
    }

    #[test]
    fn extract_nonexistent_archive_returns_error() {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        let result = extract_layer(&dir.path().join("missing.tar"), &dir.path().join("out"));
        assert!(matches!(result, Err(RootletError::Extract { .. })));
    }

    #[test]
    fn malformed_gzip_aborts_remaining_layers() {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        let broken = dir.path().join("broken");
        std::fs::write(&broken, [0x1f_u8, 0x8b, 0x08, 0x00, 0xff, 0xff]).expect("write");
        let good = create_test_tar(dir.path(), "good", &[("late.txt", b"late")]);
        let target = dir.path().join("root");

        let result = extract_layers(&target, &[broken, good]);
        assert!(matches!(result, Err(RootletError::Extract { .. })));
        assert!(!target.join("late.txt").exists());
    }

    #[test]
    fn gzip_magic_detection() {
        let mut gz = &[0x1f_u8, 0x8b, 0x08][..];
        let mut plain = &b"ustar"[..];
        let mut empty = &b""[..];
        assert!(is_gzip_stream(&mut gz).expect("peek"));
        assert!(!is_gzip_stream(&mut plain).expect("peek"));
        assert!(!is_gzip_stream(&mut empty).expect("peek"));
    }
}
