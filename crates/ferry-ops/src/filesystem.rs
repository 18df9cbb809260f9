//! Filesystem mutations performed by operations.
//!
//! Every change an operation makes to the disk goes through [`FileSystem`].
//! The provided methods talk to the real disk; [`NativeFileSystem`] uses them
//! unchanged, and other implementations override what they need.

use std::fs::{self, File, FileTimes};
use std::io;
use std::path::Path;

use crate::delete::trash_target;

/// Filesystem access used by the operation bodies.
pub trait FileSystem: Send + Sync {
    /// Create `path` and any missing parents.
    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path)
    }

    /// Copy one item. Symbolic links are copied as links; regular files get
    /// their contents and permission bits, plus timestamps when
    /// `copy_metadata` is set.
    fn copy_file(&self, source: &Path, target: &Path, copy_metadata: bool) -> io::Result<()> {
        if source.symlink_metadata()?.file_type().is_symlink() {
            return copy_link(source, target);
        }

        fs::copy(source, target)?;
        if copy_metadata {
            if let Err(e) = copy_times(source, target) {
                tracing::debug!(path = %target.display(), error = %e, "could not preserve timestamps");
            }
        }
        Ok(())
    }

    /// Rename `source` to `target`.
    fn rename(&self, source: &Path, target: &Path) -> io::Result<()> {
        fs::rename(source, target)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }

    fn remove_dir_all(&self, path: &Path) -> io::Result<()> {
        fs::remove_dir_all(path)
    }

    /// Send `path` to the platform trash.
    fn trash(&self, path: &Path) -> Result<(), trash::Error> {
        trash::delete(trash_target(path))
    }

    /// Open a file for reading.
    fn open(&self, path: &Path) -> io::Result<File> {
        File::open(path)
    }

    /// Create or truncate a file for writing.
    fn create(&self, path: &Path) -> io::Result<File> {
        File::create(path)
    }
}

/// The real disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeFileSystem;

impl FileSystem for NativeFileSystem {}

fn copy_times(source: &Path, target: &Path) -> io::Result<()> {
    let metadata = fs::metadata(source)?;
    let times = FileTimes::new()
        .set_accessed(metadata.accessed()?)
        .set_modified(metadata.modified()?);
    File::open(target)?.set_times(times)
}

#[cfg(unix)]
fn copy_link(source: &Path, target: &Path) -> io::Result<()> {
    let link = fs::read_link(source)?;
    std::os::unix::fs::symlink(link, target)
}

#[cfg(windows)]
fn copy_link(source: &Path, target: &Path) -> io::Result<()> {
    let link = fs::read_link(source)?;
    if fs::metadata(source).is_ok_and(|m| m.is_dir()) {
        std::os::windows::fs::symlink_dir(link, target)
    } else {
        std::os::windows::fs::symlink_file(link, target)
    }
}

/// Replace the entry at `target` with whatever `write` produces.
///
/// `write` is handed a free sibling path. The existing entry is only removed
/// once that write succeeded, so a failed write leaves `target` as it was.
pub(crate) fn replace_existing(target: &Path, write: impl FnOnce(&Path) -> io::Result<()>) -> io::Result<()> {
    let parent = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let staged = tempfile::Builder::new()
        .prefix(".ferry-")
        .tempfile_in(parent)?
        .into_temp_path();
    // `write` expects a free name; the staged path is cleaned up on drop.
    fs::remove_file(&staged)?;
    write(&staged)?;

    let replaces_dir = target.symlink_metadata().is_ok_and(|m| m.is_dir());
    if !replaces_dir {
        return staged.persist(target).map_err(io::Error::from);
    }

    let parking = tempfile::Builder::new().prefix(".ferry-old-").tempdir_in(parent)?;
    let parked = parking.path().join("entry");
    fs::rename(target, &parked)?;
    if let Err(e) = staged.persist(target) {
        if let Err(restore) = fs::rename(&parked, target) {
            tracing::error!(path = %target.display(), error = %restore, "could not restore replaced folder");
        }
        return Err(e.into());
    }
    if let Err(e) = parking.close() {
        tracing::debug!(path = %target.display(), error = %e, "could not remove replaced folder");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn set_old_times(path: &Path, accessed: bool) -> std::time::SystemTime {
        let old = std::time::SystemTime::UNIX_EPOCH + std::time::Duration::from_secs(1_000_000);
        let mut times = FileTimes::new().set_modified(old);
        if accessed {
            times = times.set_accessed(old);
        }
        File::options().write(true).open(path).unwrap().set_times(times).unwrap();
        old
    }

    #[test]
    fn test_copy_file_preserves_times_when_asked() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("a.txt");
        let target = temp.path().join("b.txt");
        fs::write(&source, "hello").unwrap();
        let old = set_old_times(&source, true);

        NativeFileSystem.copy_file(&source, &target, true).unwrap();

        assert_eq!(fs::read_to_string(&target).unwrap(), "hello");
        assert_eq!(fs::metadata(&target).unwrap().modified().unwrap(), old);
    }

    #[test]
    fn test_copy_file_without_metadata_gets_fresh_times() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("a.txt");
        let target = temp.path().join("b.txt");
        fs::write(&source, "hello").unwrap();
        let old = set_old_times(&source, false);

        NativeFileSystem.copy_file(&source, &target, false).unwrap();
        assert_ne!(fs::metadata(&target).unwrap().modified().unwrap(), old);
    }

    #[cfg(unix)]
    #[test]
    fn test_copy_file_keeps_links_as_links() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("folder")).unwrap();
        let link = temp.path().join("link");
        std::os::unix::fs::symlink(temp.path().join("folder"), &link).unwrap();
        let target = temp.path().join("copied");

        NativeFileSystem.copy_file(&link, &target, true).unwrap();

        assert!(target.symlink_metadata().unwrap().file_type().is_symlink());
        assert_eq!(fs::read_link(&target).unwrap(), temp.path().join("folder"));
    }

    #[test]
    fn test_replace_existing_swaps_file() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("a.txt");
        fs::write(&target, "old").unwrap();

        replace_existing(&target, |staged| fs::write(staged, "new")).unwrap();

        assert_eq!(fs::read_to_string(&target).unwrap(), "new");
        assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_failed_replacement_keeps_original() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("a.txt");
        fs::write(&target, "precious").unwrap();

        let err = replace_existing(&target, |_| Err(io::Error::other("disk failure"))).unwrap_err();

        assert_eq!(err.kind(), io::ErrorKind::Other);
        assert_eq!(fs::read_to_string(&target).unwrap(), "precious");
        assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_replace_existing_swaps_folder() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("item");
        fs::create_dir_all(target.join("inner")).unwrap();
        fs::write(target.join("inner/x.txt"), "x").unwrap();

        replace_existing(&target, |staged| fs::write(staged, "file now")).unwrap();

        assert_eq!(fs::read_to_string(&target).unwrap(), "file now");
        assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 1);
    }
}
