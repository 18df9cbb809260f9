//! Move operation.

use std::io;
use std::path::{Path, PathBuf};

use crate::copy::{TransferMode, create_destination, recreate_bare_folders, transfer_item};
use crate::delete::remove_emptied_folders;
use crate::executor::{Finish, Halt, Run, ensure_not_inside_sources};
use crate::filesystem::FileSystem;

/// Move every source into `destination`, then remove the emptied source
/// folders.
pub(crate) fn run_move(run: &mut Run<'_>, sources: &[PathBuf], destination: &Path) -> Result<Finish, Halt> {
    ensure_not_inside_sources(sources, destination)?;
    let enumeration = run.enumerate(sources, "Getting items to move...")?;
    if enumeration.is_empty() {
        return Ok(Finish::NothingToDo);
    }

    run.reporter.set_total(enumeration.len() + 1);
    create_destination(run.fs, destination)?;

    for item in &enumeration.items {
        let outcome = transfer_item(run, item, destination, TransferMode::Move)?;
        run.record(item, &outcome);
    }

    run.checkpoint()?;
    run.reporter.step("removing source folders");
    recreate_bare_folders(run, &enumeration.bare_folders, destination)?;
    let failed = remove_emptied_folders(run, &enumeration.folders)?;

    let moved: Vec<PathBuf> = sources
        .iter()
        .filter(|source| {
            !run.has_skipped_under(source) && !failed.iter().any(|f| f.starts_with(source))
        })
        .cloned()
        .collect();
    run.moved_sources = moved;
    Ok(Finish::Completed)
}

/// Move one file, falling back to copy and remove across filesystems.
pub(crate) fn move_file(fs: &dyn FileSystem, source: &Path, target: &Path) -> io::Result<()> {
    match fs.rename(source, target) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            tracing::debug!(from = %source.display(), to = %target.display(), "rename crosses devices, copying");
            fs.copy_file(source, target, true)?;
            fs.remove_file(source)
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filesystem::NativeFileSystem;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_move_file_renames() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("a.txt");
        let target = temp.path().join("b.txt");
        fs::write(&source, "data").unwrap();

        move_file(&NativeFileSystem, &source, &target).unwrap();

        assert!(!source.exists());
        assert_eq!(fs::read_to_string(&target).unwrap(), "data");
    }

    #[test]
    fn test_move_missing_source_is_not_found() {
        let temp = TempDir::new().unwrap();
        let err = move_file(&NativeFileSystem, &temp.path().join("missing"), &temp.path().join("b")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
