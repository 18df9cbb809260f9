//! Copy operation, and the per-item transfer shared with move.

use std::path::{Path, PathBuf};

use ferry_core::{TransferError, TransferItem, relative_location};

use crate::conflict::{BlockedFolder, ConflictAction, ConflictPrompt, PASTE_CONFLICT_MESSAGE};
use crate::executor::{Attempted, Finish, Halt, Run, ensure_not_inside_sources};
use crate::filesystem::{FileSystem, replace_existing};
use crate::move_op::move_file;
use crate::permission::{OVERWRITE_DENIED_MESSAGE, relax_permissions};

/// How an item travels to its destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TransferMode {
    Copy,
    Move,
}

/// Copy every source into `destination`.
pub(crate) fn run_copy(run: &mut Run<'_>, sources: &[PathBuf], destination: &Path) -> Result<Finish, Halt> {
    ensure_not_inside_sources(sources, destination)?;
    let enumeration = run.enumerate(sources, "Getting items to copy...")?;
    if enumeration.is_empty() {
        return Ok(Finish::NothingToDo);
    }

    run.reporter.set_total(enumeration.len() + 1);
    create_destination(run.fs, destination)?;

    for item in &enumeration.items {
        let outcome = transfer_item(run, item, destination, TransferMode::Copy)?;
        run.record(item, &outcome);
    }

    run.checkpoint()?;
    run.reporter.step("creating empty folders");
    recreate_bare_folders(run, &enumeration.bare_folders, destination)?;
    Ok(Finish::Completed)
}

pub(crate) fn create_destination(fs: &dyn FileSystem, destination: &Path) -> Result<(), Halt> {
    fs.create_dir_all(destination)
        .map_err(|e| Halt::Failed(TransferError::io(destination, e)))
}

/// Transfer one item, running the conflict and permission protocols.
///
/// Checks cancellation and advances the progress count before touching
/// anything, so a cancelled run has completed exactly the items it started.
pub(crate) fn transfer_item(
    run: &mut Run<'_>,
    item: &TransferItem,
    destination: &Path,
    mode: TransferMode,
) -> Result<Attempted<()>, Halt> {
    run.checkpoint()?;
    run.reporter.step(&item.relative_location);

    let source = item.absolute_path.as_path();
    if source.symlink_metadata().is_err() {
        return Ok(Attempted::Vanished);
    }

    let planned = item.destination_in(destination);
    let mut target = planned.clone();
    if let (Some(parent), Some(name)) = (planned.parent(), planned.file_name()) {
        match prepare_directory(run, destination, parent, PASTE_CONFLICT_MESSAGE)? {
            Attempted::Done(folder) => target = folder.join(name),
            Attempted::Skipped => return Ok(Attempted::Skipped),
            Attempted::Vanished => return Ok(Attempted::Vanished),
        }
    }

    let mut replace = false;
    if run.conflicts.is_conflict(&target) {
        let prompt = ConflictPrompt {
            context: item.relative_location.to_string(),
            destination_dir: destination.to_path_buf(),
            message: PASTE_CONFLICT_MESSAGE.to_string(),
        };
        match run.conflicts.decide(run.interaction, &prompt) {
            ConflictAction::Overwrite => {
                if is_same_file(source, &target) {
                    tracing::debug!(path = %source.display(), "source and destination are the same file");
                    return Ok(Attempted::Skipped);
                }
                replace = true;
            }
            ConflictAction::Skip => return Ok(Attempted::Skipped),
            ConflictAction::Rename => target = run.conflicts.rename_target(&target),
            ConflictAction::Cancel => return Err(Halt::Cancelled),
        }
    }

    let fs = run.fs;
    let copy_metadata = run.context.copy_metadata;
    let place = |path: &Path| match mode {
        TransferMode::Copy => fs.copy_file(source, path, copy_metadata),
        TransferMode::Move => move_file(fs, source, path),
    };
    let write = || {
        if replace {
            replace_existing(&target, &place)
        } else {
            place(&target)
        }
    };

    match mode {
        TransferMode::Copy => run
            .permissions
            .attempt(run.interaction, &target, OVERWRITE_DENIED_MESSAGE, write),
        TransferMode::Move => {
            let first = write();
            run.permissions.settle(run.interaction, &target, OVERWRITE_DENIED_MESSAGE, first, || {
                relax_permissions(source);
                write()
            })
        }
    }
}

/// Make `folder` a directory, resolving anything in the way.
///
/// A non-directory at `folder`, or at any path between `root` and `folder`,
/// is a conflict. Overwrite removes the blocking entry, Rename places the
/// folder under a numbered name, Skip leaves it alone. Skip and Rename are
/// remembered, so later items beneath the same blocked path follow them.
///
/// Returns the directory to write into.
pub(crate) fn prepare_directory(
    run: &mut Run<'_>,
    root: &Path,
    folder: &Path,
    message: &str,
) -> Result<Attempted<PathBuf>, Halt> {
    let Ok(relative) = folder.strip_prefix(root) else {
        return create_directory(run, folder.to_path_buf());
    };

    let mut current = root.to_path_buf();
    for component in relative.components() {
        current.push(component);

        match run.conflicts.blocked_folder(&current) {
            Some(BlockedFolder::Skipped) => return Ok(Attempted::Skipped),
            Some(BlockedFolder::RenamedTo(renamed)) => {
                current = renamed;
                continue;
            }
            None => {}
        }
        if !is_blocked(&current) {
            continue;
        }

        let prompt = ConflictPrompt {
            context: relative_location(&current, root)
                .map(|location| location.to_string())
                .unwrap_or_default(),
            destination_dir: root.to_path_buf(),
            message: message.to_string(),
        };
        match run.conflicts.decide(run.interaction, &prompt) {
            ConflictAction::Overwrite => {
                let fs = run.fs;
                let blocker = current.clone();
                if let Attempted::Skipped = run.permissions.attempt(
                    run.interaction,
                    &blocker,
                    OVERWRITE_DENIED_MESSAGE,
                    || fs.remove_file(&blocker),
                )? {
                    return Ok(Attempted::Skipped);
                }
            }
            ConflictAction::Skip => {
                run.conflicts.resolve_blocked_folder(current, BlockedFolder::Skipped);
                return Ok(Attempted::Skipped);
            }
            ConflictAction::Rename => {
                let renamed = run.conflicts.rename_target(&current);
                run.conflicts
                    .resolve_blocked_folder(current, BlockedFolder::RenamedTo(renamed.clone()));
                current = renamed;
            }
            ConflictAction::Cancel => return Err(Halt::Cancelled),
        }
    }

    create_directory(run, current)
}

/// Whether something other than a directory occupies `path`.
fn is_blocked(path: &Path) -> bool {
    path.symlink_metadata().is_ok() && !path.is_dir()
}

fn create_directory(run: &mut Run<'_>, folder: PathBuf) -> Result<Attempted<PathBuf>, Halt> {
    let fs = run.fs;
    let outcome = run
        .permissions
        .attempt(run.interaction, &folder, OVERWRITE_DENIED_MESSAGE, || fs.create_dir_all(&folder))?;
    Ok(match outcome {
        Attempted::Done(()) => Attempted::Done(folder),
        Attempted::Skipped => Attempted::Skipped,
        Attempted::Vanished => Attempted::Vanished,
    })
}

/// Recreate folders that held nothing to transfer.
pub(crate) fn recreate_bare_folders(
    run: &mut Run<'_>,
    bare_folders: &[TransferItem],
    destination: &Path,
) -> Result<(), Halt> {
    for folder in bare_folders {
        run.checkpoint()?;
        let target = folder.destination_in(destination);
        if let Attempted::Skipped = prepare_directory(run, destination, &target, PASTE_CONFLICT_MESSAGE)? {
            run.skip(&folder.absolute_path);
        }
    }
    Ok(())
}

fn is_same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_same_file_detection() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("a.txt");
        fs::write(&file, "").unwrap();

        assert!(is_same_file(&file, &temp.path().join(".").join("a.txt")));
        assert!(!is_same_file(&file, &temp.path().join("b.txt")));
    }

    #[test]
    fn test_file_in_place_of_folder_is_blocked() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("notes"), "").unwrap();
        fs::create_dir(temp.path().join("docs")).unwrap();

        assert!(is_blocked(&temp.path().join("notes")));
        assert!(!is_blocked(&temp.path().join("docs")));
        assert!(!is_blocked(&temp.path().join("missing")));
    }
}
