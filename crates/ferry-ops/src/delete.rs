//! Delete operation, to the trash or permanently.

use std::io;
use std::path::{Path, PathBuf};

use ferry_core::TransferWarning;

use crate::executor::{Attempted, Finish, Halt, Run};
use crate::permission::DELETE_DENIED_MESSAGE;

/// Delete every target's files, then remove the emptied folders.
pub(crate) fn run_delete(run: &mut Run<'_>, targets: &[PathBuf], use_trash: bool) -> Result<Finish, Halt> {
    let enumeration = run.enumerate(targets, "Getting items to delete...")?;
    if enumeration.is_empty() {
        return Ok(Finish::NothingToDo);
    }

    run.reporter.set_total(enumeration.len() + 1);

    for item in &enumeration.items {
        run.checkpoint()?;
        run.reporter.step(&item.relative_location);

        let fs = run.fs;
        let path = item.absolute_path.as_path();
        let outcome = if path.symlink_metadata().is_err() {
            Attempted::Vanished
        } else if use_trash {
            trash_item(run, path)?
        } else {
            run.permissions
                .attempt(run.interaction, path, DELETE_DENIED_MESSAGE, || fs.remove_file(path))?
        };
        run.record(item, &outcome);
    }

    run.checkpoint()?;
    run.reporter.step("removing folders");
    remove_emptied_folders(run, &enumeration.folders)?;
    run.succeeded += enumeration
        .bare_folders
        .iter()
        .filter(|folder| folder.absolute_path.symlink_metadata().is_err())
        .count();
    Ok(Finish::Completed)
}

/// Send one file to the trash.
///
/// A permission failure goes through the permission protocol, where `Force`
/// ends in a direct removal. Any other trash failure asks whether to delete
/// permanently instead.
fn trash_item(run: &mut Run<'_>, path: &Path) -> Result<Attempted<()>, Halt> {
    let fs = run.fs;
    let error = match fs.trash(path) {
        Ok(()) => return Ok(Attempted::Done(())),
        Err(_) if path.symlink_metadata().is_err() => return Ok(Attempted::Vanished),
        Err(e) => e,
    };

    if is_permission_error(&error) {
        return run
            .permissions
            .escalate(run.interaction, path, DELETE_DENIED_MESSAGE, || fs.remove_file(path));
    }

    tracing::warn!(path = %path.display(), %error, "trashing failed");
    let question = format!("Trashing failed due to\n{error}\nDo permanent deletion?");
    if !run.interaction.prompt_yes_no(&question) {
        return Ok(Attempted::Skipped);
    }

    let outcome = run
        .permissions
        .attempt(run.interaction, path, DELETE_DENIED_MESSAGE, || fs.remove_file(path))?;
    if let Attempted::Done(()) = outcome {
        run.warn(TransferWarning::trash_fallback(path));
    }
    Ok(outcome)
}

/// Remove folders whose contents were processed, parents first.
///
/// A folder is left alone when anything beneath it was skipped. Folders that
/// fail to go away are reported in one warning and returned; they never halt
/// the operation.
pub(crate) fn remove_emptied_folders(run: &mut Run<'_>, folders: &[PathBuf]) -> Result<Vec<PathBuf>, Halt> {
    let mut failed: Vec<PathBuf> = Vec::new();

    for folder in folders {
        run.checkpoint()?;
        if run.has_skipped_under(folder) || failed.iter().any(|f| folder.starts_with(f)) {
            continue;
        }
        match run.fs.remove_dir_all(folder) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::debug!(path = %folder.display(), error = %e, "folder not removed");
                failed.push(folder.clone());
            }
        }
    }

    if let Some(warning) = TransferWarning::folders_not_removed(&failed) {
        run.warn(warning);
    }
    Ok(failed)
}

fn is_permission_error(error: &trash::Error) -> bool {
    if let trash::Error::Os { code, .. } = error {
        // EPERM, EACCES, ERROR_ACCESS_DENIED
        return matches!(code, 1 | 13 | 5);
    }

    let mut source = std::error::Error::source(error);
    while let Some(err) = source {
        if let Some(io) = err.downcast_ref::<io::Error>() {
            if io.kind() == io::ErrorKind::PermissionDenied {
                return true;
            }
        }
        source = err.source();
    }

    let message = error.to_string().to_lowercase();
    message.contains("permission denied") || message.contains("access is denied")
}

/// The path handed to the platform trash.
#[cfg(windows)]
pub fn trash_target(path: &Path) -> PathBuf {
    PathBuf::from(path.to_string_lossy().replace('/', "\\"))
}

/// The path handed to the platform trash.
#[cfg(not(windows))]
pub fn trash_target(path: &Path) -> PathBuf {
    path.to_path_buf()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_os_permission_codes() {
        let denied = trash::Error::Os {
            code: 13,
            description: "Permission denied".into(),
        };
        assert!(is_permission_error(&denied));

        let other = trash::Error::Os {
            code: 28,
            description: "No space left on device".into(),
        };
        assert!(!is_permission_error(&other));
    }

    #[test]
    fn test_unknown_error_is_not_permission() {
        let error = trash::Error::Unknown {
            description: "no trash directory".into(),
        };
        assert!(!is_permission_error(&error));
    }

    #[cfg(not(windows))]
    #[test]
    fn test_trash_target_is_unchanged() {
        let path = Path::new("/home/user/a b/c.txt");
        assert_eq!(trash_target(path), PathBuf::from("/home/user/a b/c.txt"));
    }

    #[cfg(windows)]
    #[test]
    fn test_trash_target_uses_backslashes() {
        let path = Path::new("C:/Users/me/file.txt");
        assert_eq!(trash_target(path), PathBuf::from(r"C:\Users\me\file.txt"));
    }
}
