//! Zip creation and extraction.

use std::fs;
use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};

use ferry_core::{TransferError, TransferItem, TransferWarning, relative_location};
use itertools::Itertools;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::conflict::{ConflictAction, ConflictPrompt, EXTRACT_CONFLICT_MESSAGE};
use crate::copy::{create_destination, prepare_directory};
use crate::executor::{Attempted, Finish, Halt, Run};
use crate::filesystem::{FileSystem, replace_existing};
use crate::permission::OVERWRITE_DENIED_MESSAGE;

/// One entry to write into an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ArchiveEntry {
    /// Forward-slash name inside the archive; directories end in `/`.
    name: String,
    /// File to read, or `None` for a directory entry.
    source: Option<PathBuf>,
}

/// Write every source into a deflated zip at `archive`.
///
/// Entry names are relative to the sources' common parent. Symbolic links are
/// stored as link entries. An existing file at `archive` is replaced; a
/// failure part way leaves the partial archive on disk.
pub(crate) fn run_zip(run: &mut Run<'_>, sources: &[PathBuf], archive: &Path) -> Result<Finish, Halt> {
    let enumeration = run.enumerate(sources, "Getting files to zip...")?;
    let base = archive_base(sources);
    let entries = plan_entries(&enumeration.items, &enumeration.bare_folders, &base, archive);

    run.reporter.set_total(entries.len() + 1);

    if let Some(parent) = archive.parent().filter(|p| !p.as_os_str().is_empty()) {
        create_destination(run.fs, parent)?;
    }
    let file = run
        .fs
        .create(archive)
        .map_err(|e| Halt::Failed(TransferError::io(archive, e)))?;
    let mut writer = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for entry in &entries {
        if run.cancel.is_cancelled() {
            // Leave a readable archive holding the entries written so far.
            writer
                .finish()
                .map_err(|e| Halt::Failed(TransferError::archive(archive, e)))?;
            return Err(Halt::Cancelled);
        }
        run.reporter.step(&entry.name);

        let Some(path) = &entry.source else {
            writer
                .add_directory(entry.name.as_str(), options)
                .map_err(|e| Halt::Failed(TransferError::archive(archive, e)))?;
            run.succeeded += 1;
            continue;
        };

        let metadata = match path.symlink_metadata() {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "item vanished, skipping");
                continue;
            }
            Err(e) => return Err(Halt::Failed(TransferError::io(path, e))),
        };

        if metadata.file_type().is_symlink() {
            let link = fs::read_link(path).map_err(|e| Halt::Failed(TransferError::io(path, e)))?;
            writer
                .add_symlink(entry.name.as_str(), link.to_string_lossy().into_owned(), options)
                .map_err(|e| Halt::Failed(TransferError::archive(archive, e)))?;
        } else {
            let mut source = match run.fs.open(path) {
                Ok(file) => file,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    tracing::debug!(path = %path.display(), "item vanished, skipping");
                    continue;
                }
                Err(e) => return Err(Halt::Failed(TransferError::io(path, e))),
            };
            writer
                .start_file(entry.name.as_str(), file_options(options, path))
                .map_err(|e| Halt::Failed(TransferError::archive(archive, e)))?;
            io::copy(&mut source, &mut writer).map_err(|e| Halt::Failed(TransferError::io(path, e)))?;
        }
        run.succeeded += 1;
    }

    writer
        .finish()
        .map_err(|e| Halt::Failed(TransferError::archive(archive, e)))?;
    run.reporter.step("finishing archive");
    Ok(Finish::Completed)
}

#[cfg(unix)]
fn file_options(options: SimpleFileOptions, path: &Path) -> SimpleFileOptions {
    use std::os::unix::fs::PermissionsExt;

    match fs::metadata(path) {
        Ok(metadata) => options.unix_permissions(metadata.permissions().mode()),
        Err(_) => options,
    }
}

#[cfg(not(unix))]
fn file_options(options: SimpleFileOptions, _path: &Path) -> SimpleFileOptions {
    options
}

/// The directory entry names are made relative to.
///
/// A single source is named relative to its parent, so the archive holds it
/// by name; several sources are named relative to their common path.
fn archive_base(sources: &[PathBuf]) -> PathBuf {
    let sources: Vec<&PathBuf> = sources.iter().unique().collect();
    match sources.as_slice() {
        [] => PathBuf::new(),
        [single] => single.parent().map(Path::to_path_buf).unwrap_or_default(),
        [first, rest @ ..] => rest.iter().fold(first.to_path_buf(), |base, path| common_path(&base, path)),
    }
}

fn common_path(a: &Path, b: &Path) -> PathBuf {
    a.components()
        .zip(b.components())
        .take_while(|(x, y)| x == y)
        .map(|(x, _)| x)
        .collect()
}

/// Sorted, de-duplicated entries for the given items.
fn plan_entries(
    items: &[TransferItem],
    bare_folders: &[TransferItem],
    base: &Path,
    archive: &Path,
) -> Vec<ArchiveEntry> {
    let files = items
        .iter()
        .filter(|item| item.absolute_path != archive)
        .filter_map(|item| {
            let name = relative_location(&item.absolute_path, base)?;
            Some(ArchiveEntry {
                name: name.to_string(),
                source: Some(item.absolute_path.clone()),
            })
        });
    let folders = bare_folders.iter().filter_map(|folder| {
        let name = relative_location(&folder.absolute_path, base)?;
        (!name.is_empty()).then(|| ArchiveEntry {
            name: format!("{name}/"),
            source: None,
        })
    });

    files
        .chain(folders)
        .filter(|entry| !entry.name.is_empty())
        .sorted_by(|a, b| a.name.cmp(&b.name))
        .dedup_by(|a, b| a.name == b.name)
        .collect()
}

/// Extract every entry of `archive` into `destination`.
pub(crate) fn run_unzip(run: &mut Run<'_>, archive: &Path, destination: &Path) -> Result<Finish, Halt> {
    run.reporter.label("Preparing to extract...");
    create_destination(run.fs, destination)?;

    let file = run
        .fs
        .open(archive)
        .map_err(|e| Halt::Failed(TransferError::io(archive, e)))?;
    let mut zip = ZipArchive::new(file).map_err(|e| Halt::Failed(TransferError::archive(archive, e)))?;
    run.reporter.set_total(zip.len() + 1);

    for index in 0..zip.len() {
        run.checkpoint()?;
        let mut entry = zip
            .by_index(index)
            .map_err(|e| Halt::Failed(TransferError::archive(archive, e)))?;
        let name = entry.name().to_string();
        run.reporter.step(&name);

        let Some(relative) = entry.enclosed_name() else {
            run.warn(TransferWarning::unsafe_entry(&name));
            run.skip(&destination.join(sanitized_display(&name)));
            continue;
        };
        let planned = destination.join(&relative);

        if entry.is_dir() {
            match prepare_directory(run, destination, &planned, EXTRACT_CONFLICT_MESSAGE)? {
                Attempted::Done(_) => run.succeeded += 1,
                Attempted::Skipped => run.skip(&planned),
                Attempted::Vanished => {}
            }
            continue;
        }

        let mut target = planned.clone();
        if let (Some(parent), Some(file_name)) = (planned.parent(), planned.file_name()) {
            match prepare_directory(run, destination, parent, EXTRACT_CONFLICT_MESSAGE)? {
                Attempted::Done(folder) => target = folder.join(file_name),
                Attempted::Skipped | Attempted::Vanished => {
                    run.skip(&planned);
                    continue;
                }
            }
        }

        let mut replace = false;
        if run.conflicts.is_conflict(&target) {
            let prompt = ConflictPrompt {
                context: name.clone(),
                destination_dir: destination.to_path_buf(),
                message: EXTRACT_CONFLICT_MESSAGE.to_string(),
            };
            match run.conflicts.decide(run.interaction, &prompt) {
                ConflictAction::Overwrite => replace = true,
                ConflictAction::Skip => {
                    run.skip(&target);
                    continue;
                }
                ConflictAction::Rename => target = run.conflicts.rename_target(&target),
                ConflictAction::Cancel => return Err(Halt::Cancelled),
            }
        }

        let fs = run.fs;
        let mode = entry.unix_mode();
        let outcome = run.permissions.attempt(run.interaction, &target, OVERWRITE_DENIED_MESSAGE, || {
            if replace {
                replace_existing(&target, |staged| extract(fs, &mut entry, staged))
            } else {
                extract(fs, &mut entry, &target)
            }
        })?;
        match outcome {
            Attempted::Done(()) => {
                restore_mode(&target, mode);
                run.succeeded += 1;
            }
            Attempted::Skipped => run.skip(&target),
            Attempted::Vanished => {}
        }
    }

    run.checkpoint()?;
    run.reporter.step("finishing extraction");
    Ok(Finish::Completed)
}

fn extract(fs: &dyn FileSystem, entry: &mut impl Read, target: &Path) -> io::Result<()> {
    let mut out = fs.create(target)?;
    io::copy(entry, &mut out)?;
    Ok(())
}

/// A name for an unsafe entry that stays inside the destination.
fn sanitized_display(name: &str) -> PathBuf {
    Path::new(name)
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part),
            _ => None,
        })
        .collect()
}

#[cfg(unix)]
fn restore_mode(target: &Path, mode: Option<u32>) {
    use std::os::unix::fs::PermissionsExt;

    if let Some(mode) = mode {
        if let Err(e) = fs::set_permissions(target, fs::Permissions::from_mode(mode & 0o7777)) {
            tracing::debug!(path = %target.display(), error = %e, "could not restore mode");
        }
    }
}

#[cfg(not(unix))]
fn restore_mode(_target: &Path, _mode: Option<u32>) {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_source_base_is_parent() {
        let base = archive_base(&[PathBuf::from("/home/user/project")]);
        assert_eq!(base, PathBuf::from("/home/user"));
    }

    #[test]
    fn test_many_sources_base_is_common_path() {
        let base = archive_base(&[
            PathBuf::from("/home/user/docs/a.txt"),
            PathBuf::from("/home/user/docs/sub/b.txt"),
            PathBuf::from("/home/user/docs/c"),
        ]);
        assert_eq!(base, PathBuf::from("/home/user/docs"));
    }

    #[test]
    fn test_plan_entries_sorted_and_deduplicated() {
        let base = Path::new("/data");
        let items = vec![
            TransferItem::new("/data/proj/b.txt", "b.txt"),
            TransferItem::new("/data/proj/a.txt", "a.txt"),
            TransferItem::new("/data/proj/a.txt", "a.txt"),
        ];
        let bare = vec![TransferItem::new("/data/proj/empty", "empty")];

        let entries = plan_entries(&items, &bare, base, Path::new("/data/out.zip"));
        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();

        assert_eq!(names, vec!["proj/a.txt", "proj/b.txt", "proj/empty/"]);
        assert!(entries[2].source.is_none());
    }

    #[test]
    fn test_plan_entries_excludes_the_archive_itself() {
        let items = vec![
            TransferItem::new("/data/out.zip", "out.zip"),
            TransferItem::new("/data/a.txt", "a.txt"),
        ];
        let entries = plan_entries(&items, &[], Path::new("/data"), Path::new("/data/out.zip"));
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "a.txt");
    }

    #[test]
    fn test_sanitized_display_drops_traversal() {
        assert_eq!(sanitized_display("../../etc/passwd"), PathBuf::from("etc/passwd"));
    }
}
