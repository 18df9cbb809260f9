//! Conflict detection and resolution for file operations.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::prompt::Interaction;

/// Prompt text used when pasting onto an existing name.
pub const PASTE_CONFLICT_MESSAGE: &str =
    "The destination already has a file of that name.\nWhat do you want to do now?";

/// Prompt text used when extracting onto an existing name.
pub const EXTRACT_CONFLICT_MESSAGE: &str =
    "Path already exists in destination.\nWhat do you want to do now?";

/// How to resolve a conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConflictAction {
    /// Replace the existing item.
    Overwrite,
    /// Leave the existing item alone and skip this one.
    Skip,
    /// Write under a numbered name, e.g. "file (1).txt".
    Rename,
    /// Abort the entire operation.
    Cancel,
}

/// A conflict resolution, optionally applied to the rest of the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictDecision {
    pub action: ConflictAction,
    /// Apply `action` to every remaining conflict without asking again.
    pub sticky: bool,
}

impl ConflictDecision {
    /// A decision for this conflict only.
    pub fn once(action: ConflictAction) -> Self {
        Self {
            action,
            sticky: false,
        }
    }

    /// A decision for this and every later conflict.
    pub fn always(action: ConflictAction) -> Self {
        Self {
            action,
            sticky: true,
        }
    }
}

/// What the prompt collaborator is shown for a conflict.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictPrompt {
    /// The conflicting relative path (or archive entry name).
    pub context: String,
    /// The directory being written into.
    pub destination_dir: PathBuf,
    /// Question to display.
    pub message: String,
}

/// What happened to a folder path that was blocked by a non-folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum BlockedFolder {
    /// Items beneath it are skipped.
    Skipped,
    /// Items beneath it go into this folder instead.
    RenamedTo(PathBuf),
}

/// Per-operation conflict state.
///
/// Holds the sticky slot, the names chosen by `Rename` during this run, and
/// the outcome for folder paths that were blocked by a file.
#[derive(Debug, Default)]
pub struct ConflictResolver {
    sticky: Option<ConflictAction>,
    reserved: HashSet<PathBuf>,
    blocked: HashMap<PathBuf, BlockedFolder>,
}

impl ConflictResolver {
    /// Create a resolver with nothing decided yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// The standing decision, if one was made sticky.
    pub fn sticky(&self) -> Option<ConflictAction> {
        self.sticky
    }

    /// Whether writing to `destination` would clash with an existing entry.
    pub fn is_conflict(&self, destination: &Path) -> bool {
        destination.symlink_metadata().is_ok()
    }

    /// Decide what to do, asking only while no sticky decision exists.
    pub fn decide(&mut self, interaction: &dyn Interaction, prompt: &ConflictPrompt) -> ConflictAction {
        if let Some(action) = self.sticky {
            return action;
        }

        let decision = interaction.prompt_conflict(prompt);
        tracing::debug!(context = %prompt.context, action = ?decision.action, sticky = decision.sticky, "conflict decided");
        if decision.sticky {
            self.sticky = Some(decision.action);
        }
        decision.action
    }

    /// Find a free numbered sibling of `destination` and reserve it.
    ///
    /// Probes "base (n).ext" for n = 1, 2, ... against the directory contents
    /// and against names already handed out in this run.
    pub fn rename_target(&mut self, destination: &Path) -> PathBuf {
        let parent = destination.parent().unwrap_or(Path::new(""));
        let name = destination
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        let mut n: usize = 1;
        loop {
            let candidate = parent.join(numbered_name(&name, n));
            if candidate.symlink_metadata().is_err() && !self.reserved.contains(&candidate) {
                self.reserved.insert(candidate.clone());
                return candidate;
            }
            n += 1;
        }
    }

    /// How an earlier decision resolved a blocked folder path, if one did.
    pub(crate) fn blocked_folder(&self, folder: &Path) -> Option<BlockedFolder> {
        self.blocked.get(folder).cloned()
    }

    /// Remember how a blocked folder path was resolved for later items.
    pub(crate) fn resolve_blocked_folder(&mut self, folder: PathBuf, outcome: BlockedFolder) {
        self.blocked.insert(folder, outcome);
    }
}

/// Split a file name into base and extension at the last `.`.
///
/// A leading dot (".bashrc") does not start an extension.
pub fn split_name(name: &str) -> (&str, Option<&str>) {
    match name.rfind('.') {
        Some(idx) if idx > 0 => (&name[..idx], Some(&name[idx + 1..])),
        _ => (name, None),
    }
}

/// Build the n-th numbered variant of a file name.
pub fn numbered_name(name: &str, n: usize) -> String {
    match split_name(name) {
        (base, Some(ext)) => format!("{base} ({n}).{ext}"),
        (base, None) => format!("{base} ({n})"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_split_name() {
        assert_eq!(split_name("report.pdf"), ("report", Some("pdf")));
        assert_eq!(split_name("archive.tar.gz"), ("archive.tar", Some("gz")));
        assert_eq!(split_name("Makefile"), ("Makefile", None));
        assert_eq!(split_name(".bashrc"), (".bashrc", None));
    }

    #[test]
    fn test_numbered_name() {
        assert_eq!(numbered_name("test.txt", 1), "test (1).txt");
        assert_eq!(numbered_name("testfile", 3), "testfile (3)");
    }

    #[test]
    fn test_rename_skips_existing_names() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("base.ext"), "").unwrap();
        for n in 1..=4 {
            fs::write(temp.path().join(format!("base ({n}).ext")), "").unwrap();
        }

        let mut resolver = ConflictResolver::new();
        let target = resolver.rename_target(&temp.path().join("base.ext"));
        assert_eq!(target, temp.path().join("base (5).ext"));
    }

    #[test]
    fn test_rename_never_reuses_a_reserved_name() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a.txt"), "").unwrap();

        let mut resolver = ConflictResolver::new();
        let first = resolver.rename_target(&temp.path().join("a.txt"));
        let second = resolver.rename_target(&temp.path().join("a.txt"));

        assert_eq!(first, temp.path().join("a (1).txt"));
        assert_eq!(second, temp.path().join("a (2).txt"));
    }

    #[test]
    fn test_blocked_folder_outcome_is_remembered() {
        let mut resolver = ConflictResolver::new();
        let folder = PathBuf::from("/dest/sub");
        assert_eq!(resolver.blocked_folder(&folder), None);

        let renamed = PathBuf::from("/dest/sub (1)");
        resolver.resolve_blocked_folder(folder.clone(), BlockedFolder::RenamedTo(renamed.clone()));
        assert_eq!(resolver.blocked_folder(&folder), Some(BlockedFolder::RenamedTo(renamed)));
    }
}
