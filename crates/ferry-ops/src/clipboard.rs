//! Clipboard collaborator for cut/copy selections.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Receives the sources a Move fully transferred.
///
/// Called at most once per operation, with every entry in one batch.
pub trait ClipboardSink: Send + Sync {
    fn remove_entries(&self, paths: &[PathBuf]);
}

/// Whether a clipboard entry was cut or copied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClipboardMode {
    Copy,
    Cut,
}

/// Insertion-ordered clipboard of selected paths.
#[derive(Debug, Clone, Default)]
pub struct Clipboard {
    entries: Arc<Mutex<IndexMap<PathBuf, ClipboardMode>>>,
}

impl Clipboard {
    /// Create an empty clipboard.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add paths, replacing the mode of any already present.
    pub fn add(&self, paths: impl IntoIterator<Item = PathBuf>, mode: ClipboardMode) {
        if let Ok(mut entries) = self.entries.lock() {
            for path in paths {
                entries.insert(path, mode);
            }
        }
    }

    /// Paths currently on the clipboard with the given mode, in insertion order.
    pub fn paths(&self, mode: ClipboardMode) -> Vec<PathBuf> {
        self.entries
            .lock()
            .map(|entries| {
                entries
                    .iter()
                    .filter(|(_, m)| **m == mode)
                    .map(|(p, _)| p.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    /// Whether the clipboard is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `path` is on the clipboard.
    pub fn contains(&self, path: &Path) -> bool {
        self.entries
            .lock()
            .map(|e| e.contains_key(path))
            .unwrap_or(false)
    }
}

impl ClipboardSink for Clipboard {
    fn remove_entries(&self, paths: &[PathBuf]) {
        if let Ok(mut entries) = self.entries.lock() {
            for path in paths {
                entries.shift_remove(path);
            }
        }
    }
}
