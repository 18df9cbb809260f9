//! JWalk-based source traversal.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use jwalk::{Parallelism, WalkDir};
use tokio_util::sync::CancellationToken;

use ferry_core::{TransferError, TransferItem};

/// The closure of files and folders under a set of sources.
#[derive(Debug, Clone, Default)]
pub struct Enumeration {
    /// Files to transfer, in enumeration order.
    pub items: Vec<TransferItem>,
    /// Folders with no files or subfolders, to be recreated explicitly.
    pub bare_folders: Vec<TransferItem>,
    /// Every folder visited, parents before children.
    pub folders: Vec<PathBuf>,
}

impl Enumeration {
    /// Whether there is nothing to transfer at all.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty() && self.bare_folders.is_empty()
    }

    /// Number of file items.
    pub fn len(&self) -> usize {
        self.items.len()
    }
}

/// Enumerates transfer items under source paths.
#[derive(Debug, Clone, Default)]
pub struct Traversal {
    cancel: Option<CancellationToken>,
}

impl Traversal {
    /// Create a new traversal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop walking as soon as `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|t| t.is_cancelled())
    }

    /// Enumerate every source.
    ///
    /// Missing or inaccessible sources contribute nothing. Symlinks found while
    /// walking a folder are left out of the item list.
    pub fn enumerate(&self, sources: &[PathBuf]) -> Result<Enumeration, TransferError> {
        let mut enumeration = Enumeration::default();

        for source in sources {
            if self.is_cancelled() {
                return Err(TransferError::Cancelled);
            }

            let metadata = match fs::symlink_metadata(source) {
                Ok(m) => m,
                Err(err) => {
                    tracing::debug!(path = %source.display(), error = %err, "source unavailable, skipping");
                    continue;
                }
            };

            let file_type = metadata.file_type();
            if file_type.is_dir() {
                self.walk_folder(source, &mut enumeration)?;
            } else if let Some(name) = source.file_name() {
                enumeration
                    .items
                    .push(TransferItem::new(source.clone(), name.to_string_lossy().as_ref()));
            }
        }

        tracing::debug!(
            items = enumeration.items.len(),
            bare_folders = enumeration.bare_folders.len(),
            "enumeration finished"
        );
        Ok(enumeration)
    }

    /// Walk one folder source, appending to `enumeration`.
    fn walk_folder(&self, root: &Path, enumeration: &mut Enumeration) -> Result<(), TransferError> {
        let walker = WalkDir::new(root)
            .parallelism(Parallelism::RayonDefaultPool {
                busy_timeout: std::time::Duration::from_millis(100),
            })
            .skip_hidden(false)
            .follow_links(false)
            .sort(true)
            .min_depth(0);

        let mut folders: Vec<PathBuf> = Vec::new();
        let mut non_leaf: HashSet<PathBuf> = HashSet::new();

        for entry_result in walker {
            if self.is_cancelled() {
                return Err(TransferError::Cancelled);
            }

            let entry = match entry_result {
                Ok(e) => e,
                Err(err) => {
                    tracing::warn!(error = %err, "unreadable entry during traversal");
                    continue;
                }
            };

            let path = entry.path();
            let file_type = entry.file_type();

            if file_type.is_symlink() {
                continue;
            }

            if entry.depth() > 0 {
                if let Some(parent) = path.parent() {
                    non_leaf.insert(parent.to_path_buf());
                }
            }

            if file_type.is_dir() {
                folders.push(path);
            } else if let Some(item) = TransferItem::under_root(path, root) {
                enumeration.items.push(item);
            }
        }

        for folder in folders {
            if !non_leaf.contains(&folder) {
                if let Some(item) = TransferItem::under_root(folder.clone(), root) {
                    enumeration.bare_folders.push(item);
                }
            }
            enumeration.folders.push(folder);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_source_contributes_nothing() {
        let result = Traversal::new()
            .enumerate(&[PathBuf::from("/definitely/not/here/ferry")])
            .unwrap();
        assert!(result.is_empty());
        assert!(result.folders.is_empty());
    }

    #[test]
    fn test_cancelled_before_start() {
        let token = CancellationToken::new();
        token.cancel();
        let result = Traversal::new()
            .with_cancellation(token)
            .enumerate(&[PathBuf::from(".")]);
        assert!(matches!(result, Err(TransferError::Cancelled)));
    }
}
