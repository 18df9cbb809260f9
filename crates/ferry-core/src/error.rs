//! Error and warning types for transfer operations.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while transferring files.
#[derive(Debug, Error)]
pub enum TransferError {
    /// Permission denied for a path.
    #[error("Permission denied: {path}")]
    PermissionDenied { path: PathBuf },

    /// The item vanished before it could be processed.
    #[error("Path not found: {path}")]
    NotFound { path: PathBuf },

    /// Generic I/O error.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The zip container could not be read or written.
    #[error("Archive error at {path}: {message}")]
    Archive { path: PathBuf, message: String },

    /// A permission escalation was granted but the retried mutation failed again.
    #[error("Still no write access after forcing permissions: {path}")]
    EscalationFailed { path: PathBuf },

    /// Operation was cancelled.
    #[error("Operation cancelled")]
    Cancelled,

    /// Other error.
    #[error("{message}")]
    Other { message: String },
}

impl TransferError {
    /// Create an I/O error with path context, classified by kind.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            std::io::ErrorKind::NotFound => Self::NotFound { path },
            _ => Self::Io { path, source },
        }
    }

    /// Create an archive error.
    pub fn archive(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::Archive {
            path: path.into(),
            message: message.to_string(),
        }
    }
}

/// Kind of transfer warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WarningKind {
    /// A source folder could not be removed after its contents were processed.
    FolderNotRemoved,
    /// An archive entry pointed outside the extraction directory.
    UnsafeArchiveEntry,
    /// Trashing failed and the item was handled by the fallback question.
    TrashFallback,
}

/// Non-fatal warning collected during an operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferWarning {
    /// Path where the warning occurred.
    pub path: PathBuf,
    /// Human-readable message.
    pub message: String,
    /// Kind of warning.
    pub kind: WarningKind,
}

impl TransferWarning {
    /// Create a new transfer warning.
    pub fn new(path: impl Into<PathBuf>, message: impl Into<String>, kind: WarningKind) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
            kind,
        }
    }

    /// A folder that kept some of its contents because of a permission failure.
    pub fn folder_not_removed(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            message: format!(
                "Certain files in {} could not be removed due to a permission error",
                path.display()
            ),
            path,
            kind: WarningKind::FolderNotRemoved,
        }
    }

    /// One warning covering every folder a cleanup pass had to leave behind.
    ///
    /// Returns `None` when `folders` is empty.
    pub fn folders_not_removed(folders: &[PathBuf]) -> Option<Self> {
        match folders {
            [] => None,
            [single] => Some(Self::folder_not_removed(single.clone())),
            [first, ..] => {
                let names = folders
                    .iter()
                    .map(|f| f.display().to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                Some(Self {
                    message: format!(
                        "Certain files in {names} could not be removed due to a permission error"
                    ),
                    path: first.clone(),
                    kind: WarningKind::FolderNotRemoved,
                })
            }
        }
    }

    /// A trash failure the user chose to resolve by deleting permanently.
    pub fn trash_fallback(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            message: format!("{} could not be trashed and was deleted permanently", path.display()),
            path,
            kind: WarningKind::TrashFallback,
        }
    }

    /// An archive entry whose name escapes the destination.
    pub fn unsafe_entry(name: &str) -> Self {
        Self {
            message: format!("Blocked unsafe archive entry: {name}"),
            path: PathBuf::from(name),
            kind: WarningKind::UnsafeArchiveEntry,
        }
    }
}
