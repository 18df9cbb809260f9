//! File operation types.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// A bulk file operation to be executed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Operation {
    /// Copy files/directories to a destination.
    Copy {
        sources: Vec<PathBuf>,
        destination: PathBuf,
    },
    /// Move (cut and paste) files/directories to a destination.
    Move {
        sources: Vec<PathBuf>,
        destination: PathBuf,
    },
    /// Send files/directories to the trash.
    DeleteToTrash { targets: Vec<PathBuf> },
    /// Remove files/directories permanently.
    DeletePermanent { targets: Vec<PathBuf> },
    /// Compress files/directories into a zip archive.
    Zip {
        sources: Vec<PathBuf>,
        archive: PathBuf,
    },
    /// Extract a zip archive into a destination directory.
    Unzip {
        archive: PathBuf,
        destination: PathBuf,
    },
}

impl Operation {
    /// Create a copy operation.
    pub fn copy(sources: Vec<PathBuf>, destination: impl Into<PathBuf>) -> Self {
        Self::Copy {
            sources,
            destination: destination.into(),
        }
    }

    /// Create a move operation.
    pub fn move_to(sources: Vec<PathBuf>, destination: impl Into<PathBuf>) -> Self {
        Self::Move {
            sources,
            destination: destination.into(),
        }
    }

    /// Create a delete operation, trashing or removing permanently.
    pub fn delete(targets: Vec<PathBuf>, use_trash: bool) -> Self {
        if use_trash {
            Self::DeleteToTrash { targets }
        } else {
            Self::DeletePermanent { targets }
        }
    }

    /// Create a zip operation.
    pub fn zip(sources: Vec<PathBuf>, archive: impl Into<PathBuf>) -> Self {
        Self::Zip {
            sources,
            archive: archive.into(),
        }
    }

    /// Create an unzip operation.
    pub fn unzip(archive: impl Into<PathBuf>, destination: impl Into<PathBuf>) -> Self {
        Self::Unzip {
            archive: archive.into(),
            destination: destination.into(),
        }
    }

    /// The kind of this operation.
    pub fn operation_type(&self) -> OperationType {
        match self {
            Self::Copy { .. } => OperationType::Copy,
            Self::Move { .. } => OperationType::Move,
            Self::DeleteToTrash { .. } => OperationType::Trash,
            Self::DeletePermanent { .. } => OperationType::Delete,
            Self::Zip { .. } => OperationType::Zip,
            Self::Unzip { .. } => OperationType::Unzip,
        }
    }
}

/// The type of operation being performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationType {
    Copy,
    Move,
    Trash,
    Delete,
    Zip,
    Unzip,
}

impl OperationType {
    /// Past-tense verb used in summaries.
    pub fn past_tense(&self) -> &'static str {
        match self {
            Self::Copy => "Copied",
            Self::Move => "Moved",
            Self::Trash => "Trashed",
            Self::Delete => "Deleted",
            Self::Zip => "Zipped",
            Self::Unzip => "Extracted",
        }
    }
}

impl std::fmt::Display for OperationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Copy => write!(f, "Copy"),
            Self::Move => write!(f, "Move"),
            Self::Trash => write!(f, "Trash"),
            Self::Delete => write!(f, "Delete"),
            Self::Zip => write!(f, "Zip"),
            Self::Unzip => write!(f, "Unzip"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delete_constructor_picks_type() {
        let targets = vec![PathBuf::from("/tmp/a")];
        assert_eq!(Operation::delete(targets.clone(), true).operation_type(), OperationType::Trash);
        assert_eq!(Operation::delete(targets, false).operation_type(), OperationType::Delete);
    }

    #[test]
    fn test_labels() {
        assert_eq!(OperationType::Unzip.to_string(), "Unzip");
        assert_eq!(OperationType::Unzip.past_tense(), "Extracted");
        assert_eq!(Operation::zip(vec![], "/tmp/a.zip").operation_type(), OperationType::Zip);
    }
}
