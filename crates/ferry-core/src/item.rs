//! Transfer item types.

use std::path::{Component, Path, PathBuf};

use compact_str::CompactString;
use serde::{Deserialize, Serialize};

/// One file destined for copy, move, delete or archiving.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferItem {
    /// Where the item lives now.
    pub absolute_path: PathBuf,
    /// Destination-relative location, always `/`-separated.
    pub relative_location: CompactString,
}

impl TransferItem {
    /// Create a new transfer item.
    pub fn new(absolute_path: impl Into<PathBuf>, relative_location: impl Into<CompactString>) -> Self {
        Self {
            absolute_path: absolute_path.into(),
            relative_location: relative_location.into(),
        }
    }

    /// Create an item for a path under `root`.
    ///
    /// Returns `None` when `path` is not inside `root`.
    pub fn under_root(path: impl Into<PathBuf>, root: &Path) -> Option<Self> {
        let path = path.into();
        let relative = relative_location(&path, root)?;
        Some(Self {
            absolute_path: path,
            relative_location: relative,
        })
    }

    /// The item's base name.
    pub fn file_name(&self) -> &str {
        self.relative_location
            .rsplit('/')
            .next()
            .unwrap_or(self.relative_location.as_str())
    }

    /// Where this item lands below `destination`.
    pub fn destination_in(&self, destination: &Path) -> PathBuf {
        join_relative(destination, &self.relative_location)
    }
}

/// Compute the `/`-separated location of `path` relative to `root`.
///
/// An empty string means `path` is `root` itself.
pub fn relative_location(path: &Path, root: &Path) -> Option<CompactString> {
    let stripped = path.strip_prefix(root).ok()?;
    let mut out = CompactString::default();
    for component in stripped.components() {
        if let Component::Normal(part) = component {
            if !out.is_empty() {
                out.push('/');
            }
            out.push_str(&part.to_string_lossy());
        }
    }
    Some(out)
}

/// Join a `/`-separated relative location onto a base path.
pub fn join_relative(base: &Path, relative: &str) -> PathBuf {
    relative
        .split('/')
        .filter(|part| !part.is_empty())
        .fold(base.to_path_buf(), |acc, part| acc.join(part))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_location_uses_forward_slashes() {
        let root = Path::new("/data/photos");
        let path = root.join("2024").join("beach.jpg");
        assert_eq!(
            relative_location(&path, root).unwrap().as_str(),
            "2024/beach.jpg"
        );
        assert_eq!(relative_location(root, root).unwrap().as_str(), "");
        assert!(relative_location(Path::new("/elsewhere"), root).is_none());
    }

    #[test]
    fn test_destination_in() {
        let item = TransferItem::new("/src/a/b.txt", "a/b.txt");
        assert_eq!(
            item.destination_in(Path::new("/dest")),
            Path::new("/dest").join("a").join("b.txt")
        );
        assert_eq!(item.file_name(), "b.txt");
    }
}
