//! Source traversal for ferry.
//!
//! Turns a selection of files and folders into an ordered list of
//! [`TransferItem`]s, each carrying the location it will take relative to the
//! destination.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::path::PathBuf;
//! use ferry_scan::Traversal;
//!
//! let enumeration = Traversal::new()
//!     .enumerate(&[PathBuf::from("/path/to/folder")])
//!     .unwrap();
//!
//! for item in &enumeration.items {
//!     println!("{} -> {}", item.absolute_path.display(), item.relative_location);
//! }
//! ```
//!
//! Walking uses jwalk with sorted directory reads, so the order is stable for
//! a given tree.

mod traversal;

pub use traversal::{Enumeration, Traversal};

// Re-export core types for convenience
pub use ferry_core::{TransferError, TransferItem};
