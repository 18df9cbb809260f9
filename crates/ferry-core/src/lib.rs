//! Core types for ferry.
//!
//! This crate provides the data structures shared by the traversal and
//! transfer crates: transfer items, the transfer context, and errors.

mod config;
mod error;
mod item;

pub use config::{TransferContext, TransferContextBuilder, TransferContextBuilderError};
pub use error::{TransferError, TransferWarning, WarningKind};
pub use item::{TransferItem, join_relative, relative_location};
