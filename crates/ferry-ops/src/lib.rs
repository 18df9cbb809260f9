//! Bulk file transfer engine for ferry.
//!
//! This crate runs copy, move, delete, zip and unzip operations on a
//! background worker. Each operation streams [`TransferEvent`]s over a channel
//! and asks for decisions (name conflicts, permission failures) through an
//! [`Interaction`], whose calls block the worker until answered. Disk
//! mutations go through a [`FileSystem`], which defaults to the real disk.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use ferry_core::TransferContext;
//! use ferry_ops::{ChannelInteraction, Operation, TransferEvent, TransferExecutor};
//!
//! # async fn demo() {
//! let executor = TransferExecutor::new(TransferContext::default());
//! let (interaction, _prompts) = ChannelInteraction::new(8);
//!
//! let mut handle = executor.start(
//!     Operation::copy(vec!["/tmp/a.txt".into()], "/tmp/backup"),
//!     Arc::new(interaction),
//! );
//! while let Some(event) = handle.events.recv().await {
//!     if let TransferEvent::Complete(done) = event {
//!         println!("{}", done.label);
//!     }
//! }
//! # }
//! ```

mod archive;
mod clipboard;
mod conflict;
mod copy;
mod delete;
mod executor;
mod filesystem;
mod move_op;
mod operation;
mod permission;
mod progress;
mod prompt;

#[cfg(test)]
mod testing;

pub use clipboard::{Clipboard, ClipboardMode, ClipboardSink};
pub use conflict::{
    ConflictAction, ConflictDecision, ConflictPrompt, ConflictResolver, EXTRACT_CONFLICT_MESSAGE,
    PASTE_CONFLICT_MESSAGE, numbered_name, split_name,
};
pub use delete::trash_target;
pub use executor::{Attempted, Halt, OperationHandle, TransferExecutor};
pub use filesystem::{FileSystem, NativeFileSystem};
pub use operation::{Operation, OperationType};
pub use permission::{
    DELETE_DENIED_MESSAGE, OVERWRITE_DENIED_MESSAGE, PermissionAction, PermissionDecision,
    PermissionEscalator, PermissionPrompt, relax_permissions,
};
pub use progress::{OperationComplete, OperationStatus, ProgressReporter, ProgressState, TransferEvent};
pub use prompt::{ChannelInteraction, Interaction, PromptRequest};

pub use ferry_core::{TransferContext, TransferError, TransferItem, TransferWarning, WarningKind};
