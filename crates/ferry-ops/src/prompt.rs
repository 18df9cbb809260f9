//! The interactive collaborator seam.
//!
//! A worker asks for decisions through [`Interaction`]. The calls are
//! synchronous: the worker is parked until a value comes back, and since a
//! worker is a single thread it never has two requests outstanding.

use tokio::sync::{mpsc, oneshot};

use crate::conflict::{ConflictAction, ConflictDecision, ConflictPrompt};
use crate::permission::{PermissionAction, PermissionDecision, PermissionPrompt};

/// Decisions the engine needs from a human.
pub trait Interaction: Send + Sync {
    /// A destination path already exists.
    fn prompt_conflict(&self, prompt: &ConflictPrompt) -> ConflictDecision;

    /// A mutation was denied for lack of permission.
    fn prompt_permission(&self, prompt: &PermissionPrompt) -> PermissionDecision;

    /// A plain yes/no question.
    fn prompt_yes_no(&self, message: &str) -> bool;

    /// Show an unrecoverable failure. Called at most once per operation.
    fn notify_unhandled_error(&self, message: &str);
}

/// A typed request sent from a worker to the interactive layer.
#[derive(Debug)]
pub enum PromptRequest {
    Conflict {
        prompt: ConflictPrompt,
        respond: oneshot::Sender<ConflictDecision>,
    },
    Permission {
        prompt: PermissionPrompt,
        respond: oneshot::Sender<PermissionDecision>,
    },
    YesNo {
        message: String,
        respond: oneshot::Sender<bool>,
    },
    UnhandledError {
        message: String,
        acknowledge: oneshot::Sender<()>,
    },
}

/// [`Interaction`] backed by a request channel.
///
/// Each call sends a [`PromptRequest`] and blocks on its oneshot responder.
/// If the interactive layer has gone away, or drops a responder, the answer is
/// treated as a cancellation (or "no").
#[derive(Debug, Clone)]
pub struct ChannelInteraction {
    tx: mpsc::Sender<PromptRequest>,
}

impl ChannelInteraction {
    /// Create the interaction and the receiver the interactive layer drains.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<PromptRequest>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    fn round_trip<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> PromptRequest) -> Option<T> {
        let (respond, response) = oneshot::channel();
        self.tx.blocking_send(make(respond)).ok()?;
        response.blocking_recv().ok()
    }
}

impl Interaction for ChannelInteraction {
    fn prompt_conflict(&self, prompt: &ConflictPrompt) -> ConflictDecision {
        self.round_trip(|respond| PromptRequest::Conflict {
            prompt: prompt.clone(),
            respond,
        })
        .unwrap_or(ConflictDecision::once(ConflictAction::Cancel))
    }

    fn prompt_permission(&self, prompt: &PermissionPrompt) -> PermissionDecision {
        self.round_trip(|respond| PromptRequest::Permission {
            prompt: prompt.clone(),
            respond,
        })
        .unwrap_or(PermissionDecision::once(PermissionAction::Cancel))
    }

    fn prompt_yes_no(&self, message: &str) -> bool {
        self.round_trip(|respond| PromptRequest::YesNo {
            message: message.to_string(),
            respond,
        })
        .unwrap_or(false)
    }

    fn notify_unhandled_error(&self, message: &str) {
        let _ = self.round_trip(|acknowledge| PromptRequest::UnhandledError {
            message: message.to_string(),
            acknowledge,
        });
    }
}
