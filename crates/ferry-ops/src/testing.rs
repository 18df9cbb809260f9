//! Scripted interaction for unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::conflict::{ConflictAction, ConflictDecision, ConflictPrompt};
use crate::permission::{PermissionAction, PermissionDecision, PermissionPrompt};
use crate::prompt::Interaction;

/// Answers prompts from queues, falling back to Skip / "no".
#[derive(Debug, Default)]
pub struct ScriptedInteraction {
    conflicts: Mutex<VecDeque<ConflictDecision>>,
    permissions: Mutex<VecDeque<PermissionDecision>>,
    conflict_prompts: AtomicUsize,
    permission_prompts: AtomicUsize,
}

impl ScriptedInteraction {
    pub fn with_conflict(self, decision: ConflictDecision) -> Self {
        if let Ok(mut queue) = self.conflicts.lock() {
            queue.push_back(decision);
        }
        self
    }

    pub fn with_permission(self, decision: PermissionDecision) -> Self {
        if let Ok(mut queue) = self.permissions.lock() {
            queue.push_back(decision);
        }
        self
    }

    pub fn conflict_prompts(&self) -> usize {
        self.conflict_prompts.load(Ordering::SeqCst)
    }

    pub fn permission_prompts(&self) -> usize {
        self.permission_prompts.load(Ordering::SeqCst)
    }
}

impl Interaction for ScriptedInteraction {
    fn prompt_conflict(&self, _prompt: &ConflictPrompt) -> ConflictDecision {
        self.conflict_prompts.fetch_add(1, Ordering::SeqCst);
        self.conflicts
            .lock()
            .ok()
            .and_then(|mut q| q.pop_front())
            .unwrap_or(ConflictDecision::once(ConflictAction::Skip))
    }

    fn prompt_permission(&self, _prompt: &PermissionPrompt) -> PermissionDecision {
        self.permission_prompts.fetch_add(1, Ordering::SeqCst);
        self.permissions
            .lock()
            .ok()
            .and_then(|mut q| q.pop_front())
            .unwrap_or(PermissionDecision::once(PermissionAction::Skip))
    }

    fn prompt_yes_no(&self, _message: &str) -> bool {
        false
    }

    fn notify_unhandled_error(&self, _message: &str) {}
}
