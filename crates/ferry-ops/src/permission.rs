//! Permission escalation for denied filesystem mutations.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use ferry_core::TransferError;
use serde::{Deserialize, Serialize};

use crate::executor::{Attempted, Halt};
use crate::prompt::Interaction;

/// Prompt text used when a write is denied.
pub const OVERWRITE_DENIED_MESSAGE: &str =
    "Path has no write access to be overwritten.\nForcefully obtain and overwrite?";

/// Prompt text used when a removal is denied.
pub const DELETE_DENIED_MESSAGE: &str =
    "Path has no write access to be deleted.\nForcefully obtain and delete it?";

/// How to handle a permission failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PermissionAction {
    /// Relax the permission bits and retry once.
    Force,
    /// Leave the item alone.
    Skip,
    /// Abort the entire operation.
    Cancel,
}

/// A permission decision, optionally applied to the rest of the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionDecision {
    pub action: PermissionAction,
    /// Apply `action` to every remaining permission failure without asking.
    pub sticky: bool,
}

impl PermissionDecision {
    /// A decision for this failure only.
    pub fn once(action: PermissionAction) -> Self {
        Self {
            action,
            sticky: false,
        }
    }

    /// A decision for this and every later failure.
    pub fn always(action: PermissionAction) -> Self {
        Self {
            action,
            sticky: true,
        }
    }
}

/// What the prompt collaborator is shown for a permission failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionPrompt {
    /// The path that could not be written.
    pub context: PathBuf,
    /// Question to display.
    pub message: String,
}

/// Per-operation permission state. Its sticky slot is independent of the
/// conflict resolver's.
#[derive(Debug, Default)]
pub struct PermissionEscalator {
    sticky: Option<PermissionAction>,
}

impl PermissionEscalator {
    /// Create an escalator with nothing decided yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// The standing decision, if one was made sticky.
    pub fn sticky(&self) -> Option<PermissionAction> {
        self.sticky
    }

    /// Decide what to do, asking only while no sticky decision exists.
    pub fn decide(&mut self, interaction: &dyn Interaction, prompt: &PermissionPrompt) -> PermissionAction {
        if let Some(action) = self.sticky {
            return action;
        }

        let decision = interaction.prompt_permission(prompt);
        tracing::debug!(path = %prompt.context.display(), action = ?decision.action, sticky = decision.sticky, "permission decided");
        if decision.sticky {
            self.sticky = Some(decision.action);
        }
        decision.action
    }

    /// Run `op`, routing a permission failure through the protocol.
    ///
    /// A missing path is reported as [`Attempted::Vanished`]; any other error
    /// halts the operation.
    pub fn attempt<T>(
        &mut self,
        interaction: &dyn Interaction,
        target: &Path,
        message: &str,
        mut op: impl FnMut() -> io::Result<T>,
    ) -> Result<Attempted<T>, Halt> {
        let first = op();
        self.settle(interaction, target, message, first, op)
    }

    /// Like [`attempt`](Self::attempt), for callers that need a different
    /// closure for the forced retry than for the first try.
    pub fn settle<T>(
        &mut self,
        interaction: &dyn Interaction,
        target: &Path,
        message: &str,
        first: io::Result<T>,
        retry: impl FnMut() -> io::Result<T>,
    ) -> Result<Attempted<T>, Halt> {
        match first {
            Ok(value) => Ok(Attempted::Done(value)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Attempted::Vanished),
            Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
                self.escalate(interaction, target, message, retry)
            }
            Err(e) => Err(Halt::Failed(TransferError::io(target, e))),
        }
    }

    /// Ask about a denied mutation on `target`; on `Force`, relax and run
    /// `retry` exactly once.
    pub fn escalate<T>(
        &mut self,
        interaction: &dyn Interaction,
        target: &Path,
        message: &str,
        mut retry: impl FnMut() -> io::Result<T>,
    ) -> Result<Attempted<T>, Halt> {
        let prompt = PermissionPrompt {
            context: target.to_path_buf(),
            message: message.to_string(),
        };

        match self.decide(interaction, &prompt) {
            PermissionAction::Force => {
                relax_permissions(target);
                match retry() {
                    Ok(value) => Ok(Attempted::Done(value)),
                    Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Attempted::Vanished),
                    Err(e) => {
                        tracing::warn!(path = %target.display(), error = %e, "forced retry failed");
                        Err(Halt::Failed(TransferError::EscalationFailed {
                            path: target.to_path_buf(),
                        }))
                    }
                }
            }
            PermissionAction::Skip => Ok(Attempted::Skipped),
            PermissionAction::Cancel => Err(Halt::Cancelled),
        }
    }
}

/// Make `target` and its parent directory writable by the owner.
///
/// Failures are logged and otherwise ignored; the retried mutation reports
/// whether escalation worked.
pub fn relax_permissions(target: &Path) {
    if target.symlink_metadata().is_ok() {
        if let Err(e) = make_writable(target) {
            tracing::debug!(path = %target.display(), error = %e, "could not relax permissions");
        }
    }
    if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
        if let Err(e) = make_writable(parent) {
            tracing::debug!(path = %parent.display(), error = %e, "could not relax parent permissions");
        }
    }
}

#[cfg(unix)]
fn make_writable(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut permissions = fs::metadata(path)?.permissions();
    permissions.set_mode(permissions.mode() | 0o200);
    fs::set_permissions(path, permissions)
}

#[cfg(not(unix))]
fn make_writable(path: &Path) -> io::Result<()> {
    let mut permissions = fs::metadata(path)?.permissions();
    #[allow(clippy::permissions_set_readonly_false)]
    permissions.set_readonly(false);
    fs::set_permissions(path, permissions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedInteraction;
    use std::cell::Cell;

    fn denied() -> io::Error {
        io::Error::new(io::ErrorKind::PermissionDenied, "denied")
    }

    #[test]
    fn test_success_never_prompts() {
        let interaction = ScriptedInteraction::default();
        let mut escalator = PermissionEscalator::new();
        let result = escalator
            .attempt(&interaction, Path::new("/x"), OVERWRITE_DENIED_MESSAGE, || Ok(7))
            .unwrap();
        assert!(matches!(result, Attempted::Done(7)));
        assert_eq!(interaction.permission_prompts(), 0);
    }

    #[test]
    fn test_force_retries_exactly_once() {
        let interaction = ScriptedInteraction::default()
            .with_permission(PermissionDecision::once(PermissionAction::Force));
        let mut escalator = PermissionEscalator::new();
        let calls = Cell::new(0);

        let result = escalator
            .attempt(&interaction, Path::new("/nonexistent/ferry"), OVERWRITE_DENIED_MESSAGE, || {
                calls.set(calls.get() + 1);
                if calls.get() == 1 { Err(denied()) } else { Ok(()) }
            })
            .unwrap();

        assert!(matches!(result, Attempted::Done(())));
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_force_failing_twice_halts() {
        let interaction = ScriptedInteraction::default()
            .with_permission(PermissionDecision::once(PermissionAction::Force));
        let mut escalator = PermissionEscalator::new();
        let calls = Cell::new(0);

        let result = escalator.attempt(&interaction, Path::new("/nonexistent/ferry"), OVERWRITE_DENIED_MESSAGE, || {
            calls.set(calls.get() + 1);
            Err::<(), _>(denied())
        });

        assert!(matches!(
            result,
            Err(Halt::Failed(TransferError::EscalationFailed { .. }))
        ));
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_sticky_skip_asks_once() {
        let interaction = ScriptedInteraction::default()
            .with_permission(PermissionDecision::always(PermissionAction::Skip));
        let mut escalator = PermissionEscalator::new();

        for _ in 0..10 {
            let result = escalator
                .attempt(&interaction, Path::new("/x"), DELETE_DENIED_MESSAGE, || Err::<(), _>(denied()))
                .unwrap();
            assert!(matches!(result, Attempted::Skipped));
        }
        assert_eq!(interaction.permission_prompts(), 1);
        assert_eq!(escalator.sticky(), Some(PermissionAction::Skip));
    }

    #[test]
    fn test_cancel_halts() {
        let interaction = ScriptedInteraction::default()
            .with_permission(PermissionDecision::once(PermissionAction::Cancel));
        let mut escalator = PermissionEscalator::new();
        let result = escalator.attempt(&interaction, Path::new("/x"), DELETE_DENIED_MESSAGE, || Err::<(), _>(denied()));
        assert!(matches!(result, Err(Halt::Cancelled)));
    }

    #[test]
    fn test_not_found_is_vanished() {
        let interaction = ScriptedInteraction::default();
        let mut escalator = PermissionEscalator::new();
        let result = escalator
            .attempt(&interaction, Path::new("/x"), DELETE_DENIED_MESSAGE, || {
                Err::<(), _>(io::Error::new(io::ErrorKind::NotFound, "gone"))
            })
            .unwrap();
        assert!(matches!(result, Attempted::Vanished));
        assert_eq!(interaction.permission_prompts(), 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_relax_adds_owner_write() {
        use std::os::unix::fs::PermissionsExt;

        let temp = tempfile::TempDir::new().unwrap();
        let file = temp.path().join("locked.txt");
        fs::write(&file, "x").unwrap();
        fs::set_permissions(&file, fs::Permissions::from_mode(0o444)).unwrap();

        relax_permissions(&file);

        let mode = fs::metadata(&file).unwrap().permissions().mode();
        assert_eq!(mode & 0o200, 0o200);
    }
}
