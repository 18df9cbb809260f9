//! Operation executor: runs one operation on a background worker.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use ferry_core::{TransferContext, TransferError, TransferItem, TransferWarning};
use ferry_scan::{Enumeration, Traversal};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::archive::{run_unzip, run_zip};
use crate::clipboard::ClipboardSink;
use crate::conflict::ConflictResolver;
use crate::copy::run_copy;
use crate::delete::run_delete;
use crate::filesystem::{FileSystem, NativeFileSystem};
use crate::move_op::run_move;
use crate::operation::{Operation, OperationType};
use crate::permission::PermissionEscalator;
use crate::progress::{OperationComplete, OperationStatus, ProgressReporter, ProgressState, TransferEvent};
use crate::prompt::Interaction;

/// Why an operation stopped before finishing.
#[derive(Debug, Error)]
pub enum Halt {
    /// A Cancel decision or an external cancellation signal.
    #[error("Process cancelled")]
    Cancelled,
    /// An unrecoverable failure.
    #[error(transparent)]
    Failed(TransferError),
}

impl From<TransferError> for Halt {
    fn from(error: TransferError) -> Self {
        match error {
            TransferError::Cancelled => Self::Cancelled,
            other => Self::Failed(other),
        }
    }
}

/// Outcome of one guarded filesystem mutation.
#[derive(Debug)]
pub enum Attempted<T> {
    /// The mutation happened.
    Done(T),
    /// A decision excluded the item.
    Skipped,
    /// The path no longer exists; nothing to do.
    Vanished,
}

/// How an operation body ended when it was not halted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Finish {
    Completed,
    NothingToDo,
}

/// Mutable state for one operation run, owned by its worker.
pub(crate) struct Run<'a> {
    pub context: &'a TransferContext,
    pub interaction: &'a dyn Interaction,
    pub fs: &'a dyn FileSystem,
    pub cancel: &'a CancellationToken,
    pub reporter: ProgressReporter,
    pub conflicts: ConflictResolver,
    pub permissions: PermissionEscalator,
    pub succeeded: usize,
    pub skipped_paths: Vec<PathBuf>,
    pub warnings: Vec<TransferWarning>,
    pub moved_sources: Vec<PathBuf>,
}

impl<'a> Run<'a> {
    fn new(
        context: &'a TransferContext,
        interaction: &'a dyn Interaction,
        fs: &'a dyn FileSystem,
        cancel: &'a CancellationToken,
        reporter: ProgressReporter,
    ) -> Self {
        Self {
            context,
            interaction,
            fs,
            cancel,
            reporter,
            conflicts: ConflictResolver::new(),
            permissions: PermissionEscalator::new(),
            succeeded: 0,
            skipped_paths: Vec::new(),
            warnings: Vec::new(),
            moved_sources: Vec::new(),
        }
    }

    /// Item boundary: stop here if cancellation was requested.
    pub fn checkpoint(&self) -> Result<(), Halt> {
        if self.cancel.is_cancelled() {
            return Err(Halt::Cancelled);
        }
        Ok(())
    }

    /// Enumerate sources, honouring cancellation while walking.
    pub fn enumerate(&mut self, sources: &[PathBuf], label: &str) -> Result<Enumeration, Halt> {
        self.reporter.label(label);
        let enumeration = Traversal::new()
            .with_cancellation(self.cancel.clone())
            .enumerate(sources)?;
        Ok(enumeration)
    }

    /// Record the outcome of an item.
    pub fn record<T>(&mut self, item: &TransferItem, outcome: &Attempted<T>) {
        match outcome {
            Attempted::Done(_) => self.succeeded += 1,
            Attempted::Skipped => self.skip(&item.absolute_path),
            Attempted::Vanished => {
                tracing::debug!(path = %item.absolute_path.display(), "item vanished, skipping");
            }
        }
    }

    /// Mark a source path as deliberately left in place.
    pub fn skip(&mut self, path: &Path) {
        tracing::debug!(path = %path.display(), "item skipped");
        self.skipped_paths.push(path.to_path_buf());
    }

    /// Whether anything at or below `folder` was skipped.
    pub fn has_skipped_under(&self, folder: &Path) -> bool {
        self.skipped_paths.iter().any(|p| p.starts_with(folder))
    }

    /// Collect and publish a warning.
    pub fn warn(&mut self, warning: TransferWarning) {
        tracing::warn!(path = %warning.path.display(), "{}", warning.message);
        self.reporter.warn(warning.clone());
        self.warnings.push(warning);
    }
}

/// A running operation.
#[derive(Debug)]
pub struct OperationHandle {
    /// Progress, warning and completion events, in processing order.
    pub events: mpsc::Receiver<TransferEvent>,
    operation_type: OperationType,
    cancel: CancellationToken,
    task: JoinHandle<OperationComplete>,
}

impl OperationHandle {
    /// The kind of operation running.
    pub fn operation_type(&self) -> OperationType {
        self.operation_type
    }

    /// Ask the worker to stop at the next item boundary.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Wait for the worker, ignoring any events not yet read.
    pub async fn wait(self) -> OperationComplete {
        let Self {
            events,
            operation_type,
            task,
            ..
        } = self;
        drop(events);
        match task.await {
            Ok(complete) => complete,
            Err(e) => worker_lost(operation_type, &e.to_string()),
        }
    }

    /// Split into the event stream and a future resolving to the result.
    pub fn into_parts(
        self,
    ) -> (
        mpsc::Receiver<TransferEvent>,
        CancellationToken,
        impl std::future::Future<Output = OperationComplete>,
    ) {
        let Self {
            events,
            operation_type,
            cancel,
            task,
        } = self;
        let done = async move {
            match task.await {
                Ok(complete) => complete,
                Err(e) => worker_lost(operation_type, &e.to_string()),
            }
        };
        (events, cancel, done)
    }
}

fn worker_lost(operation_type: OperationType, reason: &str) -> OperationComplete {
    OperationComplete {
        operation_type,
        status: OperationStatus::Error,
        label: format!("{operation_type} failed: worker stopped ({reason})"),
        succeeded: 0,
        skipped: 0,
        moved_sources: Vec::new(),
        warnings: Vec::new(),
        progress: ProgressState {
            total: 0,
            completed: 0,
            label: String::new(),
            status: OperationStatus::Error,
        },
    }
}

/// Executor for bulk file operations.
#[derive(Clone)]
pub struct TransferExecutor {
    context: TransferContext,
    filesystem: Arc<dyn FileSystem>,
    clipboard: Option<Arc<dyn ClipboardSink>>,
}

impl Default for TransferExecutor {
    fn default() -> Self {
        Self::new(TransferContext::default())
    }
}

impl std::fmt::Debug for TransferExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransferExecutor")
            .field("context", &self.context)
            .field("clipboard", &self.clipboard.is_some())
            .finish()
    }
}

impl TransferExecutor {
    /// Create an executor with the given context.
    pub fn new(context: TransferContext) -> Self {
        Self {
            context,
            filesystem: Arc::new(NativeFileSystem),
            clipboard: None,
        }
    }

    /// Perform every disk mutation through `filesystem`.
    pub fn with_filesystem(mut self, filesystem: Arc<dyn FileSystem>) -> Self {
        self.filesystem = filesystem;
        self
    }

    /// Remove fully moved sources from `clipboard` when a Move completes.
    pub fn with_clipboard(mut self, clipboard: Arc<dyn ClipboardSink>) -> Self {
        self.clipboard = Some(clipboard);
        self
    }

    /// The context operations run with.
    pub fn context(&self) -> &TransferContext {
        &self.context
    }

    /// Start `operation` on its own blocking worker.
    pub fn start(&self, operation: Operation, interaction: Arc<dyn Interaction>) -> OperationHandle {
        let (tx, rx) = mpsc::channel(self.context.channel_size.max(1));
        let cancel = CancellationToken::new();
        let operation = self.prepare(operation);
        let operation_type = operation.operation_type();

        let executor = self.clone();
        let token = cancel.clone();
        let task = tokio::task::spawn_blocking(move || {
            executor.run_blocking(operation, interaction.as_ref(), &token, tx)
        });

        OperationHandle {
            events: rx,
            operation_type,
            cancel,
            task,
        }
    }

    /// Apply context settings that change what an operation is.
    fn prepare(&self, operation: Operation) -> Operation {
        match operation {
            Operation::DeleteToTrash { targets } if !self.context.use_trash => {
                Operation::DeletePermanent { targets }
            }
            other => other,
        }
    }

    /// Run `operation` on the current thread.
    ///
    /// Must not be called from an async context; events are sent with
    /// blocking sends.
    pub fn run_blocking(
        &self,
        operation: Operation,
        interaction: &dyn Interaction,
        cancel: &CancellationToken,
        tx: mpsc::Sender<TransferEvent>,
    ) -> OperationComplete {
        let operation = self.prepare(operation);
        let operation_type = operation.operation_type();
        let reporter = ProgressReporter::new(tx, operation_type);
        let mut run = Run::new(&self.context, interaction, self.filesystem.as_ref(), cancel, reporter);

        tracing::info!(operation = %operation_type, "operation started");

        let outcome = match &operation {
            Operation::Copy {
                sources,
                destination,
            } => run_copy(&mut run, sources, &self.context.resolve_destination(destination)),
            Operation::Move {
                sources,
                destination,
            } => run_move(&mut run, sources, &self.context.resolve_destination(destination)),
            Operation::DeleteToTrash { targets } => run_delete(&mut run, targets, true),
            Operation::DeletePermanent { targets } => run_delete(&mut run, targets, false),
            Operation::Zip { sources, archive } => run_zip(&mut run, sources, archive),
            Operation::Unzip {
                archive,
                destination,
            } => run_unzip(&mut run, archive, &self.context.resolve_destination(destination)),
        };

        self.finish(run, operation_type, outcome)
    }

    /// Publish the terminal state and build the completion record.
    fn finish(
        &self,
        run: Run<'_>,
        operation_type: OperationType,
        outcome: Result<Finish, Halt>,
    ) -> OperationComplete {
        let Run {
            interaction,
            mut reporter,
            succeeded,
            skipped_paths,
            warnings,
            moved_sources,
            ..
        } = run;

        let mut complete = OperationComplete {
            operation_type,
            status: OperationStatus::Active,
            label: String::new(),
            succeeded,
            skipped: skipped_paths.len(),
            moved_sources: Vec::new(),
            warnings,
            progress: reporter.state().clone(),
        };

        let (status, label) = match outcome {
            Ok(Finish::Completed) => (
                OperationStatus::Done,
                format!("{operation_type} done: {}", complete.summary()),
            ),
            Ok(Finish::NothingToDo) => (OperationStatus::Done, format!("{operation_type} done: nothing to do")),
            Err(Halt::Cancelled) => (OperationStatus::Cancelled, format!("{operation_type} cancelled")),
            Err(Halt::Failed(error)) => {
                tracing::error!(operation = %operation_type, %error, "operation failed");
                interaction.notify_unhandled_error(&format!(
                    "{operation_type} failed due to\n{error}\nProcess aborted."
                ));
                (OperationStatus::Error, format!("{operation_type} failed: {error}"))
            }
        };

        if status == OperationStatus::Done && !moved_sources.is_empty() {
            if let Some(clipboard) = &self.clipboard {
                clipboard.remove_entries(&moved_sources);
            }
            complete.moved_sources = moved_sources;
        }

        tracing::info!(operation = %operation_type, ?status, "{label}");
        complete.progress = reporter.finish(status, label.clone());
        complete.status = status;
        complete.label = label;
        reporter.complete(complete.clone());
        complete
    }
}

/// Fail when `destination` is one of the folder `sources` or lies inside one.
pub(crate) fn ensure_not_inside_sources(sources: &[PathBuf], destination: &Path) -> Result<(), Halt> {
    let canonical_destination = destination.canonicalize().ok();
    for source in sources.iter().filter(|s| s.is_dir()) {
        let inside = |dest: &Path, src: &Path| dest.starts_with(src);
        let canonical_inside = match (&canonical_destination, source.canonicalize()) {
            (Some(dest), Ok(src)) => inside(dest, &src),
            _ => false,
        };
        if inside(destination, source) || canonical_inside {
            return Err(Halt::Failed(TransferError::Other {
                message: format!(
                    "Cannot copy or move {} into itself",
                    source.display()
                ),
            }));
        }
    }
    Ok(())
}
