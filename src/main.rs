//! ferry - bulk copy, move, delete and archive for the terminal.
//!
//! Usage:
//!   ferry copy SOURCES... [--to DIR]      Copy into DIR (default: current dir)
//!   ferry move SOURCES... [--to DIR]      Move into DIR
//!   ferry delete TARGETS... [--permanent] Trash, or remove permanently
//!   ferry zip SOURCES... --output FILE    Create a zip archive
//!   ferry unzip ARCHIVE [--to DIR]        Extract a zip archive
//!
//! Exits with 0 when the operation finished, 1 when it failed and 130 when
//! it was cancelled.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Context, Result};
use ferry_core::TransferContext;
use ferry_ops::{
    ChannelInteraction, ConflictAction, ConflictDecision, Operation, OperationComplete,
    OperationStatus, PermissionAction, PermissionDecision, PromptRequest, TransferEvent,
    TransferExecutor,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "ferry",
    version,
    about = "Bulk file transfer and archive engine",
    long_about = "ferry copies, moves, deletes and archives files in bulk.\n\n\
                  When a destination name is taken or a path is not writable, \
                  ferry asks what to do. Answer in uppercase to apply the same \
                  choice to the rest of the operation."
)]
struct Cli {
    /// Print events as JSON lines on stdout
    #[arg(long, global = true)]
    json: bool,

    /// Preserve timestamps when copying
    #[arg(long, global = true)]
    metadata: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Copy files and folders into a directory
    Copy {
        /// Files or folders to copy
        #[arg(required = true)]
        sources: Vec<PathBuf>,

        /// Destination directory (defaults to the current directory)
        #[arg(short, long)]
        to: Option<PathBuf>,
    },

    /// Move files and folders into a directory
    Move {
        /// Files or folders to move
        #[arg(required = true)]
        sources: Vec<PathBuf>,

        /// Destination directory (defaults to the current directory)
        #[arg(short, long)]
        to: Option<PathBuf>,
    },

    /// Delete files and folders
    Delete {
        /// Files or folders to delete
        #[arg(required = true)]
        targets: Vec<PathBuf>,

        /// Remove permanently instead of sending to the trash
        #[arg(long)]
        permanent: bool,
    },

    /// Compress files and folders into a zip archive
    Zip {
        /// Files or folders to compress
        #[arg(required = true)]
        sources: Vec<PathBuf>,

        /// Archive to write
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Extract a zip archive
    Unzip {
        /// Archive to extract
        archive: PathBuf,

        /// Destination directory (defaults to the current directory)
        #[arg(short, long)]
        to: Option<PathBuf>,
    },
}

impl Command {
    fn into_operation(self) -> Operation {
        match self {
            Self::Copy { sources, to } => Operation::copy(sources, to.unwrap_or_default()),
            Self::Move { sources, to } => Operation::move_to(sources, to.unwrap_or_default()),
            Self::Delete { targets, permanent } => Operation::delete(targets, !permanent),
            Self::Zip { sources, output } => Operation::zip(sources, output),
            Self::Unzip { archive, to } => Operation::unzip(archive, to.unwrap_or_default()),
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    color_eyre::install()?;

    // Default: warn; RUST_LOG=ferry_ops=debug shows every item mutation
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let use_trash = !matches!(cli.command, Command::Delete { permanent: true, .. });
    let context = TransferContext::builder()
        .use_trash(use_trash)
        .copy_metadata(cli.metadata)
        .default_destination(Some(
            std::env::current_dir().context("Cannot determine the current directory")?,
        ))
        .build()
        .context("Invalid settings")?;

    let complete = run(context, cli.command.into_operation(), cli.json).await?;
    Ok(if complete.is_success() {
        ExitCode::SUCCESS
    } else if complete.status == OperationStatus::Cancelled {
        ExitCode::from(130)
    } else {
        ExitCode::from(1)
    })
}

/// Run one operation, answering its prompts on the terminal.
async fn run(context: TransferContext, operation: Operation, json: bool) -> Result<OperationComplete> {
    let (interaction, mut prompts) = ChannelInteraction::new(1);
    let handle = TransferExecutor::new(context).start(operation, Arc::new(interaction));
    let (mut events, cancel, done) = handle.into_parts();

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut prompts_open = true;

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(event) => render(&event, json)?,
                None => break,
            },
            request = prompts.recv(), if prompts_open => match request {
                Some(request) => answer(request).await?,
                None => prompts_open = false,
            },
            _ = &mut ctrl_c, if !cancel.is_cancelled() => {
                eprintln!("Cancelling after the current item...");
                cancel.cancel();
            }
        }
    }

    Ok(done.await)
}

fn render(event: &TransferEvent, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(event).context("Failed to encode event")?);
        return Ok(());
    }

    match event {
        TransferEvent::Progress(state) if !state.status.is_terminal() => {
            eprintln!("[{:>3.0}%] {}", state.percentage(), state.label);
        }
        TransferEvent::Progress(_) => {}
        TransferEvent::Warning(warning) => eprintln!("warning: {}", warning.message),
        TransferEvent::Complete(complete) => println!("{}", complete.label),
    }
    Ok(())
}

/// Answer one prompt from stdin.
async fn answer(request: PromptRequest) -> Result<()> {
    match request {
        PromptRequest::Conflict { prompt, respond } => {
            let question = format!(
                "{}\n  {} (in {})\n[o]verwrite [s]kip [r]ename [c]ancel",
                prompt.message,
                prompt.context,
                prompt.destination_dir.display()
            );
            let _ = respond.send(parse_conflict(&ask(question).await?));
        }
        PromptRequest::Permission { prompt, respond } => {
            let question = format!(
                "{}\n  {}\n[f]orce [s]kip [c]ancel",
                prompt.message,
                prompt.context.display()
            );
            let _ = respond.send(parse_permission(&ask(question).await?));
        }
        PromptRequest::YesNo { message, respond } => {
            let reply = ask(format!("{message}\n[y]es [n]o")).await?;
            let _ = respond.send(reply.eq_ignore_ascii_case("y") || reply.eq_ignore_ascii_case("yes"));
        }
        PromptRequest::UnhandledError { message, acknowledge } => {
            eprintln!("{message}");
            let _ = acknowledge.send(());
        }
    }
    Ok(())
}

async fn ask(question: String) -> Result<String> {
    tokio::task::spawn_blocking(move || -> io::Result<String> {
        let mut stderr = io::stderr().lock();
        writeln!(stderr, "{question}")?;
        write!(stderr, "> ")?;
        stderr.flush()?;

        let mut line = String::new();
        io::stdin().lock().read_line(&mut line)?;
        Ok(line.trim().to_string())
    })
    .await
    .context("Prompt task failed")?
    .context("Failed to read answer")
}

/// An uppercase answer applies to every later prompt of the same kind.
fn is_sticky(answer: &str) -> bool {
    answer.chars().next().is_some_and(|c| c.is_ascii_uppercase())
}

fn parse_conflict(answer: &str) -> ConflictDecision {
    let action = match answer.to_ascii_lowercase().as_str() {
        "o" | "overwrite" => ConflictAction::Overwrite,
        "r" | "rename" => ConflictAction::Rename,
        "c" | "cancel" => ConflictAction::Cancel,
        _ => ConflictAction::Skip,
    };
    ConflictDecision {
        action,
        sticky: is_sticky(answer),
    }
}

fn parse_permission(answer: &str) -> PermissionDecision {
    let action = match answer.to_ascii_lowercase().as_str() {
        "f" | "force" => PermissionAction::Force,
        "c" | "cancel" => PermissionAction::Cancel,
        _ => PermissionAction::Skip,
    };
    PermissionDecision {
        action,
        sticky: is_sticky(answer),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_conflict_answers() {
        assert_eq!(parse_conflict("o"), ConflictDecision::once(ConflictAction::Overwrite));
        assert_eq!(parse_conflict("R"), ConflictDecision::always(ConflictAction::Rename));
        assert_eq!(parse_conflict("Cancel"), ConflictDecision::always(ConflictAction::Cancel));
        assert_eq!(parse_conflict(""), ConflictDecision::once(ConflictAction::Skip));
    }

    #[test]
    fn test_parse_permission_answers() {
        assert_eq!(parse_permission("f"), PermissionDecision::once(PermissionAction::Force));
        assert_eq!(parse_permission("S"), PermissionDecision::always(PermissionAction::Skip));
    }

    #[test]
    fn test_cli_maps_permanent_delete() {
        let cli = Cli::parse_from(["ferry", "delete", "a", "b", "--permanent"]);
        let operation = cli.command.into_operation();
        assert!(matches!(operation, Operation::DeletePermanent { ref targets } if targets.len() == 2));
    }

    #[test]
    fn test_cli_copy_without_destination_uses_default() {
        let cli = Cli::parse_from(["ferry", "copy", "a.txt", "--json"]);
        assert!(cli.json);
        match cli.command.into_operation() {
            Operation::Copy { destination, .. } => assert!(destination.as_os_str().is_empty()),
            _ => panic!("expected a copy"),
        }
    }
}
