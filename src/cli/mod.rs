//! Command-line interface for kanban
//!
//! This module defines the CLI structure using clap derive macros.
//! Command implementations live in `task`; `shell` runs many commands
//! against one in-memory session.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::Config;
use crate::error::Result;
use crate::model::{TaskId, TaskKind, TaskStatus};
use crate::output::OutputMode;
use crate::storage::FileBackedStore;

mod shell;
mod task;

/// kanban - task tracker with epics, subtasks and schedule checks
///
/// Tasks are kept in a CSV save file. Scheduled tasks and subtasks may not
/// overlap; epic status and schedule follow their subtasks.
#[derive(Parser, Debug)]
#[command(name = "kanban")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Directory holding `.kanban.toml` and the save file (defaults to current directory)
    #[arg(long, global = true, env = "KANBAN_DIR")]
    pub dir: Option<PathBuf>,

    /// Save file, overriding `storage.file` from the config
    #[arg(long, global = true, env = "KANBAN_FILE")]
    pub file: Option<PathBuf>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Include descriptions in listings
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a task, epic or subtask
    #[command(subcommand)]
    Add(AddCommands),

    /// List every entity of one kind
    List {
        /// task, epic or subtask
        kind: TaskKind,
    },

    /// Show one entity and record it in the view history
    Show {
        id: TaskId,

        /// Only look in this kind
        #[arg(long)]
        kind: Option<TaskKind>,
    },

    /// Change fields of an existing entity
    Update(UpdateArgs),

    /// Delete an entity; deleting an epic deletes its subtasks
    Delete {
        id: TaskId,

        /// Only look in this kind
        #[arg(long)]
        kind: Option<TaskKind>,
    },

    /// Delete every entity of one kind
    Clear {
        /// task, epic or subtask
        kind: TaskKind,
    },

    /// List the subtasks of an epic
    Subtasks {
        /// Epic id
        epic: TaskId,
    },

    /// Scheduled tasks and subtasks ordered by start time
    Prioritized,

    /// Entities shown in this session, least recent first
    History,

    /// Read commands from stdin, one per line, against one session
    Shell,
}

/// `kanban add` subcommands
#[derive(Subcommand, Debug)]
pub enum AddCommands {
    /// Create a standalone task
    Task {
        name: String,

        #[command(flatten)]
        fields: WorkFields,
    },

    /// Create an epic
    Epic {
        name: String,

        #[arg(short, long, default_value = "")]
        description: String,
    },

    /// Create a subtask of an epic
    Subtask {
        name: String,

        /// Owning epic id
        #[arg(long)]
        epic: TaskId,

        #[command(flatten)]
        fields: WorkFields,
    },
}

/// Fields shared by tasks and subtasks
#[derive(Args, Debug, Clone, Default)]
pub struct WorkFields {
    #[arg(short, long, default_value = "")]
    pub description: String,

    /// NEW, IN_PROGRESS or DONE
    #[arg(long)]
    pub status: Option<TaskStatus>,

    /// Start time, e.g. "2025-01-31 14:00" or "31-01-2025 14:00"
    #[arg(long)]
    pub start: Option<String>,

    /// Duration in minutes
    #[arg(long)]
    pub duration: Option<i64>,
}

/// Arguments for `kanban update`
#[derive(Args, Debug, Clone)]
pub struct UpdateArgs {
    pub id: TaskId,

    #[arg(long)]
    pub name: Option<String>,

    #[arg(short, long)]
    pub description: Option<String>,

    /// NEW, IN_PROGRESS or DONE (not allowed for epics)
    #[arg(long)]
    pub status: Option<TaskStatus>,

    /// Start time, e.g. "2025-01-31 14:00"
    #[arg(long, conflicts_with = "unschedule")]
    pub start: Option<String>,

    /// Duration in minutes
    #[arg(long, conflicts_with = "unschedule")]
    pub duration: Option<i64>,

    /// Drop start time and duration
    #[arg(long)]
    pub unschedule: bool,

    /// Move a subtask to another epic
    #[arg(long)]
    pub epic: Option<TaskId>,
}

/// One CLI session: an open store plus output settings.
pub struct Session {
    store: FileBackedStore,
    output: OutputMode,
    verbose: bool,
}

impl Session {
    pub fn new(store: FileBackedStore, output: OutputMode, verbose: bool) -> Self {
        Self {
            store,
            output,
            verbose,
        }
    }

    pub fn store(&self) -> &FileBackedStore {
        &self.store
    }

    /// Execute one command against this session
    pub fn execute(&mut self, command: Commands) -> Result<()> {
        match command {
            Commands::Add(cmd) => task::run_add(self, cmd),
            Commands::List { kind } => task::run_list(self, kind),
            Commands::Show { id, kind } => task::run_show(self, id, kind),
            Commands::Update(args) => task::run_update(self, args),
            Commands::Delete { id, kind } => task::run_delete(self, id, kind),
            Commands::Clear { kind } => task::run_clear(self, kind),
            Commands::Subtasks { epic } => task::run_subtasks(self, epic),
            Commands::Prioritized => task::run_prioritized(self),
            Commands::History => task::run_history(self),
            Commands::Shell => {
                let stdin = std::io::stdin();
                shell::run(self, stdin.lock()).map(|_| ())
            }
        }
    }
}

impl Cli {
    /// Execute the CLI command
    pub fn run(self) -> Result<()> {
        let dir = self
            .dir
            .clone()
            .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));
        let config = Config::load_from_dir(&dir);
        let path = self
            .file
            .clone()
            .unwrap_or_else(|| config.storage_path(&dir));

        tracing::debug!(path = %path.display(), "opening save file");
        let store = FileBackedStore::open(path, &config)?;
        let output = OutputMode::from_flags(self.json, self.quiet);
        Session::new(store, output, self.verbose).execute(self.command)
    }
}
