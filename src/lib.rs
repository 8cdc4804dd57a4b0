//! kanban - in-memory task tracker library
//!
//! This library provides the core of the kanban CLI: a store of tasks,
//! epics and subtasks with a view history and a start-time ordered index.
//!
//! # Core Concepts
//!
//! - **Tasks**: standalone units of work with an optional schedule
//! - **Epics**: containers whose status and schedule roll up from subtasks
//! - **Subtasks**: tasks owned by exactly one epic
//! - **History**: recently viewed entities, each at most once
//! - **Priority**: scheduled tasks ordered by start time; overlaps are rejected
//!
//! # Module Organization
//!
//! - `cli`: Command-line interface using clap
//! - `config`: Configuration loading from `.kanban.toml`
//! - `csv`: Save file record format
//! - `error`: Error types and result aliases
//! - `history`: View history tracker
//! - `lock`: File locking and atomic writes for the save file
//! - `model`: Entity types and roll-up rules
//! - `output`: Human and JSON output
//! - `priority`: Start-time index and overlap detection
//! - `storage`: Store persisted to a save file
//! - `store`: In-memory task store

pub mod cli;
pub mod config;
pub mod csv;
pub mod error;
pub mod history;
pub mod lock;
pub mod model;
pub mod output;
pub mod priority;
pub mod storage;
pub mod store;

pub use error::{Error, Result};
pub use model::{Task, TaskId, TaskKind, TaskStatus};
pub use store::{SharedStore, TaskStore};
