//! Error types for kanban
//!
//! Exit codes:
//! - 0: Success
//! - 2: User error (bad args, unknown id, forbidden field mutation)
//! - 3: Rejected by store rules (schedule overlap, missing epic, duplicate id)
//! - 4: Operation failed (io, lock, malformed save file)

use std::path::PathBuf;
use thiserror::Error;

use crate::model::TaskId;

/// Exit codes for the kanban CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const USER_ERROR: i32 = 2;
    pub const REJECTED: i32 = 3;
    pub const OPERATION_FAILED: i32 = 4;
}

/// Main error type for kanban operations
#[derive(Error, Debug)]
pub enum Error {
    // User errors (exit code 2)
    #[error("Task not found: {0}")]
    NotFound(TaskId),

    #[error("Invalid mutation: {0}")]
    InvalidMutation(&'static str),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // Store rule rejections (exit code 3)
    #[error("Epic not found: {0}")]
    AbsentEpic(TaskId),

    #[error("{}", intersect_message(.id, .conflicting))]
    Intersect {
        id: Option<TaskId>,
        conflicting: TaskId,
    },

    #[error("Task id already in use: {0}")]
    DuplicateId(TaskId),

    // Operation failures (exit code 4)
    #[error("Invalid header in save file: {0}")]
    InvalidHeader(String),

    #[error("Invalid record on line {line}: {reason}")]
    InvalidRecord { line: usize, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Lock acquisition failed: {0}")]
    LockFailed(PathBuf),

    #[error("Operation failed: {0}")]
    OperationFailed(String),
}

fn intersect_message(id: &Option<TaskId>, conflicting: &TaskId) -> String {
    match id {
        Some(id) => format!("Task {id} overlaps the schedule of task {conflicting}"),
        None => format!("Task overlaps the schedule of task {conflicting}"),
    }
}

impl Error {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            // User errors
            Error::NotFound(_)
            | Error::InvalidMutation(_)
            | Error::InvalidConfig(_)
            | Error::InvalidArgument(_) => exit_codes::USER_ERROR,

            // Store rule rejections
            Error::AbsentEpic(_) | Error::Intersect { .. } | Error::DuplicateId(_) => {
                exit_codes::REJECTED
            }

            // Operation failures
            Error::InvalidHeader(_)
            | Error::InvalidRecord { .. }
            | Error::Io(_)
            | Error::Json(_)
            | Error::TomlParse(_)
            | Error::TomlSerialize(_)
            | Error::LockFailed(_)
            | Error::OperationFailed(_) => exit_codes::OPERATION_FAILED,
        }
    }

    /// Structured details for JSON output, when the error carries any
    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            Error::NotFound(id) | Error::DuplicateId(id) => {
                Some(serde_json::json!({ "id": id }))
            }
            Error::AbsentEpic(epic_id) => Some(serde_json::json!({ "epic_id": epic_id })),
            Error::Intersect { id, conflicting } => Some(serde_json::json!({
                "id": id,
                "conflicting_id": conflicting,
            })),
            Error::InvalidRecord { line, reason } => Some(serde_json::json!({
                "line": line,
                "reason": reason,
            })),
            Error::LockFailed(path) => Some(serde_json::json!({
                "path": path.to_string_lossy(),
            })),
            _ => None,
        }
    }
}

/// Result type alias for kanban operations
pub type Result<T> = std::result::Result<T, Error>;

/// Wrapper for displaying errors in JSON format
#[derive(serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub code: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl From<&Error> for JsonError {
    fn from(err: &Error) -> Self {
        JsonError {
            error: err.to_string(),
            code: err.exit_code(),
            details: err.details(),
        }
    }
}
