//! Command output: a `kanban.v1` JSON envelope or a short text report.
//!
//! Every command builds typed `data` for JSON plus a [`Report`] for people.
//! JSON carries `data` and the report's hints; the report's fields and lines
//! are text only.

use serde::Serialize;

use crate::error::{Error, Result};
use crate::model::{Task, TaskId};

pub const SCHEMA_VERSION: &str = "kanban.v1";

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Human,
    Quiet,
    Json,
}

impl OutputMode {
    /// `--json` wins over `--quiet`.
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        match (json, quiet) {
            (true, _) => OutputMode::Json,
            (false, true) => OutputMode::Quiet,
            (false, false) => OutputMode::Human,
        }
    }

    pub fn is_json(self) -> bool {
        self == OutputMode::Json
    }
}

/// Text shown for a successful command.
#[derive(Debug, Clone, Default)]
pub struct Report {
    title: String,
    fields: Vec<(&'static str, String)>,
    lines: Vec<String>,
    hints: Vec<String>,
}

impl Report {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn field(&mut self, label: &'static str, value: impl Into<String>) {
        self.fields.push((label, value.into()));
    }

    pub fn line(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    pub fn hint(&mut self, hint: impl Into<String>) {
        self.hints.push(hint.into());
    }

    /// Labeled fields for one task.
    pub fn task_fields(&mut self, task: &Task) {
        self.field("ID", task.id().to_string());
        self.field("Name", task.name());
        self.field("Status", task.status().as_str());
        if let Some(start) = task.start_time() {
            self.field("Start", start.format(TIME_FORMAT).to_string());
        }
        if let Some(duration) = task.duration() {
            self.field("Duration", format!("{} min", duration.num_minutes()));
        }
        if let Some(end) = task.end_time() {
            self.field("End", end.format(TIME_FORMAT).to_string());
        }
        if let Some(epic_id) = task.epic_id() {
            self.field("Epic", epic_id.to_string());
        }
        if let Some(ids) = task.subtask_ids() {
            let value = if ids.is_empty() {
                "none".to_string()
            } else {
                join_ids(ids.iter().copied())
            };
            self.field("Subtasks", value);
        }
    }

    /// One line per task; `with_description` appends the description.
    pub fn task_lines(&mut self, tasks: &[Task], with_description: bool) {
        for task in tasks {
            let line = task_line(task);
            if with_description && !task.description().is_empty() {
                self.line(format!("{line}: {}", task.description()));
            } else {
                self.line(line);
            }
        }
    }

    pub fn render(&self) -> String {
        let mut out = self.title.clone();
        for (label, value) in &self.fields {
            out.push_str(&format!("\n  {label}: {value}"));
        }
        for line in &self.lines {
            out.push_str(&format!("\n  {line}"));
        }
        for hint in &self.hints {
            out.push_str(&format!("\nhint: {hint}"));
        }
        out
    }
}

#[derive(Serialize)]
struct Success<'a, T: Serialize> {
    schema_version: &'static str,
    command: &'a str,
    ok: bool,
    data: &'a T,
    #[serde(skip_serializing_if = "no_hints")]
    hints: &'a [String],
}

fn no_hints(hints: &&[String]) -> bool {
    hints.is_empty()
}

#[derive(Serialize)]
struct Failure<'a> {
    schema_version: &'static str,
    command: &'a str,
    ok: bool,
    error: ErrorBody,
    #[serde(skip_serializing_if = "Option::is_none")]
    hint: Option<&'static str>,
}

#[derive(Serialize)]
struct ErrorBody {
    kind: &'static str,
    code: i32,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

/// Prints a successful result in the session's mode.
pub fn print_report<T: Serialize>(
    mode: OutputMode,
    command: &str,
    data: &T,
    report: &Report,
) -> Result<()> {
    match mode {
        OutputMode::Json => {
            let envelope = Success {
                schema_version: SCHEMA_VERSION,
                command,
                ok: true,
                data,
                hints: &report.hints,
            };
            println!("{}", serde_json::to_string_pretty(&envelope)?);
        }
        OutputMode::Human => println!("{}", report.render()),
        OutputMode::Quiet => {}
    }
    Ok(())
}

/// Prints a failure: JSON on stdout, or `error:`/`hint:` lines on stderr.
pub fn print_error(command: &str, err: &Error, json: bool) -> Result<()> {
    let hint = error_hint(err);
    if json {
        let envelope = Failure {
            schema_version: SCHEMA_VERSION,
            command,
            ok: false,
            error: ErrorBody {
                kind: error_kind(err),
                code: err.exit_code(),
                message: err.to_string(),
                details: err.details(),
            },
            hint,
        };
        println!("{}", serde_json::to_string_pretty(&envelope)?);
        return Ok(());
    }

    eprintln!("error: {err}");
    if let Some(hint) = hint {
        eprintln!("hint: {hint}");
    }
    Ok(())
}

/// `#id KIND [STATUS] name`, then the schedule and owning epic when set.
pub fn task_line(task: &Task) -> String {
    let mut line = format!(
        "#{} {} [{}] {}",
        task.id(),
        task.kind(),
        task.status(),
        task.name()
    );
    if let Some(start) = task.start_time() {
        line.push_str(&format!(" @ {}", start.format(TIME_FORMAT)));
        if let Some(end) = task.end_time().filter(|end| *end != start) {
            line.push_str(&format!(" - {}", end.format(TIME_FORMAT)));
        }
    }
    if let Some(epic_id) = task.epic_id() {
        line.push_str(&format!(" (epic #{epic_id})"));
    }
    line
}

pub fn join_ids(ids: impl IntoIterator<Item = TaskId>) -> String {
    ids.into_iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Command label from raw arguments: `add <kind>` for add, else the first word.
pub fn command_name<I>(args: I) -> String
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let mut words = args
        .into_iter()
        .filter(|arg| !arg.as_ref().starts_with('-'))
        .map(|arg| arg.as_ref().to_string());

    match (words.next(), words.next()) {
        (Some(add), Some(kind)) if add == "add" => format!("{add} {kind}"),
        (Some(command), _) => command,
        (None, _) => "kanban".to_string(),
    }
}

fn error_kind(err: &Error) -> &'static str {
    match err.exit_code() {
        2 => "user_error",
        3 => "rejected",
        _ => "operation_failed",
    }
}

fn error_hint(err: &Error) -> Option<&'static str> {
    match err {
        Error::NotFound(_) => Some("kanban list <task|epic|subtask>"),
        Error::AbsentEpic(_) => Some("kanban list epic"),
        Error::Intersect { .. } => Some("kanban prioritized"),
        Error::InvalidConfig(_) => Some("fix .kanban.toml then retry"),
        Error::InvalidHeader(_) | Error::InvalidRecord { .. } => {
            Some("fix the save file then retry")
        }
        _ => None,
    }
}
