//! Save file record format.
//!
//! One header line, then one comma separated record per entity:
//!
//! ```text
//! id,type,name,status,description,epic,startTime,duration
//! 1,TASK,Write report,NEW,quarterly,,01-02-2025 09:30,90
//! 2,EPIC,Release,NEW,,,,
//! 3,SUBTASK,Tag build,DONE,,2,,
//! ```
//!
//! Text fields cannot contain commas or line breaks; saving such a task is
//! rejected instead of producing a file that cannot be read back.

use chrono::{Duration, NaiveDateTime};

use crate::error::{Error, Result};
use crate::model::{Task, TaskId, TaskKind, TaskStatus};
use crate::store::TaskStore;

pub const HEADER: &str = "id,type,name,status,description,epic,startTime,duration";

/// Timestamp layout of the `startTime` column, e.g. `01-02-2025 09:30`.
pub const DATE_TIME_FORMAT: &str = "%d-%m-%Y %H:%M";

const FIELD_COUNT: usize = 8;

/// Renders one record, without a line terminator.
pub fn to_record(task: &Task) -> Result<String> {
    let name = check_text(task, "name", task.name())?;
    let description = check_text(task, "description", task.description())?;
    let epic = task.epic_id().map(|id| id.to_string()).unwrap_or_default();
    let start = task
        .start_time()
        .filter(|_| task.kind() != TaskKind::Epic)
        .map(|start| start.format(DATE_TIME_FORMAT).to_string())
        .unwrap_or_default();
    let duration = task
        .duration()
        .filter(|_| task.kind() != TaskKind::Epic)
        .map(|duration| duration.num_minutes().to_string())
        .unwrap_or_default();

    Ok(format!(
        "{},{},{},{},{},{},{},{}",
        task.id(),
        task.kind(),
        name,
        task.status(),
        description,
        epic,
        start,
        duration
    ))
}

fn check_text<'a>(task: &Task, field: &str, value: &'a str) -> Result<&'a str> {
    if value.contains(&[',', '\n', '\r'][..]) {
        return Err(Error::InvalidArgument(format!(
            "task {}: {field} cannot contain commas or line breaks",
            task.id()
        )));
    }
    Ok(value)
}

/// Parses one record. `line` is the 1-based line number used in errors.
pub fn parse_record(line: usize, record: &str) -> Result<Task> {
    let invalid = |reason: String| Error::InvalidRecord { line, reason };

    let fields: Vec<&str> = record.split(',').collect();
    if fields.len() != FIELD_COUNT {
        return Err(invalid(format!(
            "expected {FIELD_COUNT} fields, found {}",
            fields.len()
        )));
    }

    let id: TaskId = fields[0]
        .trim()
        .parse()
        .ok()
        .filter(|&id| id > 0)
        .ok_or_else(|| invalid(format!("invalid id '{}'", fields[0])))?;
    let kind: TaskKind = fields[1]
        .parse()
        .map_err(|_| invalid(format!("invalid type '{}'", fields[1])))?;
    let name = fields[2];
    let status: TaskStatus = fields[3]
        .parse()
        .map_err(|_| invalid(format!("invalid status '{}'", fields[3])))?;
    let description = fields[4];

    let mut task = match kind {
        TaskKind::Task => Task::new(name, description),
        TaskKind::Epic => Task::epic(name, description),
        TaskKind::Subtask => {
            let epic_id: TaskId = fields[5]
                .trim()
                .parse()
                .map_err(|_| invalid(format!("invalid epic id '{}'", fields[5])))?;
            Task::subtask(name, description, epic_id)
        }
    };
    task.assign_id(id);

    // Epic status and schedule are derived once subtasks are restored.
    if kind == TaskKind::Epic {
        return Ok(task);
    }

    let start = match fields[6].trim() {
        "" => None,
        raw => Some(
            NaiveDateTime::parse_from_str(raw, DATE_TIME_FORMAT)
                .map_err(|err| invalid(format!("invalid start time '{raw}': {err}")))?,
        ),
    };
    let duration = match fields[7].trim() {
        "" => None,
        raw => {
            let duration = raw
                .parse()
                .ok()
                .filter(|&minutes: &i64| minutes >= 0)
                .and_then(Duration::try_minutes)
                .ok_or_else(|| invalid(format!("invalid duration '{raw}'")))?;
            Some(duration)
        }
    };

    apply_fields(&mut task, status, start, duration).map_err(|err| invalid(err.to_string()))?;
    Ok(task)
}

fn apply_fields(
    task: &mut Task,
    status: TaskStatus,
    start: Option<NaiveDateTime>,
    duration: Option<Duration>,
) -> Result<()> {
    task.set_status(status)?;
    task.set_start_time(start)?;
    task.set_duration(duration)
}

/// Renders the whole store: tasks, then epics, then subtasks.
///
/// Epics precede subtasks so that reading the file back in order always
/// finds a subtask's epic.
pub fn render(store: &TaskStore) -> Result<String> {
    let mut out = String::from(HEADER);
    out.push('\n');
    for kind in TaskKind::ALL {
        for task in store.list(kind) {
            out.push_str(&to_record(&task)?);
            out.push('\n');
        }
    }
    Ok(out)
}

/// Parses a whole save file into records, in file order.
///
/// Blank lines are skipped. Nothing is returned unless every line parses.
pub fn parse_document(content: &str) -> Result<Vec<Task>> {
    let mut lines = content.lines();
    let header = lines.next().unwrap_or_default().trim_end_matches('\r');
    if header != HEADER {
        return Err(Error::InvalidHeader(header.to_string()));
    }

    lines
        .enumerate()
        .map(|(idx, record)| (idx + 2, record.trim_end_matches('\r')))
        .filter(|(_, record)| !record.trim().is_empty())
        .map(|(line, record)| parse_record(line, record))
        .collect()
}
