//! kanban task command implementations.

use chrono::{Duration, NaiveDateTime};
use serde::Serialize;

use crate::cli::{AddCommands, Session, UpdateArgs, WorkFields};
use crate::csv::DATE_TIME_FORMAT;
use crate::error::{Error, Result};
use crate::model::{Task, TaskId, TaskKind};
use crate::output::{join_ids, print_report, Report};
use crate::storage::FileBackedStore;

/// Accepted `--start` layouts, tried in order.
const START_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M", DATE_TIME_FORMAT];

#[derive(Serialize)]
struct TaskOutput<'a> {
    task: &'a Task,
}

#[derive(Serialize)]
struct TaskListOutput<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    kind: Option<TaskKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    epic_id: Option<TaskId>,
    total: usize,
    tasks: &'a [Task],
}

#[derive(Serialize)]
struct DeleteOutput {
    id: TaskId,
    kind: TaskKind,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    removed_subtasks: Vec<TaskId>,
}

#[derive(Serialize)]
struct ClearOutput {
    kind: TaskKind,
    removed: usize,
}

pub fn run_add(session: &mut Session, command: AddCommands) -> Result<()> {
    let (label, task) = match command {
        AddCommands::Task { name, fields } => {
            let task = Task::new(checked_name(&name)?, fields.description.as_str());
            ("add task", apply_work_fields(task, &fields)?)
        }
        AddCommands::Epic { name, description } => {
            ("add epic", Task::epic(checked_name(&name)?, description))
        }
        AddCommands::Subtask { name, epic, fields } => {
            let task = Task::subtask(checked_name(&name)?, fields.description.as_str(), epic);
            ("add subtask", apply_work_fields(task, &fields)?)
        }
    };

    let id = session.store.create(task)?;
    let created = find(&session.store, id).ok_or(Error::NotFound(id))?;

    let mut report = Report::new(format!("{} created", kind_label(created.kind())));
    report.task_fields(&created);
    if created.kind() == TaskKind::Epic {
        report.hint(format!("kanban add subtask <name> --epic {id}"));
    }

    print_report(
        session.output,
        label,
        &TaskOutput { task: &created },
        &report,
    )
}

pub fn run_list(session: &mut Session, kind: TaskKind) -> Result<()> {
    let tasks = session.store.list(kind);
    let mut report = Report::new(format!(
        "{} {}",
        tasks.len(),
        plural(kind, tasks.len())
    ));
    report.task_lines(&tasks, session.verbose);

    print_report(
        session.output,
        "list",
        &TaskListOutput {
            kind: Some(kind),
            epic_id: None,
            total: tasks.len(),
            tasks: &tasks,
        },
        &report,
    )
}

pub fn run_show(session: &mut Session, id: TaskId, kind: Option<TaskKind>) -> Result<()> {
    let task = session.store.get(id, kind).ok_or(Error::NotFound(id))?;

    let mut report = Report::new(format!("{} {}", kind_label(task.kind()), task.id()));
    report.task_fields(&task);
    if !task.description().is_empty() {
        report.line(task.description());
    }

    print_report(session.output, "show", &TaskOutput { task: &task }, &report)
}

pub fn run_update(session: &mut Session, args: UpdateArgs) -> Result<()> {
    let mut task = find(&session.store, args.id).ok_or(Error::NotFound(args.id))?;

    if let Some(name) = args.name.as_deref() {
        task.set_name(checked_name(name)?);
    }
    if let Some(description) = args.description {
        task.set_description(description);
    }
    if let Some(status) = args.status {
        task.set_status(status)?;
    }
    if args.unschedule {
        task.set_start_time(None)?;
        task.set_duration(None)?;
    }
    if let Some(raw) = args.start.as_deref() {
        task.set_start_time(Some(parse_start(raw)?))?;
    }
    if let Some(minutes) = args.duration {
        task.set_duration(Some(duration_minutes(minutes)?))?;
    }
    if let Some(epic_id) = args.epic {
        task.set_epic_id(epic_id)?;
    }

    session.store.update(args.id, task)?;
    let updated = find(&session.store, args.id).ok_or(Error::NotFound(args.id))?;

    let mut report = Report::new(format!("{} updated", kind_label(updated.kind())));
    report.task_fields(&updated);

    print_report(
        session.output,
        "update",
        &TaskOutput { task: &updated },
        &report,
    )
}

pub fn run_delete(session: &mut Session, id: TaskId, kind: Option<TaskKind>) -> Result<()> {
    let target = match kind {
        Some(kind) => session.store.list(kind).into_iter().find(|t| t.id() == id),
        None => find(&session.store, id),
    }
    .ok_or(Error::NotFound(id))?;
    let removed_subtasks: Vec<TaskId> = target
        .subtask_ids()
        .map(|ids| ids.iter().copied().collect())
        .unwrap_or_default();

    session.store.delete(id, kind)?;

    let mut report = Report::new(format!("{} {} deleted", kind_label(target.kind()), id));
    if !removed_subtasks.is_empty() {
        report.field("Subtasks removed", join_ids(removed_subtasks.iter().copied()));
    }

    print_report(
        session.output,
        "delete",
        &DeleteOutput {
            id,
            kind: target.kind(),
            removed_subtasks,
        },
        &report,
    )
}

pub fn run_clear(session: &mut Session, kind: TaskKind) -> Result<()> {
    let removed = session.store.store().count(kind);
    session.store.clear(kind)?;

    let mut report = Report::new(format!("Removed {removed} {}", plural(kind, removed)));
    if kind == TaskKind::Epic {
        report.hint("subtasks of removed epics were removed too");
    }

    print_report(
        session.output,
        "clear",
        &ClearOutput { kind, removed },
        &report,
    )
}

pub fn run_subtasks(session: &mut Session, epic_id: TaskId) -> Result<()> {
    let is_epic = session
        .store
        .list(TaskKind::Epic)
        .iter()
        .any(|epic| epic.id() == epic_id);
    if !is_epic {
        return Err(Error::AbsentEpic(epic_id));
    }

    let tasks = session.store.subtasks_of(epic_id);
    let mut report = Report::new(format!(
        "Epic {epic_id}: {} {}",
        tasks.len(),
        plural(TaskKind::Subtask, tasks.len())
    ));
    report.task_lines(&tasks, session.verbose);

    print_report(
        session.output,
        "subtasks",
        &TaskListOutput {
            kind: Some(TaskKind::Subtask),
            epic_id: Some(epic_id),
            total: tasks.len(),
            tasks: &tasks,
        },
        &report,
    )
}

pub fn run_prioritized(session: &mut Session) -> Result<()> {
    let tasks = session.store.prioritized();
    let mut report = Report::new(format!("{} scheduled", tasks.len()));
    report.task_lines(&tasks, session.verbose);
    if tasks.is_empty() {
        report.hint("kanban update <id> --start \"YYYY-MM-DD HH:MM\" --duration <minutes>");
    }

    print_report(
        session.output,
        "prioritized",
        &TaskListOutput {
            kind: None,
            epic_id: None,
            total: tasks.len(),
            tasks: &tasks,
        },
        &report,
    )
}

pub fn run_history(session: &mut Session) -> Result<()> {
    let tasks = session.store.history();
    let mut report = Report::new(format!("{} viewed", tasks.len()));
    report.task_lines(&tasks, session.verbose);
    if tasks.is_empty() {
        report.hint("history only covers the current session; see `kanban shell`");
    }

    print_report(
        session.output,
        "history",
        &TaskListOutput {
            kind: None,
            epic_id: None,
            total: tasks.len(),
            tasks: &tasks,
        },
        &report,
    )
}

/// Parses a `--start` value in any of [`START_FORMATS`].
pub(crate) fn parse_start(raw: &str) -> Result<NaiveDateTime> {
    let raw = raw.trim();
    START_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .ok_or_else(|| {
            Error::InvalidArgument(format!(
                "invalid start time '{raw}' (expected YYYY-MM-DD HH:MM)"
            ))
        })
}

fn apply_work_fields(mut task: Task, fields: &WorkFields) -> Result<Task> {
    if let Some(status) = fields.status {
        task.set_status(status)?;
    }
    let start = fields.start.as_deref().map(parse_start).transpose()?;
    task.set_start_time(start)?;
    let duration = fields.duration.map(duration_minutes).transpose()?;
    task.set_duration(duration)?;
    Ok(task)
}

fn duration_minutes(minutes: i64) -> Result<Duration> {
    Duration::try_minutes(minutes)
        .ok_or_else(|| Error::InvalidArgument(format!("duration {minutes} is out of range")))
}

fn checked_name(name: &str) -> Result<&str> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidArgument("name cannot be empty".to_string()));
    }
    Ok(trimmed)
}

/// Lookup that leaves the view history alone.
fn find(store: &FileBackedStore, id: TaskId) -> Option<Task> {
    TaskKind::ALL
        .into_iter()
        .flat_map(|kind| store.list(kind))
        .find(|task| task.id() == id)
}

fn kind_label(kind: TaskKind) -> &'static str {
    match kind {
        TaskKind::Task => "Task",
        TaskKind::Epic => "Epic",
        TaskKind::Subtask => "Subtask",
    }
}

fn plural(kind: TaskKind, count: usize) -> &'static str {
    match (kind, count == 1) {
        (TaskKind::Task, true) => "task",
        (TaskKind::Task, false) => "tasks",
        (TaskKind::Epic, true) => "epic",
        (TaskKind::Epic, false) => "epics",
        (TaskKind::Subtask, true) => "subtask",
        (TaskKind::Subtask, false) => "subtasks",
    }
}
