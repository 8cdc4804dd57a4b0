//! Entity model: tasks, epics and subtasks.
//!
//! All three kinds share one record ([`Task`]) carrying a kind payload
//! ([`TaskDetail`]). Epic status and schedule are derived from the epic's
//! subtasks and can only be recomputed from inside the crate; the public
//! setters reject them with [`Error::InvalidMutation`].

use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize, Serializer};

use crate::error::{Error, Result};

/// Identifier shared by every entity kind.
///
/// Zero means "not yet stored"; the store assigns positive ids.
pub type TaskId = u64;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    #[default]
    New,
    InProgress,
    Done,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 3] = [TaskStatus::New, TaskStatus::InProgress, TaskStatus::Done];

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::New => "NEW",
            TaskStatus::InProgress => "IN_PROGRESS",
            TaskStatus::Done => "DONE",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        let trimmed = value.trim();
        TaskStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| {
                Error::InvalidArgument(format!(
                    "unknown status '{trimmed}' (expected NEW|IN_PROGRESS|DONE)"
                ))
            })
    }
}

/// Storage partition an entity lives in.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskKind {
    Task,
    Epic,
    Subtask,
}

impl TaskKind {
    /// Search order used by id-only lookups and deletes.
    pub const ALL: [TaskKind; 3] = [TaskKind::Task, TaskKind::Epic, TaskKind::Subtask];

    pub fn as_str(self) -> &'static str {
        match self {
            TaskKind::Task => "TASK",
            TaskKind::Epic => "EPIC",
            TaskKind::Subtask => "SUBTASK",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskKind {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        let trimmed = value.trim();
        TaskKind::ALL
            .into_iter()
            .find(|kind| {
                kind.as_str().eq_ignore_ascii_case(trimmed)
                    || format!("{}s", kind.as_str()).eq_ignore_ascii_case(trimmed)
            })
            .ok_or_else(|| {
                Error::InvalidArgument(format!(
                    "unknown task type '{trimmed}' (expected task|epic|subtask)"
                ))
            })
    }
}

/// Derived state of an epic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EpicDetail {
    subtask_ids: BTreeSet<TaskId>,
    end_time: Option<NaiveDateTime>,
}

/// Kind-specific payload of a [`Task`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskDetail {
    Task,
    Epic(EpicDetail),
    Subtask { epic_id: TaskId },
}

/// Rolled-up schedule of a set of subtasks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Schedule {
    pub start_time: Option<NaiveDateTime>,
    pub duration: Option<Duration>,
    pub end_time: Option<NaiveDateTime>,
}

/// A unit of work of any kind.
///
/// Equality and hashing use the id only.
#[derive(Debug, Clone)]
pub struct Task {
    id: TaskId,
    name: String,
    description: String,
    status: TaskStatus,
    start_time: Option<NaiveDateTime>,
    duration: Option<Duration>,
    detail: TaskDetail,
}

impl Task {
    /// A standalone task with status `NEW` and no schedule.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::with_detail(name, description, TaskDetail::Task)
    }

    /// An epic without subtasks.
    pub fn epic(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::with_detail(name, description, TaskDetail::Epic(EpicDetail::default()))
    }

    /// A subtask pointing at `epic_id`.
    pub fn subtask(
        name: impl Into<String>,
        description: impl Into<String>,
        epic_id: TaskId,
    ) -> Self {
        Self::with_detail(name, description, TaskDetail::Subtask { epic_id })
    }

    fn with_detail(
        name: impl Into<String>,
        description: impl Into<String>,
        detail: TaskDetail,
    ) -> Self {
        Self {
            id: 0,
            name: name.into(),
            description: description.into(),
            status: TaskStatus::New,
            start_time: None,
            duration: None,
            detail,
        }
    }

    /// Sets the schedule, consuming and returning the task.
    pub fn scheduled(mut self, start_time: NaiveDateTime, duration: Duration) -> Result<Self> {
        self.set_start_time(Some(start_time))?;
        self.set_duration(Some(duration))?;
        Ok(self)
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn kind(&self) -> TaskKind {
        match self.detail {
            TaskDetail::Task => TaskKind::Task,
            TaskDetail::Epic(_) => TaskKind::Epic,
            TaskDetail::Subtask { .. } => TaskKind::Subtask,
        }
    }

    pub fn detail(&self) -> &TaskDetail {
        &self.detail
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn status(&self) -> TaskStatus {
        self.status
    }

    pub fn start_time(&self) -> Option<NaiveDateTime> {
        self.start_time
    }

    pub fn duration(&self) -> Option<Duration> {
        self.duration
    }

    /// End of the scheduled interval.
    ///
    /// Epics report the latest end among their subtasks. Other kinds report
    /// `start + duration`, or `start` when no duration is set.
    pub fn end_time(&self) -> Option<NaiveDateTime> {
        if let TaskDetail::Epic(epic) = &self.detail {
            return epic.end_time;
        }
        let start = self.start_time?;
        match self.duration {
            Some(duration) => start.checked_add_signed(duration),
            None => Some(start),
        }
    }

    /// Owning epic, for subtasks.
    pub fn epic_id(&self) -> Option<TaskId> {
        match self.detail {
            TaskDetail::Subtask { epic_id } => Some(epic_id),
            _ => None,
        }
    }

    /// Member subtasks, for epics.
    pub fn subtask_ids(&self) -> Option<&BTreeSet<TaskId>> {
        match &self.detail {
            TaskDetail::Epic(epic) => Some(&epic.subtask_ids),
            _ => None,
        }
    }

    /// Whether this entity takes part in schedule conflict checks.
    pub fn is_schedulable(&self) -> bool {
        self.kind() != TaskKind::Epic && self.start_time.is_some()
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    pub fn set_status(&mut self, status: TaskStatus) -> Result<()> {
        self.reject_epic("epic status is derived from its subtasks")?;
        self.status = status;
        Ok(())
    }

    pub fn set_start_time(&mut self, start_time: Option<NaiveDateTime>) -> Result<()> {
        self.reject_epic("epic start time is derived from its subtasks")?;
        check_schedule(start_time, self.duration)?;
        self.start_time = start_time;
        Ok(())
    }

    pub fn set_duration(&mut self, duration: Option<Duration>) -> Result<()> {
        self.reject_epic("epic duration is derived from its subtasks")?;
        check_schedule(self.start_time, duration)?;
        self.duration = duration;
        Ok(())
    }

    /// Re-points a subtask at another epic.
    pub fn set_epic_id(&mut self, epic_id: TaskId) -> Result<()> {
        match &mut self.detail {
            TaskDetail::Subtask { epic_id: current } => {
                *current = epic_id;
                Ok(())
            }
            _ => Err(Error::InvalidMutation("only subtasks belong to an epic")),
        }
    }

    /// Interval overlap with another entity; see [`overlaps`].
    pub fn overlaps(&self, other: &Task) -> bool {
        overlaps(self, other)
    }

    fn reject_epic(&self, reason: &'static str) -> Result<()> {
        if self.kind() == TaskKind::Epic {
            return Err(Error::InvalidMutation(reason));
        }
        Ok(())
    }

    pub(crate) fn assign_id(&mut self, id: TaskId) {
        self.id = id;
    }

    /// Drops every subtask link and derived value of an epic.
    pub(crate) fn reset_epic(&mut self) {
        if let TaskDetail::Epic(epic) = &mut self.detail {
            epic.subtask_ids.clear();
            epic.end_time = None;
            self.status = TaskStatus::New;
            self.start_time = None;
            self.duration = None;
        }
    }

    pub(crate) fn attach_subtask(&mut self, subtask_id: TaskId) {
        if let TaskDetail::Epic(epic) = &mut self.detail {
            epic.subtask_ids.insert(subtask_id);
        }
    }

    pub(crate) fn detach_subtask(&mut self, subtask_id: TaskId) {
        if let TaskDetail::Epic(epic) = &mut self.detail {
            epic.subtask_ids.remove(&subtask_id);
        }
    }

    /// Recomputes an epic's status and schedule from `subtasks`.
    ///
    /// No-op for other kinds.
    pub(crate) fn roll_up<'a, I>(&mut self, subtasks: I)
    where
        I: IntoIterator<Item = &'a Task>,
    {
        let TaskDetail::Epic(epic) = &mut self.detail else {
            return;
        };
        let members: Vec<&Task> = subtasks.into_iter().collect();
        let schedule = roll_up_schedule(members.iter().copied());
        self.status = roll_up_status(members.iter().map(|subtask| subtask.status));
        self.start_time = schedule.start_time;
        self.duration = schedule.duration;
        epic.end_time = schedule.end_time;
    }
}

impl PartialEq for Task {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Task {}

impl Hash for Task {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {} '{}' [{}]", self.id, self.kind(), self.name, self.status)
    }
}

#[derive(Serialize)]
struct TaskView<'a> {
    id: TaskId,
    #[serde(rename = "type")]
    kind: TaskKind,
    name: &'a str,
    description: &'a str,
    status: TaskStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    start_time: Option<NaiveDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_minutes: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    end_time: Option<NaiveDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    epic_id: Option<TaskId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    subtask_ids: Option<&'a BTreeSet<TaskId>>,
}

impl Serialize for Task {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        TaskView {
            id: self.id,
            kind: self.kind(),
            name: &self.name,
            description: &self.description,
            status: self.status,
            start_time: self.start_time,
            duration_minutes: self.duration.map(|duration| duration.num_minutes()),
            end_time: self.end_time(),
            epic_id: self.epic_id(),
            subtask_ids: self.subtask_ids(),
        }
        .serialize(serializer)
    }
}

/// A stored schedule always has a representable end.
fn check_schedule(start: Option<NaiveDateTime>, duration: Option<Duration>) -> Result<()> {
    let Some(duration) = duration else {
        return Ok(());
    };
    if duration < Duration::zero() {
        return Err(Error::InvalidArgument(
            "duration cannot be negative".to_string(),
        ));
    }
    if start.is_some_and(|start| start.checked_add_signed(duration).is_none()) {
        return Err(Error::InvalidArgument(
            "schedule ends outside the supported date range".to_string(),
        ));
    }
    Ok(())
}

/// Epic status derived from its subtasks' statuses.
///
/// Empty → `NEW`; any `IN_PROGRESS` → `IN_PROGRESS`; all `NEW` → `NEW`;
/// all `DONE` → `DONE`; a mix of `NEW` and `DONE` → `IN_PROGRESS`.
pub fn roll_up_status<I>(statuses: I) -> TaskStatus
where
    I: IntoIterator<Item = TaskStatus>,
{
    let mut total = 0usize;
    let mut new = 0usize;
    let mut done = 0usize;
    for status in statuses {
        total += 1;
        match status {
            TaskStatus::InProgress => return TaskStatus::InProgress,
            TaskStatus::New => new += 1,
            TaskStatus::Done => done += 1,
        }
    }
    if new == total {
        TaskStatus::New
    } else if done == total {
        TaskStatus::Done
    } else {
        TaskStatus::InProgress
    }
}

/// Epic schedule derived from its subtasks.
///
/// Start is the earliest subtask start, end the latest subtask end, and
/// duration the sum of subtask durations; a zero sum counts as absent.
pub fn roll_up_schedule<'a, I>(subtasks: I) -> Schedule
where
    I: IntoIterator<Item = &'a Task>,
{
    let mut schedule = Schedule::default();
    let mut total = Duration::zero();
    for subtask in subtasks {
        if let Some(start) = subtask.start_time() {
            schedule.start_time = Some(schedule.start_time.map_or(start, |cur| cur.min(start)));
        }
        if let Some(end) = subtask.end_time() {
            schedule.end_time = Some(schedule.end_time.map_or(end, |cur| cur.max(end)));
        }
        if let Some(duration) = subtask.duration() {
            total = total.checked_add(&duration).unwrap_or(Duration::MAX);
        }
    }
    if !total.is_zero() {
        schedule.duration = Some(total);
    }
    schedule
}

/// Whether two scheduled intervals `[start, end)` intersect.
///
/// False when either side is unscheduled. Equal starts always overlap,
/// even for zero-length intervals; touching endpoints do not.
pub fn overlaps(a: &Task, b: &Task) -> bool {
    let (Some(a_start), Some(b_start)) = (a.start_time(), b.start_time()) else {
        return false;
    };
    let a_end = a.end_time().unwrap_or(a_start);
    let b_end = b.end_time().unwrap_or(b_start);
    a_start == b_start
        || (b_start > a_start && b_start < a_end)
        || (a_start > b_start && a_start < b_end)
}
