//! In-memory task store.
//!
//! The store owns every entity, partitioned by kind, and keeps the epic and
//! subtask links consistent in both directions. Reads by id feed the
//! [`HistoryTracker`]; every mutation of a scheduled entity goes through the
//! [`PriorityIndex`]. Validation always runs before the first mutation, so a
//! failed operation leaves no trace. Callers only ever receive copies.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::history::HistoryTracker;
use crate::model::{Task, TaskId, TaskKind};
use crate::priority::PriorityIndex;

#[derive(Debug, Clone, Default)]
pub struct TaskStore {
    tasks: BTreeMap<TaskId, Task>,
    epics: BTreeMap<TaskId, Task>,
    subtasks: BTreeMap<TaskId, Task>,
    /// Last id handed out.
    last_id: TaskId,
    history: HistoryTracker,
    priority: PriorityIndex,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store whose history keeps at most `limit` entries.
    pub fn with_history_limit(limit: Option<usize>) -> Self {
        Self {
            history: HistoryTracker::with_limit(limit),
            ..Self::default()
        }
    }

    /// Last id handed out, zero when nothing was ever stored.
    pub fn last_id(&self) -> TaskId {
        self.last_id
    }

    pub fn count(&self, kind: TaskKind) -> usize {
        self.partition(kind).len()
    }

    /// Copies of every entity of `kind`, in id order.
    pub fn list(&self, kind: TaskKind) -> Vec<Task> {
        self.partition(kind).values().cloned().collect()
    }

    /// Looks up `id`, in one partition or probing tasks, epics, subtasks.
    ///
    /// A hit is recorded in the history.
    pub fn get(&mut self, id: TaskId, kind: Option<TaskKind>) -> Option<Task> {
        let task = lookup_order(kind)
            .iter()
            .find_map(|&kind| self.partition(kind).get(&id))?
            .clone();
        self.history.record(&task);
        Some(task)
    }

    /// Stores a copy of `task` under a fresh id and returns that id.
    ///
    /// Subtasks must point at an existing epic. Scheduled tasks and subtasks
    /// must not overlap anything already scheduled. Epic links and derived
    /// fields carried by the argument are ignored.
    pub fn create(&mut self, task: Task) -> Result<TaskId> {
        let mut task = task;
        let id = self.last_id + 1;
        task.assign_id(id);
        task.reset_epic();
        self.ensure_epic(&task)?;
        self.ensure_free_slot(&task)?;

        self.last_id = id;
        debug!(id, kind = %task.kind(), "created task");
        self.insert(task);
        Ok(id)
    }

    /// Re-inserts a task that already carries an id, such as one read back
    /// from a save file.
    ///
    /// Same rules as [`TaskStore::create`], plus the id must be unused. Later
    /// creates continue after the highest restored id.
    pub fn restore(&mut self, task: Task) -> Result<()> {
        let mut task = task;
        let id = task.id();
        if id == 0 {
            return Err(Error::InvalidArgument(
                "restored task needs a positive id".to_string(),
            ));
        }
        if self.contains(id) {
            return Err(Error::DuplicateId(id));
        }
        task.reset_epic();
        self.ensure_epic(&task)?;
        self.ensure_free_slot(&task)?;

        self.last_id = self.last_id.max(id);
        debug!(id, kind = %task.kind(), "restored task");
        self.insert(task);
        Ok(())
    }

    /// Replaces the entity `id` in the partition of `task`'s kind.
    ///
    /// Epics only take the new name and description. Subtasks may move to
    /// another epic; both epics are rolled up again.
    pub fn update(&mut self, id: TaskId, task: Task) -> Result<()> {
        let kind = task.kind();
        let Some(stored) = self.partition(kind).get(&id) else {
            warn!(id, %kind, "update of unknown task");
            return Err(Error::NotFound(id));
        };

        match kind {
            TaskKind::Epic => {
                let mut epic = stored.clone();
                epic.set_name(task.name());
                epic.set_description(task.description());
                self.history.refresh(&epic);
                self.epics.insert(id, epic);
            }
            TaskKind::Task => {
                let mut task = task;
                task.assign_id(id);
                self.ensure_free_slot(&task)?;
                self.priority.insert(&task);
                self.history.refresh(&task);
                self.tasks.insert(id, task);
            }
            TaskKind::Subtask => {
                let previous_epic = stored.epic_id();
                let mut subtask = task;
                subtask.assign_id(id);
                self.ensure_epic(&subtask)?;
                self.ensure_free_slot(&subtask)?;

                let next_epic = subtask.epic_id();
                self.priority.insert(&subtask);
                self.history.refresh(&subtask);
                self.subtasks.insert(id, subtask);

                if let Some(previous) = previous_epic.filter(|&prev| Some(prev) != next_epic) {
                    if let Some(epic) = self.epics.get_mut(&previous) {
                        epic.detach_subtask(id);
                    }
                    self.roll_up(previous);
                }
                if let Some(next) = next_epic {
                    if let Some(epic) = self.epics.get_mut(&next) {
                        epic.attach_subtask(id);
                    }
                    self.roll_up(next);
                }
            }
        }
        debug!(id, %kind, "updated task");
        Ok(())
    }

    /// Deletes `id`, in one partition or probing tasks, epics, subtasks.
    ///
    /// Deleting an epic deletes its subtasks; deleting a subtask rolls its
    /// epic up again.
    pub fn delete(&mut self, id: TaskId, kind: Option<TaskKind>) -> Result<()> {
        let Some(kind) = lookup_order(kind)
            .iter()
            .copied()
            .find(|&kind| self.partition(kind).contains_key(&id))
        else {
            warn!(id, "delete of unknown task");
            return Err(Error::NotFound(id));
        };

        match kind {
            TaskKind::Task => {
                self.tasks.remove(&id);
                self.forget(id);
            }
            TaskKind::Epic => {
                if let Some(epic) = self.epics.remove(&id) {
                    for subtask_id in epic.subtask_ids().into_iter().flatten() {
                        self.subtasks.remove(subtask_id);
                        self.forget(*subtask_id);
                    }
                }
                self.forget(id);
            }
            TaskKind::Subtask => {
                let epic_id = self.subtasks.remove(&id).and_then(|subtask| subtask.epic_id());
                self.forget(id);
                if let Some(epic_id) = epic_id {
                    if let Some(epic) = self.epics.get_mut(&epic_id) {
                        epic.detach_subtask(id);
                    }
                    self.roll_up(epic_id);
                }
            }
        }
        debug!(id, %kind, "deleted task");
        Ok(())
    }

    /// Removes every entity of `kind`.
    ///
    /// Clearing epics also clears all subtasks. Clearing subtasks empties
    /// every epic, which rolls them back to `NEW`.
    pub fn clear(&mut self, kind: TaskKind) {
        match kind {
            TaskKind::Task => {
                let tasks = std::mem::take(&mut self.tasks);
                tasks.keys().for_each(|&id| self.forget(id));
            }
            TaskKind::Epic => {
                let epics = std::mem::take(&mut self.epics);
                let subtasks = std::mem::take(&mut self.subtasks);
                epics
                    .keys()
                    .chain(subtasks.keys())
                    .for_each(|&id| self.forget(id));
            }
            TaskKind::Subtask => {
                let subtasks = std::mem::take(&mut self.subtasks);
                subtasks.keys().for_each(|&id| self.forget(id));
                let epic_ids: Vec<TaskId> = self.epics.keys().copied().collect();
                for epic_id in epic_ids {
                    if let Some(epic) = self.epics.get_mut(&epic_id) {
                        epic.reset_epic();
                    }
                    self.roll_up(epic_id);
                }
            }
        }
        debug!(%kind, "cleared tasks");
    }

    /// Copies of the subtasks of `epic_id`; empty when there is no such epic.
    pub fn subtasks_of(&self, epic_id: TaskId) -> Vec<Task> {
        self.epics
            .get(&epic_id)
            .and_then(Task::subtask_ids)
            .into_iter()
            .flatten()
            .filter_map(|id| self.subtasks.get(id))
            .cloned()
            .collect()
    }

    /// Viewed entities, least recently viewed first.
    pub fn history(&self) -> Vec<Task> {
        self.history.snapshot()
    }

    /// Scheduled tasks and subtasks by ascending start time.
    pub fn prioritized(&self) -> Vec<Task> {
        self.priority.snapshot()
    }

    fn contains(&self, id: TaskId) -> bool {
        TaskKind::ALL
            .iter()
            .any(|&kind| self.partition(kind).contains_key(&id))
    }

    fn partition(&self, kind: TaskKind) -> &BTreeMap<TaskId, Task> {
        match kind {
            TaskKind::Task => &self.tasks,
            TaskKind::Epic => &self.epics,
            TaskKind::Subtask => &self.subtasks,
        }
    }

    fn ensure_epic(&self, task: &Task) -> Result<()> {
        match task.epic_id() {
            Some(epic_id) if !self.epics.contains_key(&epic_id) => {
                warn!(epic_id, "subtask references a missing epic");
                Err(Error::AbsentEpic(epic_id))
            }
            _ => Ok(()),
        }
    }

    fn ensure_free_slot(&self, task: &Task) -> Result<()> {
        if !task.is_schedulable() {
            return Ok(());
        }
        match self.priority.find_conflict(task) {
            Some(conflicting) => {
                warn!(id = task.id(), conflicting, "schedule overlap");
                let id = self.contains(task.id()).then_some(task.id());
                Err(Error::Intersect { id, conflicting })
            }
            None => Ok(()),
        }
    }

    /// Commits an already validated entity.
    fn insert(&mut self, task: Task) {
        let id = task.id();
        self.priority.insert(&task);
        match task.kind() {
            TaskKind::Task => {
                self.tasks.insert(id, task);
            }
            TaskKind::Epic => {
                self.epics.insert(id, task);
            }
            TaskKind::Subtask => {
                let epic_id = task.epic_id();
                self.subtasks.insert(id, task);
                if let Some(epic_id) = epic_id {
                    if let Some(epic) = self.epics.get_mut(&epic_id) {
                        epic.attach_subtask(id);
                    }
                    self.roll_up(epic_id);
                }
            }
        }
    }

    fn forget(&mut self, id: TaskId) {
        self.priority.remove(id);
        self.history.evict(id);
    }

    fn roll_up(&mut self, epic_id: TaskId) {
        let Some(epic) = self.epics.get_mut(&epic_id) else {
            return;
        };
        let members: Vec<&Task> = epic
            .subtask_ids()
            .into_iter()
            .flatten()
            .filter_map(|id| self.subtasks.get(id))
            .collect();
        epic.roll_up(members);
        self.history.refresh(epic);
    }
}

fn lookup_order(kind: Option<TaskKind>) -> &'static [TaskKind] {
    match kind {
        Some(TaskKind::Task) => &[TaskKind::Task],
        Some(TaskKind::Epic) => &[TaskKind::Epic],
        Some(TaskKind::Subtask) => &[TaskKind::Subtask],
        None => &TaskKind::ALL,
    }
}

/// A [`TaskStore`] behind one coarse lock, for callers on several threads.
#[derive(Debug, Clone, Default)]
pub struct SharedStore {
    inner: Arc<Mutex<TaskStore>>,
}

impl SharedStore {
    pub fn new(store: TaskStore) -> Self {
        Self {
            inner: Arc::new(Mutex::new(store)),
        }
    }

    pub fn list(&self, kind: TaskKind) -> Result<Vec<Task>> {
        Ok(self.lock()?.list(kind))
    }

    pub fn get(&self, id: TaskId, kind: Option<TaskKind>) -> Result<Option<Task>> {
        Ok(self.lock()?.get(id, kind))
    }

    pub fn create(&self, task: Task) -> Result<TaskId> {
        self.lock()?.create(task)
    }

    pub fn update(&self, id: TaskId, task: Task) -> Result<()> {
        self.lock()?.update(id, task)
    }

    pub fn delete(&self, id: TaskId, kind: Option<TaskKind>) -> Result<()> {
        self.lock()?.delete(id, kind)
    }

    pub fn clear(&self, kind: TaskKind) -> Result<()> {
        self.lock()?.clear(kind);
        Ok(())
    }

    pub fn subtasks_of(&self, epic_id: TaskId) -> Result<Vec<Task>> {
        Ok(self.lock()?.subtasks_of(epic_id))
    }

    pub fn history(&self) -> Result<Vec<Task>> {
        Ok(self.lock()?.history())
    }

    pub fn prioritized(&self) -> Result<Vec<Task>> {
        Ok(self.lock()?.prioritized())
    }

    fn lock(&self) -> Result<MutexGuard<'_, TaskStore>> {
        self.inner
            .lock()
            .map_err(|_| Error::OperationFailed("task store lock poisoned".to_string()))
    }
}
