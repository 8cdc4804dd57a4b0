//! File-backed task store.
//!
//! Wraps a [`TaskStore`] and rewrites the save file after every successful
//! mutation. The file is written atomically under `<file>.lock`; see
//! [`crate::csv`] for the record layout.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::config::Config;
use crate::csv;
use crate::error::{Error, Result};
use crate::lock;
use crate::model::{Task, TaskId, TaskKind};
use crate::store::TaskStore;

#[derive(Debug, Clone)]
pub struct FileBackedStore {
    store: TaskStore,
    path: PathBuf,
    lock_timeout_ms: u64,
}

impl FileBackedStore {
    /// Empty store saving to `path`. Nothing is written until a mutation.
    pub fn new(path: impl Into<PathBuf>, config: &Config) -> Self {
        Self {
            store: TaskStore::with_history_limit(config.history.limit),
            path: path.into(),
            lock_timeout_ms: config.storage.lock_timeout_ms,
        }
    }

    /// Loads `path` if it exists, otherwise starts empty.
    pub fn open(path: impl Into<PathBuf>, config: &Config) -> Result<Self> {
        let path = path.into();
        if path.exists() {
            Self::load(path, config)
        } else {
            Ok(Self::new(path, config))
        }
    }

    /// Reads a save file into a fresh store.
    ///
    /// Every line is parsed before any entity is restored, and a rule
    /// violation while restoring discards the whole store.
    pub fn load(path: impl Into<PathBuf>, config: &Config) -> Result<Self> {
        let mut loaded = Self::new(path, config);
        let content = lock::read_locked_str(&loaded.path, loaded.lock_timeout_ms)?;
        let records = csv::parse_document(&content)?;

        for (offset, task) in records.into_iter().enumerate() {
            let id = task.id();
            loaded.store.restore(task).map_err(|err| Error::InvalidRecord {
                line: record_line(&content, offset),
                reason: format!("task {id}: {err}"),
            })?;
        }
        info!(
            path = %loaded.path.display(),
            tasks = loaded.store.count(TaskKind::Task),
            epics = loaded.store.count(TaskKind::Epic),
            subtasks = loaded.store.count(TaskKind::Subtask),
            "loaded save file"
        );
        Ok(loaded)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn store(&self) -> &TaskStore {
        &self.store
    }

    /// Writes the whole store to the save file.
    pub fn save(&self) -> Result<()> {
        let content = csv::render(&self.store)?;
        lock::write_atomic_locked(&self.path, content.as_bytes(), self.lock_timeout_ms)?;
        debug!(path = %self.path.display(), "saved tasks");
        Ok(())
    }

    pub fn list(&self, kind: TaskKind) -> Vec<Task> {
        self.store.list(kind)
    }

    pub fn get(&mut self, id: TaskId, kind: Option<TaskKind>) -> Option<Task> {
        self.store.get(id, kind)
    }

    pub fn create(&mut self, task: Task) -> Result<TaskId> {
        self.commit(|store| store.create(task))
    }

    pub fn update(&mut self, id: TaskId, task: Task) -> Result<()> {
        self.commit(|store| store.update(id, task))
    }

    pub fn delete(&mut self, id: TaskId, kind: Option<TaskKind>) -> Result<()> {
        self.commit(|store| store.delete(id, kind))
    }

    pub fn clear(&mut self, kind: TaskKind) -> Result<()> {
        self.commit(|store| {
            store.clear(kind);
            Ok(())
        })
    }

    /// Applies `change` and saves; a failed save restores the previous store.
    fn commit<T>(&mut self, change: impl FnOnce(&mut TaskStore) -> Result<T>) -> Result<T> {
        let previous = self.store.clone();
        let value = change(&mut self.store)?;
        if let Err(err) = self.save() {
            warn!(path = %self.path.display(), error = %err, "save failed, change discarded");
            self.store = previous;
            return Err(err);
        }
        Ok(value)
    }

    pub fn subtasks_of(&self, epic_id: TaskId) -> Vec<Task> {
        self.store.subtasks_of(epic_id)
    }

    pub fn history(&self) -> Vec<Task> {
        self.store.history()
    }

    pub fn prioritized(&self) -> Vec<Task> {
        self.store.prioritized()
    }
}

/// 1-based line of the `offset`-th non-blank record after the header.
fn record_line(content: &str, offset: usize) -> usize {
    content
        .lines()
        .enumerate()
        .skip(1)
        .filter(|(_, line)| !line.trim().is_empty())
        .nth(offset)
        .map(|(idx, _)| idx + 1)
        .unwrap_or(0)
}
