//! Recently viewed entities.
//!
//! Entries live in an arena of slots linked into a doubly linked list by
//! index, with a side map from task id to slot. Recording, evicting and
//! moving an entry to the most recent end are all O(1), and a re-accessed
//! entry keeps its slot.

use std::collections::HashMap;

use crate::model::{Task, TaskId};

#[derive(Debug, Clone)]
struct Entry {
    task: Task,
    prev: Option<usize>,
    next: Option<usize>,
}

/// Access-ordered, deduplicated record of viewed tasks.
///
/// Unbounded by default. With a limit, recording a new id beyond the limit
/// drops the least recently accessed entry.
#[derive(Debug, Clone, Default)]
pub struct HistoryTracker {
    slots: Vec<Option<Entry>>,
    free: Vec<usize>,
    index: HashMap<TaskId, usize>,
    head: Option<usize>,
    tail: Option<usize>,
    limit: Option<usize>,
}

impl HistoryTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tracker that keeps at most `limit` entries; `None` is unbounded.
    pub fn with_limit(limit: Option<usize>) -> Self {
        Self {
            limit,
            ..Self::default()
        }
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn contains(&self, id: TaskId) -> bool {
        self.index.contains_key(&id)
    }

    /// Marks `task` as the most recently accessed entry.
    pub fn record(&mut self, task: &Task) {
        if let Some(&slot) = self.index.get(&task.id()) {
            self.unlink(slot);
            if let Some(entry) = self.entry_mut(slot) {
                entry.task = task.clone();
            }
            self.push_back(slot);
            return;
        }

        let entry = Entry {
            task: task.clone(),
            prev: None,
            next: None,
        };
        let slot = match self.free.pop() {
            Some(slot) => {
                self.slots[slot] = Some(entry);
                slot
            }
            None => {
                self.slots.push(Some(entry));
                self.slots.len() - 1
            }
        };
        self.index.insert(task.id(), slot);
        self.push_back(slot);

        if let Some(limit) = self.limit {
            while self.index.len() > limit {
                let Some(oldest) = self.head_id() else {
                    break;
                };
                self.evict(oldest);
            }
        }
    }

    /// Replaces the stored copy of `task` without changing its position.
    ///
    /// Returns false when the task is not in the history.
    pub fn refresh(&mut self, task: &Task) -> bool {
        let Some(&slot) = self.index.get(&task.id()) else {
            return false;
        };
        match self.entry_mut(slot) {
            Some(entry) => {
                entry.task = task.clone();
                true
            }
            None => false,
        }
    }

    /// Drops the entry for `id`. Returns false when it was not present.
    pub fn evict(&mut self, id: TaskId) -> bool {
        let Some(slot) = self.index.remove(&id) else {
            return false;
        };
        self.unlink(slot);
        self.slots[slot] = None;
        self.free.push(slot);
        true
    }

    /// Copies of the entries, least recently accessed first.
    pub fn snapshot(&self) -> Vec<Task> {
        let mut tasks = Vec::with_capacity(self.len());
        let mut cursor = self.head;
        while let Some(slot) = cursor {
            let Some(entry) = self.slots.get(slot).and_then(Option::as_ref) else {
                break;
            };
            tasks.push(entry.task.clone());
            cursor = entry.next;
        }
        tasks
    }

    fn head_id(&self) -> Option<TaskId> {
        let slot = self.head?;
        self.slots
            .get(slot)
            .and_then(Option::as_ref)
            .map(|entry| entry.task.id())
    }

    fn entry_mut(&mut self, slot: usize) -> Option<&mut Entry> {
        self.slots.get_mut(slot).and_then(Option::as_mut)
    }

    fn unlink(&mut self, slot: usize) {
        let (prev, next) = match self.entry_mut(slot) {
            Some(entry) => (entry.prev.take(), entry.next.take()),
            None => return,
        };
        match prev {
            Some(prev) => {
                if let Some(entry) = self.entry_mut(prev) {
                    entry.next = next;
                }
            }
            None => self.head = next,
        }
        match next {
            Some(next) => {
                if let Some(entry) = self.entry_mut(next) {
                    entry.prev = prev;
                }
            }
            None => self.tail = prev,
        }
    }

    fn push_back(&mut self, slot: usize) {
        let tail = self.tail;
        if let Some(entry) = self.entry_mut(slot) {
            entry.prev = tail;
            entry.next = None;
        }
        match tail {
            Some(tail) => {
                if let Some(entry) = self.entry_mut(tail) {
                    entry.next = Some(slot);
                }
            }
            None => self.head = Some(slot),
        }
        self.tail = Some(slot);
    }
}
