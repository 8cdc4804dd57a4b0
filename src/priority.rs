//! Start-time ordered index over scheduled tasks and subtasks.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDateTime;

use crate::model::{overlaps, Task, TaskId};

/// Scheduled entities keyed by `(start, id)`.
///
/// Epics and entities without a start time never occupy a slot.
#[derive(Debug, Clone, Default)]
pub struct PriorityIndex {
    entries: BTreeMap<(NaiveDateTime, TaskId), Task>,
    starts: HashMap<TaskId, NaiveDateTime>,
}

impl PriorityIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: TaskId) -> bool {
        self.starts.contains_key(&id)
    }

    /// Inserts or replaces the entry for `task`.
    ///
    /// A task that lost its start time, or is an epic, ends up absent.
    pub fn insert(&mut self, task: &Task) {
        self.remove(task.id());
        if !task.is_schedulable() {
            return;
        }
        if let Some(start) = task.start_time() {
            self.entries.insert((start, task.id()), task.clone());
            self.starts.insert(task.id(), start);
        }
    }

    pub fn remove(&mut self, id: TaskId) -> Option<Task> {
        let start = self.starts.remove(&id)?;
        self.entries.remove(&(start, id))
    }

    /// Whether `candidate` overlaps any stored entry other than itself.
    pub fn would_conflict(&self, candidate: &Task) -> bool {
        self.find_conflict(candidate).is_some()
    }

    /// Id of the earliest stored entry overlapping `candidate`.
    ///
    /// Entries sharing the candidate's id are skipped, so an update is never
    /// in conflict with its own previous version.
    pub fn find_conflict(&self, candidate: &Task) -> Option<TaskId> {
        let start = candidate.start_time()?;
        if self.entries.is_empty() {
            return None;
        }
        let end = candidate.end_time().unwrap_or(start);
        // Nothing starting after the candidate's end can intersect it.
        self.entries
            .range(..=(end, TaskId::MAX))
            .map(|(_, task)| task)
            .find(|task| task.id() != candidate.id() && overlaps(candidate, task))
            .map(Task::id)
    }

    /// Copies of the entries by ascending start time.
    pub fn snapshot(&self) -> Vec<Task> {
        self.entries.values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, day)
            .and_then(|date| date.and_hms_opt(hour, 0, 0))
            .expect("valid timestamp")
    }

    fn scheduled(id: TaskId, start: NaiveDateTime, hours: i64) -> Task {
        let mut task = Task::new(format!("task {id}"), "")
            .scheduled(start, Duration::hours(hours))
            .expect("schedule");
        task.assign_id(id);
        task
    }

    #[test]
    fn snapshot_is_ordered_by_start() {
        let mut index = PriorityIndex::new();
        index.insert(&scheduled(1, at(10, 0), 1));
        index.insert(&scheduled(2, at(1, 0), 1));
        index.insert(&scheduled(3, at(7, 0), 1));
        index.insert(&scheduled(4, at(3, 0), 1));

        let ids: Vec<TaskId> = index.snapshot().iter().map(Task::id).collect();
        assert_eq!(ids, vec![2, 4, 3, 1]);
    }

    #[test]
    fn unscheduled_and_epics_are_skipped() {
        let mut index = PriorityIndex::new();
        let mut plain = Task::new("plain", "");
        plain.assign_id(1);
        let mut epic = Task::epic("epic", "");
        epic.assign_id(2);

        index.insert(&plain);
        index.insert(&epic);
        assert!(index.is_empty());
        assert!(!index.would_conflict(&plain));
    }

    #[test]
    fn empty_index_never_conflicts() {
        let index = PriorityIndex::new();
        assert!(!index.would_conflict(&scheduled(1, at(1, 0), 2)));
    }

    #[test]
    fn detects_overlap_and_allows_touching() {
        let mut index = PriorityIndex::new();
        index.insert(&scheduled(1, at(1, 0), 2));

        assert_eq!(index.find_conflict(&scheduled(2, at(1, 1), 1)), Some(1));
        assert!(!index.would_conflict(&scheduled(3, at(1, 2), 1)));
        // Candidate that starts earlier and runs into the stored entry.
        assert!(index.would_conflict(&scheduled(4, at(1, 0) - Duration::hours(1), 2)));
    }

    #[test]
    fn own_entry_is_not_a_conflict() {
        let mut index = PriorityIndex::new();
        index.insert(&scheduled(1, at(1, 0), 2));
        assert!(!index.would_conflict(&scheduled(1, at(1, 1), 2)));
    }

    #[test]
    fn reinsert_moves_entry() {
        let mut index = PriorityIndex::new();
        index.insert(&scheduled(1, at(1, 0), 1));
        index.insert(&scheduled(1, at(5, 0), 1));
        assert_eq!(index.len(), 1);
        assert_eq!(index.snapshot()[0].start_time(), Some(at(5, 0)));

        let mut cleared = scheduled(1, at(5, 0), 1);
        cleared.set_start_time(None).expect("clear start");
        index.insert(&cleared);
        assert!(!index.contains(1));
    }

    #[test]
    fn remove_by_id() {
        let mut index = PriorityIndex::new();
        index.insert(&scheduled(1, at(1, 0), 1));
        assert_eq!(index.remove(1).map(|task| task.id()), Some(1));
        assert!(index.remove(1).is_none());
        assert!(index.is_empty());
    }
}
