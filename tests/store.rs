use std::thread;

use chrono::{Duration, NaiveDate, NaiveDateTime};

use kanban::error::Error;
use kanban::model::{Task, TaskId, TaskKind, TaskStatus};
use kanban::store::{SharedStore, TaskStore};

fn at(day: u32, hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 1, day)
        .and_then(|date| date.and_hms_opt(hour, 0, 0))
        .expect("valid timestamp")
}

fn scheduled(name: &str, start: NaiveDateTime, minutes: i64) -> Task {
    Task::new(name, "")
        .scheduled(start, Duration::minutes(minutes))
        .expect("schedule")
}

fn ids(tasks: &[Task]) -> Vec<TaskId> {
    tasks.iter().map(Task::id).collect()
}

fn epic_of(store: &TaskStore, id: TaskId) -> Task {
    store
        .list(TaskKind::Epic)
        .into_iter()
        .find(|epic| epic.id() == id)
        .expect("epic present")
}

#[test]
fn ids_are_monotonic_across_kinds() {
    let mut store = TaskStore::new();
    let task = store.create(Task::new("a", "")).expect("task");
    let epic = store.create(Task::epic("b", "")).expect("epic");
    let subtask = store.create(Task::subtask("c", "", epic)).expect("subtask");
    assert_eq!((task, epic, subtask), (1, 2, 3));

    store.delete(subtask, None).expect("delete");
    let next = store.create(Task::new("d", "")).expect("task");
    assert_eq!(next, 4);
    assert_eq!(store.last_id(), 4);
}

#[test]
fn rejected_create_consumes_no_id() {
    let mut store = TaskStore::new();
    let err = store
        .create(Task::subtask("orphan", "", 99))
        .expect_err("no epic");
    assert!(matches!(err, Error::AbsentEpic(99)));
    assert_eq!(store.create(Task::new("a", "")).expect("task"), 1);
}

#[test]
fn epic_status_follows_subtasks() {
    let mut store = TaskStore::new();
    let epic = store.create(Task::epic("release", "")).expect("epic");
    assert_eq!(epic_of(&store, epic).status(), TaskStatus::New);

    let first = store.create(Task::subtask("one", "", epic)).expect("one");
    let second = store.create(Task::subtask("two", "", epic)).expect("two");
    assert_eq!(epic_of(&store, epic).status(), TaskStatus::New);

    let mut done = Task::subtask("one", "", epic);
    done.set_status(TaskStatus::Done).expect("status");
    store.update(first, done).expect("update");
    assert_eq!(epic_of(&store, epic).status(), TaskStatus::InProgress);

    let mut done = Task::subtask("two", "", epic);
    done.set_status(TaskStatus::Done).expect("status");
    store.update(second, done).expect("update");
    assert_eq!(epic_of(&store, epic).status(), TaskStatus::Done);

    store.delete(second, None).expect("delete");
    store.delete(first, None).expect("delete");
    assert_eq!(epic_of(&store, epic).status(), TaskStatus::New);
}

#[test]
fn epic_schedule_spans_subtasks() {
    let mut store = TaskStore::new();
    let epic = store.create(Task::epic("release", "")).expect("epic");
    store
        .create(
            Task::subtask("late", "", epic)
                .scheduled(at(3, 10), Duration::minutes(60))
                .expect("schedule"),
        )
        .expect("late");
    store
        .create(
            Task::subtask("early", "", epic)
                .scheduled(at(1, 9), Duration::minutes(30))
                .expect("schedule"),
        )
        .expect("early");

    let epic = epic_of(&store, epic);
    assert_eq!(epic.start_time(), Some(at(1, 9)));
    assert_eq!(epic.end_time(), Some(at(3, 11)));
    assert_eq!(epic.duration(), Some(Duration::minutes(90)));
}

#[test]
fn epic_links_stay_consistent() {
    let mut store = TaskStore::new();
    let first = store.create(Task::epic("first", "")).expect("epic");
    let second = store.create(Task::epic("second", "")).expect("epic");
    let subtask = store.create(Task::subtask("move me", "", first)).expect("subtask");

    assert_eq!(ids(&store.subtasks_of(first)), vec![subtask]);

    store
        .update(subtask, Task::subtask("move me", "", second))
        .expect("re-parent");
    assert!(store.subtasks_of(first).is_empty());
    assert_eq!(ids(&store.subtasks_of(second)), vec![subtask]);

    for epic in store.list(TaskKind::Epic) {
        for id in epic.subtask_ids().into_iter().flatten() {
            let sub = store
                .list(TaskKind::Subtask)
                .into_iter()
                .find(|task| task.id() == *id)
                .expect("subtask present");
            assert_eq!(sub.epic_id(), Some(epic.id()));
        }
    }
}

#[test]
fn re_parent_to_missing_epic_changes_nothing() {
    let mut store = TaskStore::new();
    let epic = store.create(Task::epic("epic", "")).expect("epic");
    let subtask = store.create(Task::subtask("sub", "", epic)).expect("subtask");

    let err = store
        .update(subtask, Task::subtask("renamed", "", 42))
        .expect_err("missing epic");
    assert!(matches!(err, Error::AbsentEpic(42)));

    let stored = store.list(TaskKind::Subtask);
    assert_eq!(stored[0].name(), "sub");
    assert_eq!(stored[0].epic_id(), Some(epic));
}

#[test]
fn deleting_epic_cascades_everywhere() {
    let mut store = TaskStore::new();
    let epic = store.create(Task::epic("epic", "")).expect("epic");
    let sub = store
        .create(
            Task::subtask("sub", "", epic)
                .scheduled(at(1, 9), Duration::minutes(60))
                .expect("schedule"),
        )
        .expect("subtask");
    let task = store.create(Task::new("keep", "")).expect("task");

    store.get(epic, None).expect("view epic");
    store.get(sub, None).expect("view sub");
    store.get(task, None).expect("view task");

    store.delete(epic, None).expect("delete");
    assert!(store.list(TaskKind::Subtask).is_empty());
    assert!(store.prioritized().is_empty());
    assert_eq!(ids(&store.history()), vec![task]);
}

#[test]
fn clearing_subtasks_resets_epics() {
    let mut store = TaskStore::new();
    let epic = store.create(Task::epic("epic", "")).expect("epic");
    let mut sub = Task::subtask("sub", "", epic)
        .scheduled(at(2, 8), Duration::minutes(15))
        .expect("schedule");
    sub.set_status(TaskStatus::Done).expect("status");
    store.create(sub).expect("subtask");
    assert_eq!(epic_of(&store, epic).status(), TaskStatus::Done);

    store.clear(TaskKind::Subtask);
    let epic = epic_of(&store, epic);
    assert_eq!(epic.status(), TaskStatus::New);
    assert!(epic.subtask_ids().is_some_and(|ids| ids.is_empty()));
    assert!(epic.start_time().is_none());
    assert!(store.prioritized().is_empty());
}

#[test]
fn clearing_epics_clears_subtasks() {
    let mut store = TaskStore::new();
    let epic = store.create(Task::epic("epic", "")).expect("epic");
    store.create(Task::subtask("sub", "", epic)).expect("subtask");
    store.create(Task::new("task", "")).expect("task");

    store.clear(TaskKind::Epic);
    assert_eq!(store.count(TaskKind::Epic), 0);
    assert_eq!(store.count(TaskKind::Subtask), 0);
    assert_eq!(store.count(TaskKind::Task), 1);
}

#[test]
fn history_deduplicates_views() {
    let mut store = TaskStore::new();
    for name in ["1", "2", "3", "4"] {
        store.create(Task::new(name, "")).expect("task");
    }
    for id in [1, 2, 3, 2, 4] {
        store.get(id, None).expect("view");
    }
    assert_eq!(ids(&store.history()), vec![1, 3, 2, 4]);

    store.delete(3, None).expect("delete");
    assert_eq!(ids(&store.history()), vec![1, 2, 4]);
}

#[test]
fn history_limit_evicts_oldest() {
    let mut store = TaskStore::with_history_limit(Some(2));
    for name in ["1", "2", "3"] {
        store.create(Task::new(name, "")).expect("task");
    }
    for id in [1, 2, 3] {
        store.get(id, None).expect("view");
    }
    assert_eq!(ids(&store.history()), vec![2, 3]);
}

#[test]
fn missed_lookup_is_not_recorded() {
    let mut store = TaskStore::new();
    let id = store.create(Task::new("a", "")).expect("task");
    assert!(store.get(id, Some(TaskKind::Epic)).is_none());
    assert!(store.get(99, None).is_none());
    assert!(store.history().is_empty());
}

#[test]
fn overlapping_schedules_are_rejected() {
    let mut store = TaskStore::new();
    store
        .create(scheduled("first", at(1, 0), 120))
        .expect("first");

    let err = store
        .create(scheduled("inside", at(1, 1), 60))
        .expect_err("overlap");
    assert!(matches!(
        err,
        Error::Intersect {
            id: None,
            conflicting: 1
        }
    ));

    let id = store
        .create(scheduled("after", at(1, 2), 60))
        .expect("touching end is free");
    assert_eq!(id, 2);
}

#[test]
fn schedule_past_date_range_never_reaches_store() {
    let mut store = TaskStore::new();
    store
        .create(scheduled("first", at(1, 0), 120))
        .expect("first");

    let err = Task::new("huge", "")
        .scheduled(at(1, 3), Duration::minutes(1_000_000_000_000))
        .expect_err("end out of range");
    assert!(matches!(err, Error::InvalidArgument(_)));

    let epic = store.create(Task::epic("release", "")).expect("epic");
    let sub = Task::subtask("tag", "", epic)
        .scheduled(at(2, 0), Duration::minutes(30))
        .expect("schedule");
    let sub = store.create(sub).expect("subtask");
    let mut copy = store.get(sub, Some(TaskKind::Subtask)).expect("stored");
    assert!(copy.set_duration(Some(Duration::minutes(1_000_000_000_000))).is_err());
    assert_eq!(copy.duration(), Some(Duration::minutes(30)));

    store.update(sub, copy).expect("unchanged update");
    assert_eq!(
        epic_of(&store, epic).end_time(),
        Some(at(2, 0) + Duration::minutes(30))
    );
}

#[test]
fn overlapping_update_leaves_store_unchanged() {
    let mut store = TaskStore::new();
    let first = store.create(scheduled("first", at(1, 9), 60)).expect("first");
    let second = store.create(scheduled("second", at(1, 12), 60)).expect("second");

    let err = store
        .update(second, scheduled("moved", at(1, 9), 30))
        .expect_err("overlap");
    assert!(matches!(
        err,
        Error::Intersect {
            id: Some(id),
            conflicting,
        } if id == second && conflicting == first
    ));

    let stored = store
        .list(TaskKind::Task)
        .into_iter()
        .find(|task| task.id() == second)
        .expect("second");
    assert_eq!(stored.name(), "second");
    assert_eq!(stored.start_time(), Some(at(1, 12)));
    assert_eq!(ids(&store.prioritized()), vec![first, second]);
}

#[test]
fn rescheduling_over_own_slot_is_allowed() {
    let mut store = TaskStore::new();
    let id = store.create(scheduled("task", at(1, 9), 60)).expect("task");
    store
        .update(id, scheduled("task", at(1, 9), 90))
        .expect("same slot");
    assert_eq!(store.prioritized()[0].duration(), Some(Duration::minutes(90)));
}

#[test]
fn prioritized_orders_by_start() {
    let mut store = TaskStore::new();
    let epic = store.create(Task::epic("epic", "")).expect("epic");
    let day10 = store.create(scheduled("10", at(10, 9), 30)).expect("task");
    let day3 = store
        .create(
            Task::subtask("3", "", epic)
                .scheduled(at(3, 9), Duration::minutes(30))
                .expect("schedule"),
        )
        .expect("subtask");
    let day7 = store.create(scheduled("7", at(7, 9), 30)).expect("task");
    let day1 = store.create(scheduled("1", at(1, 9), 30)).expect("task");
    store.create(Task::new("unscheduled", "")).expect("task");

    assert_eq!(ids(&store.prioritized()), vec![day1, day3, day7, day10]);
}

#[test]
fn returned_copies_are_isolated() {
    let mut store = TaskStore::new();
    let id = store.create(Task::new("original", "")).expect("task");

    let mut copy = store.get(id, None).expect("task");
    copy.set_name("changed");
    copy.set_status(TaskStatus::Done).expect("status");

    assert_eq!(store.list(TaskKind::Task)[0].name(), "original");
    assert_eq!(store.history()[0].name(), "original");
}

#[test]
fn history_sees_updates() {
    let mut store = TaskStore::new();
    let id = store.create(Task::new("draft", "")).expect("task");
    store.get(id, None).expect("view");
    store.update(id, Task::new("final", "")).expect("update");
    assert_eq!(store.history()[0].name(), "final");
}

#[test]
fn epic_update_keeps_derived_fields() {
    let mut store = TaskStore::new();
    let epic = store.create(Task::epic("epic", "")).expect("epic");
    let mut sub = Task::subtask("sub", "", epic);
    sub.set_status(TaskStatus::InProgress).expect("status");
    let sub = store.create(sub).expect("subtask");

    store
        .update(epic, Task::epic("renamed", "now described"))
        .expect("update");
    let epic = epic_of(&store, epic);
    assert_eq!(epic.name(), "renamed");
    assert_eq!(epic.description(), "now described");
    assert_eq!(epic.status(), TaskStatus::InProgress);
    assert!(epic.subtask_ids().is_some_and(|ids| ids.contains(&sub)));
}

#[test]
fn epic_fields_cannot_be_set_directly() {
    let mut epic = Task::epic("epic", "");
    assert!(matches!(
        epic.set_status(TaskStatus::Done),
        Err(Error::InvalidMutation(_))
    ));
    assert!(matches!(
        epic.set_start_time(Some(at(1, 9))),
        Err(Error::InvalidMutation(_))
    ));
    assert!(matches!(
        epic.set_duration(Some(Duration::minutes(5))),
        Err(Error::InvalidMutation(_))
    ));
}

#[test]
fn update_and_delete_of_unknown_id() {
    let mut store = TaskStore::new();
    assert!(matches!(
        store.update(7, Task::new("x", "")),
        Err(Error::NotFound(7))
    ));
    assert!(matches!(store.delete(7, None), Err(Error::NotFound(7))));

    let id = store.create(Task::new("task", "")).expect("task");
    assert!(matches!(
        store.update(id, Task::epic("wrong kind", "")),
        Err(Error::NotFound(_))
    ));
}

#[test]
fn shared_store_serializes_writers() {
    let shared = SharedStore::default();
    let handles: Vec<_> = (0..8)
        .map(|worker| {
            let shared = shared.clone();
            thread::spawn(move || {
                for n in 0..25 {
                    shared
                        .create(Task::new(format!("{worker}-{n}"), ""))
                        .expect("create");
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("join");
    }

    let tasks = shared.list(TaskKind::Task).expect("list");
    assert_eq!(tasks.len(), 200);
    let expected: Vec<TaskId> = (1..=200).collect();
    assert_eq!(ids(&tasks), expected);
}

#[test]
fn shared_store_keeps_one_history() {
    let shared = SharedStore::new(TaskStore::new());
    let id = shared.create(Task::new("a", "")).expect("create");

    let reader = shared.clone();
    thread::spawn(move || reader.get(id, None).expect("lock").expect("task"))
        .join()
        .expect("join");

    assert_eq!(ids(&shared.history().expect("history")), vec![id]);
}

#[test]
fn deleting_subtask_evicts_it_from_history() {
    let mut store = TaskStore::new();
    let epic = store.create(Task::epic("epic", "")).expect("epic");
    let sub = store.create(Task::subtask("sub", "", epic)).expect("subtask");
    let task = store.create(Task::new("task", "")).expect("task");
    for id in [epic, sub, task] {
        store.get(id, None).expect("view");
    }

    store.delete(sub, Some(TaskKind::Subtask)).expect("delete");
    assert_eq!(ids(&store.history()), vec![epic, task]);
    assert!(store.history()[0]
        .subtask_ids()
        .is_some_and(|ids| ids.is_empty()));
}
