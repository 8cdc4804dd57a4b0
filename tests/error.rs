use std::path::PathBuf;

use kanban::error::{exit_codes, Error, JsonError};

#[test]
fn exit_codes_map_correctly() {
    let user = Error::InvalidArgument("bad".to_string());
    assert_eq!(user.exit_code(), exit_codes::USER_ERROR);

    let missing = Error::NotFound(4);
    assert_eq!(missing.exit_code(), exit_codes::USER_ERROR);

    let overlap = Error::Intersect {
        id: Some(2),
        conflicting: 1,
    };
    assert_eq!(overlap.exit_code(), exit_codes::REJECTED);
    assert_eq!(Error::AbsentEpic(9).exit_code(), exit_codes::REJECTED);

    let op = Error::LockFailed(PathBuf::from("tasks.csv.lock"));
    assert_eq!(op.exit_code(), exit_codes::OPERATION_FAILED);
}

#[test]
fn intersect_message_names_both_sides() {
    let stored = Error::Intersect {
        id: Some(2),
        conflicting: 1,
    };
    assert_eq!(
        stored.to_string(),
        "Task 2 overlaps the schedule of task 1"
    );

    let new = Error::Intersect {
        id: None,
        conflicting: 1,
    };
    assert_eq!(new.to_string(), "Task overlaps the schedule of task 1");
}

#[test]
fn json_error_includes_code_and_details() {
    let err = Error::AbsentEpic(7);
    let json = JsonError::from(&err);
    assert_eq!(json.code, exit_codes::REJECTED);
    assert!(json.error.contains("Epic not found"));
    assert_eq!(
        json.details,
        Some(serde_json::json!({ "epic_id": 7 }))
    );

    let plain = JsonError::from(&Error::OperationFailed("boom".to_string()));
    assert!(plain.details.is_none());
    let rendered = serde_json::to_value(&plain).expect("serialize");
    assert!(rendered.get("details").is_none());
}

#[test]
fn record_errors_carry_line() {
    let err = Error::InvalidRecord {
        line: 3,
        reason: "invalid id 'x'".to_string(),
    };
    assert_eq!(err.to_string(), "Invalid record on line 3: invalid id 'x'");
    assert_eq!(
        err.details(),
        Some(serde_json::json!({ "line": 3, "reason": "invalid id 'x'" }))
    );
}
