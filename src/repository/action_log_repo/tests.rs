use super::ActionLogRepository;
use crate::domain::action_log::{ActionLog, ActionType};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use rusqlite::Connection;
use serde_json::json;
use std::sync::{Arc, Mutex};

fn setup_test_db() -> Arc<Mutex<Connection>> {
    let conn = Connection::open_in_memory().unwrap();
    crate::db::configure_sqlite_connection(&conn).unwrap();
    crate::db::init_schema(&conn).unwrap();
    Arc::new(Mutex::new(conn))
}

fn ts(minutes: i64) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 4, 1)
        .unwrap()
        .and_hms_opt(9, 0, 0)
        .unwrap()
        + Duration::minutes(minutes)
}

fn make_test_log(action_id: &str, pool_id: &str, enrollment_id: Option<&str>, minutes: i64) -> ActionLog {
    ActionLog {
        action_id: action_id.to_string(),
        pool_id: pool_id.to_string(),
        enrollment_id: enrollment_id.map(|s| s.to_string()),
        action_type: ActionType::Submit.as_str().to_string(),
        action_ts: ts(minutes),
        actor: "staff-1".to_string(),
        payload_json: Some(json!({ "slot_code": "A01" })),
        detail: Some("Test log".to_string()),
    }
}

#[test]
fn test_insert_and_find_by_id() {
    let repo = ActionLogRepository::new(setup_test_db());

    let log = make_test_log("log1", "FAIR-1", Some("e1"), 0);
    assert_eq!(repo.insert(&log).unwrap(), "log1");

    let found = repo.find_by_id("log1").unwrap().unwrap();
    assert_eq!(found.pool_id, "FAIR-1");
    assert_eq!(found.enrollment_id.as_deref(), Some("e1"));
    assert_eq!(found.payload_json, Some(json!({ "slot_code": "A01" })));
    assert_eq!(found.action_ts, ts(0));
    assert!(repo.find_by_id("missing").unwrap().is_none());
}

#[test]
fn test_list_by_pool_and_enrollment() {
    let repo = ActionLogRepository::new(setup_test_db());

    repo.insert(&make_test_log("log1", "FAIR-1", Some("e1"), 0)).unwrap();
    repo.insert(&make_test_log("log2", "FAIR-1", Some("e2"), 1)).unwrap();
    repo.insert(&make_test_log("log3", "FAIR-2", Some("e1"), 2)).unwrap();

    let pool_logs = repo.list_by_pool("FAIR-1").unwrap();
    assert_eq!(pool_logs.len(), 2);
    assert_eq!(pool_logs[0].action_id, "log1");

    let enrollment_logs = repo.list_by_enrollment("e1").unwrap();
    assert_eq!(enrollment_logs.len(), 2);
}

#[test]
fn test_list_recent_orders_newest_first() {
    let repo = ActionLogRepository::new(setup_test_db());

    for i in 0..5 {
        repo.insert(&make_test_log(&format!("log{}", i), "ACT-1", None, i))
            .unwrap();
    }

    let recent = repo.list_recent(3).unwrap();
    assert_eq!(recent.len(), 3);
    assert_eq!(recent[0].action_id, "log4");
    assert_eq!(recent[2].action_id, "log2");
}
