//! Integration tests for the event store

use chrono::Utc;
use fleet_telemetry::store::EventStore;
use fleet_telemetry::Event;

mod common;

fn event(event_id: &str, defect_count: i32, version: i64) -> Event {
    let now = Utc::now();
    Event {
        event_id: event_id.to_string(),
        machine_id: "M1".to_string(),
        factory_id: "F1".to_string(),
        event_time: now,
        received_time: now,
        duration_ms: 500,
        defect_count,
        version,
    }
}

#[tokio::test]
async fn save_all_inserts_new_events() {
    let pool = common::setup_test_db().await;
    let store = EventStore::new(pool);

    let outcome = store.save_all(&[event("E1", 1, 0), event("E2", 2, 0)]).await.unwrap();
    assert_eq!(outcome.succeeded.len(), 2);
    assert!(outcome.conflicted.is_empty());

    let found = store.find_by_id("E1").await.unwrap().unwrap();
    assert_eq!(found.version, 0);
    assert_eq!(found.defect_count, 1);
}

#[tokio::test]
async fn save_all_bumps_version_on_matching_update() {
    let pool = common::setup_test_db().await;
    let store = EventStore::new(pool);

    store.save_all(&[event("E1", 1, 0)]).await.unwrap();

    let update = event("E1", 5, 0);
    let outcome = store.save_all(&[update]).await.unwrap();
    assert_eq!(outcome.succeeded, vec!["E1".to_string()]);

    let found = store.find_by_id("E1").await.unwrap().unwrap();
    assert_eq!(found.version, 1);
    assert_eq!(found.defect_count, 5);
}

#[tokio::test]
async fn save_all_reports_conflict_on_stale_version() {
    let pool = common::setup_test_db().await;
    let store = EventStore::new(pool);

    store.save_all(&[event("E1", 1, 0)]).await.unwrap();
    store.save_all(&[event("E1", 5, 0)]).await.unwrap(); // now at version 1

    let stale_update = event("E1", 9, 0); // still expects version 0
    let outcome = store.save_all(&[stale_update]).await.unwrap();
    assert!(outcome.succeeded.is_empty());
    assert_eq!(outcome.conflicted, vec!["E1".to_string()]);

    let found = store.find_by_id("E1").await.unwrap().unwrap();
    assert_eq!(found.defect_count, 5, "stale write must not have applied");
}

#[tokio::test]
async fn save_one_reports_the_actual_current_version_on_conflict() {
    let pool = common::setup_test_db().await;
    let store = EventStore::new(pool);

    store.save_one(&event("E1", 1, 0)).await.unwrap();

    let err = store.save_one(&event("E1", 2, 5)).await.unwrap_err();
    assert!(err.is_version_conflict());
    match err {
        fleet_telemetry::store::StoreError::VersionConflict { expected, actual, .. } => {
            assert_eq!(expected, 5);
            assert_eq!(actual, 0);
        }
        _ => panic!("expected VersionConflict"),
    }
}

#[tokio::test]
async fn find_by_machine_and_range_filters_by_event_time() {
    let pool = common::setup_test_db().await;
    let store = EventStore::new(pool);

    let now = Utc::now();
    let mut inside = event("E1", 1, 0);
    inside.event_time = now;
    let mut outside = event("E2", 1, 0);
    outside.event_time = now - chrono::Duration::days(10);

    store.save_all(&[inside, outside]).await.unwrap();

    let found = store
        .find_by_machine_and_range("M1", now - chrono::Duration::hours(1), now + chrono::Duration::hours(1))
        .await
        .unwrap();

    assert_eq!(found.len(), 1);
    assert_eq!(found[0].event_id, "E1");
}

#[tokio::test]
async fn top_defect_lines_excludes_unknown_defect_counts_from_the_sum() {
    use fleet_telemetry::store::GroupBy;

    let pool = common::setup_test_db().await;
    let store = EventStore::new(pool);

    let now = Utc::now();
    let mut known = event("E1", 5, 0);
    known.machine_id = "M-X".to_string();
    known.event_time = now;
    let mut unknown = event("E2", -1, 0);
    unknown.machine_id = "M-X".to_string();
    unknown.event_time = now;

    store.save_all(&[known, unknown]).await.unwrap();

    let lines = store
        .top_defect_lines(now - chrono::Duration::hours(1), now + chrono::Duration::hours(1), GroupBy::MachineId)
        .await
        .unwrap();

    let line = lines.iter().find(|l| l.key == "M-X").unwrap();
    assert_eq!(line.total_defects, 5, "unknown defect count must not count toward the sum");
    assert_eq!(line.event_count, 2, "event_count still counts every row in the group");
}

#[tokio::test]
async fn sum_known_defects_ignores_unknown_rows() {
    let pool = common::setup_test_db().await;
    let store = EventStore::new(pool);

    store
        .save_all(&[event("E1", 7, 0), event("E2", -1, 0)])
        .await
        .unwrap();

    let total = store.sum_known_defects().await.unwrap();
    assert_eq!(total, 7);
}
