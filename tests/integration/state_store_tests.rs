use chrono::NaiveDate;
use progro_app_lib::db::repositories::slot_repository::SlotRepository;
use progro_app_lib::db::DbPool;
use progro_app_lib::models::concept::ConceptRecord;
use progro_app_lib::models::habit::HabitRecord;
use progro_app_lib::models::task::TaskRecord;
use progro_app_lib::services::store_service::{
    StateStore, CONCEPTS_SLOT, HABITS_SLOT, TASKS_SLOT,
};
use progro_app_lib::services::task_service::TaskService;
use tempfile::tempdir;

fn setup() -> (DbPool, StateStore, tempfile::TempDir) {
    let dir = tempdir().expect("temp dir");
    let pool = DbPool::new(dir.path().join("progro.sqlite")).expect("db pool");
    (pool.clone(), StateStore::new(pool), dir)
}

#[test]
fn task_collection_round_trips_with_order_and_fields() {
    let (_pool, store, _dir) = setup();

    let tasks = vec![
        TaskRecord {
            id: "2-b".to_string(),
            text: "后加入的任务".to_string(),
            is_complete: false,
            is_proactive_done: true,
            created_at: 1_754_000_000_200,
        },
        TaskRecord {
            id: "1-a".to_string(),
            text: "先加入的任务".to_string(),
            is_complete: true,
            is_proactive_done: false,
            created_at: 1_754_000_000_100,
        },
    ];

    store.write(TASKS_SLOT, &tasks);
    let read: Vec<TaskRecord> = store.read(TASKS_SLOT, Vec::new());
    assert_eq!(read, tasks);
}

#[test]
fn concept_collection_round_trips() {
    let (_pool, store, _dir) = setup();

    let concepts = vec![ConceptRecord {
        id: "3-c".to_string(),
        topic: "光合作用".to_string(),
        confidence_score: 8,
        created_at: 1_754_000_000_300,
        ai_feedback: Some("讲得很有条理".to_string()),
    }];

    store.write(CONCEPTS_SLOT, &concepts);
    let read: Vec<ConceptRecord> = store.read(CONCEPTS_SLOT, Vec::new());
    assert_eq!(read, concepts);
}

#[test]
fn habit_collection_round_trips_with_iso_dates() {
    let (pool, store, _dir) = setup();

    let date: NaiveDate = "2026-08-08".parse().expect("iso date");
    let habits = vec![HabitRecord {
        id: "4-d".to_string(),
        name: "晨跑".to_string(),
        last_completed_date: Some(date),
        streak: 12,
        created_at: 1_754_000_000_400,
    }];

    store.write(HABITS_SLOT, &habits);
    let read: Vec<HabitRecord> = store.read(HABITS_SLOT, Vec::new());
    assert_eq!(read, habits);

    // The stored form is the plain ISO calendar date.
    let raw = pool
        .with_connection(|conn| SlotRepository::get(conn, HABITS_SLOT))
        .expect("slot read")
        .expect("slot present");
    assert!(raw.value.contains("\"2026-08-08\""));
}

#[test]
fn corrupt_slot_yields_an_empty_collection_on_load() {
    let (pool, store, _dir) = setup();

    store.write(TASKS_SLOT, &vec!["not-a-task".to_string()]);
    pool.with_connection(|conn| SlotRepository::upsert(conn, TASKS_SLOT, "{corrupt"))
        .expect("corrupt the slot");

    let service = TaskService::new(store);
    assert!(service.list().is_empty());
}
