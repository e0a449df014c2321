use chrono::NaiveDate;
use progro_app_lib::app::proactivity::ProactivityTab;
use progro_app_lib::app::study::StudyTab;
use progro_app_lib::app::AppState;
use progro_app_lib::db::DbPool;
use progro_app_lib::models::suggestion::{ActionStep, StudyFeedback};
use tempfile::tempdir;

fn setup_state() -> (AppState, std::path::PathBuf, tempfile::TempDir) {
    let dir = tempdir().expect("temp dir");
    let db_path = dir.path().join("progro.sqlite");
    let pool = DbPool::new(db_path.clone()).expect("db pool");
    let state = AppState::new(pool).expect("app state");
    (state, db_path, dir)
}

fn step(number: u32, title: &str) -> ActionStep {
    ActionStep {
        step_number: number,
        title: title.to_string(),
        description: String::new(),
        estimated_time: "5 min".to_string(),
        is_completed: false,
    }
}

#[test]
fn collections_survive_a_restart() {
    let (state, db_path, _dir) = setup_state();

    state.tasks().add("写周报").expect("add task");
    state
        .concepts()
        .add("光合作用", 8, Some("讲得不错".to_string()))
        .expect("add concept");
    let habit = state.habits().add("晨跑").expect("add habit");
    state
        .habits()
        .complete_on(&habit.id, "2026-08-08".parse::<NaiveDate>().unwrap());

    drop(state);

    let pool = DbPool::new(db_path).expect("reopen db");
    let reopened = AppState::new(pool).expect("reopened state");

    let tasks = reopened.tasks().list();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].text, "写周报");

    let concepts = reopened.concepts().list();
    assert_eq!(concepts.len(), 1);
    assert_eq!(concepts[0].confidence_score, 8);
    assert_eq!(concepts[0].ai_feedback.as_deref(), Some("讲得不错"));

    let habits = reopened.habits().list();
    assert_eq!(habits.len(), 1);
    assert_eq!(habits[0].streak, 1);
    assert_eq!(
        habits[0].last_completed_date,
        Some("2026-08-08".parse::<NaiveDate>().unwrap())
    );
}

#[test]
fn complete_then_reopen_resets_flags_across_restart() {
    let (state, db_path, _dir) = setup_state();

    let tasks = state.tasks();
    let task = tasks.add("报税").expect("add");
    tasks.toggle_proactive(&task.id);
    tasks.complete(&task.id);
    tasks.reopen(&task.id);
    drop(state);

    let pool = DbPool::new(db_path).expect("reopen db");
    let reopened = AppState::new(pool).expect("reopened state");
    let stored = &reopened.tasks().list()[0];
    assert!(!stored.is_complete);
    assert!(!stored.is_proactive_done);
}

#[test]
fn accepting_a_whole_plan_keeps_step_order_in_the_display() {
    let (state, _db_path, _dir) = setup_state();
    let tasks = state.tasks();

    let mut tab = ProactivityTab::new();
    tab.set_input("finish tax filing");
    let goal = tab.begin_breakdown().expect("begin");
    tab.finish_breakdown(
        &goal,
        Ok(vec![
            step(1, "收集凭证"),
            step(2, "填写申报表"),
            step(3, "核对扣除项"),
            step(4, "提交申报"),
        ]),
    )
    .expect("finish");

    let added = tab.accept_all(&tasks).expect("accept all");
    assert_eq!(added, 4);

    // Newest-first storage puts the last-accepted step at the head.
    let stored: Vec<String> = tasks.list().into_iter().map(|t| t.text).collect();
    assert_eq!(
        stored,
        vec!["提交申报", "核对扣除项", "填写申报表", "收集凭证"]
    );

    // The display partition mirrors storage order while everything is open.
    let displayed: Vec<String> = tasks.incomplete().into_iter().map(|t| t.text).collect();
    assert_eq!(displayed.len(), 4);
    assert_eq!(displayed[0], "提交申报");
}

#[test]
fn study_flow_folds_feedback_into_the_recorded_concept() {
    let (state, _db_path, _dir) = setup_state();
    let concepts = state.concepts();

    let mut tab = StudyTab::new();
    tab.topic = "photosynthesis".to_string();
    tab.explanation = "plants turn light into sugar".to_string();
    tab.begin_evaluation().expect("begin");
    tab.finish_evaluation(Ok(StudyFeedback {
        score: 55,
        understanding_level: "一般".to_string(),
        missing_concepts: vec!["暗反应".to_string()],
        better_explanation: "补充暗反应".to_string(),
        encouragement: "方向对了".to_string(),
    }))
    .expect("finish");

    assert_eq!(tab.confidence, 5);

    let record = tab.record(&concepts).expect("record");
    assert_eq!(record.confidence_score, 5);
    assert_eq!(record.ai_feedback.as_deref(), Some("方向对了"));
    assert_eq!(concepts.list().len(), 1);
}

#[test]
fn suggestion_service_is_unconfigured_without_an_api_key() {
    let (state, _db_path, _dir) = setup_state();
    // No PROGRO_GEMINI_API_KEY in the test environment.
    assert!(!state.suggestions().is_configured());
}
