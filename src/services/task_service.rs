use std::sync::RwLock;

use chrono::Utc;
use tracing::{debug, info};

use crate::error::{AppError, AppResult};
use crate::models::task::TaskRecord;
use crate::services::store_service::{StateStore, TASKS_SLOT};
use crate::utils::ident::new_entity_id;

/// The task collection: an ordered list, newest first, persisted as one JSON
/// array under a fixed slot. Every mutation is a pure transformation of the
/// prior list followed by a best-effort durable write.
pub struct TaskService {
    store: StateStore,
    tasks: RwLock<Vec<TaskRecord>>,
}

impl TaskService {
    pub fn new(store: StateStore) -> Self {
        let tasks: Vec<TaskRecord> = store.read(TASKS_SLOT, Vec::new());
        debug!(target: "app::tasks", count = tasks.len(), "task collection loaded");
        Self {
            store,
            tasks: RwLock::new(tasks),
        }
    }

    pub fn list(&self) -> Vec<TaskRecord> {
        self.tasks
            .read()
            .expect("task collection lock poisoned")
            .clone()
    }

    /// Incomplete tasks, most recently created first.
    pub fn incomplete(&self) -> Vec<TaskRecord> {
        let mut tasks: Vec<TaskRecord> =
            self.list().into_iter().filter(|t| !t.is_complete).collect();
        tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        tasks
    }

    /// Completed tasks, most recently created first.
    pub fn completed(&self) -> Vec<TaskRecord> {
        let mut tasks: Vec<TaskRecord> =
            self.list().into_iter().filter(|t| t.is_complete).collect();
        tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        tasks
    }

    pub fn add(&self, text: &str) -> AppResult<TaskRecord> {
        let text = normalize_text(text)?;
        let task = TaskRecord {
            id: new_entity_id(),
            text,
            is_complete: false,
            is_proactive_done: false,
            created_at: Utc::now().timestamp_millis(),
        };

        let inserted = task.clone();
        self.apply(move |mut tasks| {
            tasks.insert(0, task);
            tasks
        });
        info!(target: "app::tasks", task_id = %inserted.id, "task added");
        Ok(inserted)
    }

    /// No-op when the id is absent.
    pub fn remove(&self, id: &str) {
        self.apply(|tasks| tasks.into_iter().filter(|t| t.id != id).collect());
        info!(target: "app::tasks", task_id = %id, "task removed");
    }

    pub fn toggle_proactive(&self, id: &str) {
        self.update_by_id(id, |mut task| {
            task.is_proactive_done = !task.is_proactive_done;
            task
        });
        debug!(target: "app::tasks", task_id = %id, "proactive flag toggled");
    }

    /// Marks the task complete. The proactive flag is left untouched.
    pub fn complete(&self, id: &str) {
        self.update_by_id(id, |mut task| {
            task.is_complete = true;
            task
        });
        info!(target: "app::tasks", task_id = %id, "task completed");
    }

    /// Reopens a completed task, resetting both flags.
    pub fn reopen(&self, id: &str) {
        self.update_by_id(id, |mut task| {
            task.is_complete = false;
            task.is_proactive_done = false;
            task
        });
        info!(target: "app::tasks", task_id = %id, "task reopened");
    }

    fn update_by_id<F>(&self, id: &str, transform: F)
    where
        F: Fn(TaskRecord) -> TaskRecord,
    {
        self.apply(|tasks| {
            tasks
                .into_iter()
                .map(|task| if task.id == id { transform(task) } else { task })
                .collect()
        });
    }

    fn apply<F>(&self, transform: F)
    where
        F: FnOnce(Vec<TaskRecord>) -> Vec<TaskRecord>,
    {
        let mut guard = self.tasks.write().expect("task collection lock poisoned");
        let next = transform(guard.clone());
        self.store.write(TASKS_SLOT, &next);
        *guard = next;
    }
}

fn normalize_text(text: &str) -> AppResult<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(AppError::validation("任务内容不能为空"));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbPool;
    use tempfile::tempdir;

    fn setup_service() -> (TaskService, tempfile::TempDir) {
        let dir = tempdir().expect("temp dir");
        let pool = DbPool::new(dir.path().join("tasks.sqlite")).expect("db pool");
        (TaskService::new(StateStore::new(pool)), dir)
    }

    #[test]
    fn add_trims_and_prepends() {
        let (service, _dir) = setup_service();
        service.add("  first  ").expect("add first");
        service.add("second").expect("add second");

        let tasks = service.list();
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].text, "second");
        assert_eq!(tasks[1].text, "first");
        assert!(!tasks[0].is_complete);
        assert!(!tasks[0].is_proactive_done);
    }

    #[test]
    fn add_rejects_whitespace_only_text() {
        let (service, _dir) = setup_service();
        let result = service.add("   ");
        assert!(matches!(result, Err(AppError::Validation { .. })));
        assert!(service.list().is_empty());
    }

    #[test]
    fn complete_leaves_proactive_flag_untouched() {
        let (service, _dir) = setup_service();
        let task = service.add("写周报").expect("add");
        service.toggle_proactive(&task.id);
        service.complete(&task.id);

        let stored = &service.list()[0];
        assert!(stored.is_complete);
        assert!(stored.is_proactive_done);
    }

    #[test]
    fn reopen_resets_both_flags() {
        let (service, _dir) = setup_service();
        let task = service.add("报税").expect("add");
        service.toggle_proactive(&task.id);
        service.complete(&task.id);
        service.reopen(&task.id);

        let stored = &service.list()[0];
        assert!(!stored.is_complete);
        assert!(!stored.is_proactive_done);
    }

    #[test]
    fn remove_is_noop_for_unknown_id() {
        let (service, _dir) = setup_service();
        service.add("保留").expect("add");
        service.remove("no-such-id");
        assert_eq!(service.list().len(), 1);
    }

    #[test]
    fn display_partitions_split_by_completion() {
        let (service, _dir) = setup_service();
        let a = service.add("a").expect("add");
        let _b = service.add("b").expect("add");
        service.complete(&a.id);

        let incomplete = service.incomplete();
        let completed = service.completed();
        assert_eq!(incomplete.len(), 1);
        assert_eq!(incomplete[0].text, "b");
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].text, "a");
    }
}
