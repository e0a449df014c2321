use tracing::debug;

use crate::error::{AppError, AppResult};
use crate::models::suggestion::ActionStep;
use crate::models::task::TaskRecord;
use crate::services::suggestion_service::SuggestionService;
use crate::services::task_service::TaskService;

use super::{UiError, UiResult};

/// Form and transient state for the proactivity tab.
#[derive(Default)]
pub struct ProactivityTab {
    pub input: String,
    pub confirm_reopen_id: Option<String>,
    pub is_generating: bool,
    pub show_suggestions: bool,
    pub suggested_steps: Vec<ActionStep>,
    pending_goal: Option<String>,
}

impl ProactivityTab {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_input(&mut self, value: impl Into<String>) {
        self.input = value.into();
    }

    /// Add a task from the current input and clear the field.
    pub fn submit(&mut self, tasks: &TaskService) -> UiResult<TaskRecord> {
        let record = tasks.add(&self.input)?;
        self.input.clear();
        Ok(record)
    }

    /// Validate the form and mark a breakdown request outstanding. Returns
    /// the goal the request is tagged with; re-submission while a request is
    /// outstanding is refused.
    pub fn begin_breakdown(&mut self) -> UiResult<String> {
        let goal = self.input.trim().to_string();
        if goal.is_empty() {
            return Err(UiError::from(AppError::validation("目标不能为空")));
        }
        if self.is_generating {
            return Err(UiError::from(AppError::validation(
                "上一个 AI 请求尚未完成",
            )));
        }

        self.is_generating = true;
        self.show_suggestions = true;
        self.pending_goal = Some(goal.clone());
        Ok(goal)
    }

    /// Apply the outcome of a breakdown request. A result tagged with a goal
    /// that no longer matches the current input is discarded as stale and
    /// `Ok(false)` is returned; on failure the form returns to its
    /// pre-submission state.
    pub fn finish_breakdown(
        &mut self,
        goal: &str,
        outcome: AppResult<Vec<ActionStep>>,
    ) -> UiResult<bool> {
        self.is_generating = false;

        let tagged = self.pending_goal.take();
        if tagged.as_deref() != Some(goal) || self.input.trim() != goal {
            debug!(target: "app::ui", goal, "stale breakdown result discarded");
            return Ok(false);
        }

        match outcome {
            Ok(steps) => {
                self.suggested_steps = steps;
                Ok(true)
            }
            Err(error) => {
                self.show_suggestions = false;
                self.suggested_steps.clear();
                Err(error.into())
            }
        }
    }

    pub async fn request_breakdown(
        &mut self,
        suggestions: &SuggestionService,
    ) -> UiResult<bool> {
        let goal = self.begin_breakdown()?;
        let outcome = suggestions.plan_actions(&goal).await;
        self.finish_breakdown(&goal, outcome)
    }

    /// Convert a single suggested step into a task.
    pub fn accept_step(&mut self, tasks: &TaskService, step_number: u32) -> UiResult<TaskRecord> {
        let step = self
            .suggested_steps
            .iter()
            .find(|step| step.step_number == step_number)
            .ok_or_else(|| UiError::from(AppError::validation("推荐步骤不存在")))?;

        Ok(tasks.add(&step.title)?)
    }

    /// Convert every suggested step, in list order, then reset the form.
    /// Adds prepend, so the last-accepted step ends up first in storage
    /// order; the display keeps that ordering.
    pub fn accept_all(&mut self, tasks: &TaskService) -> UiResult<usize> {
        let steps = std::mem::take(&mut self.suggested_steps);
        let mut added = 0;
        for step in &steps {
            tasks.add(&step.title)?;
            added += 1;
        }

        self.show_suggestions = false;
        self.input.clear();
        Ok(added)
    }

    /// Flip the local completion flag on a suggested step. Purely visual;
    /// nothing is persisted until a step is converted.
    pub fn toggle_step(&mut self, step_number: u32) {
        for step in &mut self.suggested_steps {
            if step.step_number == step_number {
                step.is_completed = !step.is_completed;
            }
        }
    }

    pub fn dismiss_suggestions(&mut self) {
        self.show_suggestions = false;
    }

    /// Tapping a completed task toggles its reopen confirmation.
    pub fn request_reopen(&mut self, id: &str) {
        if self.confirm_reopen_id.as_deref() == Some(id) {
            self.confirm_reopen_id = None;
        } else {
            self.confirm_reopen_id = Some(id.to_string());
        }
    }

    pub fn confirm_reopen(&mut self, tasks: &TaskService) {
        if let Some(id) = self.confirm_reopen_id.take() {
            tasks.reopen(&id);
        }
    }

    pub fn cancel_reopen(&mut self) {
        self.confirm_reopen_id = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbPool;
    use crate::services::store_service::StateStore;
    use tempfile::tempdir;

    fn setup_tasks() -> (TaskService, tempfile::TempDir) {
        let dir = tempdir().expect("temp dir");
        let pool = DbPool::new(dir.path().join("tasks.sqlite")).expect("db pool");
        (TaskService::new(StateStore::new(pool)), dir)
    }

    fn step(number: u32, title: &str) -> ActionStep {
        ActionStep {
            step_number: number,
            title: title.to_string(),
            description: format!("{title} 的具体做法"),
            estimated_time: "5 min".to_string(),
            is_completed: false,
        }
    }

    #[test]
    fn submit_adds_task_and_clears_input() {
        let (tasks, _dir) = setup_tasks();
        let mut tab = ProactivityTab::new();
        tab.set_input("  整理收件箱  ");

        let record = tab.submit(&tasks).expect("submit");
        assert_eq!(record.text, "整理收件箱");
        assert!(tab.input.is_empty());
    }

    #[test]
    fn begin_breakdown_refuses_empty_and_concurrent_requests() {
        let mut tab = ProactivityTab::new();
        assert!(tab.begin_breakdown().is_err());

        tab.set_input("报税");
        tab.begin_breakdown().expect("first request");
        let second = tab.begin_breakdown();
        assert!(second.is_err());
    }

    #[test]
    fn stale_breakdown_result_is_discarded() {
        let mut tab = ProactivityTab::new();
        tab.set_input("报税");
        let goal = tab.begin_breakdown().expect("begin");

        // The user rewrites the goal while the call is in flight.
        tab.set_input("搬家");
        let applied = tab
            .finish_breakdown(&goal, Ok(vec![step(1, "a"), step(2, "b"), step(3, "c")]))
            .expect("finish");

        assert!(!applied);
        assert!(tab.suggested_steps.is_empty());
        assert!(!tab.is_generating);
    }

    #[test]
    fn failed_breakdown_restores_form_state() {
        let mut tab = ProactivityTab::new();
        tab.set_input("报税");
        let goal = tab.begin_breakdown().expect("begin");

        let result = tab.finish_breakdown(
            &goal,
            Err(AppError::ai(
                crate::error::AiErrorCode::HttpTimeout,
                "Gemini 请求超时",
            )),
        );

        assert!(result.is_err());
        assert!(!tab.is_generating);
        assert!(!tab.show_suggestions);
        assert!(tab.suggested_steps.is_empty());
    }

    #[test]
    fn accept_all_preserves_step_order_with_newest_first_storage() {
        let (tasks, _dir) = setup_tasks();
        let mut tab = ProactivityTab::new();
        tab.set_input("报税");
        let goal = tab.begin_breakdown().expect("begin");
        tab.finish_breakdown(
            &goal,
            Ok(vec![step(1, "收集凭证"), step(2, "填写申报表"), step(3, "提交")]),
        )
        .expect("finish");

        let added = tab.accept_all(&tasks).expect("accept all");
        assert_eq!(added, 3);
        assert!(tab.input.is_empty());
        assert!(tab.suggested_steps.is_empty());

        // Last accepted step sits first in storage order.
        let texts: Vec<String> = tasks.list().into_iter().map(|t| t.text).collect();
        assert_eq!(texts, vec!["提交", "填写申报表", "收集凭证"]);
    }

    #[test]
    fn accept_step_converts_a_single_suggestion() {
        let (tasks, _dir) = setup_tasks();
        let mut tab = ProactivityTab::new();
        tab.set_input("报税");
        let goal = tab.begin_breakdown().expect("begin");
        tab.finish_breakdown(
            &goal,
            Ok(vec![step(1, "收集凭证"), step(2, "填写申报表"), step(3, "提交")]),
        )
        .expect("finish");

        tab.accept_step(&tasks, 2).expect("accept step");
        assert_eq!(tasks.list()[0].text, "填写申报表");
        // The list stays visible for further conversions.
        assert_eq!(tab.suggested_steps.len(), 3);

        assert!(tab.accept_step(&tasks, 9).is_err());
    }

    #[test]
    fn toggle_step_only_touches_the_local_flag() {
        let (tasks, _dir) = setup_tasks();
        let mut tab = ProactivityTab::new();
        tab.set_input("报税");
        let goal = tab.begin_breakdown().expect("begin");
        tab.finish_breakdown(&goal, Ok(vec![step(1, "a"), step(2, "b"), step(3, "c")]))
            .expect("finish");

        tab.toggle_step(2);
        assert!(tab.suggested_steps[1].is_completed);
        tab.toggle_step(2);
        assert!(!tab.suggested_steps[1].is_completed);
        assert!(tasks.list().is_empty());
    }

    #[test]
    fn reopen_flow_requires_confirmation() {
        let (tasks, _dir) = setup_tasks();
        let task = tasks.add("写周报").expect("add");
        tasks.toggle_proactive(&task.id);
        tasks.complete(&task.id);

        let mut tab = ProactivityTab::new();
        tab.request_reopen(&task.id);
        assert_eq!(tab.confirm_reopen_id.as_deref(), Some(task.id.as_str()));

        // Tapping again cancels the confirmation.
        tab.request_reopen(&task.id);
        assert!(tab.confirm_reopen_id.is_none());

        tab.request_reopen(&task.id);
        tab.confirm_reopen(&tasks);
        let stored = &tasks.list()[0];
        assert!(!stored.is_complete);
        assert!(!stored.is_proactive_done);
        assert!(tab.confirm_reopen_id.is_none());
    }
}
