use serde::{Deserialize, Serialize};

use crate::error::AppResult;

/// One step of an AI-generated action plan. Transient: becomes a task only
/// when the user converts it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActionStep {
    pub step_number: u32,
    pub title: String,
    pub description: String,
    pub estimated_time: String,
    #[serde(default)]
    pub is_completed: bool,
}

/// Wire shape of the action planning response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionPlan {
    pub steps: Vec<ActionStep>,
}

/// Evaluation of a self-explained study topic. Transient: only `score` and
/// `encouragement` fold into a concept at creation time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StudyFeedback {
    pub score: u32,
    pub understanding_level: String,
    pub missing_concepts: Vec<String>,
    pub better_explanation: String,
    pub encouragement: String,
}

/// Closed category set for routine items.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RoutineCategory {
    Exercise,
    Study,
    Rest,
    Work,
    Meal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RoutineItem {
    pub time: String,
    pub activity: String,
    pub category: RoutineCategory,
    pub note: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RoutinePlan {
    pub title: String,
    pub items: Vec<RoutineItem>,
    pub tips: String,
}

/// Shared adapter contract for the external completion service.
#[async_trait::async_trait]
pub trait SuggestionProvider: Send + Sync {
    async fn plan_actions(&self, goal: &str) -> AppResult<Vec<ActionStep>>;

    async fn evaluate_explanation(
        &self,
        topic: &str,
        explanation: &str,
    ) -> AppResult<StudyFeedback>;

    async fn plan_routine(
        &self,
        wake_time: &str,
        bed_time: &str,
        focus_areas: &[String],
    ) -> AppResult<RoutinePlan>;
}
