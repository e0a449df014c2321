use crate::error::{AppError, AppResult};
use crate::models::habit::HabitRecord;
use crate::models::suggestion::RoutinePlan;
use crate::services::habit_service::HabitService;
use crate::services::suggestion_service::SuggestionService;

use super::{UiError, UiResult};

/// Only the first few routine items become habits; the rest stay advisory.
const ROUTINE_HABIT_LIMIT: usize = 3;

pub const DEFAULT_WAKE_TIME: &str = "07:00";
pub const DEFAULT_BED_TIME: &str = "23:00";

pub fn default_focus_areas() -> Vec<String> {
    vec!["学习".to_string(), "运动".to_string()]
}

/// Form and transient state for the rhythm tab.
#[derive(Default)]
pub struct RhythmTab {
    pub input: String,
    pub is_generating: bool,
}

impl RhythmTab {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_input(&mut self, value: impl Into<String>) {
        self.input = value.into();
    }

    /// Add a habit from the current input and clear the field.
    pub fn submit(&mut self, habits: &HabitService) -> UiResult<HabitRecord> {
        let record = habits.add(&self.input)?;
        self.input.clear();
        Ok(record)
    }

    /// Mark a routine request outstanding; refused while one is in flight.
    pub fn begin_routine(&mut self) -> UiResult<()> {
        if self.is_generating {
            return Err(UiError::from(AppError::validation(
                "上一个 AI 请求尚未完成",
            )));
        }
        self.is_generating = true;
        Ok(())
    }

    /// Convert the first routine items into habits named "{time} {activity}".
    pub fn finish_routine(
        &mut self,
        habits: &HabitService,
        outcome: AppResult<RoutinePlan>,
    ) -> UiResult<Vec<HabitRecord>> {
        self.is_generating = false;

        let plan = outcome.map_err(UiError::from)?;
        let mut added = Vec::new();
        for item in plan.items.iter().take(ROUTINE_HABIT_LIMIT) {
            let record = habits.add(&format!("{} {}", item.time, item.activity))?;
            added.push(record);
        }
        Ok(added)
    }

    pub async fn request_routine(
        &mut self,
        suggestions: &SuggestionService,
        habits: &HabitService,
        wake_time: &str,
        bed_time: &str,
        focus_areas: &[String],
    ) -> UiResult<Vec<HabitRecord>> {
        self.begin_routine()?;
        let outcome = suggestions
            .plan_routine(wake_time, bed_time, focus_areas)
            .await;
        self.finish_routine(habits, outcome)
    }
}
