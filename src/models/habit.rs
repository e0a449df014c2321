use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A habit chain. `streak` counts distinct calendar days of completion and
/// never decays on missed days; only deletion removes the chain.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HabitRecord {
    pub id: String,
    pub name: String,
    pub last_completed_date: Option<NaiveDate>,
    pub streak: u32,
    pub created_at: i64,
}

impl HabitRecord {
    pub fn completed_on(&self, date: NaiveDate) -> bool {
        self.last_completed_date == Some(date)
    }
}
