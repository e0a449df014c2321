use std::sync::RwLock;

use chrono::{Local, NaiveDate, Utc};
use tracing::{debug, info};

use crate::error::{AppError, AppResult};
use crate::models::habit::HabitRecord;
use crate::services::store_service::{StateStore, HABITS_SLOT};
use crate::utils::ident::new_entity_id;

/// The habit chain collection. Completion is idempotent per calendar day and
/// the streak never decays; deletion is the only way a streak goes away.
pub struct HabitService {
    store: StateStore,
    habits: RwLock<Vec<HabitRecord>>,
}

impl HabitService {
    pub fn new(store: StateStore) -> Self {
        let habits: Vec<HabitRecord> = store.read(HABITS_SLOT, Vec::new());
        debug!(target: "app::habits", count = habits.len(), "habit collection loaded");
        Self {
            store,
            habits: RwLock::new(habits),
        }
    }

    pub fn list(&self) -> Vec<HabitRecord> {
        self.habits
            .read()
            .expect("habit collection lock poisoned")
            .clone()
    }

    pub fn add(&self, name: &str) -> AppResult<HabitRecord> {
        let name = {
            let trimmed = name.trim();
            if trimmed.is_empty() {
                return Err(AppError::validation("习惯名称不能为空"));
            }
            trimmed.to_string()
        };

        let habit = HabitRecord {
            id: new_entity_id(),
            name,
            last_completed_date: None,
            streak: 0,
            created_at: Utc::now().timestamp_millis(),
        };

        let inserted = habit.clone();
        self.apply(move |mut habits| {
            habits.insert(0, habit);
            habits
        });
        info!(target: "app::habits", habit_id = %inserted.id, "habit added");
        Ok(inserted)
    }

    /// No-op when the id is absent.
    pub fn remove(&self, id: &str) {
        self.apply(|habits| habits.into_iter().filter(|h| h.id != id).collect());
        info!(target: "app::habits", habit_id = %id, "habit removed");
    }

    /// Marks the habit complete for the device-local calendar date.
    pub fn complete_today(&self, id: &str) {
        self.complete_on(id, Local::now().date_naive());
    }

    /// First completion of `date` bumps the streak by exactly 1; repeating
    /// the same date is a no-op.
    pub fn complete_on(&self, id: &str, date: NaiveDate) {
        self.apply(|habits| {
            habits
                .into_iter()
                .map(|mut habit| {
                    if habit.id == id && habit.last_completed_date != Some(date) {
                        habit.last_completed_date = Some(date);
                        habit.streak += 1;
                    }
                    habit
                })
                .collect()
        });
        debug!(target: "app::habits", habit_id = %id, date = %date, "habit completion applied");
    }

    /// How many habits are already done on `date` (the "today N / M" badge).
    pub fn completed_count(&self, date: NaiveDate) -> usize {
        self.list().iter().filter(|h| h.completed_on(date)).count()
    }

    fn apply<F>(&self, transform: F)
    where
        F: FnOnce(Vec<HabitRecord>) -> Vec<HabitRecord>,
    {
        let mut guard = self.habits.write().expect("habit collection lock poisoned");
        let next = transform(guard.clone());
        self.store.write(HABITS_SLOT, &next);
        *guard = next;
    }
}
