use std::sync::RwLock;

use chrono::Utc;
use tracing::{debug, info};

use crate::error::{AppError, AppResult};
use crate::models::concept::ConceptRecord;
use crate::services::store_service::{StateStore, CONCEPTS_SLOT};
use crate::utils::ident::new_entity_id;

/// Maps an external evaluation score in [0,100] onto the 1–10 confidence
/// domain: integer division by 10, clamped so a score of 0 still lands on
/// the domain minimum.
pub fn confidence_from_score(score: u32) -> u8 {
    (score / 10).clamp(1, 10) as u8
}

/// The study log. Concepts are created and deleted, never edited; the
/// confidence score is fixed at creation time.
pub struct ConceptService {
    store: StateStore,
    concepts: RwLock<Vec<ConceptRecord>>,
}

impl ConceptService {
    pub fn new(store: StateStore) -> Self {
        let concepts: Vec<ConceptRecord> = store.read(CONCEPTS_SLOT, Vec::new());
        debug!(target: "app::concepts", count = concepts.len(), "concept collection loaded");
        Self {
            store,
            concepts: RwLock::new(concepts),
        }
    }

    pub fn list(&self) -> Vec<ConceptRecord> {
        self.concepts
            .read()
            .expect("concept collection lock poisoned")
            .clone()
    }

    pub fn add(
        &self,
        topic: &str,
        confidence_score: u8,
        ai_feedback: Option<String>,
    ) -> AppResult<ConceptRecord> {
        let topic = {
            let trimmed = topic.trim();
            if trimmed.is_empty() {
                return Err(AppError::validation("主题不能为空"));
            }
            trimmed.to_string()
        };

        if !(1..=10).contains(&confidence_score) {
            return Err(AppError::validation("自信分数需在 1 到 10 之间"));
        }

        let concept = ConceptRecord {
            id: new_entity_id(),
            topic,
            confidence_score,
            created_at: Utc::now().timestamp_millis(),
            ai_feedback: ai_feedback.filter(|text| !text.trim().is_empty()),
        };

        let inserted = concept.clone();
        self.apply(move |mut concepts| {
            concepts.insert(0, concept);
            concepts
        });
        info!(target: "app::concepts", concept_id = %inserted.id, "concept recorded");
        Ok(inserted)
    }

    /// No-op when the id is absent.
    pub fn remove(&self, id: &str) {
        self.apply(|concepts| concepts.into_iter().filter(|c| c.id != id).collect());
        info!(target: "app::concepts", concept_id = %id, "concept removed");
    }

    fn apply<F>(&self, transform: F)
    where
        F: FnOnce(Vec<ConceptRecord>) -> Vec<ConceptRecord>,
    {
        let mut guard = self
            .concepts
            .write()
            .expect("concept collection lock poisoned");
        let next = transform(guard.clone());
        self.store.write(CONCEPTS_SLOT, &next);
        *guard = next;
    }
}
