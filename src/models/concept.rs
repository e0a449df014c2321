use serde::{Deserialize, Serialize};

/// A study log entry. Scoring is fixed at creation time; there is no edit
/// operation for concepts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConceptRecord {
    pub id: String,
    pub topic: String,
    pub confidence_score: u8,
    pub created_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_feedback: Option<String>,
}
