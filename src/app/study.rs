use crate::error::{AppError, AppResult};
use crate::models::concept::ConceptRecord;
use crate::models::suggestion::StudyFeedback;
use crate::services::concept_service::{confidence_from_score, ConceptService};
use crate::services::suggestion_service::SuggestionService;

use super::{UiError, UiResult};

const DEFAULT_CONFIDENCE: u8 = 7;

/// Form and transient state for the study tab.
pub struct StudyTab {
    pub topic: String,
    pub confidence: u8,
    pub explanation: String,
    pub show_tutor: bool,
    pub feedback: Option<StudyFeedback>,
    pub is_loading: bool,
}

impl Default for StudyTab {
    fn default() -> Self {
        Self {
            topic: String::new(),
            confidence: DEFAULT_CONFIDENCE,
            explanation: String::new(),
            show_tutor: false,
            feedback: None,
            is_loading: false,
        }
    }
}

impl StudyTab {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn toggle_tutor(&mut self) {
        self.show_tutor = !self.show_tutor;
    }

    /// Validate the form and mark an evaluation request outstanding. Both
    /// fields must be non-empty before any external call is attempted.
    pub fn begin_evaluation(&mut self) -> UiResult<(String, String)> {
        let topic = self.topic.trim().to_string();
        if topic.is_empty() {
            return Err(UiError::from(AppError::validation("主题不能为空")));
        }
        let explanation = self.explanation.trim().to_string();
        if explanation.is_empty() {
            return Err(UiError::from(AppError::validation("解释内容不能为空")));
        }
        if self.is_loading {
            return Err(UiError::from(AppError::validation(
                "上一个 AI 请求尚未完成",
            )));
        }

        self.is_loading = true;
        Ok((topic, explanation))
    }

    /// Apply the evaluation outcome: feedback is kept and the confidence
    /// slider follows the returned score. On failure the form keeps its
    /// pre-submission state.
    pub fn finish_evaluation(&mut self, outcome: AppResult<StudyFeedback>) -> UiResult<()> {
        self.is_loading = false;

        match outcome {
            Ok(feedback) => {
                self.confidence = confidence_from_score(feedback.score);
                self.feedback = Some(feedback);
                Ok(())
            }
            Err(error) => Err(error.into()),
        }
    }

    pub async fn request_evaluation(&mut self, suggestions: &SuggestionService) -> UiResult<()> {
        let (topic, explanation) = self.begin_evaluation()?;
        let outcome = suggestions.evaluate_explanation(&topic, &explanation).await;
        self.finish_evaluation(outcome)
    }

    /// Record the concept with the current confidence, folding in the
    /// encouragement when an evaluation preceded it, then reset the form.
    pub fn record(&mut self, concepts: &ConceptService) -> UiResult<ConceptRecord> {
        let encouragement = self
            .feedback
            .as_ref()
            .map(|feedback| feedback.encouragement.clone());
        let record = concepts.add(&self.topic, self.confidence, encouragement)?;

        self.topic.clear();
        self.explanation.clear();
        self.confidence = DEFAULT_CONFIDENCE;
        self.feedback = None;
        self.show_tutor = false;

        Ok(record)
    }
}
