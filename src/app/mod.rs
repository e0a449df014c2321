pub mod proactivity;
pub mod rhythm;
pub mod study;

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map as JsonMap, Value as JsonValue};
use tracing::error;

use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::services::concept_service::ConceptService;
use crate::services::habit_service::HabitService;
use crate::services::store_service::StateStore;
use crate::services::suggestion_service::SuggestionService;
use crate::services::task_service::TaskService;

/// Root state container. Built once and threaded down to the tab
/// controllers; tests construct isolated instances over temp databases.
#[derive(Clone)]
pub struct AppState {
    db_pool: DbPool,
    task_service: Arc<TaskService>,
    concept_service: Arc<ConceptService>,
    habit_service: Arc<HabitService>,
    suggestion_service: Arc<SuggestionService>,
}

impl AppState {
    pub fn new(db_pool: DbPool) -> AppResult<Self> {
        let store = StateStore::new(db_pool.clone());
        let task_service = Arc::new(TaskService::new(store.clone()));
        let concept_service = Arc::new(ConceptService::new(store.clone()));
        let habit_service = Arc::new(HabitService::new(store));
        let suggestion_service = Arc::new(SuggestionService::new()?);

        Ok(Self {
            db_pool,
            task_service,
            concept_service,
            habit_service,
            suggestion_service,
        })
    }

    /// Composition root for the running client: logging, then the database
    /// file under the app data directory.
    pub fn bootstrap(data_dir: &Path) -> AppResult<Self> {
        crate::utils::logger::init_logging(data_dir)?;

        std::fs::create_dir_all(data_dir)?;
        let db_path = data_dir.join("progro.sqlite");
        let pool = DbPool::new(db_path)?;
        Self::new(pool)
    }

    pub fn tasks(&self) -> Arc<TaskService> {
        Arc::clone(&self.task_service)
    }

    pub fn concepts(&self) -> Arc<ConceptService> {
        Arc::clone(&self.concept_service)
    }

    pub fn habits(&self) -> Arc<HabitService> {
        Arc::clone(&self.habit_service)
    }

    pub fn suggestions(&self) -> Arc<SuggestionService> {
        Arc::clone(&self.suggestion_service)
    }

    pub fn db(&self) -> DbPool {
        self.db_pool.clone()
    }
}

pub type UiResult<T> = Result<T, UiError>;

/// Error shape crossing the view boundary: stable code plus a localized,
/// human-readable message.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UiError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<JsonValue>,
}

impl UiError {
    pub fn new(
        code: impl Into<String>,
        message: impl Into<String>,
        details: Option<JsonValue>,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details,
        }
    }
}

impl From<AppError> for UiError {
    fn from(error: AppError) -> Self {
        match error {
            AppError::Validation {
                message, details, ..
            } => UiError::new("VALIDATION_ERROR", message, details),
            AppError::NotFound => UiError::new("NOT_FOUND", "请求的资源不存在", None),
            AppError::Ai {
                code,
                message,
                correlation_id,
                details,
            } => {
                let mut merged = JsonMap::new();
                if let Some(existing) = details {
                    match existing {
                        JsonValue::Object(map) => {
                            for (key, value) in map {
                                merged.insert(key, value);
                            }
                        }
                        value => {
                            merged.insert("info".to_string(), value);
                        }
                    }
                }
                if let Some(id) = correlation_id {
                    merged.insert("correlationId".to_string(), JsonValue::String(id));
                }
                let detail_value = if merged.is_empty() {
                    None
                } else {
                    Some(JsonValue::Object(merged))
                };
                UiError::new(code.as_str(), message, detail_value)
            }
            AppError::Database { message } => {
                error!(target: "app::ui", %message, "database error at view boundary");
                UiError::new("UNKNOWN", message, None)
            }
            AppError::Serialization(error) => {
                error!(target: "app::ui", error = %error, "serialization error at view boundary");
                UiError::new("UNKNOWN", "序列化失败", None)
            }
            AppError::Io(error) => {
                error!(target: "app::ui", error = %error, "io error at view boundary");
                UiError::new("UNKNOWN", "文件系统读写失败", None)
            }
            AppError::Other(message) => {
                error!(target: "app::ui", %message, "unexpected error at view boundary");
                UiError::new("UNKNOWN", message, None)
            }
        }
    }
}
