use std::sync::Arc;
use std::time::{Duration as StdDuration, Instant};

use serde_json::{json, Value as JsonValue};
use tracing::{debug, warn};

use crate::error::{AiErrorCode, AppError, AppResult};
use crate::models::suggestion::{
    ActionPlan, ActionStep, RoutinePlan, StudyFeedback, SuggestionProvider,
};
use crate::services::prompt_templates::{
    action_plan_response_schema, action_plan_system_prompt, build_action_plan_payload,
    build_routine_payload, build_study_feedback_payload, routine_plan_response_schema,
    routine_plan_system_prompt, study_feedback_response_schema, study_feedback_system_prompt,
};
use reqwest::StatusCode;
use uuid::Uuid;

/// Adapter to the hosted completion service. Calls are single-shot: no
/// automatic retry, the user resubmits manually after a failure.
pub struct SuggestionService {
    provider: Option<Arc<GeminiProvider>>,
}

#[derive(Debug, Clone)]
struct SuggestionConfig {
    api_key: Option<String>,
    api_base_url: String,
    model: String,
    http_timeout: StdDuration,
}

impl SuggestionConfig {
    fn from_env() -> Self {
        let api_key = std::env::var("PROGRO_GEMINI_API_KEY")
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());
        let api_base_url = std::env::var("PROGRO_GEMINI_BASE_URL")
            .ok()
            .unwrap_or_else(|| "https://generativelanguage.googleapis.com/v1beta/openai".to_string());
        let model = std::env::var("PROGRO_GEMINI_MODEL")
            .ok()
            .unwrap_or_else(|| "gemini-2.5-flash".to_string());

        Self {
            api_key,
            api_base_url,
            model,
            http_timeout: StdDuration::from_secs(30),
        }
    }

    fn build_provider(&self) -> AppResult<Option<Arc<GeminiProvider>>> {
        match &self.api_key {
            Some(api_key) => {
                let provider = GeminiProvider::try_new(self, api_key.clone())?;
                Ok(Some(Arc::new(provider)))
            }
            None => Ok(None),
        }
    }
}

impl SuggestionService {
    pub fn new() -> AppResult<Self> {
        let config = SuggestionConfig::from_env();
        let provider = config.build_provider()?;
        Ok(Self { provider })
    }

    /// Whether an API key is present. Lets the UI disable AI affordances
    /// without triggering a failing call.
    pub fn is_configured(&self) -> bool {
        self.provider.is_some()
    }

    pub async fn plan_actions(&self, goal: &str) -> AppResult<Vec<ActionStep>> {
        let goal = goal.trim();
        if goal.is_empty() {
            return Err(AppError::validation("目标不能为空"));
        }

        let provider = self.current_provider()?;
        provider.plan_actions(goal).await
    }

    pub async fn evaluate_explanation(
        &self,
        topic: &str,
        explanation: &str,
    ) -> AppResult<StudyFeedback> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(AppError::validation("主题不能为空"));
        }
        let explanation = explanation.trim();
        if explanation.is_empty() {
            return Err(AppError::validation("解释内容不能为空"));
        }

        let provider = self.current_provider()?;
        provider.evaluate_explanation(topic, explanation).await
    }

    pub async fn plan_routine(
        &self,
        wake_time: &str,
        bed_time: &str,
        focus_areas: &[String],
    ) -> AppResult<RoutinePlan> {
        let wake_time = wake_time.trim();
        let bed_time = bed_time.trim();
        if wake_time.is_empty() || bed_time.is_empty() {
            return Err(AppError::validation("作息时间不能为空"));
        }

        let provider = self.current_provider()?;
        provider.plan_routine(wake_time, bed_time, focus_areas).await
    }

    fn current_provider(&self) -> AppResult<Arc<GeminiProvider>> {
        self.provider
            .as_ref()
            .cloned()
            .ok_or_else(|| AppError::ai(AiErrorCode::MissingApiKey, "Gemini API Key 未配置"))
    }
}

struct GeminiProvider {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
    model: String,
}

#[derive(Clone, Copy)]
enum GeminiOperation {
    PlanActions,
    EvaluateExplanation,
    PlanRoutine,
}

impl GeminiOperation {
    fn as_str(self) -> &'static str {
        match self {
            GeminiOperation::PlanActions => "planActions",
            GeminiOperation::EvaluateExplanation => "evaluateExplanation",
            GeminiOperation::PlanRoutine => "planRoutine",
        }
    }

    fn system_prompt(self) -> &'static str {
        match self {
            GeminiOperation::PlanActions => action_plan_system_prompt(),
            GeminiOperation::EvaluateExplanation => study_feedback_system_prompt(),
            GeminiOperation::PlanRoutine => routine_plan_system_prompt(),
        }
    }

    fn response_schema(self) -> JsonValue {
        match self {
            GeminiOperation::PlanActions => action_plan_response_schema(),
            GeminiOperation::EvaluateExplanation => study_feedback_response_schema(),
            GeminiOperation::PlanRoutine => routine_plan_response_schema(),
        }
    }

    fn temperature(self) -> f32 {
        match self {
            GeminiOperation::PlanActions => 0.4,
            GeminiOperation::EvaluateExplanation => 0.2,
            GeminiOperation::PlanRoutine => 0.3,
        }
    }
}

struct ChatInvocationResult {
    content: JsonValue,
    correlation_id: String,
}

impl GeminiProvider {
    fn try_new(config: &SuggestionConfig, api_key: String) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .pool_max_idle_per_host(2)
            .pool_idle_timeout(Some(StdDuration::from_secs(90)))
            .build()
            .map_err(|err| AppError::other(format!("初始化 Gemini HTTP 客户端失败: {err}")))?;

        let base_url = config.api_base_url.trim_end_matches('/').to_string();
        let endpoint = format!("{}/chat/completions", base_url);

        Ok(Self {
            client,
            api_key,
            endpoint,
            model: config.model.clone(),
        })
    }

    async fn invoke_chat(
        &self,
        operation: GeminiOperation,
        payload: JsonValue,
    ) -> AppResult<ChatInvocationResult> {
        let correlation_id = Uuid::new_v4().to_string();
        let request_body = self.build_request_body(operation, &payload);

        debug!(
            target: "app::ai::gemini",
            operation = operation.as_str(),
            correlation_id = %correlation_id,
            "invoking Gemini"
        );

        let start = Instant::now();
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await;

        let resp = match response {
            Ok(resp) => resp,
            Err(err) => {
                warn!(
                    target: "app::ai::gemini",
                    correlation_id = %correlation_id,
                    "Gemini request error"
                );
                return Err(Self::error_from_reqwest(err, correlation_id.as_str()));
            }
        };

        let status = resp.status();
        if !status.is_success() {
            warn!(
                target: "app::ai::gemini",
                correlation_id = %correlation_id,
                status = status.as_u16(),
                "Gemini returned non-success status"
            );
            return Err(Self::map_http_error(status, correlation_id.as_str()));
        }

        let latency_ms = start.elapsed().as_millis();
        let body: JsonValue = resp.json().await.map_err(|err| {
            AppError::ai_with_details(
                AiErrorCode::InvalidResponse,
                "解析 Gemini 响应失败",
                Some(correlation_id.as_str()),
                Some(json!({ "reason": err.to_string() })),
            )
        })?;

        let content = body
            .pointer("/choices/0/message/content")
            .and_then(|value| value.as_str())
            .ok_or_else(|| {
                AppError::ai_with_details(
                    AiErrorCode::InvalidResponse,
                    "Gemini 响应缺少 message.content 字段",
                    Some(correlation_id.as_str()),
                    Some(json!({ "reason": "missing_message_content" })),
                )
            })?;

        let content_value = Self::parse_content(content, &correlation_id)?;
        Self::validate_against_schema(operation, &content_value, &correlation_id)?;

        debug!(
            target: "app::ai::gemini",
            correlation_id = %correlation_id,
            latency_ms,
            "Gemini responded"
        );

        Ok(ChatInvocationResult {
            content: content_value,
            correlation_id,
        })
    }

    fn build_request_body(&self, operation: GeminiOperation, payload: &JsonValue) -> JsonValue {
        let user_content = serde_json::to_string(payload).unwrap_or_else(|_| "{}".to_string());
        json!({
            "model": self.model,
            "temperature": operation.temperature(),
            "response_format": { "type": "json_object" },
            "messages": [
                { "role": "system", "content": operation.system_prompt() },
                { "role": "user", "content": user_content }
            ]
        })
    }

    fn parse_content(content: &str, correlation_id: &str) -> AppResult<JsonValue> {
        let trimmed = content.trim();
        let cleaned = if trimmed.starts_with("```") {
            let without_prefix = trimmed
                .trim_start_matches("```json")
                .trim_start_matches("```JSON")
                .trim_start_matches("```");
            let without_suffix = without_prefix.trim_end_matches("```").trim();
            without_suffix.to_string()
        } else {
            trimmed.to_string()
        };

        serde_json::from_str(&cleaned).map_err(|err| {
            AppError::ai_with_details(
                AiErrorCode::InvalidResponse,
                format!("Gemini 响应内容非 JSON: {err}"),
                Some(correlation_id),
                Some(json!({ "reason": "invalid_json" })),
            )
        })
    }

    /// Reject any response that does not match the declared output shape.
    /// A violation never yields a partially populated record.
    fn validate_against_schema(
        operation: GeminiOperation,
        content: &JsonValue,
        correlation_id: &str,
    ) -> AppResult<()> {
        let schema_doc = operation.response_schema();
        let schema = jsonschema::JSONSchema::compile(&schema_doc)
            .map_err(|err| AppError::other(format!("编译响应结构失败: {err}")))?;

        let violations: Vec<String> = match schema.validate(content) {
            Ok(()) => return Ok(()),
            Err(errors) => errors
                .map(|error| {
                    let path = error.instance_path.to_string();
                    let path_display = if path.is_empty() {
                        "root".to_string()
                    } else {
                        path
                    };
                    format!("{}: {}", path_display, error)
                })
                .collect(),
        };

        Err(AppError::ai_with_details(
            AiErrorCode::InvalidResponse,
            "Gemini 响应不符合约定结构",
            Some(correlation_id),
            Some(json!({ "errors": violations })),
        ))
    }

    fn map_http_error(status: StatusCode, correlation_id: &str) -> AppError {
        match status {
            StatusCode::UNAUTHORIZED => AppError::ai_with_details(
                AiErrorCode::MissingApiKey,
                "Gemini API Key 无效或未授权",
                Some(correlation_id),
                None,
            ),
            StatusCode::FORBIDDEN => AppError::ai_with_details(
                AiErrorCode::Forbidden,
                "Gemini API 权限不足",
                Some(correlation_id),
                None,
            ),
            StatusCode::TOO_MANY_REQUESTS => AppError::ai_with_details(
                AiErrorCode::RateLimited,
                "Gemini 请求过于频繁，请稍后重试",
                Some(correlation_id),
                None,
            ),
            status if status.is_server_error() => AppError::ai_with_details(
                AiErrorCode::GeminiUnavailable,
                format!("Gemini 服务暂时不可用 (状态码 {})", status.as_u16()),
                Some(correlation_id),
                None,
            ),
            StatusCode::BAD_REQUEST => AppError::ai_with_details(
                AiErrorCode::InvalidRequest,
                "Gemini 请求格式无效",
                Some(correlation_id),
                None,
            ),
            StatusCode::NOT_FOUND => AppError::ai_with_details(
                AiErrorCode::InvalidRequest,
                "Gemini 接口地址无效",
                Some(correlation_id),
                None,
            ),
            status => AppError::ai_with_details(
                AiErrorCode::Unknown,
                format!("Gemini 返回错误状态码 {}", status.as_u16()),
                Some(correlation_id),
                None,
            ),
        }
    }

    fn error_from_reqwest(err: reqwest::Error, correlation_id: &str) -> AppError {
        if err.is_timeout() {
            AppError::ai_with_details(
                AiErrorCode::HttpTimeout,
                "Gemini 请求超时",
                Some(correlation_id),
                None,
            )
        } else if err.is_connect() {
            AppError::ai_with_details(
                AiErrorCode::GeminiUnavailable,
                "Gemini 网络连接失败",
                Some(correlation_id),
                None,
            )
        } else if let Some(status) = err.status() {
            Self::map_http_error(status, correlation_id)
        } else {
            AppError::ai_with_details(
                AiErrorCode::Unknown,
                format!("Gemini 请求失败: {err}"),
                Some(correlation_id),
                None,
            )
        }
    }
}

/// Order steps by the returned number, then renumber contiguously from 1 so
/// the caller always sees 1..N regardless of gaps in the model output.
fn normalize_steps(mut steps: Vec<ActionStep>) -> Vec<ActionStep> {
    steps.sort_by_key(|step| step.step_number);
    for (index, step) in steps.iter_mut().enumerate() {
        step.step_number = index as u32 + 1;
        step.is_completed = false;
    }
    steps
}

#[async_trait::async_trait]
impl SuggestionProvider for GeminiProvider {
    async fn plan_actions(&self, goal: &str) -> AppResult<Vec<ActionStep>> {
        let payload = build_action_plan_payload(goal);
        let result = self
            .invoke_chat(GeminiOperation::PlanActions, payload)
            .await?;

        let ChatInvocationResult {
            content,
            correlation_id,
        } = result;

        let plan: ActionPlan = serde_json::from_value(content).map_err(|err| {
            AppError::ai_with_details(
                AiErrorCode::InvalidResponse,
                format!("解析 Gemini 行动计划响应失败: {err}"),
                Some(correlation_id.as_str()),
                None,
            )
        })?;

        Ok(normalize_steps(plan.steps))
    }

    async fn evaluate_explanation(
        &self,
        topic: &str,
        explanation: &str,
    ) -> AppResult<StudyFeedback> {
        let payload = build_study_feedback_payload(topic, explanation);
        let result = self
            .invoke_chat(GeminiOperation::EvaluateExplanation, payload)
            .await?;

        let ChatInvocationResult {
            content,
            correlation_id,
        } = result;

        serde_json::from_value(content).map_err(|err| {
            AppError::ai_with_details(
                AiErrorCode::InvalidResponse,
                format!("解析 Gemini 学习反馈响应失败: {err}"),
                Some(correlation_id.as_str()),
                None,
            )
        })
    }

    async fn plan_routine(
        &self,
        wake_time: &str,
        bed_time: &str,
        focus_areas: &[String],
    ) -> AppResult<RoutinePlan> {
        let payload = build_routine_payload(wake_time, bed_time, focus_areas);
        let result = self
            .invoke_chat(GeminiOperation::PlanRoutine, payload)
            .await?;

        let ChatInvocationResult {
            content,
            correlation_id,
        } = result;

        serde_json::from_value(content).map_err(|err| {
            AppError::ai_with_details(
                AiErrorCode::InvalidResponse,
                format!("解析 Gemini 作息计划响应失败: {err}"),
                Some(correlation_id.as_str()),
                None,
            )
        })
    }
}

pub mod testing {
    use super::*;

    /// Expose the Gemini error mapping for integration tests without widening
    /// the public API surface.
    pub fn map_http_error(status: StatusCode) -> AppError {
        GeminiProvider::map_http_error(status, "test-correlation-id")
    }

    fn test_config(base_url: &str, timeout: StdDuration) -> SuggestionConfig {
        SuggestionConfig {
            api_key: Some("test-key".to_string()),
            api_base_url: base_url.trim_end_matches('/').to_string(),
            model: "gemini-2.5-flash".to_string(),
            http_timeout: timeout,
        }
    }

    /// Build a service wired to an arbitrary endpoint (httpmock).
    pub fn service_with_base_url(
        base_url: &str,
        timeout: StdDuration,
    ) -> AppResult<SuggestionService> {
        let config = test_config(base_url, timeout);
        let provider = config.build_provider()?;
        Ok(SuggestionService { provider })
    }

    pub async fn plan_actions_via_http(
        base_url: &str,
        timeout: StdDuration,
        goal: &str,
    ) -> AppResult<Vec<ActionStep>> {
        let provider = GeminiProvider::try_new(&test_config(base_url, timeout), "test-key".into())?;
        provider.plan_actions(goal).await
    }

    pub async fn evaluate_explanation_via_http(
        base_url: &str,
        timeout: StdDuration,
        topic: &str,
        explanation: &str,
    ) -> AppResult<StudyFeedback> {
        let provider = GeminiProvider::try_new(&test_config(base_url, timeout), "test-key".into())?;
        provider.evaluate_explanation(topic, explanation).await
    }

    pub async fn plan_routine_via_http(
        base_url: &str,
        timeout: StdDuration,
        wake_time: &str,
        bed_time: &str,
        focus_areas: &[String],
    ) -> AppResult<RoutinePlan> {
        let provider = GeminiProvider::try_new(&test_config(base_url, timeout), "test-key".into())?;
        provider.plan_routine(wake_time, bed_time, focus_areas).await
    }
}
