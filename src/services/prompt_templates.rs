use serde_json::{json, Value as JsonValue};

/// System prompt for breaking a goal into concrete action steps.
pub fn action_plan_system_prompt() -> &'static str {
    r#"You are Pro-Gro's proactivity coach. Break the user's goal into a concrete
action plan of 3 to 5 small steps. Always respond with valid UTF-8 JSON and
nothing else. Do not wrap the response in markdown code blocks. The schema is:
{
  "steps": [{
     "stepNumber": integer,
     "title": string,
     "description": string,
     "estimatedTime": string
  }]
}
Number the steps starting at 1 in execution order. Keep each step small enough
to start within five minutes, and keep estimatedTime a short human label such
as "10 min"."#
}

/// System prompt for evaluating a self-explained study topic.
pub fn study_feedback_system_prompt() -> &'static str {
    r#"You are Pro-Gro's study tutor. The user explains a topic in their own
words; judge how well they understand it. Always respond with valid UTF-8 JSON
and nothing else. Do not wrap the response in markdown code blocks. The schema
is:
{
  "score": integer (0-100),
  "understandingLevel": string,
  "missingConcepts": string[],
  "betterExplanation": string,
  "encouragement": string
}
Score the explanation on substance, not style. missingConcepts may be empty.
Keep the encouragement warm and specific."#
}

/// System prompt for planning a daily routine.
pub fn routine_plan_system_prompt() -> &'static str {
    r#"You are Pro-Gro's daily rhythm planner. Given a wake time, a bed time and
focus areas, lay out a realistic daily routine. Always respond with valid UTF-8
JSON and nothing else. Do not wrap the response in markdown code blocks. The
schema is:
{
  "title": string,
  "items": [{
     "time": string,
     "activity": string,
     "category": one of "Exercise" | "Study" | "Rest" | "Work" | "Meal",
     "note": string
  }],
  "tips": string
}
Order the items chronologically between the wake and bed times."#
}

/// Declared output shape for action planning, used to validate responses.
pub fn action_plan_response_schema() -> JsonValue {
    json!({
        "type": "object",
        "required": ["steps"],
        "properties": {
            "steps": {
                "type": "array",
                "minItems": 3,
                "maxItems": 5,
                "items": {
                    "type": "object",
                    "required": ["stepNumber", "title", "description", "estimatedTime"],
                    "properties": {
                        "stepNumber": { "type": "integer", "minimum": 1 },
                        "title": { "type": "string" },
                        "description": { "type": "string" },
                        "estimatedTime": { "type": "string" }
                    }
                }
            }
        }
    })
}

/// Declared output shape for study feedback, used to validate responses.
pub fn study_feedback_response_schema() -> JsonValue {
    json!({
        "type": "object",
        "required": [
            "score",
            "understandingLevel",
            "missingConcepts",
            "betterExplanation",
            "encouragement"
        ],
        "properties": {
            "score": { "type": "integer", "minimum": 0, "maximum": 100 },
            "understandingLevel": { "type": "string" },
            "missingConcepts": {
                "type": "array",
                "items": { "type": "string" }
            },
            "betterExplanation": { "type": "string" },
            "encouragement": { "type": "string" }
        }
    })
}

/// Declared output shape for routine planning, used to validate responses.
pub fn routine_plan_response_schema() -> JsonValue {
    json!({
        "type": "object",
        "required": ["title", "items", "tips"],
        "properties": {
            "title": { "type": "string" },
            "items": {
                "type": "array",
                "minItems": 1,
                "items": {
                    "type": "object",
                    "required": ["time", "activity", "category", "note"],
                    "properties": {
                        "time": { "type": "string" },
                        "activity": { "type": "string" },
                        "category": {
                            "type": "string",
                            "enum": ["Exercise", "Study", "Rest", "Work", "Meal"]
                        },
                        "note": { "type": "string" }
                    }
                }
            },
            "tips": { "type": "string" }
        }
    })
}

/// Build the user payload for action planning requests.
pub fn build_action_plan_payload(goal: &str) -> JsonValue {
    json!({
        "operation": "planActions",
        "goal": goal,
        "expectations": {
            "minSteps": 3,
            "maxSteps": 5,
            "fiveMinuteRule": true
        }
    })
}

/// Build the user payload for study evaluation requests.
pub fn build_study_feedback_payload(topic: &str, explanation: &str) -> JsonValue {
    json!({
        "operation": "evaluateExplanation",
        "topic": topic,
        "explanation": explanation,
        "expectations": {
            "scoreRange": [0, 100],
            "languages": ["zh-CN", "en"]
        }
    })
}

/// Build the user payload for routine planning requests.
pub fn build_routine_payload(wake_time: &str, bed_time: &str, focus_areas: &[String]) -> JsonValue {
    json!({
        "operation": "planRoutine",
        "wakeTime": wake_time,
        "bedTime": bed_time,
        "focusAreas": focus_areas,
        "expectations": {
            "chronological": true,
            "categories": ["Exercise", "Study", "Rest", "Work", "Meal"]
        }
    })
}
