//! Query Plan - the structured output of the generation step.

use crate::error::{BiError, Result};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use thiserror::Error;

pub const MAX_FOLLOWUPS: usize = 3;
pub const DEGRADED_SQL: &str = "-- Error generating SQL";
pub const DEGRADED_PREFIX: &str = "⚠️ Vertex AI error: ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartType {
    #[default]
    Bar,
    Line,
    Pie,
}

impl ChartType {
    /// Lenient parse: anything unrecognised is a bar chart.
    pub fn parse_lenient(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "line" => ChartType::Line,
            "pie" => ChartType::Pie,
            _ => ChartType::Bar,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ChartType::Bar => "bar",
            ChartType::Line => "line",
            ChartType::Pie => "pie",
        }
    }
}

impl fmt::Display for ChartType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ChartType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Option::<serde_json::Value>::deserialize(deserializer)?;
        Ok(match value {
            Some(serde_json::Value::String(s)) => ChartType::parse_lenient(&s),
            _ => ChartType::Bar,
        })
    }
}

/// SQL plus chart hints for a single turn. All six main fields are always present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryPlan {
    #[serde(default, deserialize_with = "null_as_default")]
    pub sql: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub explanation: String,
    #[serde(default)]
    pub chart_type: ChartType,
    #[serde(default, deserialize_with = "null_as_default")]
    pub x_col: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub y_col: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub followups: Vec<String>,
    /// Diagnostic, only set when generation failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

lazy_static! {
    static ref FENCE_OPEN: Regex = Regex::new(r"^```(?:json)?\s*").expect("valid regex");
    static ref FENCE_CLOSE: Regex = Regex::new(r"\s*```$").expect("valid regex");
}

/// Remove a surrounding markdown code fence, if any.
pub fn strip_code_fence(raw: &str) -> String {
    let trimmed = raw.trim();
    let without_open = FENCE_OPEN.replace(trimmed, "");
    FENCE_CLOSE.replace(&without_open, "").into_owned()
}

impl QueryPlan {
    /// Parse the raw backend text into a plan.
    pub fn from_response(raw: &str) -> Result<Self> {
        let cleaned = strip_code_fence(raw);
        if cleaned.is_empty() {
            return Err(BiError::Llm("Empty response from model".to_string()));
        }
        let value: serde_json::Value = serde_json::from_str(&cleaned)?;
        if !value.is_object() {
            return Err(BiError::Llm(format!(
                "Expected a JSON object, got: {}",
                cleaned
            )));
        }
        let mut plan: QueryPlan = serde_json::from_value(value)?;
        plan.followups.truncate(MAX_FOLLOWUPS);
        plan.error = None;
        Ok(plan)
    }

    /// Displayable plan for a failed generation.
    pub fn degraded(failure: &GenerationFailure) -> Self {
        let diagnostic = failure.to_string();
        Self {
            sql: DEGRADED_SQL.to_string(),
            explanation: format!("{}{}", DEGRADED_PREFIX, diagnostic),
            chart_type: ChartType::Bar,
            x_col: String::new(),
            y_col: String::new(),
            followups: Vec::new(),
            error: Some(diagnostic),
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.error.is_some()
    }
}

/// Why a live generation attempt did not yield a plan.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GenerationFailure {
    #[error("{0}")]
    Backend(String),

    #[error("could not parse model response: {0}")]
    InvalidResponse(String),

    #[error("model did not respond within {0}ms")]
    Timeout(u64),

    #[error("{capability} is not available. {remedy}")]
    MissingCapability { capability: String, remedy: String },
}

impl From<BiError> for GenerationFailure {
    fn from(err: BiError) -> Self {
        match err {
            BiError::Json(e) => GenerationFailure::InvalidResponse(e.to_string()),
            BiError::Llm(msg) => GenerationFailure::Backend(msg),
            BiError::Timeout(ms) => GenerationFailure::Timeout(ms),
            BiError::MissingCapability { capability, remedy } => {
                GenerationFailure::MissingCapability { capability, remedy }
            }
            other => GenerationFailure::Backend(other.to_string()),
        }
    }
}

/// Result of the generation step. Never an `Err`: failures carry a degraded plan.
#[derive(Debug, Clone, PartialEq)]
pub enum PlanOutcome {
    Generated(QueryPlan),
    Degraded {
        plan: QueryPlan,
        failure: GenerationFailure,
    },
}

impl PlanOutcome {
    pub fn degraded(failure: GenerationFailure) -> Self {
        PlanOutcome::Degraded {
            plan: QueryPlan::degraded(&failure),
            failure,
        }
    }

    pub fn plan(&self) -> &QueryPlan {
        match self {
            PlanOutcome::Generated(plan) | PlanOutcome::Degraded { plan, .. } => plan,
        }
    }

    pub fn into_plan(self) -> QueryPlan {
        match self {
            PlanOutcome::Generated(plan) | PlanOutcome::Degraded { plan, .. } => plan,
        }
    }

    pub fn failure(&self) -> Option<&GenerationFailure> {
        match self {
            PlanOutcome::Generated(_) => None,
            PlanOutcome::Degraded { failure, .. } => Some(failure),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_code_fence() {
        assert_eq!(strip_code_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("```\n{}\n```  "), "{}");
        assert_eq!(strip_code_fence("  {\"a\":1} "), "{\"a\":1}");
    }

    #[test]
    fn test_parse_fenced_response() {
        let raw = r#"```json
{
  "sql": "SELECT region, SUM(amount) AS total FROM `p.d.sf_opportunities` GROUP BY region",
  "explanation": "West leads.",
  "chart_type": "pie",
  "x_col": "region",
  "y_col": "total",
  "followups": ["a", "b", "c", "d"]
}
```"#;
        let plan = QueryPlan::from_response(raw).unwrap();
        assert_eq!(plan.chart_type, ChartType::Pie);
        assert_eq!(plan.x_col, "region");
        assert_eq!(plan.followups, vec!["a", "b", "c"]);
        assert!(!plan.is_degraded());
    }

    #[test]
    fn test_missing_and_invalid_fields_default() {
        let plan =
            QueryPlan::from_response(r#"{"sql": "SELECT 1", "chart_type": "scatter", "x_col": null}"#)
                .unwrap();
        assert_eq!(plan.chart_type, ChartType::Bar);
        assert_eq!(plan.x_col, "");
        assert_eq!(plan.y_col, "");
        assert!(plan.followups.is_empty());
        assert_eq!(plan.explanation, "");
    }

    #[test]
    fn test_unparseable_response_is_error() {
        assert!(matches!(QueryPlan::from_response("Sure! Here is"), Err(BiError::Json(_))));
        assert!(matches!(QueryPlan::from_response(""), Err(BiError::Llm(_))));
        assert!(matches!(QueryPlan::from_response("[1,2]"), Err(BiError::Llm(_))));
    }

    #[test]
    fn test_degraded_plan_shape() {
        let outcome = PlanOutcome::degraded(GenerationFailure::Backend("quota exceeded".into()));
        let plan = outcome.plan();
        assert_eq!(plan.sql, DEGRADED_SQL);
        assert_eq!(plan.explanation, "⚠️ Vertex AI error: quota exceeded");
        assert_eq!(plan.chart_type, ChartType::Bar);
        assert!(plan.x_col.is_empty() && plan.y_col.is_empty() && plan.followups.is_empty());
        assert_eq!(plan.error.as_deref(), Some("quota exceeded"));
        assert!(matches!(outcome.failure(), Some(GenerationFailure::Backend(_))));
    }

    #[test]
    fn test_failure_from_error_kinds() {
        let failure: GenerationFailure = BiError::Timeout(60).into();
        assert_eq!(failure, GenerationFailure::Timeout(60));
        let failure: GenerationFailure = BiError::Llm("boom".into()).into();
        assert_eq!(failure, GenerationFailure::Backend("boom".into()));
    }
}
