//! Per-session conversation state
//!
//! A `Session` owns the append-only message log and the current turn's artifacts.
//! Nothing here is shared between sessions.

use crate::execution::{ExecutionFailure, TabularResult};
use crate::plan::{GenerationFailure, QueryPlan};
use chrono::{DateTime, Utc};
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const LOCAL_MODEL_LABEL: &str = "Local Demo";
pub const QUERY_ERROR_PREFIX: &str = "⚠️ Query error: ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Agent,
}

/// One line of the conversation log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    /// Set on agent messages only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_label: Option<String>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            model_label: None,
        }
    }

    pub fn agent(content: impl Into<String>, model_label: impl Into<String>) -> Self {
        Self {
            role: Role::Agent,
            content: content.into(),
            model_label: Some(model_label.into()),
        }
    }

    pub fn is_warning(&self) -> bool {
        self.content.contains(QUERY_ERROR_PREFIX)
    }
}

/// How a turn's plan was produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "strategy", rename_all = "lowercase")]
pub enum Strategy {
    Offline,
    Live { model_id: String, model_label: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Provenance {
    pub source_id: String,
    /// Plain catalog label, without the icon.
    pub source_label: String,
    #[serde(flatten)]
    pub strategy: Strategy,
}

impl Provenance {
    pub fn model_label(&self) -> &str {
        match &self.strategy {
            Strategy::Offline => LOCAL_MODEL_LABEL,
            Strategy::Live { model_label, .. } => model_label,
        }
    }

    pub fn is_offline(&self) -> bool {
        matches!(self.strategy, Strategy::Offline)
    }
}

/// Lifecycle of one submitted question. Every path ends in `Rendered`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnPhase {
    Idle,
    Generating,
    Executing,
    Rendered,
}

impl std::fmt::Display for TurnPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TurnPhase::Idle => "idle",
            TurnPhase::Generating => "generating",
            TurnPhase::Executing => "executing",
            TurnPhase::Rendered => "rendered",
        };
        f.write_str(name)
    }
}

/// Result of one question. The table is present only when execution succeeded.
#[derive(Debug, Clone)]
pub struct TurnRecord {
    pub question: String,
    pub plan: QueryPlan,
    pub generation_error: Option<GenerationFailure>,
    pub execution_error: Option<ExecutionFailure>,
    pub provenance: Provenance,
    /// Engine that ran the SQL ("fixture", "bigquery", or "none" when nothing could run it).
    pub engine: String,
    pub execution_time_ms: u64,
    pub timestamp: DateTime<Utc>,
    table: Option<DataFrame>,
}

impl TurnRecord {
    pub fn new(
        question: impl Into<String>,
        plan: QueryPlan,
        generation_error: Option<GenerationFailure>,
        result: TabularResult,
        provenance: Provenance,
    ) -> Self {
        let engine = result.engine_name().to_string();
        let execution_time_ms = result.execution_time_ms();
        let (table, execution_error) = result.into_parts();
        Self {
            question: question.into(),
            plan,
            generation_error,
            execution_error,
            provenance,
            engine,
            execution_time_ms,
            timestamp: Utc::now(),
            table,
        }
    }

    pub fn table(&self) -> Option<&DataFrame> {
        self.table.as_ref()
    }

    /// Explanation as shown to the user, with the execution error appended as a warning.
    pub fn agent_text(&self) -> String {
        match &self.execution_error {
            Some(err) => format!("{}\n\n{}{}", self.plan.explanation, QUERY_ERROR_PREFIX, err),
            None => self.plan.explanation.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Session {
    id: Uuid,
    log: Vec<ChatMessage>,
    current: Option<TurnRecord>,
    phase: TurnPhase,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            log: Vec::new(),
            current: None,
            phase: TurnPhase::Idle,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.log
    }

    pub fn current(&self) -> Option<&TurnRecord> {
        self.current.as_ref()
    }

    /// Table of the current turn, absent when its execution failed.
    pub fn current_table(&self) -> Option<&DataFrame> {
        self.current.as_ref().and_then(TurnRecord::table)
    }

    pub fn phase(&self) -> TurnPhase {
        self.phase
    }

    pub(crate) fn set_phase(&mut self, phase: TurnPhase) {
        self.phase = phase;
    }

    /// Append the user/agent pair and make `turn` the current result.
    pub(crate) fn record(&mut self, turn: TurnRecord) {
        self.log.push(ChatMessage::user(turn.question.clone()));
        self.log.push(ChatMessage::agent(turn.agent_text(), turn.provenance.model_label()));
        self.current = Some(turn);
        self.phase = TurnPhase::Rendered;
    }

    pub fn last_question(&self) -> Option<&str> {
        self.current.as_ref().map(|turn| turn.question.as_str())
    }

    pub fn followups(&self) -> &[String] {
        self.current
            .as_ref()
            .map(|turn| turn.plan.followups.as_slice())
            .unwrap_or(&[])
    }

    /// Forget the log and the current result. The session id is kept.
    pub fn clear(&mut self) {
        self.log.clear();
        self.current = None;
        self.phase = TurnPhase::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;

    fn provenance() -> Provenance {
        Provenance {
            source_id: "jira".into(),
            source_label: "Jira".into(),
            strategy: Strategy::Live {
                model_id: "gemini-2.0-flash-001".into(),
                model_label: "Gemini 2.0 Flash".into(),
            },
        }
    }

    fn plan() -> QueryPlan {
        QueryPlan {
            sql: "SELECT 1".into(),
            explanation: "Counts issues.".into(),
            followups: vec!["Which team?".into()],
            ..QueryPlan::default()
        }
    }

    fn table() -> TabularResult {
        TabularResult::success(df!["a" => [1i64]].unwrap(), "bigquery", 42)
    }

    #[test]
    fn test_failed_execution_has_no_table() {
        let failed = TabularResult::failure(ExecutionFailure::Query("boom".into()), "bigquery", 7);
        let turn = TurnRecord::new("q", plan(), None, failed, provenance());
        assert!(turn.table().is_none());
        assert_eq!(turn.engine, "bigquery");
        assert_eq!(turn.execution_time_ms, 7);
        assert_eq!(turn.agent_text(), "Counts issues.\n\n⚠️ Query error: boom");
    }

    #[test]
    fn test_execution_stats_carried() {
        let turn = TurnRecord::new("q", plan(), None, table(), provenance());
        assert_eq!(turn.table().map(|df| df.height()), Some(1));
        assert_eq!(turn.engine, "bigquery");
        assert_eq!(turn.execution_time_ms, 42);
        assert!(turn.execution_error.is_none());
    }

    #[test]
    fn test_record_appends_pair_and_replaces_current() {
        let mut session = Session::new();
        session.record(TurnRecord::new("first", plan(), None, table(), provenance()));
        session.record(TurnRecord::new("second", plan(), None, table(), provenance()));

        assert_eq!(session.messages().len(), 4);
        assert_eq!(session.messages()[2], ChatMessage::user("second"));
        assert_eq!(session.messages()[3].model_label.as_deref(), Some("Gemini 2.0 Flash"));
        assert_eq!(session.last_question(), Some("second"));
        assert_eq!(session.followups(), ["Which team?".to_string()]);
        assert_eq!(session.phase(), TurnPhase::Rendered);
    }

    #[test]
    fn test_clear_keeps_id() {
        let mut session = Session::new();
        let id = session.id();
        session.record(TurnRecord::new("q", plan(), None, table(), provenance()));
        session.clear();
        assert_eq!(session.id(), id);
        assert!(session.messages().is_empty());
        assert!(session.current().is_none());
        assert!(session.followups().is_empty());
    }

    #[test]
    fn test_offline_model_label() {
        let p = Provenance {
            source_id: "local_jira".into(),
            source_label: "Jira (Local)".into(),
            strategy: Strategy::Offline,
        };
        assert_eq!(p.model_label(), LOCAL_MODEL_LABEL);
        assert!(p.is_offline());
    }
}
