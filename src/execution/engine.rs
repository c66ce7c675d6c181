//! Execution Engine Trait - contract shared by the fixture and warehouse engines

use crate::error::Result;
use async_trait::async_trait;
use polars::prelude::DataFrame;
use std::time::Duration;

/// Per-query context passed to engines
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    /// Base identifier of the source being queried
    pub base_id: String,

    /// The question that produced the SQL. Fixture selection ignores it for now.
    pub question: String,

    /// Upper bound for the whole execution, including result paging
    pub timeout: Duration,
}

impl ExecutionContext {
    pub fn new(base_id: impl Into<String>, question: impl Into<String>, timeout: Duration) -> Self {
        Self {
            base_id: base_id.into(),
            question: question.into(),
            timeout,
        }
    }
}

#[async_trait]
pub trait ExecutionEngine: Send + Sync {
    /// Engine name (e.g., "fixture", "bigquery")
    fn name(&self) -> &'static str;

    /// Execute SQL and materialize the full result
    async fn execute(&self, sql: &str, ctx: &ExecutionContext) -> Result<DataFrame>;
}
