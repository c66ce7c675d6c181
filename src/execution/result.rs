//! Tabular Result - a table or a failure, never both

use crate::error::{BiError, Result};
use polars::prelude::*;
use thiserror::Error;

/// Why a query produced no table.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExecutionFailure {
    #[error("{0}")]
    Query(String),

    #[error("{capability} is not available. {remedy}")]
    MissingCapability { capability: String, remedy: String },

    #[error("query did not finish within {0}ms")]
    Timeout(u64),
}

impl From<BiError> for ExecutionFailure {
    fn from(err: BiError) -> Self {
        match err {
            BiError::MissingCapability { capability, remedy } => {
                ExecutionFailure::MissingCapability { capability, remedy }
            }
            BiError::Timeout(ms) => ExecutionFailure::Timeout(ms),
            BiError::Execution(msg) => ExecutionFailure::Query(msg),
            other => ExecutionFailure::Query(other.to_string()),
        }
    }
}

/// Outcome of executing one query. Constructed only through `success` / `failure`,
/// so a failed result never carries a table.
#[derive(Debug, Clone)]
pub struct TabularResult {
    table: Option<DataFrame>,
    error: Option<ExecutionFailure>,
    engine_name: String,
    execution_time_ms: u64,
}

impl TabularResult {
    pub fn success(table: DataFrame, engine_name: impl Into<String>, execution_time_ms: u64) -> Self {
        Self {
            table: Some(table),
            error: None,
            engine_name: engine_name.into(),
            execution_time_ms,
        }
    }

    pub fn failure(
        error: ExecutionFailure,
        engine_name: impl Into<String>,
        execution_time_ms: u64,
    ) -> Self {
        Self {
            table: None,
            error: Some(error),
            engine_name: engine_name.into(),
            execution_time_ms,
        }
    }

    pub fn table(&self) -> Option<&DataFrame> {
        self.table.as_ref()
    }

    pub fn error(&self) -> Option<&ExecutionFailure> {
        self.error.as_ref()
    }

    pub fn error_message(&self) -> Option<String> {
        self.error.as_ref().map(|e| e.to_string())
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    pub fn engine_name(&self) -> &str {
        &self.engine_name
    }

    pub fn execution_time_ms(&self) -> u64 {
        self.execution_time_ms
    }

    pub fn row_count(&self) -> usize {
        self.table.as_ref().map(|t| t.height()).unwrap_or(0)
    }

    pub fn into_parts(self) -> (Option<DataFrame>, Option<ExecutionFailure>) {
        (self.table, self.error)
    }
}

/// Convert a table to `{"columns": [...], "rows": [{...}]}`.
pub fn table_to_json(df: &DataFrame) -> Result<serde_json::Value> {
    let columns: Vec<String> = df.get_column_names().iter().map(|s| s.to_string()).collect();
    let mut rows = Vec::with_capacity(df.height());

    for row_idx in 0..df.height() {
        let mut row = serde_json::Map::new();
        for series in df.get_columns() {
            row.insert(series.name().to_string(), cell_to_json(series, row_idx)?);
        }
        rows.push(serde_json::Value::Object(row));
    }

    Ok(serde_json::json!({
        "columns": columns,
        "rows": rows
    }))
}

fn cell_to_json(series: &Series, row_idx: usize) -> Result<serde_json::Value> {
    let value = series.get(row_idx)?;

    Ok(match value {
        AnyValue::Null => serde_json::Value::Null,
        AnyValue::Boolean(b) => serde_json::Value::Bool(b),
        AnyValue::String(s) => serde_json::Value::String(s.to_string()),
        AnyValue::Int8(i) => i.into(),
        AnyValue::Int16(i) => i.into(),
        AnyValue::Int32(i) => i.into(),
        AnyValue::Int64(i) => i.into(),
        AnyValue::UInt8(u) => u.into(),
        AnyValue::UInt16(u) => u.into(),
        AnyValue::UInt32(u) => u.into(),
        AnyValue::UInt64(u) => u.into(),
        AnyValue::Float32(f) => serde_json::Number::from_f64(f as f64)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        AnyValue::Float64(f) => serde_json::Number::from_f64(f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        other => serde_json::Value::String(other.to_string()),
    })
}
