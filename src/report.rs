//! Hand-off to report and email collaborators.

use crate::error::{BiError, Result};
use crate::plan::ChartType;
use crate::session::TurnRecord;
use polars::prelude::*;

/// Everything a report or email needs about one turn. Every text field is always
/// present; degraded turns carry empty strings and no table.
#[derive(Debug, Clone)]
pub struct ReportContext {
    pub question: String,
    pub explanation: String,
    pub sql: String,
    pub table: Option<DataFrame>,
    pub source_id: String,
    pub source_label: String,
    pub chart_type: ChartType,
    pub model_label: String,
    pub x_col: String,
    pub y_col: String,
}

impl ReportContext {
    pub fn from_turn(turn: &TurnRecord) -> Self {
        Self {
            question: turn.question.clone(),
            explanation: turn.plan.explanation.clone(),
            sql: turn.plan.sql.clone(),
            table: turn.table().cloned(),
            source_id: turn.provenance.source_id.clone(),
            source_label: turn.provenance.source_label.clone(),
            chart_type: turn.plan.chart_type,
            model_label: turn.provenance.model_label().to_string(),
            x_col: turn.plan.x_col.clone(),
            y_col: turn.plan.y_col.clone(),
        }
    }

    pub fn report_file_name(&self) -> String {
        format!("bi_report_{}.html", self.source_id)
    }

    pub fn data_file_name(&self) -> String {
        format!("bi_data_{}.csv", self.source_id)
    }

    /// Email subject: source label plus the first 50 characters of the question.
    pub fn email_subject(&self) -> String {
        let excerpt: String = self.question.chars().take(50).collect();
        format!("BI Report: {} — {}", self.source_label, excerpt)
    }

    /// Table as CSV with a header row. Empty string when there is no table.
    pub fn to_csv(&self) -> Result<String> {
        match &self.table {
            Some(df) => table_to_csv(df),
            None => Ok(String::new()),
        }
    }
}

pub fn table_to_csv(df: &DataFrame) -> Result<String> {
    let mut buffer: Vec<u8> = Vec::new();
    let mut df = df.clone();
    CsvWriter::new(&mut buffer)
        .include_header(true)
        .finish(&mut df)?;
    String::from_utf8(buffer).map_err(|e| BiError::Execution(format!("CSV output is not UTF-8: {}", e)))
}
