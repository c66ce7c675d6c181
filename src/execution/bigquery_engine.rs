//! BigQuery Execution Engine
//!
//! Runs standard SQL through the BigQuery REST API (`jobs.query`, then
//! `jobs.getQueryResults` until the job completes and every page is read).

use crate::config::Settings;
use crate::error::{BiError, Result};
use crate::execution::engine::{ExecutionContext, ExecutionEngine};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use polars::prelude::*;
use reqwest::Client;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tracing::{info, warn};

const MAX_POLLS: usize = 1000;
const PAGE_SIZE: u32 = 10_000;

pub struct BigQueryEngine {
    client: Client,
    base_url: String,
    project: String,
    dataset: String,
    access_token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryResponse {
    job_reference: Option<JobReference>,
    #[serde(default)]
    job_complete: bool,
    schema: Option<TableSchema>,
    #[serde(default)]
    rows: Vec<TableRow>,
    page_token: Option<String>,
    #[serde(default)]
    errors: Vec<ErrorProto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobReference {
    job_id: String,
    location: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TableSchema {
    #[serde(default)]
    pub fields: Vec<FieldSchema>,
}

#[derive(Debug, Deserialize)]
pub struct FieldSchema {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
    pub mode: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TableRow {
    #[serde(default)]
    pub f: Vec<TableCell>,
}

#[derive(Debug, Deserialize)]
pub struct TableCell {
    #[serde(default)]
    pub v: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ErrorProto {
    reason: Option<String>,
    message: String,
}

impl BigQueryEngine {
    pub fn new(base_url: String, project: String, dataset: String, access_token: String) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .tcp_keepalive(Duration::from_secs(60))
            .build()
            .map_err(|e| BiError::Execution(format!("Failed to create HTTP client for BigQuery: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            project,
            dataset,
            access_token,
        })
    }

    /// Requires a project and an access token; anything else is a missing capability.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        if settings.project_id.is_empty() {
            return Err(BiError::MissingCapability {
                capability: "BigQuery project (GCP_PROJECT_ID)".to_string(),
                remedy: "Set GCP_PROJECT_ID in the environment or .env file.".to_string(),
            });
        }
        let token = settings
            .access_token
            .clone()
            .ok_or_else(|| BiError::MissingCapability {
                capability: "BigQuery credentials".to_string(),
                remedy: "Set GCP_ACCESS_TOKEN (e.g. from `gcloud auth print-access-token`)."
                    .to_string(),
            })?;

        Self::new(
            settings.bigquery_base_url.clone(),
            settings.project_id.clone(),
            settings.dataset.clone(),
            token,
        )
    }

    async fn submit_query(&self, sql: &str, ctx: &ExecutionContext) -> Result<QueryResponse> {
        let url = format!("{}/projects/{}/queries", self.base_url, self.project);
        let body = serde_json::json!({
            "query": sql,
            "useLegacySql": false,
            "timeoutMs": ctx.timeout.as_millis() as u64,
            "maxResults": PAGE_SIZE,
            "defaultDataset": {
                "projectId": self.project,
                "datasetId": self.dataset
            }
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| BiError::Execution(format!("Failed to submit BigQuery query: {}", e)))?;

        Self::read_response(response).await
    }

    async fn fetch_results(
        &self,
        job: &JobReference,
        page_token: Option<&str>,
        remaining: Duration,
    ) -> Result<QueryResponse> {
        let url = format!(
            "{}/projects/{}/queries/{}",
            self.base_url, self.project, job.job_id
        );

        let mut params: Vec<(&str, String)> = vec![
            ("maxResults", PAGE_SIZE.to_string()),
            ("timeoutMs", remaining.as_millis().to_string()),
        ];
        if let Some(location) = &job.location {
            params.push(("location", location.clone()));
        }
        if let Some(token) = page_token {
            params.push(("pageToken", token.to_string()));
        }

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.access_token)
            .query(&params)
            .send()
            .await
            .map_err(|e| BiError::Execution(format!("Failed to fetch BigQuery results: {}", e)))?;

        Self::read_response(response).await
    }

    async fn read_response(response: reqwest::Response) -> Result<QueryResponse> {
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(BiError::Execution(format!(
                "BigQuery request failed with status {}: {}",
                status,
                api_error_message(&text)
            )));
        }

        let parsed: QueryResponse = response
            .json()
            .await
            .map_err(|e| BiError::Execution(format!("Failed to parse BigQuery response: {}", e)))?;

        if let Some(err) = parsed.errors.first() {
            return Err(BiError::Execution(format!(
                "BigQuery error: {}{}",
                err.message,
                err.reason
                    .as_ref()
                    .map(|r| format!(" ({})", r))
                    .unwrap_or_default()
            )));
        }

        Ok(parsed)
    }
}

/// Prefer `error.message` from a Google API error body, else the raw text.
fn api_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.pointer("/error/message").and_then(|m| m.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}

/// Convert BigQuery rows (all cells string-encoded) to a typed DataFrame.
pub fn rows_to_dataframe(fields: &[FieldSchema], rows: &[TableRow]) -> Result<DataFrame> {
    let mut columns = Vec::with_capacity(fields.len());

    for (col_idx, field) in fields.iter().enumerate() {
        let cells: Vec<Option<&serde_json::Value>> = rows
            .iter()
            .map(|row| row.f.get(col_idx).map(|c| &c.v).filter(|v| !v.is_null()))
            .collect();

        let repeated = field.mode.as_deref() == Some("REPEATED");
        let series = match field.field_type.as_str() {
            _ if repeated => Series::new(&field.name, cells.iter().map(|c| c.map(json_to_text)).collect::<Vec<_>>()),
            "INTEGER" | "INT64" => {
                let values: Vec<Option<i64>> = cells.iter().map(|c| c.and_then(parse_cell)).collect();
                Series::new(&field.name, values)
            }
            "FLOAT" | "FLOAT64" | "NUMERIC" | "BIGNUMERIC" => {
                let values: Vec<Option<f64>> = cells.iter().map(|c| c.and_then(parse_cell)).collect();
                Series::new(&field.name, values)
            }
            "BOOLEAN" | "BOOL" => {
                let values: Vec<Option<bool>> = cells
                    .iter()
                    .map(|c| c.and_then(|v| v.as_str()).map(|s| s.eq_ignore_ascii_case("true")))
                    .collect();
                Series::new(&field.name, values)
            }
            "DATE" => {
                let values: Vec<Option<NaiveDate>> = cells
                    .iter()
                    .map(|c| {
                        c.and_then(|v| v.as_str())
                            .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
                    })
                    .collect();
                Series::new(&field.name, values)
            }
            "TIMESTAMP" => {
                let values: Vec<Option<NaiveDateTime>> =
                    cells.iter().map(|c| c.and_then(parse_timestamp)).collect();
                Series::new(&field.name, values)
            }
            "DATETIME" => {
                let values: Vec<Option<NaiveDateTime>> = cells
                    .iter()
                    .map(|c| {
                        c.and_then(|v| v.as_str())
                            .and_then(|s| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f").ok())
                    })
                    .collect();
                Series::new(&field.name, values)
            }
            _ => Series::new(&field.name, cells.iter().map(|c| c.map(json_to_text)).collect::<Vec<_>>()),
        };

        columns.push(series);
    }

    Ok(DataFrame::new(columns)?)
}

fn parse_cell<T: std::str::FromStr>(value: &serde_json::Value) -> Option<T> {
    value.as_str().and_then(|s| s.parse::<T>().ok())
}

/// TIMESTAMP cells arrive as epoch seconds, possibly in exponent form ("1.7040672E9").
fn parse_timestamp(value: &serde_json::Value) -> Option<NaiveDateTime> {
    let secs: f64 = parse_cell(value)?;
    let whole = secs.floor();
    let nanos = ((secs - whole) * 1e9).round() as u32;
    DateTime::from_timestamp(whole as i64, nanos.min(999_999_999)).map(|dt| dt.naive_utc())
}

fn json_to_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[async_trait]
impl ExecutionEngine for BigQueryEngine {
    fn name(&self) -> &'static str {
        "bigquery"
    }

    async fn execute(&self, sql: &str, ctx: &ExecutionContext) -> Result<DataFrame> {
        let start_time = Instant::now();
        info!("Executing query with BigQuery: {}", sql);

        let first = self.submit_query(sql, ctx).await?;
        let job = first
            .job_reference
            .ok_or_else(|| BiError::Execution("BigQuery response has no job reference".to_string()))?;
        info!("BigQuery job submitted: {}", job.job_id);

        let mut schema = first.schema;
        let mut rows = first.rows;
        let mut complete = first.job_complete;
        let mut page_token = first.page_token;
        let mut poll_count = 0;

        while !complete || page_token.is_some() {
            let elapsed = start_time.elapsed();
            if elapsed >= ctx.timeout {
                return Err(BiError::Timeout(ctx.timeout.as_millis() as u64));
            }

            poll_count += 1;
            if poll_count > MAX_POLLS {
                return Err(BiError::Execution(format!(
                    "BigQuery job {} exceeded max polls ({})",
                    job.job_id, MAX_POLLS
                )));
            }

            let token = if complete { page_token.as_deref() } else { None };
            let page = self.fetch_results(&job, token, ctx.timeout - elapsed).await?;

            if !page.job_complete {
                warn!("BigQuery job {} still running (poll {})", job.job_id, poll_count);
                tokio::time::sleep(Duration::from_millis((100 * poll_count.min(10)) as u64)).await;
                continue;
            }

            complete = true;
            if schema.is_none() {
                schema = page.schema;
            }
            rows.extend(page.rows);
            page_token = page.page_token;
        }

        let fields = schema.map(|s| s.fields).unwrap_or_default();
        let df = rows_to_dataframe(&fields, &rows)?;

        info!(
            "BigQuery job {} returned {} rows in {}ms",
            job.job_id,
            df.height(),
            start_time.elapsed().as_millis()
        );
        Ok(df)
    }

}
