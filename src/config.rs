//! Runtime settings loaded from the environment (and `.env` via dotenv in the binary).

use crate::error::{BiError, Result};
use std::time::Duration;

pub const DEFAULT_LOCATION: &str = "us-central1";
pub const DEFAULT_DATASET: &str = "erp_poc";
pub const PLACEHOLDER_PROJECT: &str = "YOUR_PROJECT";

#[derive(Debug, Clone)]
pub struct Settings {
    /// GCP project used for both Vertex AI and BigQuery. Empty when unset.
    pub project_id: String,
    pub location: String,
    pub dataset: String,
    /// OAuth bearer token for the Google REST APIs.
    pub access_token: Option<String>,
    pub vertex_base_url: Option<String>,
    pub bigquery_base_url: String,
    pub generation_timeout: Duration,
    pub execution_timeout: Duration,
    pub temperature: f64,
    pub max_output_tokens: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            project_id: String::new(),
            location: DEFAULT_LOCATION.to_string(),
            dataset: DEFAULT_DATASET.to_string(),
            access_token: None,
            vertex_base_url: None,
            bigquery_base_url: "https://bigquery.googleapis.com/bigquery/v2".to_string(),
            generation_timeout: Duration::from_secs(60),
            execution_timeout: Duration::from_secs(120),
            temperature: 0.1,
            max_output_tokens: 2048,
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        Ok(Self {
            project_id: get("GCP_PROJECT_ID").unwrap_or_default(),
            location: get("GCP_LOCATION").unwrap_or(defaults.location),
            dataset: get("BQ_DATASET").unwrap_or(defaults.dataset),
            access_token: get("GCP_ACCESS_TOKEN"),
            vertex_base_url: get("VERTEX_BASE_URL"),
            bigquery_base_url: get("BIGQUERY_BASE_URL").unwrap_or(defaults.bigquery_base_url),
            generation_timeout: match get("BI_GENERATION_TIMEOUT_SECS") {
                Some(v) => Duration::from_secs(parse_number("BI_GENERATION_TIMEOUT_SECS", &v)?),
                None => defaults.generation_timeout,
            },
            execution_timeout: match get("BI_EXECUTION_TIMEOUT_SECS") {
                Some(v) => Duration::from_secs(parse_number("BI_EXECUTION_TIMEOUT_SECS", &v)?),
                None => defaults.execution_timeout,
            },
            temperature: match get("BI_TEMPERATURE") {
                Some(v) => parse_number("BI_TEMPERATURE", &v)?,
                None => defaults.temperature,
            },
            max_output_tokens: match get("BI_MAX_OUTPUT_TOKENS") {
                Some(v) => parse_number("BI_MAX_OUTPUT_TOKENS", &v)?,
                None => defaults.max_output_tokens,
            },
        })
    }

    /// Project name used in schema text; falls back to a placeholder when unset.
    pub fn project_or_placeholder(&self) -> &str {
        if self.project_id.is_empty() {
            PLACEHOLDER_PROJECT
        } else {
            &self.project_id
        }
    }

    pub fn vertex_endpoint(&self) -> String {
        match &self.vertex_base_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("https://{}-aiplatform.googleapis.com/v1", self.location),
        }
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .parse::<T>()
        .map_err(|_| BiError::Config(format!("{} has invalid value '{}'", key, value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_env_empty() {
        let settings = Settings::from_lookup(lookup(&[])).unwrap();
        assert_eq!(settings.location, "us-central1");
        assert_eq!(settings.dataset, "erp_poc");
        assert!(settings.access_token.is_none());
        assert_eq!(settings.project_or_placeholder(), "YOUR_PROJECT");
        assert_eq!(settings.max_output_tokens, 2048);
        assert_eq!(
            settings.vertex_endpoint(),
            "https://us-central1-aiplatform.googleapis.com/v1"
        );
    }

    #[test]
    fn test_overrides_and_blank_values() {
        let settings = Settings::from_lookup(lookup(&[
            ("GCP_PROJECT_ID", "acme-bi"),
            ("BQ_DATASET", "  "),
            ("GCP_ACCESS_TOKEN", "ya29.token"),
            ("BI_EXECUTION_TIMEOUT_SECS", "15"),
            ("VERTEX_BASE_URL", "http://localhost:9000/"),
        ]))
        .unwrap();
        assert_eq!(settings.project_or_placeholder(), "acme-bi");
        assert_eq!(settings.dataset, "erp_poc");
        assert_eq!(settings.access_token.as_deref(), Some("ya29.token"));
        assert_eq!(settings.execution_timeout, Duration::from_secs(15));
        assert_eq!(settings.vertex_endpoint(), "http://localhost:9000");
    }

    #[test]
    fn test_invalid_number_is_config_error() {
        let err = Settings::from_lookup(lookup(&[("BI_TEMPERATURE", "warm")])).unwrap_err();
        assert!(matches!(err, BiError::Config(_)));
    }
}
