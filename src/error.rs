use thiserror::Error;

#[derive(Error, Debug)]
pub enum BiError {
    #[error("Unknown source '{id}'{}", did_you_mean(.suggestion))]
    UnknownSource {
        id: String,
        suggestion: Option<String>,
    },

    #[error("Unknown model: {0}")]
    UnknownModel(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Execution error: {0}")]
    Execution(String),

    #[error("{capability} is not available. {remedy}")]
    MissingCapability {
        capability: String,
        remedy: String,
    },

    #[error("Timed out after {0}ms")]
    Timeout(u64),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Polars error: {0}")]
    Polars(String),
}

impl From<polars::error::PolarsError> for BiError {
    fn from(err: polars::error::PolarsError) -> Self {
        BiError::Polars(err.to_string())
    }
}

fn did_you_mean(suggestion: &Option<String>) -> String {
    suggestion
        .as_ref()
        .map(|s| format!(" (did you mean '{}'?)", s))
        .unwrap_or_default()
}

pub type Result<T> = std::result::Result<T, BiError>;
