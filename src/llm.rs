use crate::config::Settings;
use crate::error::{BiError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

pub const SYSTEM_PROMPT_TEMPLATE: &str = r#"You are an expert BI analyst and SQL engineer working with enterprise data.
The data comes from {source_name} and is stored in BigQuery.

Schema:
{schema}

Your task:
1. Understand the user's business question
2. Generate a valid BigQuery SQL query
3. Choose best chart type: "bar", "line", or "pie"
4. Pick x and y columns for the chart
5. Write a clear 2-3 sentence business explanation
6. Suggest 3 relevant follow-up questions

Respond ONLY in this JSON format (no markdown, no extra text):
{
  "sql": "<SQL>",
  "explanation": "<explanation>",
  "chart_type": "<bar|line|pie>",
  "x_col": "<column>",
  "y_col": "<column>",
  "followups": ["<q1>", "<q2>", "<q3>"]
}
"#;

pub fn build_system_prompt(source_name: &str, schema: &str) -> String {
    SYSTEM_PROMPT_TEMPLATE
        .replace("{source_name}", source_name)
        .replace("{schema}", schema)
}

/// One generation call: grounding instruction plus the user's question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub model: String,
    pub source_name: String,
    pub schema: String,
    pub system_instruction: String,
    pub question: String,
    pub temperature: f64,
    pub max_output_tokens: u32,
}

impl GenerationRequest {
    pub fn user_text(&self) -> String {
        format!("Business question: {}", self.question)
    }
}

/// Text-generation backend. Returns the raw model text; parsing happens in the generator.
#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    fn name(&self) -> &'static str;

    async fn generate(&self, request: &GenerationRequest) -> Result<String>;
}

/// Vertex AI `generateContent` over REST.
pub struct VertexAiClient {
    client: Client,
    endpoint: String,
    project: String,
    location: String,
    access_token: String,
}

impl VertexAiClient {
    pub fn new(
        endpoint: String,
        project: String,
        location: String,
        access_token: String,
    ) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| BiError::Llm(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            project,
            location,
            access_token,
        })
    }

    /// Requires a project and an access token; anything else is a missing capability.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        if settings.project_id.is_empty() {
            return Err(BiError::MissingCapability {
                capability: "Vertex AI (GCP_PROJECT_ID)".to_string(),
                remedy: "Set GCP_PROJECT_ID in the environment or .env file.".to_string(),
            });
        }
        let token = settings
            .access_token
            .clone()
            .ok_or_else(|| BiError::MissingCapability {
                capability: "Vertex AI credentials".to_string(),
                remedy: "Set GCP_ACCESS_TOKEN (e.g. from `gcloud auth print-access-token`)."
                    .to_string(),
            })?;
        Self::new(
            settings.vertex_endpoint(),
            settings.project_id.clone(),
            settings.location.clone(),
            token,
        )
    }

    fn url(&self, model: &str) -> String {
        format!(
            "{}/projects/{}/locations/{}/publishers/google/models/{}:generateContent",
            self.endpoint, self.project, self.location, model
        )
    }

    fn request_body(request: &GenerationRequest) -> serde_json::Value {
        serde_json::json!({
            "systemInstruction": {
                "parts": [{"text": request.system_instruction}]
            },
            "contents": [
                {"role": "user", "parts": [{"text": request.user_text()}]}
            ],
            "generationConfig": {
                "temperature": request.temperature,
                "maxOutputTokens": request.max_output_tokens
            }
        })
    }
}

#[async_trait]
impl GenerativeBackend for VertexAiClient {
    fn name(&self) -> &'static str {
        "vertex-ai"
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        debug!("Calling Vertex AI model {}", request.model);

        let response = self
            .client
            .post(self.url(&request.model))
            .bearer_auth(&self.access_token)
            .json(&Self::request_body(request))
            .send()
            .await
            .map_err(|e| BiError::Llm(format!("Vertex AI call failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(BiError::Llm(format!("{}: {}", status, error_text)));
        }

        let response_json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| BiError::Llm(format!("Failed to parse Vertex AI response: {}", e)))?;

        extract_text(&response_json)
    }
}

/// Pull the candidate text out of a `generateContent` response.
pub fn extract_text(response: &serde_json::Value) -> Result<String> {
    if let Some(error) = response.get("error") {
        let message = error
            .get("message")
            .and_then(|m| m.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string());
        return Err(BiError::Llm(message));
    }

    if let Some(reason) = response
        .pointer("/promptFeedback/blockReason")
        .and_then(|r| r.as_str())
    {
        return Err(BiError::Llm(format!("Prompt blocked: {}", reason)));
    }

    let candidate = response
        .get("candidates")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .ok_or_else(|| BiError::Llm("No candidates in Vertex AI response".to_string()))?;

    match candidate.get("finishReason").and_then(|r| r.as_str()) {
        Some("SAFETY") | Some("RECITATION") | Some("BLOCKLIST") | Some("PROHIBITED_CONTENT") => {
            let reason = candidate["finishReason"].as_str().unwrap_or_default();
            return Err(BiError::Llm(format!("Response was filtered: {}", reason)));
        }
        Some("MAX_TOKENS") => warn!("Vertex AI response was truncated due to length limit"),
        _ => {}
    }

    let text: String = candidate
        .pointer("/content/parts")
        .and_then(|p| p.as_array())
        .map(|parts| {
            parts
                .iter()
                .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
                .collect()
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(BiError::Llm("Empty content in Vertex AI response".to_string()));
    }

    Ok(text)
}
