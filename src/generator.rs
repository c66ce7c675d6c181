//! Plan Generator
//!
//! Offline sources get their canned plan. Live sources go through the generative backend,
//! bounded by a timeout; every failure becomes a degraded plan instead of an error.

use crate::config::Settings;
use crate::error::BiError;
use crate::fixtures;
use crate::llm::{build_system_prompt, GenerationRequest, GenerativeBackend};
use crate::plan::{GenerationFailure, PlanOutcome, QueryPlan};
use crate::schema::SchemaProvider;
use crate::sources::SourceDescriptor;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub struct PlanGenerator {
    backend: Option<Arc<dyn GenerativeBackend>>,
    schemas: SchemaProvider,
    timeout: Duration,
    temperature: f64,
    max_output_tokens: u32,
    /// Why `backend` is absent, surfaced on every live request.
    unavailable: Option<GenerationFailure>,
}

impl PlanGenerator {
    pub fn new(backend: Arc<dyn GenerativeBackend>, schemas: SchemaProvider) -> Self {
        let defaults = Settings::default();
        Self {
            backend: Some(backend),
            schemas,
            timeout: defaults.generation_timeout,
            temperature: defaults.temperature,
            max_output_tokens: defaults.max_output_tokens,
            unavailable: None,
        }
    }

    /// Generator that can only serve offline sources; live requests degrade with `reason`.
    pub fn offline_only(schemas: SchemaProvider, reason: BiError) -> Self {
        let defaults = Settings::default();
        Self {
            backend: None,
            schemas,
            timeout: defaults.generation_timeout,
            temperature: defaults.temperature,
            max_output_tokens: defaults.max_output_tokens,
            unavailable: Some(reason.into()),
        }
    }

    pub fn with_settings(mut self, settings: &Settings) -> Self {
        self.timeout = settings.generation_timeout;
        self.temperature = settings.temperature;
        self.max_output_tokens = settings.max_output_tokens;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn schemas(&self) -> &SchemaProvider {
        &self.schemas
    }

    pub async fn generate(
        &self,
        question: &str,
        model_id: &str,
        source: &SourceDescriptor,
    ) -> PlanOutcome {
        if source.is_local() {
            info!("Serving canned plan for offline source {}", source.id);
            return PlanOutcome::Generated(fixtures::offline_plan(source.base_id()));
        }

        let request = self.build_request(question, model_id, source.base_id());
        match self.call_backend(&request).await {
            Ok(plan) => {
                info!(
                    "Generated plan for {} with {} (chart: {})",
                    source.id, model_id, plan.chart_type
                );
                PlanOutcome::Generated(plan)
            }
            Err(failure) => {
                warn!("Plan generation failed for {}: {}", source.id, failure);
                PlanOutcome::degraded(failure)
            }
        }
    }

    pub fn build_request(&self, question: &str, model_id: &str, base_id: &str) -> GenerationRequest {
        let source_name = self.schemas.source_name(base_id);
        let schema = self.schemas.describe(base_id);
        GenerationRequest {
            model: model_id.to_string(),
            system_instruction: build_system_prompt(&source_name, &schema),
            source_name,
            schema,
            question: question.to_string(),
            temperature: self.temperature,
            max_output_tokens: self.max_output_tokens,
        }
    }

    async fn call_backend(
        &self,
        request: &GenerationRequest,
    ) -> std::result::Result<QueryPlan, GenerationFailure> {
        let backend = match &self.backend {
            Some(backend) => backend,
            None => {
                return Err(self.unavailable.clone().unwrap_or_else(|| {
                    GenerationFailure::Backend("No generative backend configured".to_string())
                }))
            }
        };

        let raw = match tokio::time::timeout(self.timeout, backend.generate(request)).await {
            Ok(result) => result?,
            Err(_) => return Err(GenerationFailure::Timeout(self.timeout.as_millis() as u64)),
        };

        QueryPlan::from_response(&raw).map_err(|e| match e {
            BiError::Json(err) => GenerationFailure::InvalidResponse(err.to_string()),
            BiError::Llm(msg) => GenerationFailure::InvalidResponse(msg),
            other => other.into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::plan::ChartType;
    use crate::sources::SourceRegistry;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct ScriptedBackend {
        reply: std::result::Result<String, String>,
        seen: Mutex<Vec<GenerationRequest>>,
    }

    impl ScriptedBackend {
        fn replying(reply: std::result::Result<String, String>) -> Arc<Self> {
            Arc::new(Self {
                reply,
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl GenerativeBackend for ScriptedBackend {
        fn name(&self) -> &'static str {
            "scripted"
        }

        async fn generate(&self, request: &GenerationRequest) -> Result<String> {
            self.seen.lock().unwrap().push(request.clone());
            match &self.reply {
                Ok(text) => Ok(text.clone()),
                Err(e) => Err(BiError::Llm(e.clone())),
            }
        }
    }

    struct HangingBackend;

    #[async_trait]
    impl GenerativeBackend for HangingBackend {
        fn name(&self) -> &'static str {
            "hanging"
        }

        async fn generate(&self, _request: &GenerationRequest) -> Result<String> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok("{}".to_string())
        }
    }

    fn schemas() -> SchemaProvider {
        SchemaProvider::new("acme", "erp_poc")
    }

    #[tokio::test]
    async fn test_offline_plans_are_deterministic_and_never_call_backend() {
        let backend = ScriptedBackend::replying(Err("must not be called".into()));
        let generator = PlanGenerator::new(backend.clone(), schemas());
        let registry = SourceRegistry::new();

        for source in registry.local_sources() {
            let first = generator.generate("anything", "gemini-2.0-flash-001", source).await;
            let second = generator.generate("something else", "gemini-1.5-pro-002", source).await;
            assert_eq!(first, second);
            let plan = first.plan();
            assert!(!plan.sql.is_empty());
            assert!(matches!(plan.chart_type, ChartType::Bar | ChartType::Line | ChartType::Pie));
        }
        assert!(backend.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_live_request_is_grounded_in_schema() {
        let backend = ScriptedBackend::replying(Ok(
            r#"{"sql":"SELECT 1","explanation":"ok","chart_type":"line","x_col":"a","y_col":"b","followups":[]}"#
                .to_string(),
        ));
        let generator = PlanGenerator::new(backend.clone(), schemas());
        let source = SourceRegistry::new().resolve("jira").unwrap();

        let outcome = generator.generate("velocity?", "gemini-1.5-pro-002", source).await;
        assert_eq!(outcome.plan().chart_type, ChartType::Line);

        let seen = backend.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].model, "gemini-1.5-pro-002");
        assert!(seen[0].system_instruction.contains("JIRA Project Management"));
        assert!(seen[0].system_instruction.contains("`acme.erp_poc.jira_sprints`"));
        assert_eq!(seen[0].user_text(), "Business question: velocity?");
        assert!((seen[0].temperature - 0.1).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_backend_error_degrades() {
        let backend = ScriptedBackend::replying(Err("quota".into()));
        let generator = PlanGenerator::new(backend, schemas());
        let source = SourceRegistry::new().resolve("salesforce").unwrap();

        let outcome = generator.generate("q", "gemini-2.0-flash-001", source).await;
        assert!(matches!(outcome.failure(), Some(GenerationFailure::Backend(_))));
        let plan = outcome.plan();
        assert!(plan.sql.starts_with("--"));
        assert_eq!(plan.explanation, "⚠️ Vertex AI error: quota");
        assert_eq!(plan.error.as_deref(), Some("quota"));
    }

    #[tokio::test]
    async fn test_garbage_response_degrades_as_invalid() {
        let backend = ScriptedBackend::replying(Ok("I cannot help with that.".to_string()));
        let generator = PlanGenerator::new(backend, schemas());
        let source = SourceRegistry::new().resolve("coupa").unwrap();

        let outcome = generator.generate("q", "gemini-2.0-flash-001", source).await;
        assert!(matches!(outcome.failure(), Some(GenerationFailure::InvalidResponse(_))));
        assert!(outcome.plan().followups.is_empty());
    }

    #[tokio::test]
    async fn test_timeout_degrades() {
        let generator = PlanGenerator::new(Arc::new(HangingBackend), schemas())
            .with_timeout(Duration::from_millis(20));
        let source = SourceRegistry::new().resolve("netsuite").unwrap();

        let outcome = generator.generate("q", "gemini-2.0-flash-001", source).await;
        assert_eq!(outcome.failure(), Some(&GenerationFailure::Timeout(20)));
        assert!(outcome.plan().explanation.ends_with("model did not respond within 20ms"));
    }

    #[tokio::test]
    async fn test_offline_only_generator_reports_missing_capability() {
        let generator = PlanGenerator::offline_only(
            schemas(),
            BiError::MissingCapability {
                capability: "Vertex AI credentials".into(),
                remedy: "Set GCP_ACCESS_TOKEN.".into(),
            },
        );
        let registry = SourceRegistry::new();

        let live = generator
            .generate("q", "gemini-2.0-flash-001", registry.resolve("workday").unwrap())
            .await;
        match live.failure() {
            Some(GenerationFailure::MissingCapability { capability, .. }) => {
                assert_eq!(capability, "Vertex AI credentials")
            }
            other => panic!("unexpected failure {:?}", other),
        }

        let offline = generator
            .generate("q", "gemini-2.0-flash-001", registry.resolve("local_workday").unwrap())
            .await;
        assert!(offline.failure().is_none());
    }
}
