//! BI Assistant - composes plan generation and execution into a turn
//!
//! The assistant itself holds no conversation state. Callers pass their own
//! `Session`, so independent sessions can share one assistant.

use crate::config::Settings;
use crate::execution::{BigQueryEngine, QueryExecutor};
use crate::generator::PlanGenerator;
use crate::llm::VertexAiClient;
use crate::models::ModelRegistry;
use crate::schema::SchemaProvider;
use crate::session::{Provenance, Session, Strategy, TurnPhase, TurnRecord};
use crate::sources::SourceRegistry;
use std::sync::Arc;
use tracing::{info, warn};

pub struct BiAssistant {
    sources: SourceRegistry,
    models: ModelRegistry,
    generator: PlanGenerator,
    executor: QueryExecutor,
}

impl BiAssistant {
    pub fn new(generator: PlanGenerator, executor: QueryExecutor) -> Self {
        Self {
            sources: SourceRegistry::new(),
            models: ModelRegistry::new(),
            generator,
            executor,
        }
    }

    /// Wire up Vertex AI and BigQuery from settings. Missing credentials leave the
    /// offline sources fully usable; live turns then report what is missing.
    pub fn from_settings(settings: &Settings) -> Self {
        let schemas = SchemaProvider::from_settings(settings);

        let generator = match VertexAiClient::from_settings(settings) {
            Ok(client) => PlanGenerator::new(Arc::new(client), schemas),
            Err(e) => {
                warn!("Vertex AI unavailable, live generation disabled: {}", e);
                PlanGenerator::offline_only(schemas, e)
            }
        }
        .with_settings(settings);

        let executor = match BigQueryEngine::from_settings(settings) {
            Ok(engine) => QueryExecutor::new(Arc::new(engine)),
            Err(e) => {
                warn!("BigQuery unavailable, live execution disabled: {}", e);
                QueryExecutor::offline_only(e)
            }
        }
        .with_timeout(settings.execution_timeout);

        Self::new(generator, executor)
    }

    pub fn sources(&self) -> &SourceRegistry {
        &self.sources
    }

    pub fn models(&self) -> &ModelRegistry {
        &self.models
    }

    pub fn schemas(&self) -> &SchemaProvider {
        self.generator.schemas()
    }

    /// Answer one question. Always lands in a displayable turn; generation and
    /// execution failures are carried inside the returned record.
    pub async fn submit(
        &self,
        session: &mut Session,
        question: &str,
        model_selector: &str,
        source_selector: &str,
    ) -> TurnRecord {
        let source = self.sources.resolve_or_default(source_selector);
        let model = self.models.resolve_or_default(model_selector);

        let strategy = if source.is_local() {
            Strategy::Offline
        } else {
            Strategy::Live {
                model_id: model.id.to_string(),
                model_label: model.label.to_string(),
            }
        };
        let provenance = Provenance {
            source_id: source.id.clone(),
            source_label: source.label.clone(),
            strategy,
        };

        session.set_phase(TurnPhase::Generating);
        info!(session = %session.id(), phase = %TurnPhase::Generating, "Question for {}: {}", source.id, question);
        let outcome = self.generator.generate(question, model.id, source).await;
        let generation_error = outcome.failure().cloned();
        let plan = outcome.into_plan();

        session.set_phase(TurnPhase::Executing);
        info!(session = %session.id(), phase = %TurnPhase::Executing, "Executing plan for {}", source.id);
        let result = self.executor.execute(&plan.sql, source, question).await;
        let turn = TurnRecord::new(question, plan, generation_error, result, provenance);
        session.record(turn.clone());
        info!(
            session = %session.id(),
            phase = %TurnPhase::Rendered,
            "Turn rendered: {} rows from {} in {}ms, execution error: {}",
            turn.table().map(|df| df.height()).unwrap_or(0),
            turn.engine,
            turn.execution_time_ms,
            turn.execution_error.is_some()
        );
        turn
    }
}
