pub mod assistant;
pub mod chart;
pub mod config;
pub mod error;
pub mod execution;
pub mod fixtures;
pub mod generator;
pub mod llm;
pub mod models;
pub mod plan;
pub mod report;
pub mod schema;
pub mod session;
pub mod sources;

pub use assistant::BiAssistant;
pub use config::Settings;
pub use error::{BiError, Result};
pub use plan::{ChartType, PlanOutcome, QueryPlan};
pub use session::{Session, TurnRecord};
pub use sources::{SourceDescriptor, SourceRegistry};
