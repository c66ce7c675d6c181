//! Execution Module - runs a plan's SQL against the backing store for a source
//!
//! - ExecutionEngine trait for pluggable engines
//! - FixtureEngine serves bundled tables for offline sources
//! - BigQueryEngine runs SQL against the live warehouse
//! - QueryExecutor dispatches on the source kind and enforces the result/error contract

pub mod bigquery_engine;
pub mod engine;
pub mod executor;
pub mod fixture_engine;
pub mod result;

pub use bigquery_engine::BigQueryEngine;
pub use engine::{ExecutionContext, ExecutionEngine};
pub use executor::QueryExecutor;
pub use fixture_engine::FixtureEngine;
pub use result::{table_to_json, ExecutionFailure, TabularResult};
