//! Query Executor - dispatches on the source kind and enforces the result/error contract

use crate::config::Settings;
use crate::error::BiError;
use crate::execution::engine::{ExecutionContext, ExecutionEngine};
use crate::execution::fixture_engine::FixtureEngine;
use crate::execution::result::{ExecutionFailure, TabularResult};
use crate::sources::SourceDescriptor;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

pub struct QueryExecutor {
    offline: Arc<dyn ExecutionEngine>,
    live: Option<Arc<dyn ExecutionEngine>>,
    /// Why `live` is absent, reported on every live request.
    unavailable: Option<ExecutionFailure>,
    timeout: Duration,
}

impl QueryExecutor {
    pub fn new(live: Arc<dyn ExecutionEngine>) -> Self {
        Self {
            offline: Arc::new(FixtureEngine::new()),
            live: Some(live),
            unavailable: None,
            timeout: Settings::default().execution_timeout,
        }
    }

    /// Executor without a warehouse; live requests fail with `reason`.
    pub fn offline_only(reason: BiError) -> Self {
        Self {
            offline: Arc::new(FixtureEngine::new()),
            live: None,
            unavailable: Some(reason.into()),
            timeout: Settings::default().execution_timeout,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn execute(&self, sql: &str, source: &SourceDescriptor, question: &str) -> TabularResult {
        let ctx = ExecutionContext::new(source.base_id(), question, self.timeout);

        let engine = if source.is_local() {
            &self.offline
        } else {
            match &self.live {
                Some(engine) => engine,
                None => {
                    let failure = self.unavailable.clone().unwrap_or_else(|| {
                        ExecutionFailure::MissingCapability {
                            capability: "BigQuery client".to_string(),
                            remedy: "Set GCP_PROJECT_ID and GCP_ACCESS_TOKEN to query live sources."
                                .to_string(),
                        }
                    });
                    warn!("Cannot execute against {}: {}", source.id, failure);
                    return TabularResult::failure(failure, "none", 0);
                }
            }
        };

        if !source.is_local() && !has_statement(sql) {
            return TabularResult::failure(
                ExecutionFailure::Query("No executable SQL was generated".to_string()),
                engine.name(),
                0,
            );
        }

        let start_time = Instant::now();
        let outcome = tokio::time::timeout(self.timeout, engine.execute(sql, &ctx)).await;
        let elapsed = start_time.elapsed().as_millis() as u64;

        match outcome {
            Ok(Ok(df)) => {
                info!(
                    "{} returned {} rows for {} in {}ms",
                    engine.name(),
                    df.height(),
                    source.id,
                    elapsed
                );
                TabularResult::success(df, engine.name(), elapsed)
            }
            Ok(Err(e)) => {
                warn!("{} execution failed for {}: {}", engine.name(), source.id, e);
                TabularResult::failure(e.into(), engine.name(), elapsed)
            }
            Err(_) => {
                warn!("{} execution timed out for {}", engine.name(), source.id);
                TabularResult::failure(
                    ExecutionFailure::Timeout(self.timeout.as_millis() as u64),
                    engine.name(),
                    elapsed,
                )
            }
        }
    }
}

/// True when the SQL has something besides whitespace and `--` comments.
fn has_statement(sql: &str) -> bool {
    sql.lines()
        .map(str::trim)
        .any(|line| !line.is_empty() && !line.starts_with("--"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::sources::SourceRegistry;
    use async_trait::async_trait;
    use polars::prelude::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FailingEngine {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ExecutionEngine for FailingEngine {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn execute(&self, _sql: &str, _ctx: &ExecutionContext) -> Result<DataFrame> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(BiError::Execution("connection reset by peer".to_string()))
        }
    }

    struct SlowEngine;

    #[async_trait]
    impl ExecutionEngine for SlowEngine {
        fn name(&self) -> &'static str {
            "slow"
        }

        async fn execute(&self, _sql: &str, _ctx: &ExecutionContext) -> Result<DataFrame> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(DataFrame::empty())
        }
    }

    #[tokio::test]
    async fn test_every_offline_source_returns_a_table() {
        let executor = QueryExecutor::offline_only(BiError::Config("no warehouse".into()));
        for source in SourceRegistry::new().local_sources() {
            let result = executor.execute("-- ignored", source, "q").await;
            assert!(result.error().is_none(), "{}", source.id);
            assert!(result.row_count() > 0, "{}", source.id);
        }
    }

    #[tokio::test]
    async fn test_live_failure_yields_no_table() {
        let engine = Arc::new(FailingEngine { calls: AtomicUsize::new(0) });
        let executor = QueryExecutor::new(engine.clone());
        let source = SourceRegistry::new().resolve("salesforce").unwrap();

        let result = executor.execute("SELECT 1", source, "q").await;
        assert!(result.table().is_none());
        assert_eq!(
            result.error_message().as_deref(),
            Some("connection reset by peer")
        );
        assert_eq!(engine.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_missing_warehouse_is_missing_capability() {
        let executor = QueryExecutor::offline_only(BiError::MissingCapability {
            capability: "BigQuery credentials".into(),
            remedy: "Set GCP_ACCESS_TOKEN.".into(),
        });
        let source = SourceRegistry::new().resolve("workday").unwrap();

        let result = executor.execute("SELECT 1", source, "q").await;
        assert!(matches!(result.error(), Some(ExecutionFailure::MissingCapability { .. })));
        assert!(result.error_message().unwrap().contains("GCP_ACCESS_TOKEN"));
        assert!(result.table().is_none());
    }

    #[tokio::test]
    async fn test_placeholder_sql_is_not_sent() {
        let engine = Arc::new(FailingEngine { calls: AtomicUsize::new(0) });
        let executor = QueryExecutor::new(engine.clone());
        let source = SourceRegistry::new().resolve("jira").unwrap();

        let result = executor.execute("-- Error generating SQL", source, "q").await;
        assert!(result.table().is_none());
        assert_eq!(engine.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_timeout_becomes_failure() {
        let executor = QueryExecutor::new(Arc::new(SlowEngine)).with_timeout(Duration::from_millis(20));
        let source = SourceRegistry::new().resolve("coupa").unwrap();

        let result = executor.execute("SELECT 1", source, "q").await;
        assert_eq!(result.error(), Some(&ExecutionFailure::Timeout(20)));
        assert_eq!(result.error_message().as_deref(), Some("query did not finish within 20ms"));
        assert!(result.table().is_none());
    }

    #[test]
    fn test_has_statement() {
        assert!(has_statement("-- top ten\nSELECT 1"));
        assert!(!has_statement("-- Error generating SQL"));
        assert!(!has_statement("   \n"));
    }
}
