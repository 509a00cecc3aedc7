//! Server state: the lookup engine shared by all requests

use std::sync::Arc;
use std::time::Instant;

use breach_core::{BreachRecord, LookupConfig, LookupQuery};
use serde::Serialize;

use crate::admission::AdmissionController;
use crate::aggregator::{AggregateResult, SourceAggregator};
use crate::error::{Result, ServerError};
use crate::limiter::ConcurrencyLimiter;
use crate::metrics;
use crate::sources::{build_sources, BreachSource};

/// Answer to one lookup
#[derive(Debug, Clone, Serialize)]
pub struct LookupResponse {
    /// Canonical form the lookup ran under
    pub email: String,
    pub records: Vec<BreachRecord>,
    /// Sources that failed and contributed nothing
    pub failed_sources: usize,
}

/// Admission gate in front of the source fan-out
pub struct LookupService {
    admission: AdmissionController,
    aggregator: SourceAggregator,
}

impl LookupService {
    pub fn new(admission: AdmissionController, aggregator: SourceAggregator) -> Self {
        Self {
            admission,
            aggregator,
        }
    }

    /// Validate the config and build sources, limiter and a live-host
    /// admission controller. Must be called inside a Tokio runtime.
    pub fn from_config(config: &LookupConfig) -> Result<Self> {
        config.validate()?;
        let sources = build_sources(config)?;
        Self::with_sources(
            config,
            sources,
            AdmissionController::system(config.admission.clone()),
        )
    }

    /// Build around pre-made sources and admission controller
    pub fn with_sources(
        config: &LookupConfig,
        sources: Vec<Arc<dyn BreachSource>>,
        admission: AdmissionController,
    ) -> Result<Self> {
        let limiter = ConcurrencyLimiter::new(config.concurrency_limit);
        let aggregator = SourceAggregator::new(sources, limiter)?;
        Ok(Self::new(admission, aggregator))
    }

    pub fn aggregator(&self) -> &SourceAggregator {
        &self.aggregator
    }

    /// Run one lookup: admission first, then the fan-out.
    /// A busy rejection happens before any source is touched.
    pub async fn lookup(&self, email: &str) -> Result<LookupResponse> {
        let started = Instant::now();
        let result = self.lookup_inner(email).await;

        let outcome = match &result {
            Ok(_) => metrics::OUTCOME_OK,
            Err(ServerError::Busy(_)) | Err(ServerError::ShuttingDown) => metrics::OUTCOME_BUSY,
            Err(ServerError::InvalidQuery(_)) => metrics::OUTCOME_CLIENT_ERROR,
            Err(_) => metrics::OUTCOME_SERVER_ERROR,
        };
        metrics::record_lookup_request(outcome, started.elapsed());

        result
    }

    async fn lookup_inner(&self, email: &str) -> Result<LookupResponse> {
        if self.aggregator.limiter().is_closed() {
            return Err(ServerError::ShuttingDown);
        }
        self.admission.check().map_err(ServerError::Busy)?;

        let query = LookupQuery::new(email)?;
        let AggregateResult { records, failures } = self.aggregator.search(&query).await;

        tracing::info!(
            records = records.len(),
            failed_sources = failures.len(),
            "Lookup complete"
        );

        Ok(LookupResponse {
            email: query.canonical,
            records,
            failed_sources: failures.len(),
        })
    }

    /// Occupancy snapshot for health checks
    pub fn stats(&self) -> EngineStats {
        let limiter = self.aggregator.limiter();
        EngineStats {
            sources: self
                .aggregator
                .sources()
                .iter()
                .map(|s| s.kind().as_str())
                .collect(),
            concurrency_limit: limiter.capacity(),
            in_flight: limiter.in_flight(),
        }
    }

    /// Stop accepting lookups and release source resources
    pub async fn shutdown(&self) {
        self.aggregator.close().await;
    }
}

/// Engine statistics for monitoring
#[derive(Debug, Clone, Serialize)]
pub struct EngineStats {
    pub sources: Vec<&'static str>,
    pub concurrency_limit: usize,
    pub in_flight: usize,
}

/// Shared server state type
pub type SharedState = Arc<LookupService>;

/// Create shared state from config
pub fn create_shared_state(config: &LookupConfig) -> Result<SharedState> {
    Ok(Arc::new(LookupService::from_config(config)?))
}
