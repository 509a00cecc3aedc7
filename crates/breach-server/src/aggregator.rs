//! Multi-source fan-out
//!
//! Every configured source is queried through the shared limiter. All source
//! futures are driven from the calling task by `join_all`, which keeps their
//! outputs in declaration order no matter which finishes first.

use std::sync::Arc;
use std::time::Instant;

use breach_core::{BreachRecord, LookupQuery, SourceKind};
use futures::future::join_all;
use serde::Serialize;

use crate::error::{Result, ServerError, SourceError};
use crate::limiter::ConcurrencyLimiter;
use crate::metrics;
use crate::sources::BreachSource;

/// A source that contributed nothing because it failed
#[derive(Debug, Clone, Serialize)]
pub struct SourceFailure {
    /// Position in declaration order
    pub index: usize,
    pub kind: SourceKind,
    pub error: String,
}

/// Merged result of one fan-out
#[derive(Debug, Clone, Default)]
pub struct AggregateResult {
    pub records: Vec<BreachRecord>,
    pub failures: Vec<SourceFailure>,
}

pub struct SourceAggregator {
    sources: Vec<Arc<dyn BreachSource>>,
    limiter: ConcurrencyLimiter,
}

impl SourceAggregator {
    /// An empty source list is rejected here, before any request is served
    pub fn new(sources: Vec<Arc<dyn BreachSource>>, limiter: ConcurrencyLimiter) -> Result<Self> {
        if sources.is_empty() {
            return Err(ServerError::NoSources);
        }
        metrics::set_sources_configured(sources.len());
        Ok(Self { sources, limiter })
    }

    pub fn sources(&self) -> &[Arc<dyn BreachSource>] {
        &self.sources
    }

    pub fn limiter(&self) -> &ConcurrencyLimiter {
        &self.limiter
    }

    /// Query every source and concatenate results in declaration order.
    /// A failing source contributes nothing and is listed in `failures`.
    pub async fn search(&self, query: &LookupQuery) -> AggregateResult {
        let outcomes = join_all(
            self.sources
                .iter()
                .map(|source| self.search_one(source.as_ref(), query)),
        )
        .await;

        let mut result = AggregateResult::default();
        for (index, (source, outcome)) in self.sources.iter().zip(outcomes).enumerate() {
            match outcome {
                Ok(mut records) => result.records.append(&mut records),
                Err(error) => {
                    tracing::warn!(
                        index,
                        source = %source.kind(),
                        error = %error,
                        "Source failed, contributing no records"
                    );
                    result.failures.push(SourceFailure {
                        index,
                        kind: source.kind(),
                        error: error.to_string(),
                    });
                }
            }
        }

        result
    }

    async fn search_one(
        &self,
        source: &dyn BreachSource,
        query: &LookupQuery,
    ) -> std::result::Result<Vec<BreachRecord>, SourceError> {
        let kind = source.kind();
        let outcome = self
            .limiter
            .run(async {
                let started = Instant::now();
                let outcome = source.search(query).await;
                let label = if outcome.is_ok() {
                    metrics::OUTCOME_OK
                } else {
                    metrics::OUTCOME_FAILED
                };
                metrics::record_source_query(kind.as_str(), label, started.elapsed());
                outcome
            })
            .await;

        match outcome {
            Ok(inner) => inner,
            Err(closed) => Err(SourceError::Unavailable(closed.to_string())),
        }
    }

    /// Close every source's long-lived resources
    pub async fn close(&self) {
        self.limiter.close();
        for source in &self.sources {
            source.close().await;
        }
    }
}
