//! Lookup sources
//!
//! Every backend exposes the same capability, `search(query) -> records`, so
//! the aggregator can hold a homogeneous list of them.

mod plaintext;
mod relational;
mod shard;

use std::sync::Arc;

use async_trait::async_trait;
use breach_core::{BreachRecord, LookupConfig, LookupQuery, SourceConfig, SourceKind};

use crate::error::SourceError;

pub use plaintext::PlaintextDirSource;
pub use relational::RelationalSource;
pub use shard::{ShardDescriptor, ShardSource};

#[async_trait]
pub trait BreachSource: Send + Sync {
    /// Kind label for logs and metrics
    fn kind(&self) -> SourceKind;

    /// All records this source holds for the query, in source order.
    /// A missing file or bucket is an empty result, not an error.
    async fn search(&self, query: &LookupQuery) -> Result<Vec<BreachRecord>, SourceError>;

    /// Release long-lived resources at shutdown
    async fn close(&self) {}
}

/// Instantiate the configured sources in declaration order
pub fn build_sources(config: &LookupConfig) -> breach_core::Result<Vec<Arc<dyn BreachSource>>> {
    config
        .sources
        .iter()
        .map(|source| -> breach_core::Result<Arc<dyn BreachSource>> {
            Ok(match source {
                SourceConfig::Shard { key_hex, base_dirs } => {
                    Arc::new(ShardSource::new(key_hex, base_dirs.clone())?)
                }
                SourceConfig::Plaintext { base_dir } => {
                    Arc::new(PlaintextDirSource::new(base_dir.clone()))
                }
                SourceConfig::Relational(rel) => Arc::new(RelationalSource::new(rel)?),
            })
        })
        .collect()
}
