//! breach-server: Breach lookup engine and HTTP surface
//!
//! Fans a lookup out to every configured source (sharded HMAC store,
//! bucketed plaintext dump, relational table) under a bounded-concurrency
//! limiter, behind a load-based admission gate.

pub mod admission;
pub mod aggregator;
pub mod error;
pub mod limiter;
pub mod metrics;
pub mod routes;
pub mod server;
pub mod sources;
pub mod state;

pub use admission::{AdmissionController, BusyReason, LoadProbe, LoadSample, SystemLoadProbe};
pub use aggregator::{AggregateResult, SourceAggregator, SourceFailure};
pub use error::{ServerError, SourceError};
pub use limiter::{ConcurrencyLimiter, ConcurrencySlot, LimiterError};
pub use routes::create_router;
pub use server::{LookupServer, ServerBuilder};
pub use sources::{
    build_sources, BreachSource, PlaintextDirSource, RelationalSource, ShardDescriptor,
    ShardSource,
};
pub use state::{create_shared_state, EngineStats, LookupResponse, LookupService, SharedState};
