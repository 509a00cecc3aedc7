//! breach-lookup: pseudonymized breach-corpus lookup engine
//!
//! Re-exports the workspace crates:
//! - [`breach_core`]: normalization, shard keys, layouts, configuration
//! - [`breach_server`]: sources, limiter, admission, aggregator, HTTP surface

pub use breach_core;
pub use breach_server;

pub use breach_core::{normalize, BreachRecord, LookupConfig, LookupQuery};
pub use breach_server::{LookupService, ServerBuilder};
