//! breach-core: Core types for pseudonymized breach-corpus lookups
//!
//! This crate defines the foundational pieces shared by every lookup source:
//! - Canonicalization of raw email identifiers
//! - HMAC-SHA256 pseudonymous shard keys
//! - On-disk layouts for hash-bucketed shards and char-bucketed plaintext dumps
//! - Source configuration
//!
//! # Privacy Model
//!
//! The shard corpus never stores a plaintext identifier. Records are keyed by
//! `HMAC-SHA256(secret, canonical_email)`, so the storage layer only ever sees
//! an opaque 64-hex-char key.
//!
//! ## What Each Layer Sees
//!
//! | Layer | Raw email | Shard key |
//! |-------|-----------|-----------|
//! | Shard files | NO | YES |
//! | Plaintext dump | YES (bucketed by leading chars) | NO |
//! | Relational store | canonical form | NO |
//! | Logs / metrics | NO | 4-char prefix at most |
//!
//! The plaintext and relational sources are opt-in and weaken the model by
//! construction; a deployment that wants pure pseudonymization configures only
//! shard sources.

mod config;
mod error;
mod key;
mod layout;
mod normalize;
mod record;

pub use config::{
    AdmissionConfig, LookupConfig, RelationalSourceConfig, SourceConfig, SourceKind,
};
pub use error::Error;
pub use key::{derive_key, KeyDeriver, ShardKey};
pub use layout::{map_bucket_char, PlaintextBucketPath, ShardPath, ShardVariant};
pub use normalize::{normalize, LookupQuery};
pub use record::{BreachRecord, HASH_TYPE_PLAINTEXT, PLAINTEXT_SOURCE_LABEL};

pub type Result<T> = std::result::Result<T, Error>;

/// Constants for the lookup engine
pub mod constants {
    /// Length of a hex-encoded shard key
    pub const SHARD_KEY_HEX_LEN: usize = 64;

    /// Hex chars of the key naming the shard directory
    pub const SHARD_DIR_CHARS: usize = 2;

    /// Hex chars of the key naming the shard file
    pub const SHARD_PREFIX_CHARS: usize = 4;

    /// Bucket name for any character that is not ASCII alphanumeric
    pub const SYMBOLS_BUCKET: &str = "symbols";

    /// Default number of sources allowed to run at once
    pub const DEFAULT_CONCURRENCY_LIMIT: usize = 2;

    /// Largest accepted concurrency limit
    pub const MAX_CONCURRENCY_LIMIT: usize = 4096;

    /// Default CPU gate factor (load average vs. available cores)
    pub const DEFAULT_CPU_LOAD_FACTOR: f64 = 0.75;

    /// Default memory gate factor (process memory vs. total memory)
    pub const DEFAULT_MEMORY_USAGE_FACTOR: f64 = 0.8;
}
