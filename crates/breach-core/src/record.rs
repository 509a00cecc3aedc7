//! Breach record returned to callers

use serde::{Deserialize, Serialize};

/// `hash_type` used when the stored password is not hashed
pub const HASH_TYPE_PLAINTEXT: &str = "plaintext";

/// Provenance label for plaintext dump matches
pub const PLAINTEXT_SOURCE_LABEL: &str = "Other";

/// One match from one source. Built per query and never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreachRecord {
    /// Email the record was matched under
    pub email: String,
    pub password: String,
    /// Provenance label
    pub source: String,
    pub is_hash: bool,
    pub hash_type: String,
}

impl BreachRecord {
    /// A plaintext-dump match
    pub fn plaintext(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
            source: PLAINTEXT_SOURCE_LABEL.to_string(),
            is_hash: false,
            hash_type: HASH_TYPE_PLAINTEXT.to_string(),
        }
    }
}
