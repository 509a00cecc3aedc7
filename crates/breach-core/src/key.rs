//! Pseudonymous shard keys: HMAC-SHA256 over the canonical email

use std::fmt;

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::constants::{SHARD_DIR_CHARS, SHARD_KEY_HEX_LEN, SHARD_PREFIX_CHARS};
use crate::{Error, Result};

type HmacSha256 = Hmac<Sha256>;

/// 64-char lowercase hex HMAC-SHA256 digest identifying a canonical email
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShardKey(String);

impl ShardKey {
    /// Wrap an existing hex digest, validating its shape
    pub fn from_hex(hex: &str) -> Result<Self> {
        let valid = hex.len() == SHARD_KEY_HEX_LEN
            && hex.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'));
        if !valid {
            return Err(Error::InvalidIdentifier(format!(
                "shard key must be {} lowercase hex chars",
                SHARD_KEY_HEX_LEN
            )));
        }
        Ok(Self(hex.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Directory bucket: first 2 hex chars
    pub fn dir(&self) -> &str {
        &self.0[..SHARD_DIR_CHARS]
    }

    /// File prefix: first 4 hex chars
    pub fn prefix(&self) -> &str {
        &self.0[..SHARD_PREFIX_CHARS]
    }
}

impl fmt::Display for ShardKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Keyed HMAC state, built once per source and cloned per query.
#[derive(Clone)]
pub struct KeyDeriver {
    mac: HmacSha256,
}

impl KeyDeriver {
    /// Decode a hex secret. Empty or non-hex secrets are rejected.
    pub fn from_hex(secret_hex: &str) -> Result<Self> {
        let secret_hex = secret_hex.trim();
        if secret_hex.is_empty() {
            return Err(Error::InvalidSecretKey("secret is empty".into()));
        }
        let secret =
            hex::decode(secret_hex).map_err(|e| Error::InvalidSecretKey(e.to_string()))?;
        let mac = HmacSha256::new_from_slice(&secret)
            .map_err(|e| Error::InvalidSecretKey(e.to_string()))?;
        Ok(Self { mac })
    }

    /// Key for an already-canonical email
    pub fn derive(&self, canonical_email: &str) -> ShardKey {
        let mut mac = self.mac.clone();
        mac.update(canonical_email.as_bytes());
        ShardKey(hex::encode(mac.finalize().into_bytes()))
    }
}

impl fmt::Debug for KeyDeriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyDeriver")
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// One-shot derivation from a hex secret
pub fn derive_key(secret_hex: &str, canonical_email: &str) -> Result<ShardKey> {
    Ok(KeyDeriver::from_hex(secret_hex)?.derive(canonical_email))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize;

    const SECRET: &str = "000102030405060708090a0b0c0d0e0f";

    #[test]
    fn test_key_shape() {
        let key = derive_key(SECRET, "alice@example.com").unwrap();
        assert_eq!(key.as_str().len(), 64);
        assert!(ShardKey::from_hex(key.as_str()).is_ok());
        assert_eq!(key.dir(), &key.as_str()[..2]);
        assert_eq!(key.prefix(), &key.as_str()[..4]);
    }

    #[test]
    fn test_known_vector() {
        // RFC 4231 test case 2
        let secret = hex::encode(b"Jefe");
        let key = derive_key(&secret, "what do ya want for nothing?").unwrap();
        assert_eq!(
            key.as_str(),
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn test_stable_across_variants() {
        let a = derive_key(SECRET, &normalize("Alice@Example.com")).unwrap();
        let b = derive_key(SECRET, &normalize("  alice+promo@EXAMPLE.com ")).unwrap();
        let c = derive_key(SECRET, &normalize("alice@example.com")).unwrap();
        assert_eq!(a, b);
        assert_eq!(a, c);
    }

    #[test]
    fn test_different_secret_different_key() {
        let a = derive_key(SECRET, "alice@example.com").unwrap();
        let b = derive_key("ff", "alice@example.com").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_rejects_bad_secret() {
        assert!(matches!(
            KeyDeriver::from_hex("not-hex"),
            Err(Error::InvalidSecretKey(_))
        ));
        assert!(matches!(
            KeyDeriver::from_hex("  "),
            Err(Error::InvalidSecretKey(_))
        ));
    }

    #[test]
    fn test_from_hex_rejects_uppercase() {
        let upper = "A".repeat(64);
        assert!(ShardKey::from_hex(&upper).is_err());
        assert!(ShardKey::from_hex("abcd").is_err());
    }

    #[test]
    fn test_debug_redacts_secret() {
        let deriver = KeyDeriver::from_hex(SECRET).unwrap();
        assert!(!format!("{:?}", deriver).contains("0001"));
    }
}
