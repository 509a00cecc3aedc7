//! On-disk layouts: where a lookup's records may live
//!
//! ```text
//! shard base/
//!   ab/
//!     abcd.jsonl.gz      <- key "abcd..." (compressed)
//!     abcd.jsonl         <- key "abcd..." (plain, may coexist)
//!
//! plaintext base/
//!   f/
//!     o                  <- leaf file for "fo..."
//!   symbols/
//!     x/                 <- deeper bucket, read off the filesystem
//!       1                <- leaf file for "_x1..."
//! ```

use std::path::{Path, PathBuf};

use crate::constants::SYMBOLS_BUCKET;
use crate::ShardKey;

/// Which file variant of a shard prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShardVariant {
    /// `{prefix}.jsonl.gz`
    Gzip,
    /// `{prefix}.jsonl`
    Plain,
}

impl ShardVariant {
    /// Probe order for a prefix
    pub const ALL: [ShardVariant; 2] = [ShardVariant::Gzip, ShardVariant::Plain];

    pub fn extension(&self) -> &'static str {
        match self {
            ShardVariant::Gzip => "jsonl.gz",
            ShardVariant::Plain => "jsonl",
        }
    }

    pub fn is_compressed(&self) -> bool {
        matches!(self, ShardVariant::Gzip)
    }
}

/// Relative location of a key's shard files: `<dir>/<prefix>.<ext>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardPath {
    pub dir: String,
    pub prefix: String,
}

impl ShardPath {
    pub fn for_key(key: &ShardKey) -> Self {
        Self {
            dir: key.dir().to_string(),
            prefix: key.prefix().to_string(),
        }
    }

    /// File name for one variant, e.g. `abcd.jsonl.gz`
    pub fn file_name(&self, variant: ShardVariant) -> String {
        format!("{}.{}", self.prefix, variant.extension())
    }

    /// Full candidate path under a base directory
    pub fn resolve(&self, base: &Path, variant: ShardVariant) -> PathBuf {
        base.join(&self.dir).join(self.file_name(variant))
    }
}

/// Map one leading character to its bucket name.
///
/// ASCII letters and digits map to their lowercase form; anything else,
/// including a missing character, maps to the symbols bucket.
pub fn map_bucket_char(c: Option<char>) -> String {
    match c {
        Some(c) if c.is_ascii_alphanumeric() => c.to_ascii_lowercase().to_string(),
        _ => SYMBOLS_BUCKET.to_string(),
    }
}

/// Bucket segments derived from the first three characters of a raw query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaintextBucketPath {
    segments: [String; 3],
}

impl PlaintextBucketPath {
    pub fn for_query(raw: &str) -> Self {
        let mut chars = raw.chars();
        let first = map_bucket_char(chars.next());
        let second = map_bucket_char(chars.next());
        let third = map_bucket_char(chars.next());
        Self {
            segments: [first, second, third],
        }
    }

    pub fn segments(&self) -> &[String; 3] {
        &self.segments
    }

    /// `<base>/<c1>/<c2>`
    pub fn two_level(&self, base: &Path) -> PathBuf {
        base.join(&self.segments[0]).join(&self.segments[1])
    }

    /// `<base>/<c1>/<c2>/<c3>`, used only when the two-level path is a directory
    pub fn three_level(&self, base: &Path) -> PathBuf {
        self.two_level(base).join(&self.segments[2])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(prefix: &str) -> ShardKey {
        let hex = format!("{}{}", prefix, "0".repeat(64 - prefix.len()));
        ShardKey::from_hex(&hex).unwrap()
    }

    #[test]
    fn test_shard_path_from_key() {
        let path = ShardPath::for_key(&key("abcd1234"));
        assert_eq!(path.dir, "ab");
        assert_eq!(path.prefix, "abcd");
        assert_eq!(path.file_name(ShardVariant::Gzip), "abcd.jsonl.gz");
        assert_eq!(path.file_name(ShardVariant::Plain), "abcd.jsonl");
    }

    #[test]
    fn test_shard_path_resolve() {
        let path = ShardPath::for_key(&key("abcd1234"));
        assert_eq!(
            path.resolve(Path::new("/data/shards"), ShardVariant::Plain),
            PathBuf::from("/data/shards/ab/abcd.jsonl")
        );
    }

    #[test]
    fn test_map_bucket_char() {
        assert_eq!(map_bucket_char(Some('A')), "a");
        assert_eq!(map_bucket_char(Some('7')), "7");
        assert_eq!(map_bucket_char(Some('_')), SYMBOLS_BUCKET);
        assert_eq!(map_bucket_char(Some('é')), SYMBOLS_BUCKET);
        assert_eq!(map_bucket_char(None), SYMBOLS_BUCKET);
    }

    #[test]
    fn test_plaintext_bucket_segments() {
        let bucket = PlaintextBucketPath::for_query("Fo.bar@x.com");
        assert_eq!(bucket.segments(), &["f".to_string(), "o".into(), SYMBOLS_BUCKET.into()]);
        assert_eq!(bucket.two_level(Path::new("/p")), PathBuf::from("/p/f/o"));
        assert_eq!(
            bucket.three_level(Path::new("/p")),
            PathBuf::from("/p/f/o/symbols")
        );
    }

    #[test]
    fn test_short_query_pads_with_symbols() {
        let bucket = PlaintextBucketPath::for_query("a");
        assert_eq!(bucket.segments()[1], SYMBOLS_BUCKET);
        assert_eq!(bucket.segments()[2], SYMBOLS_BUCKET);
    }
}
