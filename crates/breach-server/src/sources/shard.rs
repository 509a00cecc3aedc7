//! HMAC-keyed JSONL shards
//!
//! A lookup derives the shard key from the canonical email, probes
//! `<base>/<key[0:2]>/<key[0:4]>.jsonl[.gz]` in every base directory and
//! streams each existing file, keeping records whose `email_hash` equals the
//! key.

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use breach_core::{BreachRecord, KeyDeriver, LookupQuery, ShardKey, ShardPath, ShardVariant, SourceKind};
use flate2::read::GzDecoder;
use serde::Deserialize;
use serde_json::Value;

use super::BreachSource;
use crate::error::SourceError;

/// One existing shard file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardDescriptor {
    pub path: PathBuf,
    pub variant: ShardVariant,
    /// Index of the base directory it was found under
    pub base_index: usize,
}

/// A shard line. Only `email_hash` is typed; the payload fields are taken
/// as whatever JSON the writer produced. Unknown fields are ignored.
#[derive(Debug, Deserialize)]
struct ShardLine {
    email_hash: String,
    #[serde(default)]
    password: Option<Value>,
    #[serde(default)]
    is_hash: Option<Value>,
    #[serde(default)]
    hash_type: Option<Value>,
}

/// Strings are taken verbatim, `null` is empty, anything else is its JSON text
fn text_field(value: Option<Value>) -> String {
    match value {
        Some(Value::String(s)) => s,
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

fn flag_field(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|n| n != 0.0),
        Some(Value::String(s)) => s.eq_ignore_ascii_case("true"),
        _ => false,
    }
}

pub struct ShardSource {
    deriver: KeyDeriver,
    base_dirs: Vec<PathBuf>,
}

impl ShardSource {
    pub fn new(key_hex: &str, base_dirs: Vec<PathBuf>) -> breach_core::Result<Self> {
        Ok(Self {
            deriver: KeyDeriver::from_hex(key_hex)?,
            base_dirs,
        })
    }

    pub fn base_dirs(&self) -> &[PathBuf] {
        &self.base_dirs
    }

    /// Shard key for a canonical email
    pub fn key_for(&self, canonical_email: &str) -> ShardKey {
        self.deriver.derive(canonical_email)
    }

    /// Existing shard files for a key, base directories in order and the
    /// compressed variant before the plain one within each
    pub async fn locate(&self, key: &ShardKey) -> Vec<ShardDescriptor> {
        locate(key, &self.base_dirs).await
    }
}

/// See [`ShardSource::locate`]
pub async fn locate(key: &ShardKey, base_dirs: &[PathBuf]) -> Vec<ShardDescriptor> {
    let shard_path = ShardPath::for_key(key);
    let mut found = Vec::new();

    for (base_index, base) in base_dirs.iter().enumerate() {
        for variant in ShardVariant::ALL {
            let path = shard_path.resolve(base, variant);
            match tokio::fs::metadata(&path).await {
                Ok(meta) if meta.is_file() => found.push(ShardDescriptor {
                    path,
                    variant,
                    base_index,
                }),
                Ok(_) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Cannot stat shard file");
                }
            }
        }
    }

    found
}

/// Stream one shard file on the blocking pool and keep matching records.
///
/// Lines that are not valid JSON are skipped. A read or decompression error
/// ends the file early; matches read before it are kept and the error is
/// logged.
pub async fn read_shard(
    descriptor: &ShardDescriptor,
    key: &ShardKey,
    canonical_email: &str,
) -> Result<Vec<BreachRecord>, SourceError> {
    let path = descriptor.path.clone();
    let compressed = descriptor.variant.is_compressed();
    let key = key.as_str().to_string();
    let email = canonical_email.to_string();

    tokio::task::spawn_blocking(move || scan_file(&path, compressed, &key, &email)).await?
}

fn scan_file(
    path: &Path,
    compressed: bool,
    key: &str,
    email: &str,
) -> Result<Vec<BreachRecord>, SourceError> {
    let file = File::open(path)?;
    let mut reader: Box<dyn BufRead> = if compressed {
        Box::new(BufReader::new(GzDecoder::new(file)))
    } else {
        Box::new(BufReader::new(file))
    };

    let source = path.display().to_string();
    let mut matches = Vec::new();
    let mut line = Vec::new();

    loop {
        line.clear();
        match reader.read_until(b'\n', &mut line) {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(
                    path = %source,
                    error = %e,
                    kept = matches.len(),
                    "Shard read failed, keeping matches so far"
                );
                break;
            }
        }

        let Ok(entry) = serde_json::from_slice::<ShardLine>(trim_line(&line)) else {
            continue;
        };
        if entry.email_hash != key {
            continue;
        }

        matches.push(BreachRecord {
            email: email.to_string(),
            is_hash: flag_field(entry.is_hash.as_ref()),
            password: text_field(entry.password),
            source: source.clone(),
            hash_type: text_field(entry.hash_type),
        });
    }

    Ok(matches)
}

fn trim_line(line: &[u8]) -> &[u8] {
    let mut end = line.len();
    while end > 0 && matches!(line[end - 1], b'\n' | b'\r') {
        end -= 1;
    }
    &line[..end]
}

type Fingerprint = (usize, String, bool, String);

fn fingerprint(base_index: usize, record: &BreachRecord) -> Fingerprint {
    (
        base_index,
        record.password.clone(),
        record.is_hash,
        record.hash_type.clone(),
    )
}

/// Append one file's matches. Compressed shards are taken whole; a plain
/// shard drops records that repeat one already taken from the compressed
/// sibling in the same base directory.
fn merge_variant(
    from_gzip: &mut HashSet<Fingerprint>,
    descriptor: &ShardDescriptor,
    records: Vec<BreachRecord>,
    out: &mut Vec<BreachRecord>,
) {
    for record in records {
        let print = fingerprint(descriptor.base_index, &record);
        match descriptor.variant {
            ShardVariant::Gzip => {
                from_gzip.insert(print);
            }
            ShardVariant::Plain if from_gzip.contains(&print) => continue,
            ShardVariant::Plain => {}
        }
        out.push(record);
    }
}

#[async_trait]
impl BreachSource for ShardSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Shard
    }

    async fn search(&self, query: &LookupQuery) -> Result<Vec<BreachRecord>, SourceError> {
        let key = self.key_for(&query.canonical);
        let descriptors = self.locate(&key).await;
        tracing::debug!(prefix = key.prefix(), files = descriptors.len(), "Shard lookup");

        let mut from_gzip = HashSet::new();
        let mut results = Vec::new();
        for descriptor in &descriptors {
            match read_shard(descriptor, &key, &query.canonical).await {
                Ok(records) => merge_variant(&mut from_gzip, descriptor, records, &mut results),
                Err(e) => {
                    tracing::warn!(
                        path = %descriptor.path.display(),
                        error = %e,
                        "Skipping unreadable shard"
                    );
                }
            }
        }

        Ok(results)
    }
}
