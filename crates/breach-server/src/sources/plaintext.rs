//! Char-bucketed plaintext dump
//!
//! Lines look like `email:password`, `email;password` or `email password`.
//! Files are bucketed by the first two (sometimes three) characters of the
//! identifier, so a lookup scans exactly one leaf file.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use breach_core::{BreachRecord, LookupQuery, PlaintextBucketPath, SourceKind};
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};

use super::BreachSource;
use crate::error::SourceError;

const SEPARATORS: [u8; 3] = [b':', b';', b' '];

pub struct PlaintextDirSource {
    base_dir: PathBuf,
}

impl PlaintextDirSource {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Leaf file for a raw query. The third level is used only when the
    /// two-level path is a directory. `None` when no leaf file exists.
    pub async fn resolve_leaf(&self, raw: &str) -> Option<PathBuf> {
        let bucket = PlaintextBucketPath::for_query(raw);
        let mut leaf = bucket.two_level(&self.base_dir);

        if let Ok(meta) = tokio::fs::metadata(&leaf).await {
            if meta.is_dir() {
                leaf = bucket.three_level(&self.base_dir);
            }
        }

        match tokio::fs::metadata(&leaf).await {
            Ok(meta) if meta.is_file() => Some(leaf),
            _ => None,
        }
    }
}

/// Split a line that starts with `query` directly followed by a separator
/// into `(email, password)`.
///
/// Case is folded per character with Unicode lowercase mapping, so `Ü`
/// matches `ü` as well as `A` matching `a`.
pub fn match_line<'a>(line: &'a str, query: &str) -> Option<(&'a str, &'a str)> {
    let mut chars = line.char_indices();
    let mut end = 0;
    for q in query.chars() {
        let (at, c) = chars.next()?;
        if !c.to_lowercase().eq(q.to_lowercase()) {
            return None;
        }
        end = at + c.len_utf8();
    }

    match line.as_bytes().get(end) {
        // separators are ASCII, so both slices are on char boundaries
        Some(sep) if SEPARATORS.contains(sep) => Some((&line[..end], &line[end + 1..])),
        _ => None,
    }
}

#[async_trait]
impl BreachSource for PlaintextDirSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Plaintext
    }

    async fn search(&self, query: &LookupQuery) -> Result<Vec<BreachRecord>, SourceError> {
        let Some(leaf) = self.resolve_leaf(&query.raw).await else {
            return Ok(Vec::new());
        };

        let mut reader = BufReader::new(File::open(&leaf).await?);
        let mut buf = Vec::new();
        let mut results = Vec::new();

        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf).await? == 0 {
                break;
            }
            let line = String::from_utf8_lossy(&buf);
            let line = line.trim_end_matches(['\n', '\r']);
            if let Some((email, password)) = match_line(line, &query.raw) {
                results.push(BreachRecord::plaintext(email, password));
            }
        }

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use breach_core::constants::SYMBOLS_BUCKET;

    fn query(input: &str) -> LookupQuery {
        LookupQuery::new(input).unwrap()
    }

    fn write_leaf(base: &Path, segments: &[&str], content: &str) {
        let mut path = base.to_path_buf();
        for segment in segments {
            path.push(segment);
        }
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    #[test]
    fn test_match_line_separators() {
        assert_eq!(match_line("a@b.c:pw", "a@b.c"), Some(("a@b.c", "pw")));
        assert_eq!(match_line("a@b.c;pw", "a@b.c"), Some(("a@b.c", "pw")));
        assert_eq!(match_line("a@b.c pw", "a@b.c"), Some(("a@b.c", "pw")));
        assert_eq!(match_line("A@B.C:pw", "a@b.c"), Some(("A@B.C", "pw")));
    }

    #[test]
    fn test_match_line_requires_separator_after_query() {
        assert_eq!(match_line("a@b.cc:pw", "a@b.c"), None);
        assert_eq!(match_line("a@b.c", "a@b.c"), None);
        assert_eq!(match_line("a@b.c,pw", "a@b.c"), None);
        assert_eq!(match_line("xa@b.c:pw", "a@b.c"), None);
    }

    #[test]
    fn test_match_line_keeps_separators_in_password() {
        assert_eq!(match_line("a@b.c:p:w;x y", "a@b.c"), Some(("a@b.c", "p:w;x y")));
    }

    #[test]
    fn test_match_line_folds_unicode_case() {
        assert_eq!(
            match_line("üser@exämple.de:pw", "Üser@EXÄMPLE.de"),
            Some(("üser@exämple.de", "pw"))
        );
        assert_eq!(match_line("user@example.de:pw", "üser@example.de"), None);
    }

    #[test]
    fn test_match_line_non_ascii_is_safe() {
        assert_eq!(match_line("é", "a"), None);
        assert_eq!(match_line("ü@x.de:pw", "ü@x.de"), Some(("ü@x.de", "pw")));
    }

    #[tokio::test]
    async fn test_missing_leaf_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let source = PlaintextDirSource::new(dir.path());
        assert!(source.search(&query("foo@bar.com")).await.unwrap().is_empty());

        let source = PlaintextDirSource::new("/nonexistent/path");
        assert!(source.search(&query("test@example.com")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_prefix_neighbour_not_matched() {
        let dir = tempfile::tempdir().unwrap();
        write_leaf(
            dir.path(),
            &["f", "o"],
            "foo@bar.com:pw1\nfoobar@baz.com:pw2\n",
        );
        let source = PlaintextDirSource::new(dir.path());

        let records = source.search(&query("foo@bar.com")).await.unwrap();
        assert_eq!(records, vec![BreachRecord::plaintext("foo@bar.com", "pw1")]);
        assert_eq!(records[0].source, "Other");
        assert_eq!(records[0].hash_type, "plaintext");
    }

    #[tokio::test]
    async fn test_case_insensitive_and_all_matches() {
        let dir = tempfile::tempdir().unwrap();
        write_leaf(
            dir.path(),
            &["f", "o"],
            "Foo@Bar.com;first\r\nother@x.com:nope\nfoo@bar.com second\n",
        );
        let source = PlaintextDirSource::new(dir.path());

        let records = source.search(&query("  FOO@bar.COM ")).await.unwrap();
        let passwords: Vec<_> = records.iter().map(|r| r.password.as_str()).collect();
        assert_eq!(passwords, vec!["first", "second"]);
        assert_eq!(records[0].email, "Foo@Bar.com");
    }

    #[tokio::test]
    async fn test_three_level_bucket() {
        let dir = tempfile::tempdir().unwrap();
        write_leaf(dir.path(), &["j", "o", "h"], "john@x.com:deep\n");
        let source = PlaintextDirSource::new(dir.path());

        let leaf = source.resolve_leaf("john@x.com").await.unwrap();
        assert_eq!(leaf, dir.path().join("j").join("o").join("h"));
        let records = source.search(&query("john@x.com")).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].password, "deep");
    }

    #[tokio::test]
    async fn test_symbols_bucket() {
        let dir = tempfile::tempdir().unwrap();
        write_leaf(dir.path(), &[SYMBOLS_BUCKET, "a"], "_alice@x.com:pw\n");
        let source = PlaintextDirSource::new(dir.path());

        let records = source.search(&query("_alice@x.com")).await.unwrap();
        assert_eq!(records.len(), 1);
    }

    #[tokio::test]
    async fn test_third_level_missing_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        write_leaf(dir.path(), &["j", "o", "e"], "joe@x.com:pw\n");
        let source = PlaintextDirSource::new(dir.path());

        assert!(source.search(&query("john@x.com")).await.unwrap().is_empty());
    }
}
