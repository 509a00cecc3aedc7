//! Email canonicalization

use crate::{Error, Result};

/// Canonicalize a raw identifier.
///
/// Trims and lowercases. When an `@` is present, the leading run of
/// characters outside `[a-z0-9]` is stripped and the subaddress tag (`+...`)
/// is removed from the local part. Without an `@` the trimmed, lowercased
/// string is returned as is.
///
/// `normalize(normalize(x)) == normalize(x)` for every input.
pub fn normalize(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase();
    if !lowered.contains('@') {
        return lowered;
    }

    let stripped = lowered.trim_start_matches(|c: char| !c.is_ascii_alphanumeric());
    match stripped.split_once('@') {
        Some((local, domain)) => {
            let local = local.split('+').next().unwrap_or(local);
            format!("{}@{}", local, domain)
        }
        None => stripped.to_string(),
    }
}

/// A single lookup, carried to every source.
///
/// Sources keyed by the pseudonymous hash or by the relational column use
/// `canonical`; the plaintext dump is bucketed on the input as typed, so it
/// uses `raw`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupQuery {
    /// Trimmed input, case preserved
    pub raw: String,
    /// Canonical form used for hashing and equality
    pub canonical: String,
}

impl LookupQuery {
    /// Build a query from user input. Blank input is rejected.
    pub fn new(input: &str) -> Result<Self> {
        let raw = input.trim();
        if raw.is_empty() {
            return Err(Error::InvalidIdentifier("identifier is empty".into()));
        }

        let canonical = normalize(raw);
        if canonical.is_empty() {
            return Err(Error::InvalidIdentifier(
                "identifier has no alphanumeric content".into(),
            ));
        }

        Ok(Self {
            raw: raw.to_string(),
            canonical,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trim_and_lowercase() {
        assert_eq!(normalize("  Alice@Example.COM \n"), "alice@example.com");
    }

    #[test]
    fn test_subaddress_removed() {
        assert_eq!(normalize("bob+news@example.com"), "bob@example.com");
        assert_eq!(normalize("bob+a+b@example.com"), "bob@example.com");
    }

    #[test]
    fn test_plus_in_domain_kept() {
        assert_eq!(normalize("bob@ex+ample.com"), "bob@ex+ample.com");
    }

    #[test]
    fn test_leading_symbols_stripped() {
        assert_eq!(normalize("__carol@example.com"), "carol@example.com");
        assert_eq!(normalize("+-.dave+tag@example.com"), "dave@example.com");
    }

    #[test]
    fn test_leading_non_ascii_letter_stripped() {
        assert_eq!(normalize("éric+x@example.com"), "ric@example.com");
        assert_eq!(normalize("ÉRIC@example.com"), "ric@example.com");
        assert_eq!(normalize("zoë@example.com"), "zoë@example.com");
    }

    #[test]
    fn test_no_at_short_circuits() {
        assert_eq!(normalize("  __Some+Handle "), "__some+handle");
    }

    #[test]
    fn test_leading_at_is_stripped() {
        assert_eq!(normalize("@@example.com"), "example.com");
    }

    #[test]
    fn test_idempotent() {
        let samples = [
            "",
            "   ",
            "Plain",
            "a@b",
            "+@x",
            "@",
            "--x+y@z",
            "USER+TAG@Example.Com",
            "  !!Weird..Name+1@mail.example.org  ",
            "no-at-sign+tag",
            "ünïcödé+x@exämple.de",
            "éric+x@example.com",
            "a+b+c@d+e@f",
            "tab\tinside+x@host",
        ];
        for s in samples {
            let once = normalize(s);
            assert_eq!(normalize(&once), once, "not idempotent for {:?}", s);
        }
    }

    #[test]
    fn test_query_keeps_raw_case() {
        let q = LookupQuery::new("  Foo+x@Bar.com ").unwrap();
        assert_eq!(q.raw, "Foo+x@Bar.com");
        assert_eq!(q.canonical, "foo@bar.com");
    }

    #[test]
    fn test_query_rejects_blank() {
        assert!(LookupQuery::new("   ").is_err());
        assert!(LookupQuery::new("+++@").is_err());
    }
}
