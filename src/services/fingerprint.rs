//! Fingerprint computation for in-run deduplication.
//!
//! A diagnostic's identity is the full `(file, line, rule_id, message)`
//! tuple. Each field is length-prefixed before hashing so that no two
//! distinct tuples share an input, whatever characters the fields contain.

use sha2::{Digest, Sha256};

use crate::models::diagnostic::{DedupKey, Diagnostic};

/// Compute the dedup key of a diagnostic.
pub fn dedup_key(diagnostic: &Diagnostic) -> DedupKey {
    let line = diagnostic.line.map(|l| l.to_string());
    DedupKey(hash(&[
        diagnostic.file.as_deref(),
        line.as_deref(),
        Some(diagnostic.rule_id.as_str()),
        Some(diagnostic.message.as_str()),
    ]))
}

/// SHA-256 over the encoded fields, hex-encoded.
fn hash(fields: &[Option<&str>]) -> String {
    let mut hasher = Sha256::new();
    for field in fields {
        match field {
            None => hasher.update([0u8]),
            Some(value) => {
                hasher.update([1u8]);
                hasher.update((value.len() as u64).to_le_bytes());
                hasher.update(value.as_bytes());
            }
        }
    }
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diagnostic(file: Option<&str>, line: Option<u32>, rule: &str, message: &str) -> Diagnostic {
        Diagnostic {
            file: file.map(str::to_string),
            line,
            rule_id: rule.to_string(),
            message: message.to_string(),
        }
    }

    #[test]
    fn same_inputs_same_key() {
        let a = dedup_key(&diagnostic(Some("a.cc"), Some(3), "C4267", "conversion"));
        let b = dedup_key(&diagnostic(Some("a.cc"), Some(3), "C4267", "conversion"));
        assert_eq!(a, b);
    }

    #[test]
    fn key_is_hex_sha256() {
        let key = dedup_key(&diagnostic(None, None, "r", "m"));
        assert_eq!(key.0.len(), 64);
        assert!(key.0.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn every_field_contributes() {
        let base = dedup_key(&diagnostic(Some("a.cc"), Some(3), "C4267", "conversion"));
        assert_ne!(base, dedup_key(&diagnostic(Some("b.cc"), Some(3), "C4267", "conversion")));
        assert_ne!(base, dedup_key(&diagnostic(Some("a.cc"), Some(4), "C4267", "conversion")));
        assert_ne!(base, dedup_key(&diagnostic(Some("a.cc"), Some(3), "C4100", "conversion")));
        assert_ne!(base, dedup_key(&diagnostic(Some("a.cc"), Some(3), "C4267", "other")));
    }

    #[test]
    fn absent_location_differs_from_empty_strings() {
        let absent = dedup_key(&diagnostic(None, None, "r", "m"));
        let empty = dedup_key(&diagnostic(Some(""), None, "r", "m"));
        assert_ne!(absent, empty);
    }

    #[test]
    fn field_boundaries_are_unambiguous() {
        let a = dedup_key(&diagnostic(Some("a:1"), None, "r", "m"));
        let b = dedup_key(&diagnostic(Some("a"), None, "1:r", "m"));
        assert_ne!(a, b);
    }
}
