//! Message normalization for error de-duplication.
//!
//! Volatile fragments (timestamps, identifiers, hashes, addresses and long
//! literals) are replaced with placeholder tokens so that two occurrences of
//! the same failure produce the same text.

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;

/// Replacement rules, applied in order. Broader patterns come last so that
/// a UUID is not half-eaten by the hex or number rules.
static RULES: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        (r#""[^"]{20,}"|'[^']{20,}'"#, "<str>"),
        (
            r"\b\d{4}-\d{2}-\d{2}[T ]\d{2}:\d{2}(?::\d{2}(?:\.\d+)?)?(?:Z|[+-]\d{2}:?\d{2})?",
            "<ts>",
        ),
        (
            r"\b[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}\b",
            "<uuid>",
        ),
        (r"\b\d{13}\b", "<ts>"),
        (r"\b(?:0x)?[0-9a-fA-F]{16,}\b", "<hash>"),
        (r"\b(?:\d{1,3}\.){3}\d{1,3}(?::\d{1,5})?\b", "<ip>"),
        (r"\d{6,}", "<num>"),
    ]
    .into_iter()
    .filter_map(|(pattern, token)| Regex::new(pattern).ok().map(|re| (re, token)))
    .collect()
});

static WHITESPACE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\s+").ok());

/// Replaces volatile fragments with placeholders, collapses whitespace and
/// trims.
#[must_use]
pub fn normalize(text: &str) -> String {
    let mut out = text.to_string();
    for (re, token) in RULES.iter() {
        if re.is_match(&out) {
            out = re.replace_all(&out, *token).into_owned();
        }
    }
    match WHITESPACE.as_ref() {
        Some(ws) => ws.replace_all(out.trim(), " ").into_owned(),
        None => out.split_whitespace().collect::<Vec<_>>().join(" "),
    }
}

/// Builds the de-duplication key `category|endpoint|title|message`.
#[must_use]
pub fn dedup_key(category: &str, endpoint: &str, title: &str, message: &str) -> String {
    format!(
        "{category}|{endpoint}|{}|{}",
        normalize(title),
        normalize(message)
    )
}

/// Returns how long repeat notifications are suppressed for an entry that
/// has been seen `count` times.
#[must_use]
pub const fn suppression_window(count: u32) -> Duration {
    match count {
        0..=2 => Duration::from_secs(30),
        3..=5 => Duration::from_secs(60),
        6..=10 => Duration::from_secs(120),
        _ => Duration::from_secs(300),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn timestamps_and_ids_collapse() {
        let a = normalize("Request 3f2b8c1e-9a4d-4e5f-8b6a-1c2d3e4f5a6b failed at 2024-05-01T10:00:00Z");
        let b = normalize("Request 0a1b2c3d-4e5f-4a6b-9c8d-7e6f5a4b3c2d failed at 2024-05-02T11:30:15.123+02:00");
        assert_eq!(a, b);
        assert_eq!(a, "Request <uuid> failed at <ts>");
    }

    #[test]
    fn epoch_hash_and_ip() {
        assert_eq!(normalize("at 1714557600000"), "at <ts>");
        assert_eq!(
            normalize("tx 0xdeadbeefcafebabe0011 rejected"),
            "tx <hash> rejected"
        );
        assert_eq!(normalize("host 10.0.0.12:8080 refused"), "host <ip> refused");
    }

    #[test]
    fn long_numbers_and_quoted_strings() {
        assert_eq!(normalize("block 1234567 missing"), "block <num> missing");
        assert_eq!(normalize("block 12345 missing"), "block 12345 missing");
        assert_eq!(
            normalize(r#"label "a very long wallet label here" rejected"#),
            "label <str> rejected"
        );
        assert_eq!(normalize(r#"label "short" rejected"#), r#"label "short" rejected"#);
    }

    #[test]
    fn whitespace_collapses() {
        assert_eq!(normalize("  too \t many\n spaces  "), "too many spaces");
    }

    #[test]
    fn key_layout() {
        assert_eq!(
            dedup_key("network", "balance", "Offline", "id 1234567"),
            "network|balance|Offline|id <num>"
        );
    }

    #[test]
    fn windows_grow_with_count() {
        assert_eq!(suppression_window(1), Duration::from_secs(30));
        assert_eq!(suppression_window(2), Duration::from_secs(30));
        assert_eq!(suppression_window(5), Duration::from_secs(60));
        assert_eq!(suppression_window(10), Duration::from_secs(120));
        assert_eq!(suppression_window(11), Duration::from_secs(300));
    }
}
