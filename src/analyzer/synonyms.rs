use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Closed synonym table applied to raw tokens before stemming. Illustrative,
/// not exhaustive — matches the small closed set sketched in spec.md §4.1.
pub static SYNONYMS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("crista", "cristina"),
        ("cs", "compsci"),
        ("compsci", "compsci"),
        ("uci", "uci"),
        ("ics", "informatics"),
    ])
});

/// Replaces `token` via the synonym table if present, otherwise returns it unchanged.
pub fn apply(token: &str) -> String {
    SYNONYMS
        .get(token)
        .map(|s| s.to_string())
        .unwrap_or_else(|| token.to_string())
}
