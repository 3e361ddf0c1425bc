use std::sync::OnceLock;

use regex::Regex;

/// Anything outside letters, numbers, punctuation, and separators.
const UNSAFE_TEXT: &str = r"[^\p{L}\p{N}\p{P}\p{Z}]";

fn unsafe_text() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(UNSAFE_TEXT).expect("sanitizer pattern is a valid regex"))
}

/// Strip characters outside the safe-text whitelist, then trim surrounding whitespace.
///
/// Symbols (`+`, `$`, `<`, emoji), control characters, and format characters are removed.
/// Applying the function twice yields the same string as applying it once.
pub fn sanitize(input: &str) -> String {
    unsafe_text().replace_all(input, "").trim().to_string()
}
