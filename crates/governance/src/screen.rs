//! Stateless content screening: injection detection and PII redaction.
//!
//! Both checks run over the last message of an inbound request before it
//! reaches the upstream provider. The rule sets are ordered data, not code,
//! so rules can be added or reordered without touching pipeline logic.

use regex::Regex;

/// One named redaction category.
///
/// Every match of `pattern` is replaced with `placeholder`; the category
/// name is reported once per text no matter how many matches occur.
pub struct RedactionRule {
    pub category: &'static str,
    pattern: Regex,
    placeholder: String,
}

impl RedactionRule {
    fn new(category: &'static str, pattern: &str) -> Self {
        Self {
            category,
            pattern: Regex::new(pattern).expect("invalid redaction pattern"),
            placeholder: format!("[{category}_REDACTED]"),
        }
    }
}

/// Pattern matcher for manipulation attempts and sensitive substrings.
///
/// Pure and immutable after construction; safe to share across requests
/// without synchronization.
pub struct ContentScreen {
    injection_phrases: Vec<String>,
    rules: Vec<RedactionRule>,
}

impl ContentScreen {
    /// Create a screen with the default rule sets.
    pub fn new() -> Self {
        // Ordered: match on any phrase short-circuits.
        let injection_phrases = [
            "ignore previous instructions",
            "system prompt",
            "忽略之前的指令",
            "drop table",
            "exec(",
        ]
        .iter()
        .map(|p| p.to_string())
        .collect();

        // Evaluated in this order so placeholder substitution is
        // reproducible. The card pattern intentionally matches any 13-16
        // digit run with optional separators; it is a broad heuristic, not
        // a checksum validator.
        let rules = vec![
            RedactionRule::new("EMAIL", r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}"),
            RedactionRule::new("PHONE", r"\b1[3-9]\d{9}\b"),
            RedactionRule::new("CREDIT_CARD", r"\b(?:\d[ -]*?){13,16}\b"),
            RedactionRule::new("IPV4", r"\b\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}\b"),
        ];

        Self {
            injection_phrases,
            rules,
        }
    }

    /// Whether the text contains a known manipulation phrase.
    ///
    /// Case-insensitive substring match, short-circuiting on the first hit.
    pub fn screen_for_injection(&self, text: &str) -> bool {
        let lowered = text.to_lowercase();
        self.injection_phrases
            .iter()
            .any(|phrase| lowered.contains(phrase))
    }

    /// Replace every sensitive substring with a category-tagged placeholder.
    ///
    /// Returns the sanitized text and the list of triggered categories in
    /// evaluation order, each reported at most once. Idempotent on its own
    /// output: placeholders never re-match any rule pattern.
    pub fn redact(&self, text: &str) -> (String, Vec<String>) {
        let mut sanitized = text.to_string();
        let mut triggered = Vec::new();

        for rule in &self.rules {
            if rule.pattern.is_match(&sanitized) {
                triggered.push(rule.category.to_string());
                sanitized = rule
                    .pattern
                    .replace_all(&sanitized, rule.placeholder.as_str())
                    .into_owned();
            }
        }

        (sanitized, triggered)
    }
}

impl Default for ContentScreen {
    fn default() -> Self {
        Self::new()
    }
}
