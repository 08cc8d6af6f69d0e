//! Classifier code repair.
//!
//! Codes come from years of hand entry: `CM 99-11`, `13.05`, `0908`,
//! `09-08 CRACKERJACK`, `O6-03`. The rewrite rules below run in order, each on
//! the previous output. The alias and run-together tables come before the
//! generic digit grouping so the known exceptions win.

use once_cell::sync::Lazy;
use regex::Regex;

struct Rule {
    pattern: Regex,
    replacement: &'static str,
    /// Number of matches to replace; 0 means all of them.
    limit: usize,
}

impl Rule {
    fn all(pattern: &str, replacement: &'static str) -> Self {
        Self::limited(pattern, replacement, 0)
    }

    fn first(pattern: &str, replacement: &'static str) -> Self {
        Self::limited(pattern, replacement, 1)
    }

    fn literal(from: &str, replacement: &'static str) -> Self {
        Self::all(&regex::escape(from), replacement)
    }

    fn limited(pattern: &str, replacement: &'static str, limit: usize) -> Self {
        Self {
            pattern: Regex::new(pattern).unwrap(),
            replacement,
            limit,
        }
    }

    fn apply(&self, text: String) -> String {
        self.pattern
            .replacen(&text, self.limit, self.replacement)
            .into_owned()
    }
}

/// Informal names that stand for a specific code (already upper-cased, spaces removed).
const NAMED_CODES: &[(&str, &str)] = &[
    ("09-08CRACKERJACK", "09-08"),
    ("13-05TICK-TOCK", "13-05"),
];

/// Run-together entries with a known intended split.
const RUN_TOGETHER_CODES: &[(&str, &str)] = &[
    ("0309", "03-09"),
    ("9964", "99-64"),
    ("9910", "99-10"),
];

static RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    let mut rules = vec![
        Rule::all(r#"[.'"]"#, ""),
        Rule::all(r"\s+", ""),
        Rule::literal("CM", ""),
    ];
    rules.extend(NAMED_CODES.iter().map(|&(from, to)| Rule::literal(from, to)));
    rules.extend(RUN_TOGETHER_CODES.iter().map(|&(from, to)| Rule::literal(from, to)));
    rules.extend([
        Rule::all(r"[-_]+", "-"),
        // letter O typed for the zero of the 2006 series
        Rule::literal("O6", "06"),
        Rule::first(r"(\d{2})(\d{2})", "$1-$2"),
        Rule::first(r"^-", ""),
    ]);
    rules
});

static CODE_CANDIDATE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d\d-\d\d").unwrap());
static CANONICAL_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d\d-\d\d$").unwrap());

/// Repairs a free-text classifier code into `NN-NN`, or `None` when nothing
/// usable is left.
pub fn normalize_code(raw: &str) -> Option<String> {
    let rewritten = RULES
        .iter()
        .fold(raw.to_uppercase().trim().to_string(), |text, rule| rule.apply(text));

    // Tolerate trailing garbage after a valid code.
    let candidate = CODE_CANDIDATE
        .find(&rewritten)
        .map(|m| m.as_str())
        .unwrap_or(&rewritten);

    CANONICAL_CODE
        .is_match(candidate)
        .then(|| candidate.to_string())
}
