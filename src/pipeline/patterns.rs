//! Deterministic pattern extraction: emails, phone-like and address-like tokens.
//!
//! Each rule scans the whole text on its own and keeps every non-overlapping
//! match in order of appearance. Nothing is deduplicated, so the length of a
//! list equals the number of matches. The rules are heuristics: the phone
//! rule accepts any 7-digit run, and the address rule only knows US-style
//! street suffixes.

use crate::output::PatternExtraction;
use once_cell::sync::Lazy;
use regex::Regex;

// Character classes and word boundaries are ASCII-only, so a Greek letter
// next to an address counts as a boundary and never as part of a word.

static RE_EMAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[A-Za-z0-9_.%+-]+@[A-Za-z0-9_.-]+\.[A-Za-z]{2,}").unwrap());

static RE_PHONE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\+?[0-9]{1,3}[-.\s]?)?(\(?[0-9]{3}\)?[-.\s]?)?[0-9]{3}[-.\s]?[0-9]{4}").unwrap()
});

static RE_ADDRESS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(?-u:\b)[0-9]{1,5}\s(?:[A-Za-z0-9#]+\s){1,4}(?:Street|St|Avenue|Ave|Boulevard|Blvd|Road|Rd|Lane|Ln|Drive|Dr|Court|Ct|Square|Sq|Loop|Lp|Trail|Trl|Parkway|Pkwy)(?-u:\b)",
    )
    .unwrap()
});

/// Run all three rules over `text`.
pub fn extract_patterns(text: &str) -> PatternExtraction {
    PatternExtraction {
        emails: find_all(&RE_EMAIL, text),
        phones: find_all(&RE_PHONE, text),
        addresses: find_all(&RE_ADDRESS, text),
    }
}

fn find_all(re: &Regex, text: &str) -> Vec<String> {
    re.find_iter(text).map(|m| m.as_str().to_string()).collect()
}
