//! Model answer → [`ModelExtraction`].
//!
//! The model is asked for bare JSON but sometimes wraps it in a markdown
//! fence or leaves stray backticks around it. [`sanitize`] removes those
//! artefacts without parsing markdown; [`normalize`] then parses the result
//! and checks its shape. A wrong shape is an error, never a partial result.

use crate::error::ScrapeError;
use crate::output::ModelExtraction;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

/// Opening or closing fence, with an optional language tag (```` ```json ````).
static RE_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"```[A-Za-z0-9_+-]*").unwrap());

/// Strip code fences and surrounding backticks, then trim.
pub fn sanitize(raw: &str) -> String {
    let without_fences = RE_FENCE.replace_all(raw, "");
    without_fences.trim().trim_matches('`').trim().to_string()
}

/// Sanitise, parse and validate a model answer.
///
/// Fails with [`ScrapeError::EmptyResponse`] for blank input and with
/// [`ScrapeError::MalformedResponse`] when the text is not JSON or when
/// `phoneNumbers`/`addresses` are not string arrays or `summary` is not a
/// string. Extra keys are ignored.
pub fn normalize(raw: &str) -> Result<ModelExtraction, ScrapeError> {
    if raw.trim().is_empty() {
        return Err(ScrapeError::EmptyResponse);
    }

    let cleaned = sanitize(raw);
    debug!("Sanitised model answer: {} chars", cleaned.chars().count());
    if cleaned.is_empty() {
        return Err(ScrapeError::MalformedResponse {
            detail: "answer contained only formatting".into(),
        });
    }

    serde_json::from_str::<ModelExtraction>(&cleaned).map_err(|e| {
        ScrapeError::MalformedResponse {
            detail: e.to_string(),
        }
    })
}
