//! Request, intermediate and response types of the scrape pipeline.
//!
//! The wire names are part of the public JSON contract (`extractedData`,
//! `phoneNumbers`), so every public type that crosses the HTTP boundary uses
//! `camelCase` serialisation.

use serde::{Deserialize, Serialize};

/// Body of `POST /scrape`.
///
/// `url` is optional at the wire level: a missing or blank URL is reported as
/// [`crate::error::ScrapeError::MissingUrl`] rather than as a JSON rejection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScrapeRequest {
    #[serde(default)]
    pub url: Option<String>,
}

impl ScrapeRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
        }
    }
}

/// HTML serialised from the browser after the initial DOM was parsed.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub html: String,
    /// Location after redirects, when the browser reported one.
    pub final_url: Option<String>,
    pub render_ms: u64,
}

/// Matches of the deterministic patterns, in source order, duplicates kept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternExtraction {
    pub emails: Vec<String>,
    pub phones: Vec<String>,
    pub addresses: Vec<String>,
}

/// The validated model answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelExtraction {
    pub phone_numbers: Vec<String>,
    pub addresses: Vec<String>,
    pub summary: String,
}

/// `extractedData` block of [`ScrapeResponse`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedData {
    pub emails: Vec<String>,
    pub phone_numbers: Vec<String>,
    pub addresses: Vec<String>,
}

/// The payload returned to callers.
///
/// `emails` always comes from pattern extraction; phone numbers, addresses
/// and the summary always come from the model. The pattern phones and
/// addresses are dropped here to keep the response shape stable; use
/// [`ScrapeReport`] to see both sources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeResponse {
    pub extracted_data: ExtractedData,
    pub summary: String,
}

impl ScrapeResponse {
    /// Merge the two extraction results.
    pub fn merge(patterns: &PatternExtraction, model: &ModelExtraction) -> Self {
        Self {
            extracted_data: ExtractedData {
                emails: patterns.emails.clone(),
                phone_numbers: model.phone_numbers.clone(),
                addresses: model.addresses.clone(),
            },
            summary: model.summary.clone(),
        }
    }
}

/// Timing and size figures for one scrape.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeStats {
    pub render_ms: u64,
    /// Characters of visible text extracted from the page.
    pub text_chars: usize,
    /// Characters of page text embedded in the prompt.
    pub prompt_chars: usize,
    pub truncated: bool,
    pub model_attempts: u32,
    pub model_ms: u64,
    pub total_ms: u64,
}

/// Extended result: the compatible response plus both extraction sources.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeReport {
    pub url: String,
    pub final_url: Option<String>,
    pub response: ScrapeResponse,
    pub patterns: PatternExtraction,
    pub model: ModelExtraction,
    pub stats: ScrapeStats,
}

impl ScrapeReport {
    pub fn into_response(self) -> ScrapeResponse {
        self.response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_uses_camel_case_wire_names() {
        let resp = ScrapeResponse {
            extracted_data: ExtractedData {
                emails: vec!["a@b.co".into()],
                phone_numbers: vec![],
                addresses: vec![],
            },
            summary: "s".into(),
        };
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "extractedData": { "emails": ["a@b.co"], "phoneNumbers": [], "addresses": [] },
                "summary": "s"
            })
        );
    }

    #[test]
    fn merge_takes_emails_from_patterns_only() {
        let patterns = PatternExtraction {
            emails: vec!["info@shop.com".into()],
            phones: vec!["555-123-4567".into()],
            addresses: vec!["12 Main Street".into()],
        };
        let model = ModelExtraction {
            phone_numbers: vec!["+1 (555) 000-1111".into()],
            addresses: vec!["1 Infinite Loop".into()],
            summary: "A shop.".into(),
        };
        let merged = ScrapeResponse::merge(&patterns, &model);
        assert_eq!(merged.extracted_data.emails, patterns.emails);
        assert_eq!(merged.extracted_data.phone_numbers, model.phone_numbers);
        assert_eq!(merged.extracted_data.addresses, model.addresses);
        assert_eq!(merged.summary, "A shop.");
    }

    #[test]
    fn request_without_url_deserialises() {
        let req: ScrapeRequest = serde_json::from_str("{}").unwrap();
        assert!(req.url.is_none());
    }
}
