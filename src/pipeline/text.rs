//! HTML → plain text.
//!
//! Parses the rendered document with `scraper` (html5ever underneath, so any
//! input parses) and concatenates the text nodes of `<body>`, falling back to
//! the root element for fragments without one. Text inside non-rendered
//! elements (`script`, `style`, `noscript`, `template`) is skipped.

use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

static BODY: Lazy<Selector> = Lazy::new(|| Selector::parse("body").unwrap());

const SKIPPED_TAGS: &[&str] = &["script", "style", "noscript", "template"];

/// Visible text of `html`. Never fails; may return an empty string.
pub fn extract_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut out = String::with_capacity(html.len() / 4);

    match document.select(&BODY).next() {
        Some(body) => collect_text(body, &mut out),
        None => collect_text(document.root_element(), &mut out),
    }

    debug!("Extracted {} chars of text from {} bytes of HTML", out.chars().count(), html.len());
    out
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    if SKIPPED_TAGS.contains(&element.value().name()) {
        return;
    }
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
        } else if let Some(child_el) = ElementRef::wrap(child) {
            collect_text(child_el, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_body_text_without_markup() {
        let html = "<html><head><title>T</title></head>\
                    <body><h1>Hello</h1><p>Mail <b>info@shop.com</b></p></body></html>";
        assert_eq!(extract_text(html), "HelloMail info@shop.com");
    }

    #[test]
    fn skips_scripts_and_styles() {
        let html = "<body><script>var x = 1;</script><style>p{}</style><p>Visible</p></body>";
        assert_eq!(extract_text(html), "Visible");
    }

    #[test]
    fn head_text_is_excluded() {
        let html = "<html><head><title>Hidden title</title></head><body>Shown</body></html>";
        assert_eq!(extract_text(html), "Shown");
    }

    #[test]
    fn malformed_html_degrades_gracefully() {
        let text = extract_text("<div><p>unclosed <span>tags");
        assert!(text.contains("unclosed tags"));
    }

    #[test]
    fn empty_input_yields_empty_string() {
        assert_eq!(extract_text(""), "");
    }
}
