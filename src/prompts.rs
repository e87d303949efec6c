//! Prompt templates for the extraction-and-summary request.
//!
//! Keeping the templates here, apart from the client code, lets the tests
//! inspect them directly without a model. The templates are fixed: the only
//! dynamic part of a prompt is the embedded page text.

use crate::config::Locale;

/// Placeholder replaced by the (possibly truncated) page text.
const TEXT_SLOT: &str = "{text}";

/// English instruction template.
pub const PROMPT_TEMPLATE_EN: &str = r#"Please analyse the following text and perform the tasks below:

1. **Information Extraction:**
   - **Email Addresses:** Identify and list all email addresses.
   - **Phone Numbers:** Identify and list all phone numbers.
   - **Physical Addresses:** Identify and list all physical addresses.

2. **Summary:**
   - Provide a short summary of the main points or content of the text.

**Response Format:**
Reply only with a JSON object containing the following fields:
- `phoneNumbers`: an array of extracted phone numbers.
- `addresses`: an array of extracted physical addresses.
- `summary`: a string containing the short summary.

**Example Response:**
```json
{
  "phoneNumbers": ["+1-555-123-4567"],
  "addresses": ["15 Main Street, Springfield, USA"],
  "summary": "The text discusses an upcoming company meeting and its contact details."
}
```

**Text to Analyse:**
```
{text}
```
"#;

/// Greek instruction template.
pub const PROMPT_TEMPLATE_EL: &str = r#"Παρακαλώ αναλύστε το ακόλουθο κείμενο και εκτελέστε τις παρακάτω εργασίες:

1. **Εξαγωγή Πληροφοριών:**
   - **Διευθύνσεις Email:** Αναγνωρίστε και παραθέστε όλες τις διευθύνσεις email.
   - **Αριθμοί Τηλεφώνου:** Αναγνωρίστε και παραθέστε όλους τους αριθμούς τηλεφώνου.
   - **Φυσικές Διευθύνσεις:** Αναγνωρίστε και παραθέστε όλες τις φυσικές διευθύνσεις.

2. **Περίληψη:**
   - Παρέχετε μια σύντομη περίληψη των κύριων σημείων ή του περιεχομένου του κειμένου.

**Μορφή Απάντησης:**
Απαντήστε αποκλειστικά με ένα αντικείμενο JSON που περιέχει τα ακόλουθα πεδία:
- `phoneNumbers`: Ένα πίνακα με εξαγόμενους αριθμούς τηλεφώνου.
- `addresses`: Ένα πίνακα με εξαγόμενες φυσικές διευθύνσεις.
- `summary`: Ένα κείμενο που περιέχει τη σύντομη περίληψη.

**Παράδειγμα Απάντησης:**
```json
{
  "phoneNumbers": ["+30-123-456-7890"],
  "addresses": ["Οδός Παπαδιαμάντη 15, Αθήνα, Ελλάδα"],
  "summary": "Το κείμενο συζητά την επερχόμενη εταιρική συνάντηση και τις πληροφορίες επικοινωνίας."
}
```

**Κείμενο προς Ανάλυση:**
```
{text}
```
"#;

/// Template for `locale`.
pub fn template(locale: Locale) -> &'static str {
    match locale {
        Locale::English => PROMPT_TEMPLATE_EN,
        Locale::Greek => PROMPT_TEMPLATE_EL,
    }
}

/// Marker appended to text that was cut to the prompt limit.
pub fn truncation_marker(locale: Locale) -> &'static str {
    match locale {
        Locale::English => "... [Content Truncated]",
        Locale::Greek => "... [Περιεχόμενο Περιορίστηκε]",
    }
}

/// A filled-in prompt and what went into it.
#[derive(Debug, Clone)]
pub struct BuiltPrompt {
    pub text: String,
    pub truncated: bool,
    /// Characters of page text embedded, excluding the marker.
    pub embedded_chars: usize,
}

/// Embed `text` in the template for `locale`.
///
/// Text of `max_chars` characters or more is cut to exactly its first
/// `max_chars` characters and followed by the truncation marker.
pub fn build_prompt(text: &str, max_chars: usize, locale: Locale) -> BuiltPrompt {
    let (head, truncated) = truncate_chars(text, max_chars);
    let body = if truncated {
        format!("{head}{}", truncation_marker(locale))
    } else {
        head.to_string()
    };
    BuiltPrompt {
        text: template(locale).replacen(TEXT_SLOT, &body, 1),
        truncated,
        embedded_chars: head.chars().count(),
    }
}

/// First `max_chars` characters of `text`, and whether the cut applied.
///
/// Slices on a char boundary so multi-byte text is never split mid-character.
pub fn truncate_chars(text: &str, max_chars: usize) -> (&str, bool) {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => (&text[..byte_idx], true),
        // Exactly `max_chars` characters still counts as reaching the limit.
        None if text.chars().count() == max_chars => (text, true),
        None => (text, false),
    }
}
