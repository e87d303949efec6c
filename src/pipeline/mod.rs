//! Pipeline stages for turning a URL into contact details and a summary.
//!
//! Each submodule implements exactly one step, so each can be tested on its
//! own and the two I/O-bound stages can be swapped for fakes.
//!
//! ## Data Flow
//!
//! ```text
//! render ──▶ text ──┬──▶ patterns ───────────────────────────┐
//! (Chromium) (HTML) │                                        ├──▶ merge
//!                   └──▶ prompt ──▶ llm ──▶ normalize ───────┘
//!                        (cap)     (Groq)  (JSON check)
//! ```
//!
//! 1. [`render`]    — load the page in a fresh headless browser
//! 2. [`text`]      — strip markup, keep the body text
//! 3. [`patterns`]  — regex extraction over the full text
//! 4. [`crate::prompts`] — cap the text and fill in the template
//! 5. [`llm`]       — call the completion API, backing off on rate limits
//! 6. [`normalize`] — sanitise and validate the model answer
//!
//! The pattern branch and the model branch only read the extracted text and
//! run concurrently; [`crate::scrape::Scraper`] joins them.

pub mod llm;
pub mod normalize;
pub mod patterns;
pub mod render;
pub mod text;
