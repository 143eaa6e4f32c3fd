//! XSS sanitization for free-text fields.
//!
//! Regex-based stripping per field type (name, address, phone, rich text)
//! with length truncation. All functions are stateless and pure; sanitized
//! output is a fixed point, so running a sanitizer twice never changes the
//! result further. Handlers call these after schema validation and before
//! any SQL touches the value.

use once_cell::sync::Lazy;
use regex::Regex;

/// Per-field-type length caps, applied after stripping (in chars).
pub const NAME_MAX_CHARS: usize = 100;
pub const ADDRESS_MAX_CHARS: usize = 200;
pub const PHONE_MAX_CHARS: usize = 20;
pub const RICH_TEXT_MAX_CHARS: usize = 5000;

// <script>/<style> elements go with their entire content; a stray tag pair
// left behind would otherwise turn the body into visible text.
static SCRIPT_STYLE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<(script|style)\b[^>]*>.*?</(script|style)\s*>").unwrap()
});

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").unwrap());

static JS_URI_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)javascript\s*:").unwrap());

static EVENT_HANDLER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)\bon[a-z]+\s*=\s*("[^"]*"|'[^']*'|[^\s>]*)"#).unwrap());

static WHITESPACE_RUN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

static PHONE_REJECT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^0-9+().\s-]").unwrap());

/// Remove every HTML/XML tag construct, script and style bodies included.
fn strip_tags(text: &str) -> String {
    let without_blocks = SCRIPT_STYLE_RE.replace_all(text, "");
    TAG_RE.replace_all(&without_blocks, "").into_owned()
}

/// Truncate to `max` characters on a char boundary.
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

/// Short plain-text fields with a caller-chosen cap (titles, locations,
/// note headers).
pub fn sanitize_text(input: &str, max: usize) -> String {
    truncate_chars(strip_tags(input).trim(), max)
}

/// Person names: no markup, single-spaced, at most [`NAME_MAX_CHARS`].
pub fn sanitize_name(input: &str) -> String {
    let stripped = strip_tags(input);
    let collapsed = WHITESPACE_RUN_RE.replace_all(&stripped, " ");
    truncate_chars(collapsed.trim(), NAME_MAX_CHARS)
}

/// Address lines, cities, postal codes: no markup, at most [`ADDRESS_MAX_CHARS`].
pub fn sanitize_address(input: &str) -> String {
    let stripped = strip_tags(input);
    truncate_chars(stripped.trim(), ADDRESS_MAX_CHARS)
}

/// Phone numbers: digits and common separators only, at most [`PHONE_MAX_CHARS`].
pub fn sanitize_phone(input: &str) -> String {
    let kept = PHONE_REJECT_RE.replace_all(input, "");
    truncate_chars(kept.trim(), PHONE_MAX_CHARS)
}

/// Rich text (bios, note contents, appointment details): script/style bodies
/// dropped, tags stripped, `javascript:` URIs and inline event handlers
/// removed, at most [`RICH_TEXT_MAX_CHARS`].
pub fn sanitize_rich_text(input: &str) -> String {
    let stripped = strip_tags(input);
    let no_uris = JS_URI_RE.replace_all(&stripped, "");
    let no_handlers = EVENT_HANDLER_RE.replace_all(&no_uris, "");
    truncate_chars(no_handlers.trim(), RICH_TEXT_MAX_CHARS)
}
