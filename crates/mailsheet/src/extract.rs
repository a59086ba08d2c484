//! Message body extraction
//!
//! Reduces a message payload tree to a single bounded plain-text string.
//! Extraction never fails: undecodable content becomes an empty string.

use base64::prelude::*;
use html2text::render::text_renderer::TrivialDecorator;
use log::debug;
use regex::Regex;
use std::sync::LazyLock;

use crate::models::Payload;

/// Maximum number of characters kept from a body
pub const MAX_CONTENT_CHARS: usize = 5000;

/// Appended to bodies cut at [`MAX_CONTENT_CHARS`]
pub const TRUNCATION_MARKER: &str = "... [truncated]";

const TEXT_PLAIN: &str = "text/plain";
const TEXT_HTML: &str = "text/html";

/// Wrap width handed to html2text; output is re-joined on whitespace afterwards
const HTML_RENDER_WIDTH: usize = 120;

static RE_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^<]+?>").expect("valid regex"));
static RE_BLANK_LINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\s*\n").expect("valid regex"));
static RE_SPACES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r" +").expect("valid regex"));

/// Extract the plain-text body of a message payload
///
/// Multipart payloads prefer the first `text/plain` part (depth-first) and
/// fall back to the first `text/html` part converted to text. Single-part
/// payloads are decoded directly, converting HTML if needed. The result is
/// passed through [`clean_body`].
pub fn extract_body(payload: &Payload) -> String {
    let body = match payload {
        Payload::SinglePart { data, .. } => {
            let decoded = data.as_deref().map(decode_body).unwrap_or_default();
            if payload.is_mime(TEXT_HTML) {
                html_to_text(&decoded)
            } else {
                decoded
            }
        }
        Payload::MultiPart { parts, .. } => {
            if let Some(data) = find_part(parts, TEXT_PLAIN) {
                data.map(decode_body).unwrap_or_default()
            } else if let Some(data) = find_part(parts, TEXT_HTML) {
                html_to_text(&data.map(decode_body).unwrap_or_default())
            } else {
                String::new()
            }
        }
    };

    clean_body(&body)
}

/// Find the first leaf of the given MIME type, searching nested containers in order
///
/// Returns `Some(None)` for a matching leaf that carries no data.
fn find_part<'a>(parts: &'a [Payload], mime: &str) -> Option<Option<&'a str>> {
    for part in parts {
        match part {
            Payload::SinglePart { data, .. } if part.is_mime(mime) => {
                return Some(data.as_deref());
            }
            Payload::SinglePart { .. } => {}
            Payload::MultiPart { parts: nested, .. } => {
                if let Some(found) = find_part(nested, mime) {
                    return Some(found);
                }
            }
        }
    }

    None
}

/// Decode base64-encoded body data as UTF-8
///
/// Gmail uses URL-safe base64 but padding can vary, so we try multiple decoders.
/// Undecodable input yields an empty string.
pub fn decode_body(data: &str) -> String {
    use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD, URL_SAFE};

    let decoders: &[&base64::engine::GeneralPurpose] =
        &[&BASE64_URL_SAFE_NO_PAD, &URL_SAFE, &STANDARD, &STANDARD_NO_PAD];

    for decoder in decoders {
        if let Ok(decoded) = decoder.decode(data)
            && let Ok(s) = String::from_utf8(decoded)
        {
            return s;
        }
    }

    debug!("Body data could not be decoded ({} bytes)", data.len());
    String::new()
}

/// Convert HTML to plain text
///
/// Keeps only text content, joined with single spaces. Tables render without
/// borders. Falls back to regex tag stripping if the HTML renderer errors or
/// panics on malformed input.
pub fn html_to_text(html: &str) -> String {
    let rendered = std::panic::catch_unwind(|| {
        html2text::config::with_decorator(TrivialDecorator::new())
            .no_table_borders()
            .string_from_read(html.as_bytes(), HTML_RENDER_WIDTH)
    });

    match rendered {
        Ok(Ok(text)) => text.split_whitespace().collect::<Vec<_>>().join(" "),
        Ok(Err(e)) => {
            debug!("HTML rendering failed ({}), stripping tags instead", e);
            strip_tags(html)
        }
        Err(_) => {
            debug!("HTML renderer panicked, stripping tags instead");
            strip_tags(html)
        }
    }
}

/// Remove anything that looks like a tag
fn strip_tags(html: &str) -> String {
    RE_TAG.replace_all(html, "").trim().to_string()
}

/// Normalize whitespace and cap the length of a body
///
/// Runs of blank lines collapse to one blank line, runs of spaces to one
/// space. Bodies longer than [`MAX_CONTENT_CHARS`] characters are cut and
/// get [`TRUNCATION_MARKER`] appended.
pub fn clean_body(body: &str) -> String {
    let body = RE_BLANK_LINES.replace_all(body, "\n\n");
    let body = RE_SPACES.replace_all(&body, " ");

    let body = if body.chars().count() > MAX_CONTENT_CHARS {
        let mut truncated: String = body.chars().take(MAX_CONTENT_CHARS).collect();
        truncated.push_str(TRUNCATION_MARKER);
        truncated
    } else {
        body.into_owned()
    };

    body.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(s: &str) -> Option<String> {
        Some(BASE64_URL_SAFE_NO_PAD.encode(s))
    }

    #[test]
    fn test_single_part_plain() {
        let payload = Payload::single("text/plain", encode("Hello, World!"));
        assert_eq!(extract_body(&payload), "Hello, World!");
    }

    #[test]
    fn test_single_part_html_converted() {
        let payload = Payload::single(
            "text/html",
            encode("<html><body><p>Hello</p><p><b>World</b></p></body></html>"),
        );
        assert_eq!(extract_body(&payload), "Hello World");
    }

    #[test]
    fn test_html_table_has_no_border_characters() {
        let html = "<table><tr><td>Order</td><td>Total</td></tr>\
                    <tr><td>A1</td><td>$5</td></tr></table>";
        assert_eq!(html_to_text(html), "Order Total A1 $5");
    }

    #[test]
    fn test_html_layout_table_body() {
        let payload = Payload::single(
            "text/html",
            encode(
                "<html><body><table width=\"600\"><tr><td><h1>Receipt</h1></td></tr>\
                 <tr><td><p>Thanks for your order.</p></td></tr></table></body></html>",
            ),
        );
        let body = extract_body(&payload);
        assert!(body.contains("Receipt"));
        assert!(body.contains("Thanks for your order."));
        assert!(!body.contains(|c: char| ('\u{2500}'..='\u{257F}').contains(&c)));
    }

    #[test]
    fn test_single_part_without_data_is_empty() {
        let payload = Payload::single("text/plain", None);
        assert_eq!(extract_body(&payload), "");
    }

    #[test]
    fn test_multipart_prefers_plain_over_html() {
        let payload = Payload::multi(
            "multipart/alternative",
            vec![
                Payload::single("text/html", encode("<p>HTML version</p>")),
                Payload::single("text/plain", encode("Plain version")),
            ],
        );
        assert_eq!(extract_body(&payload), "Plain version");
    }

    #[test]
    fn test_multipart_falls_back_to_html() {
        let payload = Payload::multi(
            "multipart/mixed",
            vec![
                Payload::single("application/pdf", encode("%PDF")),
                Payload::single("text/html", encode("<div>Only <i>HTML</i></div>")),
            ],
        );
        assert_eq!(extract_body(&payload), "Only HTML");
    }

    #[test]
    fn test_multipart_searches_nested_parts() {
        let payload = Payload::multi(
            "multipart/mixed",
            vec![
                Payload::multi(
                    "multipart/alternative",
                    vec![
                        Payload::single("text/plain", encode("Nested plain")),
                        Payload::single("text/html", encode("<p>Nested html</p>")),
                    ],
                ),
                Payload::single("image/png", None),
            ],
        );
        assert_eq!(extract_body(&payload), "Nested plain");
    }

    #[test]
    fn test_multipart_without_text_parts_is_empty() {
        let payload = Payload::multi("multipart/mixed", vec![Payload::single("image/png", None)]);
        assert_eq!(extract_body(&payload), "");
    }

    #[test]
    fn test_decode_body_padding_variants() {
        assert_eq!(decode_body("SGVsbG8sIFdvcmxkIQ"), "Hello, World!");
        assert_eq!(decode_body("SGVsbG8sIFdvcmxkIQ=="), "Hello, World!");
    }

    #[test]
    fn test_decode_body_url_safe_alphabet() {
        // "??>" encodes to "Pz8-" with the URL-safe alphabet
        assert_eq!(decode_body("Pz8-"), "??>");
    }

    #[test]
    fn test_decode_body_invalid_is_empty() {
        assert_eq!(decode_body("!!not base64!!"), "");
        // Valid base64, invalid UTF-8 (0xff 0xfe)
        assert_eq!(decode_body("__4"), "");
    }

    #[test]
    fn test_strip_tags_fallback() {
        assert_eq!(strip_tags("<p>Hi <b>there</b></p>"), "Hi there");
    }

    #[test]
    fn test_clean_collapses_blank_lines_and_spaces() {
        let body = "Line one\n\n\n\nLine two\n   \n\t\nLine    three";
        assert_eq!(clean_body(body), "Line one\n\nLine two\n\nLine three");
    }

    #[test]
    fn test_clean_trims() {
        assert_eq!(clean_body("  \n hello \n  "), "hello");
    }

    #[test]
    fn test_clean_truncates_long_bodies() {
        let body = "a".repeat(MAX_CONTENT_CHARS + 250);
        let cleaned = clean_body(&body);
        assert_eq!(
            cleaned,
            format!("{}{}", "a".repeat(MAX_CONTENT_CHARS), TRUNCATION_MARKER)
        );
    }

    #[test]
    fn test_clean_exact_limit_not_truncated() {
        let body = "b".repeat(MAX_CONTENT_CHARS);
        assert_eq!(clean_body(&body), body);
    }

    #[test]
    fn test_clean_truncation_counts_characters_not_bytes() {
        let body = "é".repeat(MAX_CONTENT_CHARS + 1);
        let cleaned = clean_body(&body);
        assert!(cleaned.ends_with(TRUNCATION_MARKER));
        assert_eq!(
            cleaned.chars().count(),
            MAX_CONTENT_CHARS + TRUNCATION_MARKER.chars().count()
        );
    }
}
