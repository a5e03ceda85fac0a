//! Text helpers shared by the extraction and enrichment stages.
//!
//! - Log-friendly truncation of large page bodies
//! - Flattening scraped markup to plain text, inline or line-preserving

use scraper::{ElementRef, Html};

/// Truncate a string for logging purposes.
///
/// Long strings are cut to at most `max` bytes (on a char boundary) with an
/// ellipsis and the remaining byte count appended.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log(&"a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}…(+{} bytes)", &s[..cut], s.len() - cut)
}

/// Text of an element collapsed onto one line.
///
/// Every run of whitespace becomes a single space, so titles split across
/// nested tags still read naturally.
pub fn inline_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Text of an element with one line per non-empty text node.
pub fn block_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Strip markup from an HTML fragment, keeping line structure.
///
/// Plain text without any tags is returned trimmed and otherwise untouched.
pub fn html_to_text(raw: &str) -> String {
    if !looks_like_html(raw) {
        return raw.trim().to_string();
    }
    let fragment = Html::parse_fragment(raw);
    block_text(fragment.root_element())
}

/// Cheap check for markup before paying for a parse.
pub fn looks_like_html(raw: &str) -> bool {
    raw.contains('<') && raw.contains('>')
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Selector;

    #[test]
    fn test_truncate_for_log_short_string() {
        let s = "Hello, world!";
        assert_eq!(truncate_for_log(s, 100), "Hello, world!");
    }

    #[test]
    fn test_truncate_for_log_long_string() {
        let s = "a".repeat(500);
        let result = truncate_for_log(&s, 100);
        assert!(result.starts_with(&"a".repeat(100)));
        assert!(result.contains("…(+400 bytes)"));
    }

    #[test]
    fn test_truncate_for_log_respects_char_boundaries() {
        let s = "é".repeat(10);
        let result = truncate_for_log(&s, 3);
        assert!(result.starts_with('é'));
        assert!(result.contains("(+18 bytes)"));
    }

    #[test]
    fn test_html_to_text_preserves_lines() {
        let raw = "<p>We are hiring.</p><ul><li>Rust</li><li>  Tokio </li></ul>";
        assert_eq!(html_to_text(raw), "We are hiring.\nRust\nTokio");
    }

    #[test]
    fn test_html_to_text_passes_plain_text_through() {
        assert_eq!(html_to_text("  no markup here \n"), "no markup here");
    }

    #[test]
    fn test_inline_text_collapses_whitespace() {
        let doc = Html::parse_fragment("<h3>  Senior\n   <b>Rust</b> Engineer </h3>");
        let selector = Selector::parse("h3").unwrap();
        let h3 = doc.select(&selector).next().unwrap();
        assert_eq!(inline_text(h3), "Senior Rust Engineer");
    }
}
