//! TXT record value formatting
//!
//! DNS limits each character-string inside a TXT record to 255 bytes.
//! Longer values (DKIM keys, large SPF policies) must be sent as several
//! quoted strings within one record value: `"part1" "part2"`.
//!
//! [`format_txt_value`] turns a raw configured value into that wire
//! encoding. It is total and idempotent: feeding it an already encoded
//! value returns it unchanged.

use tracing::{debug, info};

/// Maximum length of a single TXT character-string, in bytes
pub const MAX_TXT_SEGMENT_LEN: usize = 255;

/// Separator between quoted segments of a multi-part TXT value
const SEGMENT_SEPARATOR: &str = "\" \"";

/// Format a raw TXT value for the provider API
///
/// - Pre-formatted input (see [`is_preformatted`]) is returned as-is.
/// - A single layer of surrounding quotes is stripped.
/// - Values up to 255 bytes are quoted once.
/// - Longer values are cut into 255-byte chunks, each quoted, joined by a
///   single space.
///
/// # Example
///
/// ```
/// use hddns_core::txt::format_txt_value;
///
/// assert_eq!(format_txt_value("v=spf1 mx ~all"), "\"v=spf1 mx ~all\"");
/// assert_eq!(format_txt_value("\"a\" \"b\""), "\"a\" \"b\"");
/// ```
pub fn format_txt_value(value: &str) -> String {
    if is_preformatted(value) {
        debug!("TXT value is pre-formatted, passing through as-is");
        return value.trim().to_string();
    }

    let raw = strip_single_quotes(value.trim());

    if raw.len() <= MAX_TXT_SEGMENT_LEN {
        return format!("\"{raw}\"");
    }

    let chunks = split_into_chunks(raw, MAX_TXT_SEGMENT_LEN);
    info!(
        "Split long TXT record into {} parts ({} bytes)",
        chunks.len(),
        raw.len()
    );

    chunks
        .iter()
        .map(|chunk| format!("\"{chunk}\""))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Check whether a TXT value already has the quoted wire encoding
///
/// The trimmed value must start and end with a double quote. It then
/// counts as formatted when it is either a multi-segment value (contains
/// `" "`) or a single quoted segment (exactly two quotes). Quote parity is
/// not checked: a chunked value whose text holds a stray quote must still
/// be recognised.
pub fn is_preformatted(value: &str) -> bool {
    let value = value.trim();

    if value.len() < 2 || !value.starts_with('"') || !value.ends_with('"') {
        return false;
    }

    value.contains(SEGMENT_SEPARATOR) || value.matches('"').count() == 2
}

/// Split a wire-formatted TXT value back into its un-quoted segments
///
/// An unquoted value comes back as a single segment.
pub fn split_segments(value: &str) -> Vec<String> {
    let value = value.trim();

    if value.len() < 2 || !value.starts_with('"') || !value.ends_with('"') {
        return vec![value.to_string()];
    }

    value[1..value.len() - 1]
        .split(SEGMENT_SEPARATOR)
        .map(str::to_string)
        .collect()
}

/// Remove one layer of surrounding quotes from a single-segment value
fn strip_single_quotes(value: &str) -> &str {
    if value.len() >= 2
        && value.starts_with('"')
        && value.ends_with('"')
        && !value.contains(SEGMENT_SEPARATOR)
    {
        &value[1..value.len() - 1]
    } else {
        value
    }
}

/// Cut a string at byte offsets `0, size, 2*size, ...`
///
/// A cut that would land inside a multi-byte character moves back to the
/// previous character boundary.
fn split_into_chunks(value: &str, size: usize) -> Vec<&str> {
    let mut chunks = Vec::with_capacity(value.len().div_ceil(size));
    let mut rest = value;

    while !rest.is_empty() {
        let mut end = size.min(rest.len());
        while !rest.is_char_boundary(end) {
            end -= 1;
        }
        // A single character wider than `size` bytes cannot occur for size >= 4.
        if end == 0 {
            end = rest
                .char_indices()
                .nth(1)
                .map_or(rest.len(), |(idx, _)| idx);
        }
        let (chunk, tail) = rest.split_at(end);
        chunks.push(chunk);
        rest = tail;
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_value_is_quoted_once() {
        assert_eq!(format_txt_value("v=spf1 mx ~all"), "\"v=spf1 mx ~all\"");
    }

    #[test]
    fn test_surrounding_whitespace_is_trimmed() {
        assert_eq!(format_txt_value("  hello  "), "\"hello\"");
    }

    #[test]
    fn test_empty_value_becomes_empty_string() {
        assert_eq!(format_txt_value(""), "\"\"");
    }

    #[test]
    fn test_single_quoted_value_passes_through() {
        let value = "\"v=DMARC1; p=none\"";
        assert!(is_preformatted(value));
        assert_eq!(format_txt_value(value), value);
    }

    #[test]
    fn test_multi_segment_value_passes_through() {
        let value = "\"v=DKIM1; k=rsa; p=MIIB\" \"AQAB\"";
        assert!(is_preformatted(value));
        assert_eq!(format_txt_value(value), value);
    }

    #[test]
    fn test_odd_quote_count_is_not_preformatted() {
        // Stripped and re-quoted, which reproduces the same text.
        let value = "\"a\"b\"";
        assert!(!is_preformatted(value));
        assert_eq!(format_txt_value(value), value);
    }

    #[test]
    fn test_lone_quote_is_not_preformatted() {
        assert!(!is_preformatted("\""));
        assert_eq!(format_txt_value("\""), "\"\"\"");
    }

    #[test]
    fn test_300_chars_split_into_two_segments() {
        let raw = "a".repeat(300);
        let formatted = format_txt_value(&raw);

        let expected = format!("\"{}\" \"{}\"", "a".repeat(255), "a".repeat(45));
        assert_eq!(formatted, expected);
    }

    #[test]
    fn test_exactly_255_stays_single_segment() {
        let raw = "b".repeat(255);
        assert_eq!(format_txt_value(&raw), format!("\"{raw}\""));

        let raw = "b".repeat(256);
        assert_eq!(split_segments(&format_txt_value(&raw)).len(), 2);
    }

    #[test]
    fn test_chunking_is_positional() {
        // Spaces and semicolons are not treated as preferred split points.
        let raw = format!("{}; {}", "k".repeat(253), "p".repeat(300));
        let segments = split_segments(&format_txt_value(&raw));

        assert_eq!(segments[0].len(), 255);
        assert!(segments[0].ends_with("; "));
        assert_eq!(segments.concat(), raw);
    }

    #[test]
    fn test_formatting_is_idempotent() {
        for len in [0, 1, 100, 255, 256, 510, 511, 1024] {
            let once = format_txt_value(&"x".repeat(len));
            assert_eq!(format_txt_value(&once), once, "len {len}");
        }
    }

    #[test]
    fn test_long_value_with_inner_quote_is_idempotent() {
        let raw = format!("a\"{}", "b".repeat(300));
        let once = format_txt_value(&raw);

        assert!(is_preformatted(&once));
        assert_eq!(format_txt_value(&once), once);
        assert_eq!(split_segments(&once).concat(), raw);
    }

    #[test]
    fn test_preformatted_value_is_trimmed() {
        assert_eq!(
            format_txt_value("  \"v=DMARC1; p=none\" \n"),
            "\"v=DMARC1; p=none\""
        );
        assert_eq!(format_txt_value(" \"a\" \"b\" "), "\"a\" \"b\"");
    }

    #[test]
    fn test_segments_respect_limit_and_reconstruct() {
        let raw: String = (0..2000).map(|i| char::from(b'a' + (i % 26) as u8)).collect();
        let segments = split_segments(&format_txt_value(&raw));

        assert_eq!(segments.len(), 8);
        assert!(segments.iter().all(|s| s.len() <= MAX_TXT_SEGMENT_LEN));
        assert_eq!(segments.concat(), raw);
    }

    #[test]
    fn test_multibyte_boundary_moves_back() {
        // 254 ASCII bytes followed by a 2-byte character straddling offset 255.
        let raw = format!("{}é{}", "a".repeat(254), "z".repeat(10));
        let segments = split_segments(&format_txt_value(&raw));

        assert_eq!(segments[0].len(), 254);
        assert!(segments.iter().all(|s| s.len() <= MAX_TXT_SEGMENT_LEN));
        assert_eq!(segments.concat(), raw);
    }

    #[test]
    fn test_split_segments_of_unquoted_value() {
        assert_eq!(split_segments("plain"), vec!["plain".to_string()]);
    }
}
