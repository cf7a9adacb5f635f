use std::sync::LazyLock;

use regex::bytes::Regex;

/// Markup that has no business inside a raster image. Case-insensitive and
/// multi-line; the payload is scanned as text, invalid UTF-8 is skipped over.
const SUSPICIOUS_MARKUP_PATTERN: &str = concat!(
    r"(?im)<script|<html|<head|<title|<body|<pre|<table|<a\s+href|<img",
    r"|<plaintext|<cross-domain-policy",
);

static SUSPICIOUS_MARKUP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(SUSPICIOUS_MARKUP_PATTERN).expect("suspicious markup pattern is a valid regex")
});

/// Whether the payload contains HTML/script markers that browsers or
/// plugins could interpret if the file were served back.
///
/// This is a heuristic: binary data can match by accident, and polyglots
/// that avoid these markers are not caught.
pub fn contains_suspicious_markup(payload: &[u8]) -> bool {
    SUSPICIOUS_MARKUP.is_match(payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_marker_is_flagged() {
        for marker in [
            "<script",
            "<html",
            "<head",
            "<title",
            "<body",
            "<pre",
            "<table",
            "<a href",
            "<img",
            "<plaintext",
            "<cross-domain-policy",
        ] {
            let payload = format!("GIF89a....{marker}>....");
            assert!(contains_suspicious_markup(payload.as_bytes()), "{marker}");
        }
    }

    #[test]
    fn markers_are_case_insensitive() {
        assert!(contains_suspicious_markup(b"<SCRIPT>alert(1)</SCRIPT>"));
        assert!(contains_suspicious_markup(b"<Html>"));
        assert!(contains_suspicious_markup(b"<A HREF='x'>"));
    }

    #[test]
    fn anchor_needs_whitespace_before_href() {
        assert!(contains_suspicious_markup(b"<a\thref=x>"));
        assert!(contains_suspicious_markup(b"<a\r\n   href=x>"));
        assert!(!contains_suspicious_markup(b"<ahref=x>"));
        assert!(!contains_suspicious_markup(b"<abbr title>"));
    }

    #[test]
    fn markers_across_lines() {
        assert!(contains_suspicious_markup(b"line one\nline two\n<body onload=x>\n"));
    }

    #[test]
    fn marker_inside_binary_is_flagged() {
        let mut payload = vec![0xFF, 0xD8, 0xFF, 0xE0, 0x80, 0xC3, 0x28];
        payload.extend_from_slice(b"<script>alert(1)</script>");
        payload.extend_from_slice(&[0xFE, 0xFF, 0x00, 0xD9]);
        assert!(contains_suspicious_markup(&payload));
    }

    #[test]
    fn clean_payloads_pass() {
        assert!(!contains_suspicious_markup(b""));
        assert!(!contains_suspicious_markup(&[0xFF, 0xD8, 0xFF, 0xDB, 0x00, 0x43, 0xFF, 0xD9]));
        assert!(!contains_suspicious_markup(b"a < b and <image> are fine"));
    }
}
