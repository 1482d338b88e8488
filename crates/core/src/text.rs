//! Text cleaning and ignore rules applied to extracted runs.
//!
//! Layout decoders emit plenty of noise: bullet glyphs on their own line,
//! page numbers, copyright marks, stray ellipses. Everything here decides
//! whether a piece of text is worth keeping and, if so, what it looks like
//! once list markers are peeled off.

use std::sync::OnceLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

/// Glyph bullets may be followed directly by text ("•Item").
const GLYPH_BULLETS: &str = "•·▪▫▬►‣⁃";

/// Markers that only count as bullets when whitespace follows ("- Item").
const SPACED_BULLETS: &str = r"*\-—–+>»○□";

/// Standalone tokens that are layout artifacts rather than content.
const ARTIFACTS: [&str; 5] = ["©", "®", "™", "...", "…"];

fn bullet_prefix() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(r"^(?:[{GLYPH_BULLETS}]\s*|[{SPACED_BULLETS}]\s+)")).unwrap()
    })
}

fn lone_numbering() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(?:\d+|[a-zA-Z])[.)]$").unwrap())
}

fn symbols_only() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[^\w\s]+$").unwrap())
}

fn bare_number() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d+$").unwrap())
}

/// Strip leading bullet markers, returning what follows them.
///
/// Returns `None` when the text does not start with a marker.
fn strip_bullets(text: &str) -> Option<&str> {
    let re = bullet_prefix();
    let mut rest = text;
    let mut stripped = false;
    while let Some(m) = re.find(rest) {
        if m.end() == 0 {
            break;
        }
        rest = &rest[m.end()..];
        stripped = true;
    }
    stripped.then_some(rest)
}

/// Returns `true` when `text` is nothing but a list marker: a bullet with no
/// content after it, a lone numbering token like `1.` or `a)`, or a very
/// short run of punctuation.
pub fn is_bullet_marker(text: &str) -> bool {
    let trimmed = text.trim();

    if strip_bullets(trimmed).is_some_and(|rest| rest.trim().is_empty()) {
        return true;
    }

    if lone_numbering().is_match(trimmed) {
        return true;
    }

    trimmed.chars().count() <= 3 && symbols_only().is_match(trimmed)
}

/// Decide whether `text` carries no content worth keeping.
pub fn should_ignore(text: &str) -> bool {
    let trimmed = text.trim();

    // Also covers single letters.
    if trimmed.chars().count() < 2 {
        return true;
    }

    if is_bullet_marker(trimmed) {
        return true;
    }

    // Page numbers and reference markers.
    if bare_number().is_match(trimmed) {
        return true;
    }

    ARTIFACTS.contains(&trimmed)
}

/// Normalize `text` and remove any leading bullet markers while keeping the
/// content after them.
pub fn clean(text: &str) -> String {
    let mut result: String = text.nfc().collect();

    let ligatures = [
        ("\u{FB00}", "ff"),
        ("\u{FB01}", "fi"),
        ("\u{FB02}", "fl"),
        ("\u{FB03}", "ffi"),
        ("\u{FB04}", "ffl"),
    ];
    for (lig, replacement) in &ligatures {
        result = result.replace(lig, replacement);
    }
    result = result.replace('\u{FFFD}', "");

    let trimmed = result.trim();
    match strip_bullets(trimmed) {
        Some(rest) => rest.trim().to_string(),
        None => trimmed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_passthrough() {
        assert_eq!(clean("  Executive Summary "), "Executive Summary");
    }

    #[test]
    fn test_clean_strips_glyph_bullet() {
        assert_eq!(clean("• Some finding"), "Some finding");
        assert_eq!(clean("•Tight bullet"), "Tight bullet");
    }

    #[test]
    fn test_clean_strips_dash_bullet_only_with_space() {
        assert_eq!(clean("- Dash item"), "Dash item");
        assert_eq!(clean("-5 degrees"), "-5 degrees");
    }

    #[test]
    fn test_clean_strips_hollow_bullets_only_with_space() {
        assert_eq!(clean("○ Open item"), "Open item");
        assert_eq!(clean("□ Checkbox item"), "Checkbox item");
        assert_eq!(clean("○Item"), "○Item");
        assert_eq!(clean("□Box"), "□Box");
    }

    #[test]
    fn test_clean_strips_stacked_bullets() {
        assert_eq!(clean("• - nested"), "nested");
    }

    #[test]
    fn test_clean_fixes_ligatures() {
        assert_eq!(clean("\u{FB01}nding"), "finding");
    }

    #[test]
    fn test_bullet_marker_alone() {
        assert!(is_bullet_marker("•"));
        assert!(is_bullet_marker("- "));
        assert!(is_bullet_marker("»  "));
        assert!(is_bullet_marker("1."));
        assert!(is_bullet_marker("12)"));
        assert!(is_bullet_marker("a)"));
        assert!(is_bullet_marker("**"));
    }

    #[test]
    fn test_bullet_with_content_is_not_marker() {
        assert!(!is_bullet_marker("• Some finding"));
        assert!(!is_bullet_marker("1. Introduction"));
    }

    #[test]
    fn test_should_ignore_short_and_numbers() {
        assert!(should_ignore(""));
        assert!(should_ignore("   "));
        assert!(should_ignore("x"));
        assert!(should_ignore("42"));
        assert!(should_ignore(" 7 "));
    }

    #[test]
    fn test_should_ignore_artifacts() {
        assert!(should_ignore("©"));
        assert!(should_ignore("™"));
        assert!(should_ignore("..."));
        assert!(should_ignore("…"));
    }

    #[test]
    fn test_should_keep_content() {
        assert!(!should_ignore("Introduction"));
        assert!(!should_ignore("2.1 Scope"));
        assert!(!should_ignore("• Some finding"));
        assert!(!should_ignore("Q4"));
    }
}
