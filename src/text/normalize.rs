//! OCR text canonicalization
//!
//! Both the detected text and the target label pass through [`normalize`] before any
//! comparison, so the same misread is corrected identically on both sides.

use unicode_normalization::UnicodeNormalization;

/// Character-level OCR confusions, applied in order with non-overlapping replacement.
///
/// The punctuation rows are kept for completeness but are unreachable: the
/// non-word strip that runs first has already turned those characters into
/// spaces. See [`shadowed_word_fixes`] for the matching dictionary issue.
const CONFUSION_MAP: &[(&str, &str)] = &[
    // Digit to letter lookalikes
    ("0", "o"),
    ("1", "l"),
    ("5", "s"),
    ("6", "b"),
    ("8", "b"),
    // Punctuation lookalikes
    ("|", "l"),
    ("!", "l"),
    ("/", "l"),
    ("@", "a"),
    // Multi-char clusters
    ("rn", "m"),
    ("vv", "w"),
    ("li", "h"),
];

/// Whole-string corrections for known misreads of common UI labels.
///
/// Looked up on the string produced by the character table, so keys containing digits
/// never match; they are reported by [`shadowed_word_fixes`].
const WHOLE_WORD_FIXES: &[(&str, &str)] = &[
    ("0k", "ok"),
    ("0kay", "okay"),
    ("ye5", "yes"),
    ("n0", "no"),
    ("cance1", "cancel"),
    ("c1ose", "close"),
    ("c10se", "close"),
    ("app1y", "apply"),
    ("1ogin", "login"),
    ("submlt", "submit"),
    ("confi rm", "confirm"),
    ("conhrm", "confirm"),
];

/// Normalize a raw OCR string into the lowercase, de-noised form used for matching.
///
/// Pipeline: NFKC, trim, lowercase, collapse whitespace, anything but word characters
/// (letters, digits, `_`) to spaces, character confusion table, whole-string dictionary.
pub fn normalize(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }

    let folded: String = raw.nfkc().collect();
    let lowered = folded.trim().to_lowercase();

    let stripped: String = lowered
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '_' { c } else { ' ' })
        .collect();
    let mut text = collapse_whitespace(&stripped);

    for (wrong, right) in CONFUSION_MAP {
        if text.contains(wrong) {
            text = text.replace(wrong, right);
        }
    }

    if let Some((_, fixed)) = WHOLE_WORD_FIXES.iter().find(|(key, _)| *key == text) {
        return (*fixed).to_string();
    }

    text
}

/// A target is short when its normalized form has at most `max_len` non-space characters
pub fn is_short_target(normalized: &str, max_len: usize) -> bool {
    normalized.chars().filter(|c| *c != ' ').count() <= max_len
}

/// Dictionary keys that can never fire because the character table rewrites them first.
pub fn shadowed_word_fixes() -> Vec<&'static str> {
    WHOLE_WORD_FIXES
        .iter()
        .filter(|(key, _)| {
            let mut rewritten = collapse_whitespace(key);
            for (wrong, right) in CONFUSION_MAP {
                rewritten = rewritten.replace(wrong, right);
            }
            rewritten != *key
        })
        .map(|(key, _)| *key)
        .collect()
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
