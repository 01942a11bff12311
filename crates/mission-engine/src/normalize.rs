//! Text normalization and visual-line counting for general answers
//!
//! Answers are printed on a fixed-width layout where CJK characters take two
//! columns, so line limits are measured in rendered lines rather than
//! newline count.

use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

/// Runs of three or more dots, or repeated ellipsis characters
static ELLIPSIS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.{3,}|…+").expect("valid regex"));

/// Horizontal whitespace runs
static HSPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\S\n]+").expect("valid regex"));

/// Punctuation collapsed when repeated
const COLLAPSIBLE: &[char] = &['!', '?', ',', '~', '。', '、', '，', '！', '？'];

/// Normalize a general answer.
///
/// NFKC, unified newlines, per-line trimming and whitespace collapsing,
/// blank lines dropped, repeated punctuation collapsed to one mark.
/// Idempotent.
#[must_use]
pub fn normalize_general(raw: &str) -> String {
    let text: String = raw.nfkc().collect();
    let text = text.replace("\r\n", "\n").replace('\r', "\n");
    let text = ELLIPSIS.replace_all(&text, "…");

    text.split('\n')
        .map(|line| collapse_punctuation(HSPACE.replace_all(line, " ").trim()))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn collapse_punctuation(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut prev: Option<char> = None;
    for ch in line.chars() {
        if prev == Some(ch) && COLLAPSIBLE.contains(&ch) {
            continue;
        }
        out.push(ch);
        prev = Some(ch);
    }
    out
}

/// Whether a character renders two columns wide
#[must_use]
pub fn is_wide(ch: char) -> bool {
    matches!(ch as u32,
        0x1100..=0x115F
        | 0x2E80..=0x303E
        | 0x3041..=0x33FF
        | 0x3400..=0x4DBF
        | 0x4E00..=0x9FFF
        | 0xA000..=0xA4CF
        | 0xAC00..=0xD7A3
        | 0xF900..=0xFAFF
        | 0xFE30..=0xFE4F
        | 0xFF00..=0xFF60
        | 0xFFE0..=0xFFE6
        | 0x1F300..=0x1F64F
        | 0x1F900..=0x1F9FF
        | 0x20000..=0x3FFFD)
}

/// Rendered width in columns
#[must_use]
pub fn display_width(text: &str) -> usize {
    text.chars().map(|ch| if is_wide(ch) { 2 } else { 1 }).sum()
}

/// Rendered line count at `width` columns, wrapping each newline segment
/// independently. Empty text occupies no lines.
#[must_use]
pub fn visual_lines(text: &str, width: usize) -> usize {
    if text.is_empty() {
        return 0;
    }
    let width = width.max(1);
    text.split('\n')
        .map(|segment| display_width(segment).div_ceil(width).max(1))
        .sum()
}
