//! Character classes and token predicates shared by every stage, plus the
//! raw-text cleaning used in front of the miners.

use once_cell::sync::Lazy;
use regex::Regex;

/// Full-width punctuation that counts as "linguistic" in samples.
const WIDE_PUNCTUATION: &str = "，。！？；：、“”‘’（）【】";

/// Punctuation treated as a word boundary by the single-character statistic.
const BOUNDARY_PUNCTUATION: &str = "，。！？、；：“”‘’（）,.!?;:'\"()[]【】《》<>…—～·";

/// Words of 6+ letters that look like identifiers but are plain English.
const COMMON_ID_EXCEPTIONS: &[&str] =
    &["password", "username", "account", "message", "picture", "image"];

const ID_SYMBOLS: &[char] = &['%', '_', '-', '}', ']'];

const EMOJI_RANGES: &[(u32, u32)] = &[
    (0x1F600, 0x1F64F),
    (0x1F300, 0x1F5FF),
    (0x1F680, 0x1F6FF),
    (0x1F1E0, 0x1F1FF),
    (0x2702, 0x27B0),
    (0x1F900, 0x1F9FF),
    (0x1FA00, 0x1FA6F),
    (0x1FA70, 0x1FAFF),
    (0x2600, 0x26FF),
    (0x2300, 0x23FF),
];

pub fn is_cjk(c: char) -> bool {
    ('\u{4e00}'..='\u{9fff}').contains(&c)
}

/// CJK ideograph or ASCII letter: the characters the single-character statistic tracks.
pub fn is_cjk_or_latin(c: char) -> bool {
    is_cjk(c) || c.is_ascii_alphabetic()
}

pub fn is_emoji_char(c: char) -> bool {
    let code = c as u32;
    EMOJI_RANGES
        .iter()
        .any(|&(start, end)| (start..=end).contains(&code))
}

/// A token is an emoji when it is exactly one emoji code point.
pub fn is_emoji(token: &str) -> bool {
    let mut chars = token.chars();
    matches!((chars.next(), chars.next()), (Some(c), None) if is_emoji_char(c))
}

pub fn extract_emojis(text: &str) -> Vec<String> {
    text.chars()
        .filter(|c| is_emoji_char(*c))
        .map(String::from)
        .collect()
}

/// Ornamental glyphs (stars, geometric shapes, miscellaneous symbols).
pub fn is_decorative(c: char) -> bool {
    matches!(
        c,
        '⌒' | '☆' | '★' | '◆' | '◇' | '■' | '□' | '▲' | '△' | '●' | '○' | '※' | '§' | '▽' | '▼'
    ) || ('\u{25D0}'..='\u{25E1}').contains(&c)
        || ('\u{2600}'..='\u{26FF}').contains(&c)
}

pub fn is_wide_punctuation(c: char) -> bool {
    WIDE_PUNCTUATION.contains(c)
}

pub fn is_boundary(c: char) -> bool {
    c.is_whitespace() || BOUNDARY_PUNCTUATION.contains(c)
}

/// Every character is a digit or a non-word character.
pub fn is_numeric_or_symbolic(token: &str) -> bool {
    !token.is_empty()
        && token
            .chars()
            .all(|c| c.is_numeric() || !(c.is_alphanumeric() || c == '_'))
}

pub fn is_ascii_alphabetic_word(token: &str) -> bool {
    !token.is_empty() && token.chars().all(|c| c.is_ascii_alphabetic())
}

/// Nothing but ornaments, punctuation and whitespace.
pub fn is_decorative_only(token: &str) -> bool {
    !token.is_empty()
        && token.chars().all(|c| {
            is_decorative(c)
                || c.is_ascii_punctuation()
                || is_wide_punctuation(c)
                || c.is_whitespace()
        })
}

pub fn is_punctuation_only(token: &str) -> bool {
    !token.is_empty()
        && token
            .chars()
            .all(|c| c.is_ascii_punctuation() || is_wide_punctuation(c))
}

pub fn is_digits_only(token: &str) -> bool {
    !token.is_empty() && token.chars().all(|c| c.is_numeric() || c.is_whitespace())
}

/// Contains one of `%_-}]` and no CJK character.
pub fn has_id_symbol_without_cjk(token: &str) -> bool {
    token.contains(ID_SYMBOLS) && !token.chars().any(is_cjk)
}

/// Heuristic for machine-generated identifiers (image ids, message ids).
pub fn is_id_like(token: &str) -> bool {
    let len = token.chars().count();
    if !(3..=20).contains(&len) {
        return false;
    }
    if token.contains(ID_SYMBOLS) {
        return has_id_symbol_without_cjk(token);
    }
    if !token.chars().all(|c| c.is_ascii_alphanumeric()) {
        return false;
    }
    let letters = token.chars().filter(|c| c.is_ascii_alphabetic()).count();
    let has_digit = token.chars().any(|c| c.is_ascii_digit());
    if letters == 0 || !has_digit {
        return false;
    }
    if len <= 5 {
        return true;
    }
    if letters * 2 >= len {
        return false;
    }
    !COMMON_ID_EXCEPTIONS.contains(&token.to_lowercase().as_str())
}

static IMAGE_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\[图片[^\]]*\]").unwrap());
static IMAGE_MARKER_OPEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\[图片[^\[\]]*").unwrap());
static BACKTICK_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Z0-9]+`[A-Z0-9]+").unwrap());
static ID_RESIDUE_ONLY: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z0-9`\-_\s]+$").unwrap());
static BRACKETED: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[[^\[\]]*\]").unwrap());
static LATIN_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[a-zA-Z]{2,}").unwrap());
static REPLY_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[回复\s+[^\]]*\]").unwrap());
static MENTION: Lazy<Regex> = Lazy::new(|| Regex::new(r"@[^\s@]*\s*").unwrap());
static URL: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?:https?://|www\.)\S+").unwrap());
static SHORT_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[a-zA-Z0-9%_\-}\]]{3,10}\b").unwrap());
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Whether a message text is worth keeping as a usage example.
///
/// Image markers and backtick image ids are stripped first; what remains
/// must carry a CJK character, wide punctuation, or a Latin word of 2+ letters.
pub fn is_meaningful_sample(text: &str) -> bool {
    let trimmed = text.trim();
    if trimmed.chars().count() < 2 {
        return false;
    }
    let stripped = IMAGE_MARKER.replace_all(trimmed, "");
    let stripped = IMAGE_MARKER_OPEN.replace_all(&stripped, "");
    let stripped = BACKTICK_ID.replace_all(&stripped, "");
    let stripped = stripped.trim();
    if stripped.is_empty() || ID_RESIDUE_ONLY.is_match(stripped) {
        return false;
    }
    if stripped.contains("[图片") || stripped.contains("图片:") {
        return false;
    }
    if BRACKETED.replace_all(stripped, "").trim().is_empty() {
        return false;
    }
    stripped
        .chars()
        .any(|c| is_cjk(c) || is_wide_punctuation(c))
        || LATIN_WORD.is_match(stripped)
}

/// Strip markup, mentions, links, id residue and ornaments from a raw message.
pub fn clean_text(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }
    let text = REPLY_MARKER.replace_all(raw, "");
    let text = MENTION.replace_all(&text, "");
    let text = IMAGE_MARKER.replace_all(&text, "");
    let mut text = IMAGE_MARKER_OPEN.replace_all(&text, "").into_owned();
    loop {
        let next = BRACKETED.replace_all(&text, "").into_owned();
        if next == text {
            break;
        }
        text = next;
    }
    let text = URL.replace_all(&text, "");
    let text = BACKTICK_ID.replace_all(&text, "");
    let text = SHORT_ID.replace_all(&text, |caps: &regex::Captures| {
        let word = &caps[0];
        if has_id_symbol_without_cjk(word) {
            String::new()
        } else {
            word.to_string()
        }
    });
    let text: String = text.chars().filter(|c| !is_decorative(*c)).collect();
    WHITESPACE.replace_all(&text, " ").trim().to_string()
}

/// Markers the cleaning step removes but the behavioral counters still need.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RawSignals {
    pub has_image: bool,
    pub has_forward: bool,
    pub has_link: bool,
    /// `[表情:` stickers plus `.gif` attachments.
    pub sticker_count: usize,
}

impl RawSignals {
    pub fn from_raw(text: &str) -> Self {
        let lower = text.to_lowercase();
        let gifs = lower.matches(".gif").count();
        RawSignals {
            has_image: text.contains("[图片:") && gifs == 0,
            has_forward: text.contains("[合并转发:"),
            has_link: text.contains("[链接:")
                || lower.contains("http://")
                || lower.contains("https://"),
            sticker_count: text.matches("[表情:").count() + gifs,
        }
    }
}
