//! Board text → display-safe plain text.

use std::borrow::Cow;
use std::sync::OnceLock;

use regex::{Captures, Regex};

/// Default maximum length (in characters) of sanitized text.
pub const DEFAULT_MAX_LEN: usize = 500;

/// Appended to text that was cut at the maximum length.
pub const ELLIPSIS: &str = "...";

/// Turns raw board markup into bounded, allow-listed plain text.
///
/// The pipeline runs in a fixed order:
///
/// 1. decode HTML entities
/// 2. replace `<br>` markup with a space
/// 3. strip every remaining tag
/// 4. collapse newline runs to a single space
/// 5. drop characters outside the allow-list
/// 6. truncate to `max_len` and append [`ELLIPSIS`]
///
/// The output never exceeds `max_len + 3` characters and feeding it back
/// through the same sanitizer returns it unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sanitizer {
    max_len: usize,
}

impl Default for Sanitizer {
    fn default() -> Self {
        Self {
            max_len: DEFAULT_MAX_LEN,
        }
    }
}

impl Sanitizer {
    pub fn new(max_len: usize) -> Self {
        Self { max_len }
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }

    pub fn sanitize(&self, raw: &str) -> String {
        let decoded = decode_entities(raw);
        let spaced = line_break_tag().replace_all(&decoded, " ");
        let untagged = strip_tags(&spaced);
        let single_line = newline_run().replace_all(&untagged, " ");
        let allowed: String = single_line.chars().filter(|ch| is_allowed(*ch)).collect();
        truncate(allowed, self.max_len)
    }
}

/// Only `;`-terminated entities are decoded. The allow-list removes `;`, so
/// sanitized text never holds anything this would decode again.
fn decode_entities(text: &str) -> Cow<'_, str> {
    entity().replace_all(text, |caps: &Captures<'_>| {
        html_escape::decode_html_entities(&caps[0]).into_owned()
    })
}

fn entity() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"&(?:#[0-9]+|#[xX][0-9a-fA-F]+|[A-Za-z][A-Za-z0-9]*);")
            .expect("entity pattern is valid")
    })
}

fn line_break_tag() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)<br\s*/?>").expect("line break pattern is valid"))
}

fn markup_tag() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^<>]*>").expect("markup tag pattern is valid"))
}

fn newline_run() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[\r\n]+").expect("newline pattern is valid"))
}

/// Removes tags until none are left, so `<<b>i>` cannot leave `<i>` behind.
fn strip_tags(text: &str) -> String {
    let mut current = text.to_string();
    loop {
        let next = markup_tag().replace_all(&current, "").into_owned();
        if next == current {
            return current;
        }
        current = next;
    }
}

fn is_allowed(ch: char) -> bool {
    ch.is_ascii_alphanumeric()
        || matches!(
            ch,
            '-' | '_'
                | '/'
                | '='
                | '\''
                | '.'
                | ','
                | ':'
                | '>'
                | '#'
                | '~'
                | '?'
                | '&'
                | '%'
                | '+'
                | '<'
                | '@'
                | '('
                | ')'
                | ' '
        )
}

fn truncate(text: String, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        return text;
    }
    let mut cut: String = text.chars().take(max_len).collect();
    cut.push_str(ELLIPSIS);
    cut
}
