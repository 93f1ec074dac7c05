//! String-level clean-up passes applied to model output before parsing.
//!
//! Every function here is total: malformed input never panics and never
//! errors, it just comes back less transformed. The three JSON repairs
//! track string-literal state, so text inside strings is left alone and
//! well-formed JSON passes through unchanged.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref REASONING_BLOCK: Regex = Regex::new(
        r"(?is)<think>.*?</think>|<thinking>.*?</thinking>|<reasoning>.*?</reasoning>"
    )
    .expect("reasoning pattern is valid");
    static ref FENCE_MARKER: Regex =
        Regex::new(r"```[A-Za-z0-9_+\-]*").expect("fence pattern is valid");
}

/// Remove `<think>`, `<thinking>` and `<reasoning>` blocks, markers included.
pub fn strip_reasoning(text: &str) -> String {
    REASONING_BLOCK.replace_all(text, "").into_owned()
}

/// Drop markdown fence markers (and their language tag), keep the contents.
pub fn strip_fences(text: &str) -> String {
    FENCE_MARKER.replace_all(text, "").into_owned()
}

/// Slice from the first `{` to the last `}` inclusive.
pub fn outermost_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}

/// Tracks whether a scanner is inside a JSON string literal.
#[derive(Default)]
struct StringState {
    in_string: bool,
    escaped: bool,
}

impl StringState {
    /// Advance past `ch`. Returns whether `ch` belongs to a string literal
    /// (the delimiting quotes count as part of it).
    fn step(&mut self, ch: char) -> bool {
        if self.in_string {
            if self.escaped {
                self.escaped = false;
            } else if ch == '\\' {
                self.escaped = true;
            } else if ch == '"' {
                self.in_string = false;
            }
            true
        } else {
            if ch == '"' {
                self.in_string = true;
                return true;
            }
            false
        }
    }
}

/// Replace literal line breaks inside string literals with a single space.
/// A run of consecutive `\r`/`\n` collapses into one space.
pub fn normalize_string_newlines(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_string = false;
    let mut escaped = false;
    let mut last_was_break = false;

    for ch in text.chars() {
        if in_string && !escaped && (ch == '\n' || ch == '\r') {
            if !last_was_break {
                out.push(' ');
                last_was_break = true;
            }
            continue;
        }
        last_was_break = false;

        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
        } else if ch == '"' {
            in_string = true;
        }
        out.push(ch);
    }

    out
}

/// Remove commas that are followed, ignoring whitespace, by `}` or `]`.
pub fn remove_trailing_commas(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut state = StringState::default();

    for (i, &ch) in chars.iter().enumerate() {
        let in_literal = state.step(ch);
        if !in_literal && ch == ',' {
            let next = chars[i + 1..].iter().find(|c| !c.is_whitespace());
            if matches!(next, Some('}') | Some(']')) {
                continue;
            }
        }
        out.push(ch);
    }

    out
}

/// Insert the comma a model sometimes drops between sibling properties:
/// `"value"  "nextKey":` becomes `"value",  "nextKey":`.
///
/// Only fires when a string literal closes, at least one whitespace
/// character follows, and the next token is a string literal that is
/// itself followed by a colon. Anything else is left untouched.
pub fn insert_missing_commas(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len() + 8);
    let mut state = StringState::default();

    for (i, &ch) in chars.iter().enumerate() {
        let was_in_string = state.in_string;
        state.step(ch);
        out.push(ch);

        let closed_string = was_in_string && !state.in_string;
        if closed_string && needs_comma_after(&chars, i + 1) {
            out.push(',');
        }
    }

    out
}

/// Does `chars[from..]` look like whitespace, then `"key"`, then `:`?
fn needs_comma_after(chars: &[char], from: usize) -> bool {
    let mut i = from;
    while i < chars.len() && chars[i].is_whitespace() {
        i += 1;
    }
    if i == from || i >= chars.len() || chars[i] != '"' {
        return false;
    }

    // Walk the key literal
    i += 1;
    let mut escaped = false;
    loop {
        match chars.get(i) {
            None => return false,
            Some(_) if escaped => escaped = false,
            Some('\\') => escaped = true,
            Some('"') => break,
            Some(_) => {}
        }
        i += 1;
    }
    i += 1;

    while i < chars.len() && chars[i].is_whitespace() {
        i += 1;
    }
    chars.get(i) == Some(&':')
}
