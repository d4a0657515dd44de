//! Cleanup of raw completions before structured parsing.
//!
//! [`normalize`] applies these steps in order, each of which is also
//! callable on its own:
//!
//! 1. [`strip_control_chars`]: drop ASCII control characters other than
//!    `\t`, `\n` and `\r`.
//! 2. [`strip_code_fences`]: remove every triple-backtick marker together
//!    with its language tag.
//! 3. [`escape_breaks_in_strings`]: inside double-quoted string literals,
//!    replace raw `\n`, `\r` and `\t` with their two-character escapes.
//!    Breaks between tokens are left alone so free text keeps its lines.
//! 4. [`collapse_double_escapes`]: turn `\\n`, `\\r` and `\\t` into `\n`,
//!    `\r` and `\t`.
//! 5. Trim surrounding whitespace.
//!
//! Every step only removes or rewrites characters in ways later steps
//! cannot undo, so `normalize(normalize(x)) == normalize(x)`.

use regex::Regex;
use std::sync::OnceLock;

fn fence_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"```[A-Za-z0-9_+\-]*").expect("valid fence regex"))
}

fn double_escape_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\\\\([ntr])").expect("valid escape regex"))
}

pub fn normalize(raw: &str) -> String {
    let s = strip_control_chars(raw);
    let s = strip_code_fences(&s);
    let s = escape_breaks_in_strings(&s);
    let s = collapse_double_escapes(&s);
    s.trim().to_string()
}

fn is_stray_control(c: char) -> bool {
    matches!(c, '\u{00}'..='\u{08}' | '\u{0B}' | '\u{0C}' | '\u{0E}'..='\u{1F}' | '\u{7F}')
}

pub fn strip_control_chars(s: &str) -> String {
    s.chars().filter(|c| !is_stray_control(*c)).collect()
}

/// Removes fence markers until none are left; removal can join backticks
/// into a fresh marker, hence the loop.
pub fn strip_code_fences(s: &str) -> String {
    let mut out = s.to_string();
    while out.contains("```") {
        out = fence_re().replace_all(&out, "").into_owned();
    }
    out
}

pub fn escape_breaks_in_strings(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_string = false;
    let mut escaped = false;

    for c in s.chars() {
        if !in_string {
            if c == '"' {
                in_string = true;
            }
            out.push(c);
            continue;
        }

        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == '"' {
            in_string = false;
        }

        match c {
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out
}

pub fn collapse_double_escapes(s: &str) -> String {
    let mut out = s.to_string();
    loop {
        let next = double_escape_re().replace_all(&out, "\\$1").into_owned();
        if next == out {
            return out;
        }
        out = next;
    }
}

/// Turns escaped line breaks back into real ones, for consumers that work
/// line by line (the classifier, terminal rendering of text blocks).
pub fn expand_escaped_breaks(s: &str) -> String {
    s.replace("\\r\\n", "\n")
        .replace("\\n", "\n")
        .replace("\\r", "\n")
        .replace("\\t", "\t")
}
