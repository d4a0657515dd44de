//! Turns chapter completions into ordered [`ContentBlock`]s.
//!
//! The model is never trusted to follow the requested format. Parsing runs an
//! ordered chain of [`Strategy`] values and the first one that yields at least
//! one non-blank block wins:
//!
//! 1. [`Strategy::NativeArray`]: an array of `{type, value, language?}` records.
//! 2. [`Strategy::EmbeddedArray`]: a record whose `content` is such an array.
//! 3. [`Strategy::EncodedJson`]: a string that decodes as JSON into 1 or 2,
//!    either whole or from its outermost `{...}` / `[...]` span.
//! 4. [`Strategy::TokenScan`]: pseudo-structure made of `type: text|code`,
//!    `value:` and `language:` markers.
//! 5. [`Strategy::Heuristic`]: line classification, see [`crate::classifier`].
//! 6. [`Strategy::Fallback`]: the whole input as one text block.
//!
//! Parsing is total: every input produces a non-empty block list.
//!
//! Token markers take precedence over the fallback, so truncated JSON that
//! only ever reached a code record comes back as that code block rather
//! than as text.

use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;
use tracing::{debug, warn};

use crate::classifier::Classifier;
use crate::normalize::{expand_escaped_breaks, normalize};
use crate::wire::{BlockKind, ChapterContent, ContentBlock, CourseOutline};

/// Used when there is nothing at all to show.
pub const EMPTY_PLACEHOLDER: &str = "Content was generated but could not be parsed.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    NativeArray,
    EmbeddedArray,
    EncodedJson,
    TokenScan,
    Heuristic,
    Fallback,
}

impl Strategy {
    pub fn name(self) -> &'static str {
        match self {
            Strategy::NativeArray => "native-array",
            Strategy::EmbeddedArray => "embedded-array",
            Strategy::EncodedJson => "encoded-json",
            Strategy::TokenScan => "token-scan",
            Strategy::Heuristic => "heuristic",
            Strategy::Fallback => "fallback",
        }
    }
}

/// Chain for structured values.
const VALUE_CHAIN: [Strategy; 2] = [Strategy::NativeArray, Strategy::EmbeddedArray];
/// Chain for raw completion text.
const TEXT_CHAIN: [Strategy; 3] = [Strategy::EncodedJson, Strategy::TokenScan, Strategy::Heuristic];

/// Blocks together with the strategy that produced them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOutcome {
    pub strategy: Strategy,
    pub blocks: Vec<ContentBlock>,
}

fn type_marker_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)"?\btype\b"?\s*:\s*"?(text|code)\b"?"#).expect("valid type marker regex")
    })
}

fn value_marker_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"(?i)"?\bvalue\b"?\s*:"#).expect("valid value marker regex"))
}

fn language_marker_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)"?\blanguage\b"?\s*:\s*"?([A-Za-z0-9_+#.\-]*)"#)
            .expect("valid language marker regex")
    })
}

pub struct ContentParser {
    default_language: String,
    classifier: Classifier,
}

impl ContentParser {
    pub fn new(default_language: impl Into<String>) -> Self {
        let default_language = default_language.into();
        Self {
            classifier: Classifier::new(default_language.clone()),
            default_language,
        }
    }

    pub fn default_language(&self) -> &str {
        &self.default_language
    }

    /// Normalizes and parses one raw completion into a titled chapter.
    pub fn parse_chapter(&self, title: &str, raw: &str) -> ChapterContent {
        let outcome = self.parse_str(raw);
        debug!(
            strategy = outcome.strategy.name(),
            blocks = outcome.blocks.len(),
            "parsed chapter {title:?}"
        );
        ChapterContent::new(title, outcome.blocks)
    }

    pub fn parse_str(&self, raw: &str) -> ParseOutcome {
        let normalized = normalize(raw);
        for strategy in TEXT_CHAIN {
            if let Some(blocks) = self.attempt_text(strategy, &normalized) {
                return ParseOutcome { strategy, blocks };
            }
        }
        warn!("no strategy matched completion; wrapping it as a single text block");
        ParseOutcome { strategy: Strategy::Fallback, blocks: fallback(raw, &normalized) }
    }

    pub fn parse_value(&self, value: &Value) -> ParseOutcome {
        if let Value::String(s) = value {
            return self.parse_str(s);
        }
        if let Some(outcome) = self.attempt_value(value) {
            return outcome;
        }
        let stringified = value.to_string();
        ParseOutcome { strategy: Strategy::Fallback, blocks: fallback(&stringified, &stringified) }
    }

    fn attempt_value(&self, value: &Value) -> Option<ParseOutcome> {
        VALUE_CHAIN.into_iter().find_map(|strategy| {
            let blocks = match strategy {
                Strategy::NativeArray => self.native_array(value),
                Strategy::EmbeddedArray => self.embedded_array(value),
                _ => None,
            }?;
            Some(ParseOutcome { strategy, blocks })
        })
    }

    fn attempt_text(&self, strategy: Strategy, normalized: &str) -> Option<Vec<ContentBlock>> {
        let blocks = match strategy {
            Strategy::EncodedJson => self.encoded_json(normalized),
            Strategy::TokenScan => self.token_scan(normalized),
            Strategy::Heuristic => self.heuristic(normalized),
            _ => None,
        }?;
        if blocks.is_empty() {
            None
        } else {
            Some(blocks)
        }
    }

    pub fn native_array(&self, value: &Value) -> Option<Vec<ContentBlock>> {
        let items = value.as_array()?;
        let blocks: Vec<ContentBlock> =
            items.iter().filter_map(|item| self.block_from_record(item)).collect();
        if blocks.is_empty() {
            None
        } else {
            Some(blocks)
        }
    }

    pub fn embedded_array(&self, value: &Value) -> Option<Vec<ContentBlock>> {
        let content = value.as_object()?.get("content")?;
        self.native_array(content)
    }

    pub fn encoded_json(&self, s: &str) -> Option<Vec<ContentBlock>> {
        let decoded = decode_json(s).or_else(|| outermost_span(s).and_then(decode_json))?;
        let decoded = match decoded {
            // double-encoded payload
            Value::String(inner) => decode_json(&inner)?,
            other => other,
        };
        self.attempt_value(&decoded).map(|o| o.blocks)
    }

    pub fn token_scan(&self, s: &str) -> Option<Vec<ContentBlock>> {
        let markers: Vec<_> = type_marker_re().captures_iter(s).collect();
        if markers.is_empty() {
            return None;
        }

        let mut blocks = Vec::new();
        for (i, caps) in markers.iter().enumerate() {
            let (Some(whole), Some(tag)) = (caps.get(0), caps.get(1)) else { continue };
            let Some(kind) = BlockKind::from_tag(tag.as_str()) else { continue };
            let end = markers
                .get(i + 1)
                .and_then(|next| next.get(0))
                .map(|m| m.start())
                .unwrap_or(s.len());
            let segment = &s[whole.end()..end];

            // segments without a value marker are noise
            let Some(value_marker) = value_marker_re().find(segment) else { continue };
            let rest = &segment[value_marker.end()..];

            let block = match kind {
                BlockKind::Text => ContentBlock::text(clean_token_value(rest)),
                BlockKind::Code => {
                    let (region, language) = match language_marker_re().captures(rest) {
                        Some(lang) => {
                            let start = lang.get(0).map(|m| m.start()).unwrap_or(rest.len());
                            let tag = lang.get(1).map(|m| m.as_str()).unwrap_or_default();
                            (&rest[..start], tag)
                        }
                        None => (rest, ""),
                    };
                    let language = if language.is_empty() {
                        self.default_language.as_str()
                    } else {
                        language
                    };
                    ContentBlock::code(unescape_code(&clean_token_value(region)), language)
                }
            };
            if !block.is_blank() {
                blocks.push(block);
            }
        }

        if blocks.is_empty() {
            None
        } else {
            Some(blocks)
        }
    }

    /// Payloads that open like JSON are structured output gone wrong and
    /// are left to the fallback instead of being read as code lines.
    pub fn heuristic(&self, s: &str) -> Option<Vec<ContentBlock>> {
        if looks_like_json(s) {
            return None;
        }
        let blocks = self.classifier.classify(&expand_escaped_breaks(s));
        if blocks.is_empty() {
            None
        } else {
            Some(blocks)
        }
    }

    fn block_from_record(&self, item: &Value) -> Option<ContentBlock> {
        let obj = item.as_object()?;
        let kind = obj
            .get("type")
            .or_else(|| obj.get("kind"))
            .and_then(Value::as_str)
            .and_then(BlockKind::from_tag)?;
        let value = match obj.get("value")? {
            Value::String(s) => s.clone(),
            Value::Null => return None,
            other => other.to_string(),
        };
        let value = value.trim();
        if value.is_empty() {
            return None;
        }
        Some(match kind {
            BlockKind::Text => ContentBlock::text(value),
            BlockKind::Code => {
                let language = obj
                    .get("language")
                    .and_then(Value::as_str)
                    .map(str::trim)
                    .filter(|l| !l.is_empty())
                    .unwrap_or(&self.default_language);
                ContentBlock::code(value, language)
            }
        })
    }
}

fn decode_json(s: &str) -> Option<Value> {
    serde_json::from_str(s).ok()
}

/// Opens like a JSON object or array: a bracket followed by a key, a
/// nested container, a closer or nothing. `[Note] ...` or `{ int x; }` do not.
fn looks_like_json(s: &str) -> bool {
    let Some(rest) = s.trim_start().strip_prefix(['{', '[']) else {
        return false;
    };
    match rest.trim_start().chars().next() {
        None => true,
        Some(c) => matches!(c, '"' | '{' | '[' | '}' | ']'),
    }
}

/// The slice from the first `{`/`[` to the last matching closer, which
/// drops stray prose around a payload.
fn outermost_span(s: &str) -> Option<&str> {
    let start = s.find(['{', '['])?;
    let closer = if s[start..].starts_with('{') { '}' } else { ']' };
    let end = s.rfind(closer)?;
    if end <= start {
        return None;
    }
    Some(&s[start..=end])
}

/// Trims a marker value. A quoted value is read up to its closing quote
/// (or to the end when truncated); a bare value loses one trailing comma.
fn clean_token_value(region: &str) -> String {
    let trimmed = region.trim();
    if let Some(quoted) = trimmed.strip_prefix('"') {
        let mut escaped = false;
        for (i, c) in quoted.char_indices() {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => return quoted[..i].trim().to_string(),
                _ => {}
            }
        }
        return quoted.trim().to_string();
    }
    trimmed.strip_suffix(',').unwrap_or(trimmed).trim_end().to_string()
}

/// Code values carry `\n` and `\"` escapes from the payload; turn them into
/// real characters. Other escapes are kept.
fn unescape_code(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.peek() {
                Some('n') => {
                    out.push('\n');
                    chars.next();
                    continue;
                }
                Some('"') => {
                    out.push('"');
                    chars.next();
                    continue;
                }
                _ => {}
            }
        }
        out.push(c);
    }
    out
}

/// Whole input as one text block. JSON-looking input has its punctuation
/// stripped so what is left reads as prose; input that normalizes to
/// nothing becomes [`EMPTY_PLACEHOLDER`].
fn fallback(original: &str, normalized: &str) -> Vec<ContentBlock> {
    let rendered = if normalized.trim().is_empty() {
        String::new()
    } else if looks_like_json(normalized) {
        normalized
            .chars()
            .filter(|c| !matches!(c, '{' | '}' | '[' | ']' | '"'))
            .collect::<String>()
            .trim()
            .to_string()
    } else {
        original.trim().to_string()
    };
    if rendered.is_empty() {
        vec![ContentBlock::text(EMPTY_PLACEHOLDER)]
    } else {
        vec![ContentBlock::text(rendered)]
    }
}

/// Decodes the outline completion. Unlike chapter content there is no
/// degraded form of an outline, so failure is reported to the caller.
pub fn parse_outline(raw: &str) -> Result<CourseOutline, String> {
    let normalized = normalize(raw);
    let value = decode_json(&normalized)
        .or_else(|| outermost_span(&normalized).and_then(decode_json))
        .ok_or_else(|| "completion is not valid JSON".to_string())?;
    let outline: CourseOutline = serde_json::from_value(value)
        .map_err(|e| format!("completion does not match the outline shape: {e}"))?;
    if outline.chapters.is_empty() {
        return Err("outline has no chapters".to_string());
    }
    Ok(outline)
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::Strategy;
    use proptest::prelude::*;
    use serde_json::json;

    fn parser() -> ContentParser {
        ContentParser::new("javascript")
    }

    #[test]
    fn native_array_maps_records_and_defaults_language() {
        let value = json!([
            {"type": "text", "value": "Hello"},
            {"type": "Code", "value": "x = 1"},
            {"type": "image", "value": "ignored"},
            {"type": "text", "value": "   "}
        ]);
        let outcome = parser().parse_value(&value);
        assert_eq!(outcome.strategy, Strategy::NativeArray);
        assert_eq!(
            outcome.blocks,
            vec![ContentBlock::text("Hello"), ContentBlock::code("x = 1", "javascript")]
        );
    }

    #[test]
    fn embedded_content_array() {
        let value = json!({
            "title": "Loops",
            "content": [{"type": "code", "value": "for x in y: pass", "language": "python"}]
        });
        let outcome = parser().parse_value(&value);
        assert_eq!(outcome.strategy, Strategy::EmbeddedArray);
        assert_eq!(outcome.blocks, vec![ContentBlock::code("for x in y: pass", "python")]);
    }

    #[test]
    fn encoded_json_with_fences_and_raw_newlines() {
        let raw = "```json\n{\"title\": \"T\", \"content\": [\n  {\"type\": \"text\", \"value\": \"Line one\nLine two\"},\n  {\"type\": \"code\", \"value\": \"print(1)\", \"language\": \"python\"}\n]}\n```";
        let outcome = parser().parse_str(raw);
        assert_eq!(outcome.strategy, Strategy::EncodedJson);
        assert_eq!(
            outcome.blocks,
            vec![
                ContentBlock::text("Line one\nLine two"),
                ContentBlock::code("print(1)", "python"),
            ]
        );
    }

    #[test]
    fn encoded_json_ignores_stray_prose() {
        let raw = "Sure! Here is the chapter:\n[{\"type\": \"text\", \"value\": \"Hi\"}]\nEnjoy.";
        let outcome = parser().parse_str(raw);
        assert_eq!(outcome.strategy, Strategy::EncodedJson);
        assert_eq!(outcome.blocks, vec![ContentBlock::text("Hi")]);
    }

    #[test]
    fn double_encoded_payload() {
        let inner = r#"[{"type":"text","value":"Nested"}]"#;
        let raw = serde_json::to_string(inner).unwrap();
        let outcome = parser().parse_str(&raw);
        assert_eq!(outcome.strategy, Strategy::EncodedJson);
        assert_eq!(outcome.blocks, vec![ContentBlock::text("Nested")]);
    }

    #[test]
    fn token_scan_extracts_text_then_code() {
        let raw = "type: text, value: Hello, type: code, value: print(1), language: python";
        let outcome = parser().parse_str(raw);
        assert_eq!(outcome.strategy, Strategy::TokenScan);
        assert_eq!(
            outcome.blocks,
            vec![ContentBlock::text("Hello"), ContentBlock::code("print(1)", "python")]
        );
    }

    #[test]
    fn token_scan_unescapes_code_only() {
        let raw = r#"TYPE : Text, value: a\nb, type:code, value: print(\"hi\")\nprint(2)"#;
        let blocks = parser().token_scan(raw).unwrap();
        assert_eq!(blocks[0], ContentBlock::text(r"a\nb"));
        assert_eq!(blocks[1], ContentBlock::code("print(\"hi\")\nprint(2)", "javascript"));
    }

    #[test]
    fn token_scan_drops_segments_without_value() {
        let raw = "type: text, body: nothing here, type: text, value: Kept";
        let blocks = parser().token_scan(raw).unwrap();
        assert_eq!(blocks, vec![ContentBlock::text("Kept")]);
    }

    #[test]
    fn token_scan_reads_quoted_json_like_values() {
        let raw = r#"{"title":"x","content":[{"type":"text","value":"Hello, world"},{"type":"code","value":"let a = \"b\";","language":"js"}"#;
        let outcome = parser().parse_str(raw);
        assert_eq!(outcome.strategy, Strategy::TokenScan);
        assert_eq!(
            outcome.blocks,
            vec![ContentBlock::text("Hello, world"), ContentBlock::code("let a = \"b\";", "js")]
        );
    }

    #[test]
    fn heuristic_handles_free_text() {
        let outcome = parser().parse_str("Intro text\ndef foo():\n    pass\nMore text");
        assert_eq!(outcome.strategy, Strategy::Heuristic);
        assert_eq!(outcome.blocks.len(), 3);
        assert_eq!(outcome.blocks[1], ContentBlock::code("def foo():\n    pass", "javascript"));
    }

    #[test]
    fn truncated_json_falls_back_to_text() {
        let raw = r#"{"title": "Loops", "content": ["#;
        let outcome = parser().parse_str(raw);
        assert_eq!(outcome.strategy, Strategy::Fallback);
        assert_eq!(outcome.blocks.len(), 1);
        assert_eq!(outcome.blocks[0].kind, BlockKind::Text);
        assert!(outcome.blocks[0].value.contains("Loops"));
    }

    #[test]
    fn truncated_code_only_json_keeps_the_code_block() {
        let raw = r#"{"title":"x","content":[{"type":"code","value":"x = 1"#;
        let outcome = parser().parse_str(raw);
        assert_eq!(outcome.strategy, Strategy::TokenScan);
        assert_eq!(outcome.blocks, vec![ContentBlock::code("x = 1", "javascript")]);
    }

    #[test]
    fn bracketed_prose_is_still_classified() {
        let raw = "[Note] Loops repeat work.\nfor x in xs:\n    print(x)\nDone.";
        let outcome = parser().parse_str(raw);
        assert_eq!(outcome.strategy, Strategy::Heuristic);
        assert_eq!(
            outcome.blocks,
            vec![
                ContentBlock::code("[Note] Loops repeat work.\nfor x in xs:\n    print(x)", "javascript"),
                ContentBlock::text("Done."),
            ]
        );
    }

    #[test]
    fn code_opening_with_brace_is_classified_not_stripped() {
        let outcome = parser().parse_str("{ int x = 1; }\nThat declares x.");
        assert_eq!(outcome.strategy, Strategy::Heuristic);
        assert_eq!(outcome.blocks[0], ContentBlock::code("{ int x = 1; }", "javascript"));
    }

    #[test]
    fn json_gate_needs_a_key_or_container_after_the_bracket() {
        assert!(looks_like_json(r#"  {"a": 1"#));
        assert!(looks_like_json("[{"));
        assert!(looks_like_json("{"));
        assert!(!looks_like_json("[Note] text"));
        assert!(!looks_like_json("{ int x; }"));
    }

    #[test]
    fn blank_input_yields_placeholder() {
        let outcome = parser().parse_str("  \n ``` ");
        assert_eq!(outcome.strategy, Strategy::Fallback);
        assert_eq!(outcome.blocks, vec![ContentBlock::text(EMPTY_PLACEHOLDER)]);
    }

    #[test]
    fn non_block_object_value_is_stringified() {
        let outcome = parser().parse_value(&json!({"a": 1}));
        assert_eq!(outcome.strategy, Strategy::Fallback);
        assert_eq!(outcome.blocks, vec![ContentBlock::text("a:1")]);
    }

    #[test]
    fn stored_chapter_replays_unchanged() {
        let chapter = ChapterContent::new(
            "Intro",
            vec![ContentBlock::text("One"), ContentBlock::code("x()", "javascript")],
        );
        let stored = chapter.to_storage().unwrap();
        let replay = parser().parse_chapter("Intro", &stored);
        assert_eq!(replay, chapter);
    }

    #[test]
    fn outline_parses_fenced_json() {
        let raw = "```json\n{\"name\": \"Rust\", \"chapters\": [{\"name\": \"Ownership\"}]}\n```";
        let outline = parse_outline(raw).unwrap();
        assert_eq!(outline.name, "Rust");
        assert_eq!(outline.chapters.len(), 1);
    }

    #[test]
    fn outline_rejects_garbage_and_empty_chapters() {
        assert!(parse_outline("I cannot help with that").is_err());
        assert!(parse_outline("{\"name\": \"x\", \"chapters\": []}").is_err());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(256))]

        #[test]
        fn prop_parse_is_total(raw in "(?s).{0,80}") {
            let outcome = parser().parse_str(&raw);
            prop_assert!(!outcome.blocks.is_empty());
            prop_assert!(outcome.blocks.iter().all(|b| !b.is_blank()));
        }

        #[test]
        fn prop_parse_is_total_on_structured_noise(raw in "[a-z{}\\[\\]\":, \n]{0,80}|(type: (text|code), value: [a-z ]{0,8}, ){0,4}") {
            let outcome = parser().parse_str(&raw);
            prop_assert!(!outcome.blocks.is_empty());
            prop_assert!(outcome.blocks.iter().all(|b| !b.is_blank()));
        }
    }
}
