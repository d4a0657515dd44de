use serde_json::Value;

use crate::cli::ResponseMode;
use crate::wire::OutlineRequest;

fn outline_shape(req: &OutlineRequest) -> String {
    format!(
r#"{{
  "name": "Course Title",
  "description": "Course description",
  "category": {category},
  "level": {level},
  "duration": {duration},
  "chapters": [
    {{
      "name": "Chapter 1 Title",
      "about": "Brief description of what this chapter covers",
      "duration": "15 minutes"
    }}
  ]
}}"#,
        category = json_string(&req.category),
        level = json_string(&req.level),
        duration = json_string(&req.duration),
    )
}

/// Quoted and escaped JSON string literal.
fn json_string(s: &str) -> String {
    Value::String(s.to_string()).to_string()
}

pub fn outline_prompt(req: &OutlineRequest) -> String {
    let include_video = if req.include_video { "Yes" } else { "No" };
    let notes = if req.notes.trim().is_empty() { "None" } else { req.notes.trim() };
    format!(
r#"Generate a detailed course tutorial based on the following inputs. Return ONLY valid JSON without any markdown formatting.

Category: '{category}'
Topic: '{topic}'
Level: '{level}'
Duration: '{duration}'
Number of Chapters: {chapters}
Additional Description: '{notes}'
Include Video: '{include_video}'

The JSON must follow this EXACT structure:
{shape}

Rules:
- The "chapters" array must contain exactly {chapters} entries, in teaching order.
- Every chapter needs "name", "about" and "duration".

IMPORTANT: Return ONLY the JSON object, no markdown code blocks, no explanations."#,
        category = req.category,
        topic = req.topic,
        level = req.level,
        duration = req.duration,
        chapters = req.chapters,
        shape = outline_shape(req),
    )
}

fn structured_chapter_prompt(chapter_name: &str, course_name: &str, language: &str) -> String {
    format!(
r#"Generate educational content for the chapter "{chapter_name}" from the course "{course_name}".

Return ONLY a valid JSON object with this structure:
{{
  "title": "{chapter_name}",
  "content": [
    {{"type": "text", "value": "explanation paragraph here"}},
    {{"type": "code", "value": "code example here", "language": "{language}"}}
  ]
}}

Rules:
- Return ONLY the raw JSON object. Do not wrap it in markdown code blocks or any other text.
- Do not use "type: value" strings. Use valid JSON.
- Use \n for newlines inside string values, NOT actual newlines.
- Escape all double quotes inside strings with backslash.
- Keep the blocks in reading order.
- Include 3-5 text sections with code examples.
- Keep code examples short (under 10 lines each)."#
    )
}

fn freeform_chapter_prompt(chapter_name: &str, course_name: &str, language: &str) -> String {
    format!(
r#"Write educational content for the chapter "{chapter_name}" from the course "{course_name}".

Rules:
- Write plain explanatory paragraphs followed by short {language} code examples where useful.
- Put each code example on its own lines directly after the paragraph it illustrates.
- Indent continuation lines of code; do not indent prose.
- Do not use markdown code fences, headings, JSON or any other markup.
- Include 3-5 sections. Keep code examples short (under 10 lines each)."#
    )
}

pub fn chapter_prompt(mode: ResponseMode, chapter_name: &str, course_name: &str, language: &str) -> String {
    match mode {
        ResponseMode::Structured => structured_chapter_prompt(chapter_name, course_name, language),
        ResponseMode::Freeform => freeform_chapter_prompt(chapter_name, course_name, language),
    }
}
