use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// ========================================
/// Generated content model
/// ========================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockKind {
    Text,
    Code,
}

impl BlockKind {
    /// Case-insensitive match against the tags models emit (`text`, `Code`, ...).
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "text" => Some(BlockKind::Text),
            "code" => Some(BlockKind::Code),
            _ => None,
        }
    }
}

/// One unit of chapter material. `language` is only ever set on code blocks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub kind: BlockKind,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl ContentBlock {
    pub fn text(value: impl Into<String>) -> Self {
        Self { kind: BlockKind::Text, value: value.into(), language: None }
    }

    pub fn code(value: impl Into<String>, language: impl Into<String>) -> Self {
        Self { kind: BlockKind::Code, value: value.into(), language: Some(language.into()) }
    }

    pub fn is_blank(&self) -> bool {
        self.value.trim().is_empty()
    }
}

/// The ordered blocks produced from one chapter completion.
///
/// Serialized as `{"title": ..., "content": [...]}`, the same shape the
/// structured chapter prompt asks the model for, so stored chapters can be
/// replayed through the parser unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterContent {
    #[serde(default)]
    title: String,
    content: Vec<ContentBlock>,
}

impl ChapterContent {
    pub fn new(title: impl Into<String>, blocks: Vec<ContentBlock>) -> Self {
        Self { title: title.into(), content: blocks }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn blocks(&self) -> &[ContentBlock] {
        &self.content
    }

    pub fn to_storage(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_storage(s: &str) -> serde_json::Result<Self> {
        serde_json::from_str(s)
    }
}

/// ========================================
/// Course outline
/// ========================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterStub {
    #[serde(default, alias = "Name", alias = "chapter_name")]
    pub name: String,
    #[serde(default, alias = "About", alias = "description", alias = "Description")]
    pub about: String,
    #[serde(default, alias = "Duration")]
    pub duration: String,
}

impl ChapterStub {
    /// Name used for display, prompts and as the stored chapter id.
    pub fn display_name(&self, index: usize) -> String {
        let name = self.name.trim();
        if name.is_empty() {
            format!("Chapter {}", index + 1)
        } else {
            name.to_string()
        }
    }

    pub fn display_duration(&self) -> &str {
        if self.duration.trim().is_empty() { "15 minutes" } else { &self.duration }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseOutline {
    #[serde(default, alias = "Name", alias = "course_name")]
    pub name: String,
    #[serde(default, alias = "Description")]
    pub description: String,
    #[serde(default, alias = "Category")]
    pub category: String,
    #[serde(default, alias = "Level")]
    pub level: String,
    #[serde(default, alias = "Duration")]
    pub duration: String,
    #[serde(default, alias = "Chapters")]
    pub chapters: Vec<ChapterStub>,
}

impl CourseOutline {
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() { "Untitled Course" } else { &self.name }
    }
}

/// User inputs for one outline generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutlineRequest {
    pub topic: String,
    pub category: String,
    pub level: String,
    pub duration: String,
    pub chapters: u32,
    #[serde(default)]
    pub notes: String,
    pub include_video: bool,
}

/// ========================================
/// Video search results
/// ========================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Video {
    pub id: String,
    pub title: String,
    pub channel: String,
    pub thumbnail: String,
}

/// ========================================
/// Persisted records
/// ========================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseRecord {
    pub course_id: String,
    pub name: String,
    pub category: String,
    pub level: String,
    pub include_video: bool,
    pub outline: CourseOutline,
    pub created_by: String,
    pub user_name: String,
    pub banner: String,
    pub publish: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChapterRecord {
    pub course_id: String,
    pub chapter_id: String,
    pub position: usize,
    pub content: ChapterContent,
    pub video_id: String,
}

/// Listing row built from the denormalized columns plus the outline blob.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseSummary {
    pub id: String,
    pub title: String,
    pub category: String,
    pub level: String,
    pub chapters: usize,
    pub image: String,
    pub author: String,
    pub description: String,
}

impl From<&CourseRecord> for CourseSummary {
    fn from(rec: &CourseRecord) -> Self {
        let title = if rec.outline.name.trim().is_empty() {
            rec.name.clone()
        } else {
            rec.outline.name.clone()
        };
        Self {
            id: rec.course_id.clone(),
            title,
            category: rec.category.clone(),
            level: rec.level.clone(),
            chapters: rec.outline.chapters.len(),
            image: rec.banner.clone(),
            author: rec.user_name.clone(),
            description: rec.outline.description.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chapter_content_storage_round_trip() {
        let content = ChapterContent::new(
            "Loops",
            vec![
                ContentBlock::text("A loop repeats work.\\nUse it wisely."),
                ContentBlock::code("for i in range(3):\n    print(i)", "python"),
                ContentBlock::text("That's it."),
            ],
        );
        let stored = content.to_storage().unwrap();
        let back = ChapterContent::from_storage(&stored).unwrap();
        assert_eq!(back, content);
    }

    #[test]
    fn block_serializes_with_type_tag_and_omits_text_language() {
        let json = serde_json::to_string(&ContentBlock::text("hi")).unwrap();
        assert_eq!(json, r#"{"type":"text","value":"hi"}"#);

        let json = serde_json::to_string(&ContentBlock::code("x = 1", "python")).unwrap();
        assert_eq!(json, r#"{"type":"code","value":"x = 1","language":"python"}"#);
    }

    #[test]
    fn outline_accepts_alias_fields() {
        let raw = r#"{
            "Name": "Rust Basics",
            "description": "Learn Rust",
            "category": "Programming",
            "level": "Beginner",
            "duration": "2 hours",
            "chapters": [
                {"chapter_name": "Ownership", "About": "Moves and borrows", "Duration": "20 minutes"},
                {"name": "", "about": "Untitled"}
            ]
        }"#;
        let outline: CourseOutline = serde_json::from_str(raw).unwrap();
        assert_eq!(outline.name, "Rust Basics");
        assert_eq!(outline.chapters[0].name, "Ownership");
        assert_eq!(outline.chapters[0].about, "Moves and borrows");
        assert_eq!(outline.chapters[1].display_name(1), "Chapter 2");
        assert_eq!(outline.chapters[1].display_duration(), "15 minutes");
    }

    #[test]
    fn summary_falls_back_to_record_name() {
        let rec = CourseRecord {
            course_id: "c1".into(),
            name: "Stored Name".into(),
            category: "Health".into(),
            level: "Advanced".into(),
            include_video: false,
            outline: CourseOutline::default(),
            created_by: "a@b.c".into(),
            user_name: "a".into(),
            banner: "/placeholder.png".into(),
            publish: false,
            created_at: Utc::now(),
        };
        let summary = CourseSummary::from(&rec);
        assert_eq!(summary.title, "Stored Name");
        assert_eq!(summary.chapters, 0);
        assert_eq!(summary.author, "a");
    }
}
