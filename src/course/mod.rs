use chrono::Utc;
use std::collections::HashSet;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::cli::ResponseMode;
use crate::config::Config;
use crate::errors::{CourseError, CourseResult};
use crate::log::ArtifactSink;
use crate::parser::{parse_outline, ContentParser};
use crate::prompt;
use crate::provider::CompletionClient;
use crate::store::CourseStore;
use crate::video::{chapter_query, select_first, VideoSearch};
use crate::wire::{ChapterRecord, CourseOutline, CourseRecord, CourseSummary, OutlineRequest};

const DEFAULT_BANNER: &str =
    "https://images.unsplash.com/photo-1501504905252-473c47e087f8?w=600&h=400&fit=crop";

/// Banner image picked from the course category; unknown categories share one image.
pub fn banner_for(category: &str) -> &'static str {
    match category.trim().to_ascii_lowercase().as_str() {
        "programming" => "https://images.unsplash.com/photo-1516116216624-53e697fedbea?w=600&h=400&fit=crop",
        "health" => "https://images.unsplash.com/photo-1571019614242-c5c5dee9f50b?w=600&h=400&fit=crop",
        "creative" => "https://images.unsplash.com/photo-1611162617474-5b21e879e113?w=600&h=400&fit=crop",
        "business" => "https://images.unsplash.com/photo-1507003211169-0a1dd7228f2d?w=600&h=400&fit=crop",
        "science" => "https://images.unsplash.com/photo-1532094349884-543bc11b234d?w=600&h=400&fit=crop",
        "music" => "https://images.unsplash.com/photo-1511379938547-c1f69419868d?w=600&h=400&fit=crop",
        "design" => "https://images.unsplash.com/photo-1561070791-2526d30994b5?w=600&h=400&fit=crop",
        _ => DEFAULT_BANNER,
    }
}

/// Who a course is created for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Author {
    pub email: String,
    pub display_name: Option<String>,
}

impl Author {
    pub fn new(email: impl Into<String>) -> Self {
        Self { email: email.into(), display_name: None }
    }

    /// Display name if given, else the local part of the email, else "User".
    pub fn user_name(&self) -> String {
        if let Some(name) = self.display_name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
            return name.to_string();
        }
        match self.email.split('@').next().map(str::trim) {
            Some(local) if !local.is_empty() => local.to_string(),
            _ => "User".to_string(),
        }
    }
}

fn first_non_blank<'a>(candidates: &[&'a str], default: &'a str) -> &'a str {
    candidates.iter().map(|s| s.trim()).find(|s| !s.is_empty()).unwrap_or(default)
}

/// One step of the chapter loop, reported before the chapter is worked on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Progress {
    /// 1-based.
    pub index: usize,
    pub total: usize,
    pub chapter: String,
    /// Already stored by an earlier run.
    pub skipped: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationReport {
    pub course_id: String,
    pub total: usize,
    pub generated: usize,
    pub skipped: usize,
}

/// A course together with whatever chapters have been stored so far.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedCourse {
    pub course: CourseRecord,
    pub chapters: Vec<ChapterRecord>,
}

impl LoadedCourse {
    pub fn is_complete(&self) -> bool {
        self.chapters.len() >= self.course.outline.chapters.len()
    }
}

/// Drives outline creation and chapter generation against the injected
/// completion, video and storage collaborators.
pub struct CourseService<'a> {
    client: &'a dyn CompletionClient,
    videos: &'a dyn VideoSearch,
    store: &'a dyn CourseStore,
    parser: ContentParser,
    mode: ResponseMode,
    video_limit: u32,
    artifacts: Option<ArtifactSink>,
}

impl<'a> CourseService<'a> {
    pub fn new(
        client: &'a dyn CompletionClient,
        videos: &'a dyn VideoSearch,
        store: &'a dyn CourseStore,
        cfg: &Config,
    ) -> Self {
        Self {
            client,
            videos,
            store,
            parser: ContentParser::new(cfg.default_language.clone()),
            mode: cfg.response_mode,
            video_limit: cfg.video_limit.max(1),
            artifacts: None,
        }
    }

    pub fn with_artifacts(mut self, sink: ArtifactSink) -> Self {
        self.artifacts = Some(sink);
        self
    }

    async fn exchange(&self, stage: &str, prompt: &str) -> CourseResult<String> {
        debug!(stage, bytes = prompt.len(), "sending prompt");
        let raw = self.client.complete(prompt).await?;
        debug!(stage, bytes = raw.len(), "received completion");
        if let Some(sink) = &self.artifacts {
            sink.save(stage, prompt, &raw)?;
        }
        Ok(raw)
    }

    pub async fn generate_outline(&self, req: &OutlineRequest) -> CourseResult<CourseOutline> {
        let prompt = prompt::outline_prompt(req);
        let raw = self.exchange("outline", &prompt).await?;
        parse_outline(&raw).map_err(CourseError::Outline)
    }

    /// Generates the outline and stores it as a new course. Nothing is
    /// stored unless the outline decodes.
    pub async fn create_course(&self, req: &OutlineRequest, author: &Author) -> CourseResult<CourseRecord> {
        let outline = self.generate_outline(req).await?;

        let category = first_non_blank(&[outline.category.as_str(), req.category.as_str()], "General").to_string();
        let level = first_non_blank(&[outline.level.as_str(), req.level.as_str()], "Beginner").to_string();
        let record = CourseRecord {
            course_id: Uuid::new_v4().to_string(),
            name: outline.display_name().to_string(),
            banner: banner_for(&category).to_string(),
            category,
            level,
            include_video: req.include_video,
            outline,
            created_by: author.email.clone(),
            user_name: author.user_name(),
            publish: false,
            created_at: Utc::now(),
        };
        self.store.insert_course(&record)?;
        info!(
            course_id = %record.course_id,
            chapters = record.outline.chapters.len(),
            "stored course {:?}",
            record.name
        );
        Ok(record)
    }

    /// Produces one chapter record without storing it.
    pub async fn generate_chapter(&self, course: &CourseRecord, position: usize) -> CourseResult<ChapterRecord> {
        let stub = course.outline.chapters.get(position).ok_or_else(|| {
            CourseError::Outline(format!(
                "course {} has no chapter at position {position}",
                course.course_id
            ))
        })?;
        let chapter_name = stub.display_name(position);
        let course_name = course.outline.display_name();

        let prompt =
            prompt::chapter_prompt(self.mode, &chapter_name, course_name, self.parser.default_language());
        let raw = self.exchange(&format!("chapter-{}", position + 1), &prompt).await?;
        let content = self.parser.parse_chapter(&chapter_name, &raw);

        let video_id = if course.include_video {
            let query = chapter_query(course_name, &chapter_name);
            let found = self.videos.search(&query, self.video_limit).await;
            match select_first(&found) {
                Some(v) => v.id.clone(),
                None => {
                    warn!(%query, "no video found for chapter");
                    String::new()
                }
            }
        } else {
            String::new()
        };

        Ok(ChapterRecord {
            course_id: course.course_id.clone(),
            chapter_id: chapter_name,
            position,
            content,
            video_id,
        })
    }

    /// Generates and stores every chapter not stored yet, strictly in
    /// outline order. The first failure aborts the loop; chapters stored
    /// before it stay.
    pub async fn generate_chapters(
        &self,
        course: &CourseRecord,
        mut on_progress: impl FnMut(&Progress),
    ) -> CourseResult<GenerationReport> {
        let stored: HashSet<usize> = self
            .store
            .chapters_by_course(&course.course_id)?
            .into_iter()
            .map(|c| c.position)
            .collect();

        let total = course.outline.chapters.len();
        let mut report = GenerationReport { course_id: course.course_id.clone(), total, ..Default::default() };

        for (position, stub) in course.outline.chapters.iter().enumerate() {
            let skipped = stored.contains(&position);
            on_progress(&Progress { index: position + 1, total, chapter: stub.display_name(position), skipped });
            if skipped {
                report.skipped += 1;
                continue;
            }

            let record = self.generate_chapter(course, position).await?;
            self.store.insert_chapter(&record)?;
            info!(
                course_id = %course.course_id,
                position,
                blocks = record.content.blocks().len(),
                video = !record.video_id.is_empty(),
                "stored chapter {:?}",
                record.chapter_id
            );
            report.generated += 1;
        }
        Ok(report)
    }

    pub fn load_course(&self, course_id: &str) -> CourseResult<Option<LoadedCourse>> {
        load_course(self.store, course_id)
    }

    pub fn list_courses(&self, author: Option<&str>) -> CourseResult<Vec<CourseSummary>> {
        list_courses(self.store, author)
    }

    pub fn delete_course(&self, course_id: &str) -> CourseResult<bool> {
        delete_course(self.store, course_id)
    }
}

// Store-only operations; these need no completion endpoint.

pub fn load_course(store: &dyn CourseStore, course_id: &str) -> CourseResult<Option<LoadedCourse>> {
    let Some(course) = store.course_by_id(course_id)? else {
        return Ok(None);
    };
    let chapters = store.chapters_by_course(course_id)?;
    Ok(Some(LoadedCourse { course, chapters }))
}

pub fn list_courses(store: &dyn CourseStore, author: Option<&str>) -> CourseResult<Vec<CourseSummary>> {
    let records = match author {
        Some(email) => store.courses_by_author(email)?,
        None => store.all_courses()?,
    };
    Ok(records.iter().map(CourseSummary::from).collect())
}

/// Returns false when there was no such course.
pub fn delete_course(store: &dyn CourseStore, course_id: &str) -> CourseResult<bool> {
    if store.course_by_id(course_id)?.is_none() {
        return Ok(false);
    }
    store.delete_course(course_id)?;
    info!(course_id, "deleted course");
    Ok(true)
}
