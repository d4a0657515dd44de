//! Course and chapter persistence.
//!
//! Course rows keep the whole outline as one JSON string next to the
//! denormalized `category`, `level` and `include_video` columns used for
//! listing. Chapter rows keep the block list as one JSON string and a plain
//! video id.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

use crate::errors::{CourseError, CourseResult};
use crate::wire::{ChapterContent, ChapterRecord, CourseOutline, CourseRecord};

pub trait CourseStore: Send + Sync {
    fn insert_course(&self, course: &CourseRecord) -> CourseResult<()>;
    fn insert_chapter(&self, chapter: &ChapterRecord) -> CourseResult<()>;
    fn course_by_id(&self, course_id: &str) -> CourseResult<Option<CourseRecord>>;
    /// Chapters of a course in outline order.
    fn chapters_by_course(&self, course_id: &str) -> CourseResult<Vec<ChapterRecord>>;
    fn courses_by_author(&self, email: &str) -> CourseResult<Vec<CourseRecord>>;
    fn all_courses(&self) -> CourseResult<Vec<CourseRecord>>;
    /// Removes the chapters, then the course. Unknown ids are a no-op.
    fn delete_course(&self, course_id: &str) -> CourseResult<()>;
}

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS course_list (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    course_id       TEXT NOT NULL UNIQUE,
    name            TEXT NOT NULL,
    category        TEXT NOT NULL,
    level           TEXT NOT NULL,
    include_video   TEXT NOT NULL DEFAULT 'Yes',
    course_output   TEXT NOT NULL,
    created_by      TEXT NOT NULL,
    user_name       TEXT,
    course_banner   TEXT DEFAULT '/placeholder.png',
    publish         INTEGER NOT NULL DEFAULT 0,
    created_at      TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS chapters (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    course_id   TEXT NOT NULL,
    chapter_id  TEXT NOT NULL,
    position    INTEGER NOT NULL,
    content     TEXT NOT NULL,
    video_id    TEXT NOT NULL,
    UNIQUE (course_id, position)
);
CREATE INDEX IF NOT EXISTS idx_course_created_by ON course_list (created_by);
CREATE INDEX IF NOT EXISTS idx_chapters_course ON chapters (course_id);
"#;

const COURSE_COLUMNS: &str = "course_id, name, category, level, include_video, course_output, \
     created_by, user_name, course_banner, publish, created_at";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

/// Raw course row; decoded outside the rusqlite closure so JSON and
/// timestamp errors surface as our own error kinds.
struct CourseRow {
    course_id: String,
    name: String,
    category: String,
    level: String,
    include_video: String,
    course_output: String,
    created_by: String,
    user_name: Option<String>,
    banner: Option<String>,
    publish: bool,
    created_at: String,
}

impl CourseRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            course_id: row.get(0)?,
            name: row.get(1)?,
            category: row.get(2)?,
            level: row.get(3)?,
            include_video: row.get(4)?,
            course_output: row.get(5)?,
            created_by: row.get(6)?,
            user_name: row.get(7)?,
            banner: row.get(8)?,
            publish: row.get(9)?,
            created_at: row.get(10)?,
        })
    }

    fn into_record(self) -> CourseResult<CourseRecord> {
        let mut outline: CourseOutline = serde_json::from_str(&self.course_output)?;
        // listing columns win over the blob
        outline.category = self.category.clone();
        outline.level = self.level.clone();
        let created_at = DateTime::parse_from_rfc3339(&self.created_at)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|e| CourseError::Outline(format!("bad created_at {:?}: {e}", self.created_at)))?;
        Ok(CourseRecord {
            course_id: self.course_id,
            name: self.name,
            category: self.category,
            level: self.level,
            include_video: !self.include_video.eq_ignore_ascii_case("no"),
            outline,
            created_by: self.created_by,
            user_name: self.user_name.unwrap_or_default(),
            banner: self.banner.unwrap_or_else(|| "/placeholder.png".into()),
            publish: self.publish,
            created_at,
        })
    }
}

impl SqliteStore {
    pub fn open(path: &Path) -> CourseResult<Self> {
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> CourseResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> CourseResult<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    fn query_courses(&self, sql: &str, args: &[&dyn rusqlite::ToSql]) -> CourseResult<Vec<CourseRecord>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
            .query_map(args, CourseRow::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(CourseRow::into_record).collect()
    }
}

impl CourseStore for SqliteStore {
    fn insert_course(&self, course: &CourseRecord) -> CourseResult<()> {
        let output = serde_json::to_string(&course.outline)?;
        let include_video = if course.include_video { "Yes" } else { "No" };
        self.conn.lock().execute(
            &format!(
                "INSERT INTO course_list ({COURSE_COLUMNS}) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"
            ),
            params![
                course.course_id,
                course.name,
                course.category,
                course.level,
                include_video,
                output,
                course.created_by,
                course.user_name,
                course.banner,
                course.publish,
                course.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn insert_chapter(&self, chapter: &ChapterRecord) -> CourseResult<()> {
        let content = chapter.content.to_storage()?;
        self.conn.lock().execute(
            "INSERT INTO chapters (course_id, chapter_id, position, content, video_id) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                chapter.course_id,
                chapter.chapter_id,
                chapter.position as i64,
                content,
                chapter.video_id,
            ],
        )?;
        Ok(())
    }

    fn course_by_id(&self, course_id: &str) -> CourseResult<Option<CourseRecord>> {
        let sql = format!("SELECT {COURSE_COLUMNS} FROM course_list WHERE course_id = ?1");
        let row = self
            .conn
            .lock()
            .query_row(&sql, params![course_id], CourseRow::from_row)
            .optional()?;
        row.map(CourseRow::into_record).transpose()
    }

    fn chapters_by_course(&self, course_id: &str) -> CourseResult<Vec<ChapterRecord>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT course_id, chapter_id, position, content, video_id \
             FROM chapters WHERE course_id = ?1 ORDER BY position",
        )?;
        let rows = stmt
            .query_map(params![course_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter()
            .map(|(course_id, chapter_id, position, content, video_id)| -> CourseResult<ChapterRecord> {
                Ok(ChapterRecord {
                    course_id,
                    chapter_id,
                    position: position.max(0) as usize,
                    content: ChapterContent::from_storage(&content)?,
                    video_id,
                })
            })
            .collect()
    }

    fn courses_by_author(&self, email: &str) -> CourseResult<Vec<CourseRecord>> {
        self.query_courses(
            &format!("SELECT {COURSE_COLUMNS} FROM course_list WHERE created_by = ?1 ORDER BY id"),
            &[&email],
        )
    }

    fn all_courses(&self) -> CourseResult<Vec<CourseRecord>> {
        self.query_courses(&format!("SELECT {COURSE_COLUMNS} FROM course_list ORDER BY id"), &[])
    }

    fn delete_course(&self, course_id: &str) -> CourseResult<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM chapters WHERE course_id = ?1", params![course_id])?;
        tx.execute("DELETE FROM course_list WHERE course_id = ?1", params![course_id])?;
        tx.commit()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::{ChapterStub, ContentBlock};

    fn course(id: &str, author: &str) -> CourseRecord {
        CourseRecord {
            course_id: id.into(),
            name: "Rust".into(),
            category: "Programming".into(),
            level: "Beginner".into(),
            include_video: false,
            outline: CourseOutline {
                name: "Rust".into(),
                description: "Systems language".into(),
                category: "ignored".into(),
                level: "ignored".into(),
                duration: "1 hour".into(),
                chapters: vec![ChapterStub { name: "Ownership".into(), ..Default::default() }],
            },
            created_by: author.into(),
            user_name: "me".into(),
            banner: "/placeholder.png".into(),
            publish: false,
            created_at: DateTime::parse_from_rfc3339("2026-01-02T03:04:05Z").unwrap().with_timezone(&Utc),
        }
    }

    fn chapter(course_id: &str, position: usize) -> ChapterRecord {
        ChapterRecord {
            course_id: course_id.into(),
            chapter_id: format!("Chapter {}", position + 1),
            position,
            content: ChapterContent::new("x", vec![ContentBlock::text("body")]),
            video_id: String::new(),
        }
    }

    #[test]
    fn course_round_trip_merges_listing_columns() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.insert_course(&course("c1", "a@x.io")).unwrap();

        let back = store.course_by_id("c1").unwrap().unwrap();
        assert_eq!(back.outline.category, "Programming");
        assert_eq!(back.outline.level, "Beginner");
        assert!(!back.include_video);
        assert_eq!(back.outline.chapters.len(), 1);
        assert_eq!(back.created_at, course("c1", "a@x.io").created_at);
    }

    #[test]
    fn missing_course_is_none_not_error() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert!(store.course_by_id("nope").unwrap().is_none());
        assert!(store.chapters_by_course("nope").unwrap().is_empty());
    }

    #[test]
    fn chapters_come_back_in_position_order() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.insert_course(&course("c1", "a@x.io")).unwrap();
        store.insert_chapter(&chapter("c1", 1)).unwrap();
        store.insert_chapter(&chapter("c1", 0)).unwrap();

        let chapters = store.chapters_by_course("c1").unwrap();
        let positions: Vec<_> = chapters.iter().map(|c| c.position).collect();
        assert_eq!(positions, vec![0, 1]);
        assert_eq!(chapters[0].content.blocks(), &[ContentBlock::text("body")]);
    }

    #[test]
    fn duplicate_chapter_position_is_rejected() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.insert_chapter(&chapter("c1", 0)).unwrap();
        assert!(matches!(store.insert_chapter(&chapter("c1", 0)), Err(CourseError::Storage(_))));
    }

    #[test]
    fn lists_by_author_and_deletes() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.insert_course(&course("c1", "a@x.io")).unwrap();
        store.insert_course(&course("c2", "b@x.io")).unwrap();
        store.insert_chapter(&chapter("c1", 0)).unwrap();

        assert_eq!(store.courses_by_author("a@x.io").unwrap().len(), 1);
        assert_eq!(store.all_courses().unwrap().len(), 2);

        store.delete_course("c1").unwrap();
        assert!(store.course_by_id("c1").unwrap().is_none());
        assert!(store.chapters_by_course("c1").unwrap().is_empty());
        assert_eq!(store.all_courses().unwrap().len(), 1);
    }
}
