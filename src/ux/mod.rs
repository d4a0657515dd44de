use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};

use crate::course::{GenerationReport, LoadedCourse, Progress};
use crate::normalize::expand_escaped_breaks;
use crate::wire::{BlockKind, ChapterRecord, CourseOutline, CourseSummary};

/// File name shown above a code block, e.g. `main.py`.
pub fn file_label(language: &str) -> String {
    let ext = match language.trim().to_ascii_lowercase().as_str() {
        "python" | "py" => "py",
        "javascript" | "js" | "node" => "js",
        "typescript" | "ts" => "ts",
        "rust" | "rs" => "rs",
        "java" => "java",
        "c" => "c",
        "cpp" | "c++" => "cpp",
        "csharp" | "c#" | "cs" => "cs",
        "go" | "golang" => "go",
        "ruby" | "rb" => "rb",
        "php" => "php",
        "kotlin" | "kt" => "kt",
        "swift" => "swift",
        "bash" | "shell" | "sh" => "sh",
        "sql" => "sql",
        "html" => "html",
        "css" => "css",
        "" => "txt",
        other => return format!("main.{other}"),
    };
    format!("main.{ext}")
}

pub fn show_outline(outline: &CourseOutline) {
    println!("\n=== {} ===", outline.display_name().bold());
    if !outline.description.trim().is_empty() {
        println!("{}", outline.description.trim());
    }
    println!(
        "{}: {}   {}: {}   {}: {}",
        "Category".cyan().bold(),
        outline.category,
        "Level".cyan().bold(),
        outline.level,
        "Duration".cyan().bold(),
        outline.duration
    );
    if outline.chapters.is_empty() {
        println!("(no chapters)");
        return;
    }
    for (i, c) in outline.chapters.iter().enumerate() {
        println!(
            "{}. {}  {}",
            i + 1,
            c.display_name(i).bold(),
            format!("({})", c.display_duration()).dimmed()
        );
        if !c.about.trim().is_empty() {
            println!("   {}", c.about.trim());
        }
    }
    println!();
}

pub fn render_chapter(chapter: &ChapterRecord) {
    println!("\n{} {}", format!("[{}]", chapter.position + 1).green().bold(), chapter.chapter_id.bold());
    if !chapter.video_id.is_empty() {
        println!("{} https://www.youtube.com/watch?v={}", "video:".dimmed(), chapter.video_id);
    }
    for block in chapter.content.blocks() {
        match block.kind {
            BlockKind::Text => {
                println!("{}\n", expand_escaped_breaks(&block.value).trim());
            }
            BlockKind::Code => {
                let label = file_label(block.language.as_deref().unwrap_or_default());
                println!("{}", format!("── {label} ──").yellow());
                println!("{}", indent(&block.value, 4));
                println!();
            }
        }
    }
}

pub fn show_course(loaded: &LoadedCourse, only: Option<usize>) {
    show_outline(&loaded.course.outline);
    for chapter in &loaded.chapters {
        if only.map_or(true, |n| n == chapter.position + 1) {
            render_chapter(chapter);
        }
    }
    if !loaded.is_complete() {
        println!(
            "{}",
            format!(
                "{} of {} chapters generated; run `generate {}` to continue",
                loaded.chapters.len(),
                loaded.course.outline.chapters.len(),
                loaded.course.course_id
            )
            .yellow()
        );
    }
}

pub fn print_course_list(courses: &[CourseSummary]) {
    if courses.is_empty() {
        println!("(no courses)");
        return;
    }
    for c in courses {
        println!(
            "{}  {}  {} · {} · {} chapters · by {}",
            c.id.dimmed(),
            c.title.bold(),
            c.category.cyan(),
            c.level,
            c.chapters,
            c.author
        );
    }
}

pub fn print_report(report: &GenerationReport) {
    println!(
        "\n  {}: {}   {}: {}   {}: {}",
        "Generated".green().bold(),
        report.generated,
        "Skipped".bold(),
        report.skipped,
        "Total".bold(),
        report.total
    );
}

pub fn progress_bar(total: usize) -> ProgressBar {
    let pb = ProgressBar::new(total as u64);
    if let Ok(style) = ProgressStyle::with_template("{spinner} [{bar:30}] {pos}/{len} {msg}") {
        pb.set_style(style.progress_chars("=> "));
    }
    pb
}

/// Moves the bar to the chapter being worked on.
pub fn track(pb: &ProgressBar, p: &Progress) {
    pb.set_position((p.index - 1) as u64);
    if p.skipped {
        pb.set_message(format!("{} (stored)", p.chapter));
    } else {
        pb.set_message(p.chapter.clone());
    }
}

pub fn confirm(prompt: &str) -> bool {
    print!("{} [y/N]: ", prompt);
    let _ = io::stdout().flush();
    let mut s = String::new();
    if io::stdin().read_line(&mut s).is_ok() {
        let ans = s.trim().to_lowercase();
        ans == "y" || ans == "yes"
    } else {
        false
    }
}

fn indent(s: &str, n: usize) -> String {
    let pad = " ".repeat(n);
    s.lines().map(|l| format!("{pad}{l}")).collect::<Vec<_>>().join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_label_maps_common_languages() {
        assert_eq!(file_label("Python"), "main.py");
        assert_eq!(file_label("javascript"), "main.js");
        assert_eq!(file_label("C++"), "main.cpp");
        assert_eq!(file_label(""), "main.txt");
        assert_eq!(file_label("zig"), "main.zig");
    }

    #[test]
    fn indent_pads_every_line() {
        assert_eq!(indent("a\n  b", 2), "  a\n    b");
    }
}
