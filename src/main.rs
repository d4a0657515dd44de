use anyhow::{bail, Context};
use clap::Parser;
use std::path::Path;
use std::time::Duration;
use uuid::Uuid;

use course_gen::cli::{self, Command, CreateArgs};
use course_gen::config::Config;
use course_gen::course::{self, Author, CourseService};
use course_gen::log::{init_tracing, ArtifactSink};
use course_gen::provider::{make_client, DynClient};
use course_gen::store::SqliteStore;
use course_gen::ux;
use course_gen::video::YouTube;
use course_gen::wire::{CourseRecord, OutlineRequest};

fn resolve_config(args: &cli::Args) -> anyhow::Result<Config> {
    let mut cfg = match &args.config {
        Some(path) => Config::load(Path::new(path))?,
        None => Config::default(),
    };
    if let Some(p) = args.provider {
        cfg.provider = p;
    }
    if let Some(m) = &args.model {
        cfg.model = Some(m.clone());
    }
    if let Some(mode) = args.mode {
        cfg.response_mode = mode;
    }
    if let Some(db) = &args.database {
        cfg.database = db.clone();
    }
    if let Some(t) = args.timeout_secs {
        cfg.timeout_secs = t;
    }
    cfg.save_artifacts |= args.save_artifacts;
    cfg.validate()?;
    Ok(cfg)
}

/// Completion and video collaborators; only built for commands that call them.
struct Backends {
    client: DynClient,
    videos: YouTube,
}

impl Backends {
    fn new(cfg: &Config) -> anyhow::Result<Self> {
        Ok(Self {
            client: make_client(cfg)?,
            videos: YouTube::from_env(Duration::from_secs(cfg.timeout_secs))?,
        })
    }

    fn service<'a>(&'a self, store: &'a SqliteStore, cfg: &Config) -> CourseService<'a> {
        let service = CourseService::new(self.client.as_ref(), &self.videos, store, cfg);
        if !cfg.save_artifacts {
            return service;
        }
        let sink = ArtifactSink::new(Path::new(&cfg.root), Uuid::new_v4());
        println!("artifacts: {}", sink.dir().display());
        service.with_artifacts(sink)
    }
}

async fn run_generation(service: &CourseService<'_>, course: &CourseRecord) -> anyhow::Result<()> {
    let pb = ux::progress_bar(course.outline.chapters.len());
    let result = service.generate_chapters(course, |p| ux::track(&pb, p)).await;
    pb.finish_and_clear();

    let report = result.with_context(|| {
        format!(
            "chapter generation stopped; stored chapters are kept, rerun `generate {}` to resume",
            course.course_id
        )
    })?;
    ux::print_report(&report);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = cli::Args::parse();
    init_tracing(args.debug);

    let cfg = resolve_config(&args)?;
    let store = SqliteStore::open(Path::new(&cfg.database))
        .with_context(|| format!("opening database {}", cfg.database))?;

    match &args.command {
        Command::List { author } => {
            let courses = course::list_courses(&store, author.as_deref())?;
            ux::print_course_list(&courses);
        }
        Command::Show { course_id, chapter } => match course::load_course(&store, course_id)? {
            Some(loaded) => ux::show_course(&loaded, *chapter),
            None => bail!("no course with id {course_id}"),
        },
        Command::Delete { course_id, yes } => {
            if !*yes && !ux::confirm(&format!("Delete course {course_id} and its chapters?")) {
                println!("Aborted by user.");
                return Ok(());
            }
            if course::delete_course(&store, course_id)? {
                println!("Deleted {course_id}.");
            } else {
                println!("No course with id {course_id}.");
            }
        }
        Command::Create(create) => {
            let backends = Backends::new(&cfg)?;
            create_course(&backends.service(&store, &cfg), create).await?;
        }
        Command::Generate { course_id } => {
            let backends = Backends::new(&cfg)?;
            let service = backends.service(&store, &cfg);
            let Some(loaded) = service.load_course(course_id)? else {
                bail!("no course with id {course_id}");
            };
            if loaded.is_complete() {
                println!("All chapters of {course_id} are already generated.");
            } else {
                run_generation(&service, &loaded.course).await?;
            }
        }
    }

    Ok(())
}

async fn create_course(service: &CourseService<'_>, args: &CreateArgs) -> anyhow::Result<()> {
    let req = OutlineRequest {
        topic: args.topic.clone(),
        category: args.category.clone(),
        level: args.level.clone(),
        duration: args.duration.clone(),
        chapters: args.chapters,
        notes: args.notes.clone(),
        include_video: !args.no_video,
    };
    let author = Author { email: args.author.clone(), display_name: args.author_name.clone() };

    let record = service
        .create_course(&req, &author)
        .await
        .context("outline generation failed; nothing was stored")?;
    ux::show_outline(&record.outline);
    println!("Created course {}", record.course_id);

    if args.generate || ux::confirm("Generate chapter content now?") {
        run_generation(service, &record).await?;
    }
    Ok(())
}
