use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[value(name = "openai", alias = "open-ai")]
    OpenAI,
    Groq,
    Anthropic,
    Ollama,
}

/// Which chapter prompt is sent. Parsing is the same for both.
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseMode {
    #[default]
    Structured,
    Freeform,
}

#[derive(Parser, Debug)]
#[command(name = "course_gen", version, about = "Generate courses with an LLM and store them in SQLite")]
pub struct Args {
    /// TOML or YAML config file
    #[arg(long, global = true)]
    pub config: Option<String>,

    #[arg(long, value_enum, global = true)]
    pub provider: Option<ProviderKind>,

    #[arg(long, global = true)]
    pub model: Option<String>,

    #[arg(long, value_enum, global = true)]
    pub mode: Option<ResponseMode>,

    #[arg(long, global = true)]
    pub database: Option<String>,

    #[arg(long, global = true)]
    pub timeout_secs: Option<u64>,

    /// Save every prompt and raw completion under .course_gen/tx/<id>/
    #[arg(long, default_value_t = false, global = true)]
    pub save_artifacts: bool,

    #[arg(long, default_value_t = false, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate an outline and store it as a new course
    Create(CreateArgs),
    /// Generate content for every chapter not stored yet
    Generate {
        course_id: String,
    },
    /// Print a course with its generated chapters
    Show {
        course_id: String,
        /// Only print this chapter (1-based)
        #[arg(long)]
        chapter: Option<usize>,
    },
    /// List stored courses
    List {
        #[arg(long)]
        author: Option<String>,
    },
    /// Delete a course and its chapters
    Delete {
        course_id: String,
        #[arg(long, default_value_t = false)]
        yes: bool,
    },
}

#[derive(ClapArgs, Debug)]
pub struct CreateArgs {
    #[arg(long)]
    pub topic: String,

    #[arg(long, default_value = "Programming")]
    pub category: String,

    #[arg(long, default_value = "Beginner")]
    pub level: String,

    #[arg(long, default_value = "1 hour")]
    pub duration: String,

    #[arg(long, default_value_t = 5)]
    pub chapters: u32,

    #[arg(long, default_value = "")]
    pub notes: String,

    #[arg(long, default_value_t = false)]
    pub no_video: bool,

    #[arg(long, default_value = "guest@localhost")]
    pub author: String,

    #[arg(long)]
    pub author_name: Option<String>,

    /// Generate chapter content right after the outline is stored
    #[arg(long, default_value_t = false)]
    pub generate: bool,
}
