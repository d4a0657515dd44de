use thiserror::Error;

#[derive(Error, Debug)]
pub enum CourseError {
    #[error("completion error: {0}")]
    Completion(String),
    #[error("outline error: {0}")]
    Outline(String),
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),
    #[error("encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
    #[error("artifact error: {0}")]
    Artifact(#[from] std::io::Error),
    #[error("config error: {0}")]
    Config(String),
    #[error("{0} env var is not set")]
    MissingCredential(&'static str),
}

pub type CourseResult<T> = Result<T, CourseError>;
