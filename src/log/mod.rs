use fs_err as fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

use crate::errors::CourseResult;

/// Installs the global subscriber. `RUST_LOG` wins over the default level.
pub fn init_tracing(debug: bool) {
    let level = if debug { "course_gen=debug" } else { "course_gen=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .ok();
}

pub struct SavedPaths {
    pub dir: PathBuf,
    pub prompt: PathBuf,
    pub response: PathBuf,
}

fn tx_dir(root: &Path, tx: Uuid) -> PathBuf {
    root.join(".course_gen").join("tx").join(tx.to_string())
}

/// Writes each completion exchange of one run to `<root>/.course_gen/tx/<tx>/`.
#[derive(Debug, Clone)]
pub struct ArtifactSink {
    dir: PathBuf,
}

impl ArtifactSink {
    pub fn new(root: &Path, tx: Uuid) -> Self {
        Self { dir: tx_dir(root, tx) }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn save(&self, stage: &str, prompt: &str, response: &str) -> CourseResult<SavedPaths> {
        fs::create_dir_all(&self.dir)?;

        let prompt_path = self.dir.join(format!("{stage}.prompt.txt"));
        fs::write(&prompt_path, prompt)?;

        let response_path = self.dir.join(format!("{stage}.response.txt"));
        fs::write(&response_path, response)?;

        debug!(stage, dir = %self.dir.display(), "saved completion artifacts");
        Ok(SavedPaths { dir: self.dir.clone(), prompt: prompt_path, response: response_path })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn saves_prompt_and_response_per_stage() {
        let root = tempfile::tempdir().unwrap();
        let tx = Uuid::new_v4();
        let sink = ArtifactSink::new(root.path(), tx);

        let saved = sink.save("chapter-1", "the prompt", "the response").unwrap();
        assert_eq!(saved.dir, root.path().join(".course_gen").join("tx").join(tx.to_string()));
        assert_eq!(std::fs::read_to_string(saved.prompt).unwrap(), "the prompt");
        assert_eq!(std::fs::read_to_string(saved.response).unwrap(), "the response");
        assert!(saved.dir.join("chapter-1.response.txt").exists());
    }
}
