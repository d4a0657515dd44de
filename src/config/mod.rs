use fs_err as fs;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::cli::{ProviderKind, ResponseMode};
use crate::errors::{CourseError, CourseResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub provider: ProviderKind,
    /// Falls back to a per-provider default when unset.
    pub model: Option<String>,
    /// Overrides the provider's endpoint base URL.
    pub api_base: Option<String>,
    pub timeout_secs: u64,
    pub response_mode: ResponseMode,
    /// Language for code blocks that do not name one.
    pub default_language: String,
    pub database: String,
    pub video_limit: u32,
    pub root: String,
    pub save_artifacts: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Groq,
            model: None,
            api_base: None,
            timeout_secs: 120,
            response_mode: ResponseMode::Structured,
            default_language: "python".into(),
            database: "course_gen.sqlite".into(),
            video_limit: 1,
            root: ".".into(),
            save_artifacts: false,
        }
    }
}

impl Config {
    /// Reads a `.toml`, `.yaml` or `.yml` file; absent keys keep defaults.
    pub fn load(path: &Path) -> CourseResult<Self> {
        let text = fs::read_to_string(path)
            .map_err(|e| CourseError::Config(format!("reading {}: {e}", path.display())))?;
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
        let cfg: Config = match ext.to_ascii_lowercase().as_str() {
            "toml" => toml::from_str(&text)
                .map_err(|e| CourseError::Config(format!("parsing {}: {e}", path.display())))?,
            "yaml" | "yml" => serde_yaml::from_str(&text)
                .map_err(|e| CourseError::Config(format!("parsing {}: {e}", path.display())))?,
            other => {
                return Err(CourseError::Config(format!(
                    "unsupported config extension {other:?} (expected toml, yaml or yml)"
                )))
            }
        };
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> CourseResult<()> {
        if self.default_language.trim().is_empty() {
            return Err(CourseError::Config("default_language cannot be empty".into()));
        }
        if self.timeout_secs == 0 {
            return Err(CourseError::Config("timeout_secs must be positive".into()));
        }
        Ok(())
    }

    pub fn model_name(&self) -> &str {
        if let Some(m) = self.model.as_deref().filter(|m| !m.trim().is_empty()) {
            return m;
        }
        match self.provider {
            ProviderKind::Groq => "llama-3.3-70b-versatile",
            ProviderKind::OpenAI => "gpt-4.1-mini",
            ProviderKind::Anthropic => "claude-3-5-haiku-latest",
            ProviderKind::Ollama => "llama3.1",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    fn write_config(suffix: &str, body: &str) -> tempfile::NamedTempFile {
        let mut f = Builder::new().suffix(suffix).tempfile().unwrap();
        f.write_all(body.as_bytes()).unwrap();
        f
    }

    #[test]
    fn defaults_pick_provider_model() {
        let cfg = Config::default();
        assert_eq!(cfg.model_name(), "llama-3.3-70b-versatile");
        let cfg = Config { provider: ProviderKind::OpenAI, ..Config::default() };
        assert_eq!(cfg.model_name(), "gpt-4.1-mini");
        let cfg = Config { model: Some("custom".into()), ..Config::default() };
        assert_eq!(cfg.model_name(), "custom");
    }

    #[test]
    fn loads_partial_toml() {
        let f = write_config(
            ".toml",
            "provider = \"ollama\"\nresponse_mode = \"freeform\"\nvideo_limit = 3\n",
        );
        let cfg = Config::load(f.path()).unwrap();
        assert_eq!(cfg.provider, ProviderKind::Ollama);
        assert_eq!(cfg.response_mode, ResponseMode::Freeform);
        assert_eq!(cfg.video_limit, 3);
        assert_eq!(cfg.default_language, "python");
    }

    #[test]
    fn loads_yaml() {
        let f = write_config(".yaml", "provider: openai\ndefault_language: javascript\n");
        let cfg = Config::load(f.path()).unwrap();
        assert_eq!(cfg.provider, ProviderKind::OpenAI);
        assert_eq!(cfg.default_language, "javascript");
    }

    #[test]
    fn rejects_unknown_extension_and_bad_values() {
        let f = write_config(".ini", "provider=groq");
        assert!(matches!(Config::load(f.path()), Err(CourseError::Config(_))));

        let f = write_config(".toml", "default_language = \"  \"\n");
        assert!(matches!(Config::load(f.path()), Err(CourseError::Config(_))));
    }
}
