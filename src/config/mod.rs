//! Configuration file support for jarvis
//!
//! Loads config from ~/.jarvis/config.toml and merges it with CLI flags and
//! environment variables into `Settings`.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::provider::DEFAULT_OLLAMA_URL;
use crate::router::{DEFAULT_HOSTED_MODEL, DEFAULT_LOCAL_MODEL};

pub const DEFAULT_REASONING_MODEL: &str = "deepseek-reasoner";
pub const DEFAULT_LOCAL_REASONING_MODEL: &str = "deepseek-r1:14b";

/// Configuration for jarvis (every field optional)
#[derive(Debug, Default, Clone, Deserialize)]
pub struct Config {
    /// DeepSeek API key (hosted reasoning)
    pub deepseek_api_key: Option<String>,

    /// OpenRouter API key (hosted responses)
    pub openrouter_api_key: Option<String>,

    /// Ollama server URL
    pub ollama_url: Option<String>,

    /// Startup response model
    pub model: Option<String>,

    /// Local fallback response model (without the `ollama:` prefix)
    pub local_model: Option<String>,

    /// Local reasoning model
    pub local_reasoning_model: Option<String>,

    /// Hosted reasoning model
    pub reasoning_model: Option<String>,

    /// Override for the DeepSeek API base URL
    pub deepseek_base_url: Option<String>,

    /// Override for the OpenRouter API base URL
    pub openrouter_base_url: Option<String>,

    /// Show the reasoning stream at startup
    pub show_reasoning: Option<bool>,
}

impl Config {
    /// Load config from ~/.jarvis/config.toml
    pub fn load() -> Self {
        Self::load_from(&config_path())
    }

    /// Load config from a path, falling back to defaults on any failure
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("Warning: Failed to parse {}: {}", path.display(), e);
                    Self::default()
                }
            },
            Err(e) => {
                eprintln!("Warning: Failed to read {}: {}", path.display(), e);
                Self::default()
            }
        }
    }
}

/// Fully resolved settings
#[derive(Debug, Clone)]
pub struct Settings {
    pub deepseek_api_key: Option<String>,
    pub openrouter_api_key: Option<String>,
    pub ollama_url: String,
    pub model: String,
    pub local_model: String,
    pub local_reasoning_model: String,
    pub reasoning_model: String,
    pub deepseek_base_url: Option<String>,
    pub openrouter_base_url: Option<String>,
    pub show_reasoning: bool,
}

impl Settings {
    /// Resolve values: CLI args / env vars (`overrides`) > config file > defaults
    ///
    /// Blank strings count as unset.
    pub fn resolve(overrides: Config, file: Config) -> Self {
        fn pick(a: Option<String>, b: Option<String>) -> Option<String> {
            non_empty(a).or_else(|| non_empty(b))
        }

        Self {
            deepseek_api_key: pick(overrides.deepseek_api_key, file.deepseek_api_key),
            openrouter_api_key: pick(overrides.openrouter_api_key, file.openrouter_api_key),
            ollama_url: pick(overrides.ollama_url, file.ollama_url)
                .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string()),
            model: pick(overrides.model, file.model)
                .unwrap_or_else(|| DEFAULT_HOSTED_MODEL.to_string()),
            local_model: pick(overrides.local_model, file.local_model)
                .unwrap_or_else(|| DEFAULT_LOCAL_MODEL.to_string()),
            local_reasoning_model: pick(overrides.local_reasoning_model, file.local_reasoning_model)
                .unwrap_or_else(|| DEFAULT_LOCAL_REASONING_MODEL.to_string()),
            reasoning_model: pick(overrides.reasoning_model, file.reasoning_model)
                .unwrap_or_else(|| DEFAULT_REASONING_MODEL.to_string()),
            deepseek_base_url: pick(overrides.deepseek_base_url, file.deepseek_base_url),
            openrouter_base_url: pick(overrides.openrouter_base_url, file.openrouter_base_url),
            show_reasoning: overrides.show_reasoning.or(file.show_reasoning).unwrap_or(true),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Get the jarvis home directory
pub fn config_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_default().join(".jarvis")
}

/// Get the config file path
pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert!(config.deepseek_api_key.is_none());
        assert!(config.openrouter_api_key.is_none());
    }

    #[test]
    fn test_config_path() {
        let path = config_path();
        assert!(path.to_string_lossy().contains(".jarvis"));
        assert!(path.to_string_lossy().ends_with("config.toml"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            concat!(
                "openrouter_api_key = \"sk-or-test\"\n",
                "model = \"ollama:llama3\"\n",
                "show_reasoning = false\n",
            ),
        )
        .unwrap();

        let config = Config::load_from(&path);
        assert_eq!(config.openrouter_api_key.as_deref(), Some("sk-or-test"));
        assert_eq!(config.model.as_deref(), Some("ollama:llama3"));
        assert_eq!(config.show_reasoning, Some(false));
    }

    #[test]
    fn test_load_missing_or_malformed() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Config::load_from(&dir.path().join("nope.toml")).model.is_none());

        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "model = [unterminated").unwrap();
        assert!(Config::load_from(&path).model.is_none());
    }

    #[test]
    fn test_resolve_defaults() {
        let settings = Settings::resolve(Config::default(), Config::default());
        assert!(settings.deepseek_api_key.is_none());
        assert_eq!(settings.ollama_url, DEFAULT_OLLAMA_URL);
        assert_eq!(settings.model, DEFAULT_HOSTED_MODEL);
        assert_eq!(settings.local_model, DEFAULT_LOCAL_MODEL);
        assert_eq!(settings.reasoning_model, DEFAULT_REASONING_MODEL);
        assert_eq!(settings.local_reasoning_model, DEFAULT_LOCAL_REASONING_MODEL);
        assert!(settings.show_reasoning);
    }

    #[test]
    fn test_resolve_precedence() {
        let overrides = Config {
            deepseek_api_key: Some("from-cli".into()),
            openrouter_api_key: Some("   ".into()),
            ..Default::default()
        };
        let file = Config {
            deepseek_api_key: Some("from-file".into()),
            openrouter_api_key: Some("or-file".into()),
            ollama_url: Some("http://gpu-box:11434".into()),
            show_reasoning: Some(false),
            ..Default::default()
        };

        let settings = Settings::resolve(overrides, file);
        assert_eq!(settings.deepseek_api_key.as_deref(), Some("from-cli"));
        // Blank override falls through to the file
        assert_eq!(settings.openrouter_api_key.as_deref(), Some("or-file"));
        assert_eq!(settings.ollama_url, "http://gpu-box:11434");
        assert!(!settings.show_reasoning);
    }
}
