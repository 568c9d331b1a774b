//! Day planner configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable overriding `llm.base-url`
pub const BASE_URL_ENV: &str = "OPENROUTER_BASE_URL";

/// Environment variable overriding `llm.model`
pub const MODEL_ENV: &str = "PLANNER_MODEL";

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// LLM provider configuration
    pub llm: LlmConfig,

    /// Storage configuration
    pub storage: StorageConfig,

    /// Prompt template configuration
    pub prompts: PromptsConfig,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[serde(rename = "log-level")]
    pub log_level: Option<String>,
}

impl Config {
    /// Load configuration with fallback chain, then apply env overrides
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        let mut config = Self::load_chain(config_path)?;
        config.apply_overrides(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Read only the log level, ignoring any load failure
    ///
    /// Used before logging is initialized.
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        Self::load_chain(config_path).ok().and_then(|c| c.log_level)
    }

    fn load_chain(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .dayplanner.yml
        let local_config = PathBuf::from(".dayplanner.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/dayplanner/dayplanner.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("dayplanner").join("dayplanner.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Apply environment overrides through `lookup`
    ///
    /// Empty values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(url) = non_empty(BASE_URL_ENV) {
            tracing::debug!(%url, "apply_overrides: base-url from env");
            self.llm.base_url = url;
        }
        if let Some(model) = non_empty(MODEL_ENV) {
            tracing::debug!(%model, "apply_overrides: model from env");
            self.llm.model = model;
        }
    }
}

/// LLM provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Model identifier
    pub model: String,

    /// Environment variable containing the API key
    #[serde(rename = "api-key-env")]
    pub api_key_env: String,

    /// API base URL (the client appends `/chat/completions`)
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Sampling temperature for plan generation
    pub temperature: f32,

    #[serde(rename = "plan-max-tokens")]
    pub plan_max_tokens: u32,

    #[serde(rename = "plan-timeout-ms")]
    pub plan_timeout_ms: u64,

    #[serde(rename = "analysis-max-tokens")]
    pub analysis_max_tokens: u32,

    #[serde(rename = "analysis-timeout-ms")]
    pub analysis_timeout_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "anthropic/claude-sonnet-4.5".to_string(),
            api_key_env: "OPENROUTER_API_KEY".to_string(),
            base_url: "https://openrouter.ai/api/v1".to_string(),
            temperature: 0.7,
            plan_max_tokens: 3000,
            plan_timeout_ms: 60_000,
            analysis_max_tokens: 500,
            analysis_timeout_ms: 30_000,
        }
    }
}

impl LlmConfig {
    /// API key from the configured env var; `None` when unset or empty
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env).ok().filter(|k| !k.trim().is_empty())
    }

    pub fn plan_timeout(&self) -> Duration {
        Duration::from_millis(self.plan_timeout_ms)
    }

    pub fn analysis_timeout(&self) -> Duration {
        Duration::from_millis(self.analysis_timeout_ms)
    }
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite database file
    #[serde(rename = "db-path")]
    pub db_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        let db_path = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("dayplanner")
            .join("planner.db");
        Self { db_path }
    }
}

/// Prompt template configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptsConfig {
    /// Directory with `<name>.pmt` overrides for the embedded templates
    pub dir: Option<PathBuf>,
}
