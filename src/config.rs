/// Configuration module for lminspect.
///
/// Handles loading, validating, and providing default configuration values.
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::copilot::prompt::DEFAULT_END_MARK;
use crate::copilot::session::DEFAULT_MAX_ROUNDS;
use crate::inspector::DEFAULT_MAX_CONCURRENCIES;
use crate::render::RendererSettings;

pub const DEFAULT_CONFIG_PATH: &str = "config.json";

// ── Default value functions ──────────────────────────────────────────

fn default_endpoint() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model_name() -> String {
    "gpt-4o".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_max_rounds() -> usize {
    DEFAULT_MAX_ROUNDS
}

fn default_end_mark() -> String {
    DEFAULT_END_MARK.to_string()
}

fn default_debounce_ms() -> u64 {
    3000
}

fn default_rerender_debounce_ms() -> u64 {
    800
}

fn default_java_version() -> u32 {
    17
}

fn default_max_concurrencies() -> usize {
    DEFAULT_MAX_CONCURRENCIES
}

// ── Config structs ───────────────────────────────────────────────────

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub model: ModelConfig,

    #[serde(default)]
    pub inspection: InspectionConfig,

    #[serde(default)]
    pub renderer: RendererSettings,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ModelConfig {
    /// Base URL of an OpenAI-compatible API.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_model_name")]
    pub name: String,

    /// Environment variable holding the API key; unset means no auth header.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Requests per conversation, the first one included.
    #[serde(default = "default_max_rounds")]
    pub max_rounds: usize,

    #[serde(default = "default_end_mark")]
    pub end_mark: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct InspectionConfig {
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    #[serde(default = "default_rerender_debounce_ms")]
    pub rerender_debounce_ms: u64,

    #[serde(default = "default_java_version")]
    pub java_version: u32,

    #[serde(default = "default_max_concurrencies")]
    pub max_concurrencies: usize,
}

// ── Default impls ────────────────────────────────────────────────────

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            name: default_model_name(),
            api_key_env: default_api_key_env(),
            max_rounds: default_max_rounds(),
            end_mark: default_end_mark(),
        }
    }
}

impl Default for InspectionConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            rerender_debounce_ms: default_rerender_debounce_ms(),
            java_version: default_java_version(),
            max_concurrencies: default_max_concurrencies(),
        }
    }
}

// ── Config implementation ────────────────────────────────────────────

impl ModelConfig {
    /// API key from the configured environment variable, if set.
    #[must_use]
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|k| !k.is_empty())
    }
}

impl InspectionConfig {
    #[must_use]
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    #[must_use]
    pub fn rerender_debounce(&self) -> Duration {
        Duration::from_millis(self.rerender_debounce_ms)
    }
}

impl Config {
    /// Load configuration from a JSON file.
    ///
    /// If `config_path` is empty, defaults to `"config.json"`.
    /// If the file does not exist, returns a default config and optionally
    /// generates a template file.
    pub fn load(config_path: &str) -> Result<Self> {
        let path = if config_path.is_empty() {
            DEFAULT_CONFIG_PATH
        } else {
            config_path
        };

        if !Path::new(path).exists() {
            info!("{path} not found, using defaults");
            let cfg = Self::default();

            // Generate template only for the default path
            if path == DEFAULT_CONFIG_PATH {
                match cfg.save(path) {
                    Ok(()) => info!("Generated config template: {path}"),
                    Err(e) => warn!("Failed to generate config template: {e}"),
                }
            }

            return Ok(cfg);
        }

        let data = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {path}"))?;

        let cfg: Config = match serde_json::from_str(&data) {
            Ok(c) => c,
            Err(e) => {
                warn!("Invalid JSON in {path}: {e}");
                warn!("Using default configuration");
                return Ok(Self::default());
            }
        };

        info!("Loaded configuration from {path}");
        Ok(cfg)
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &str) -> Result<()> {
        let data = serde_json::to_string_pretty(self).context("failed to marshal config")?;
        std::fs::write(path, data).with_context(|| format!("failed to write config: {path}"))?;
        Ok(())
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(self.model.max_rounds > 0, "model.max_rounds must be positive");
        anyhow::ensure!(
            !self.model.end_mark.trim().is_empty(),
            "model.end_mark must not be empty"
        );
        anyhow::ensure!(
            !self.model.endpoint.is_empty(),
            "model.endpoint must be specified"
        );
        anyhow::ensure!(
            self.inspection.max_concurrencies > 0,
            "inspection.max_concurrencies must be positive"
        );
        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────────────
