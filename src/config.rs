use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::embedding::device::DevicePreference;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct SwisstextConfig {
    pub log: LogConfig,
    pub paths: PathsConfig,
    pub pipeline: PipelineConfig,
    pub model: ModelConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PathsConfig {
    pub texts: String,
    pub params: String,
    pub output: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PipelineConfig {
    pub batch_size: usize,
    pub max_length: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ModelConfig {
    pub cache_dir: String,
    pub device: DevicePreference,
    pub hub_url: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            texts: "data/text_data.csv".into(),
            params: "data/model_params.csv".into(),
            output: "data/embeddings.csv".into(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            max_length: 512,
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        let cache_dir = default_swisstext_dir()
            .join("models")
            .to_string_lossy()
            .into_owned();
        Self {
            cache_dir,
            device: DevicePreference::Auto,
            hub_url: "https://huggingface.co".into(),
        }
    }
}

/// Returns `~/.swisstext/`, or `./.swisstext/` when no home directory is known.
pub fn default_swisstext_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".swisstext")
}

/// Returns the default config file path: `~/.swisstext/config.toml`
pub fn default_config_path() -> PathBuf {
    default_swisstext_dir().join("config.toml")
}

impl SwisstextConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            SwisstextConfig::default()
        };

        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Apply environment variable overrides
    /// (SWISSTEXT_LOG_LEVEL, SWISSTEXT_DEVICE, SWISSTEXT_MODEL_DIR).
    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(val) = std::env::var("SWISSTEXT_LOG_LEVEL") {
            self.log.level = val;
        }
        if let Ok(val) = std::env::var("SWISSTEXT_DEVICE") {
            self.model.device = val
                .parse()
                .map_err(|e: String| anyhow::anyhow!("SWISSTEXT_DEVICE: {e}"))?;
        }
        if let Ok(val) = std::env::var("SWISSTEXT_MODEL_DIR") {
            self.model.cache_dir = val;
        }
        Ok(())
    }

    /// Resolve the model cache directory, expanding `~` if needed.
    pub fn resolved_cache_dir(&self) -> PathBuf {
        expand_tilde(&self.model.cache_dir)
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}
