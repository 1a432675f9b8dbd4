//! Batch configuration loaded from TOML.
//!
//! ```toml
//! [run]
//! trials = 3
//! concurrency = 4
//! seed = 42
//!
//! [npc]
//! provider = "openai"
//! model = "gpt-4o"
//! api_key_env = "OPENAI_API_KEY"
//!
//! [judge]
//! provider = "ollama"
//! model = "qwen3:0.6b"
//! ```
//!
//! Every field has a default, and the default providers are mock providers.

use model::ProviderConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EvalConfig {
    pub run: RunSettings,
    pub npc: ProviderConfig,
    pub player: ProviderConfig,
    pub judge: ProviderConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RunSettings {
    /// Repeated trials per scenario (the `k` of pass@k)
    pub trials: u32,
    /// Trials executing at once
    pub concurrency: usize,
    pub temperature: f32,
    pub judge_temperature: f32,
    /// Base seed; trial `n` uses `seed + n`
    pub seed: Option<u64>,
    pub scenarios_dir: PathBuf,
    pub output_dir: PathBuf,
    pub report_dir: PathBuf,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            trials: 1,
            concurrency: 4,
            temperature: 0.7,
            judge_temperature: 0.0,
            seed: None,
            scenarios_dir: PathBuf::from("evals/scenarios"),
            output_dir: PathBuf::from("evals/outputs/runs"),
            report_dir: PathBuf::from("evals/reports"),
        }
    }
}

impl RunSettings {
    pub fn with_trials(mut self, trials: u32) -> Self {
        self.trials = trials;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_output_dir(mut self, output_dir: impl Into<PathBuf>) -> Self {
        self.output_dir = output_dir.into();
        self
    }

    /// Seed for trial `run_id`, if a base seed is configured.
    pub fn trial_seed(&self, run_id: u32) -> Option<u64> {
        self.seed.map(|base| base.wrapping_add(u64::from(run_id)))
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.trials == 0 {
            return Err("trials must be at least 1".to_string());
        }

        if self.concurrency == 0 {
            return Err("concurrency must be at least 1".to_string());
        }

        for (name, value) in [
            ("temperature", self.temperature),
            ("judge_temperature", self.judge_temperature),
        ] {
            if !(0.0..=2.0).contains(&value) {
                return Err(format!("{} must be between 0.0 and 2.0", name));
            }
        }

        Ok(())
    }
}

impl EvalConfig {
    pub fn from_toml_str(toml: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(toml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> ConfigResult<Self> {
        let toml = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&toml)
    }

    /// Load `path` when it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &Path) -> ConfigResult<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> ConfigResult<()> {
        self.run.validate().map_err(ConfigError::Invalid)?;
        for (role, provider) in [
            ("npc", &self.npc),
            ("player", &self.player),
            ("judge", &self.judge),
        ] {
            provider
                .validate()
                .map_err(|e| ConfigError::Invalid(format!("[{}] {}", role, e)))?;
        }
        Ok(())
    }

    /// Replace every provider with the offline mock.
    pub fn force_mock(mut self) -> Self {
        self.npc = ProviderConfig::mock();
        self.player = ProviderConfig::mock();
        self.judge = ProviderConfig::mock();
        self
    }
}
