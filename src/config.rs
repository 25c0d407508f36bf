//! # Engine Configuration
//! TOML-backed configuration with env overrides.
//!
//! Path resolution: `RANKING_CONFIG_PATH` if set, else `config/ranking.toml`.
//! A missing file is fine for local runs (`load_or_default`); an unreadable
//! or malformed file is an error. `RANKING_LEARNING_RATE` overrides the TOML
//! value after loading, so a deployment can tune the step size without
//! shipping a new config file.

use std::fs;
use std::path::PathBuf;

use serde::Deserialize;

pub const DEFAULT_CONFIG_PATH: &str = "config/ranking.toml";

pub const ENV_CONFIG_PATH: &str = "RANKING_CONFIG_PATH";
pub const ENV_LEARNING_RATE: &str = "RANKING_LEARNING_RATE";

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct EngineConfig {
    pub learning: LearningConfig,
    pub sampler: SamplerConfig,
    pub insights: InsightsConfig,
    pub data: DataConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LearningConfig {
    /// Step size of the per-vote gradient update.
    pub learning_rate: f64,
    /// Step size of the tie half-step; defaults to `learning_rate / 2`.
    pub tie_rate: Option<f64>,
    /// Normalization stats refresh cadence, in ingested votes.
    pub normalization_refresh_every: u64,
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.05,
            tie_rate: None,
            normalization_refresh_every: 25,
        }
    }
}

impl LearningConfig {
    pub fn tie_rate(&self) -> f64 {
        self.tie_rate.unwrap_or(self.learning_rate * 0.5)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SamplerConfig {
    /// Listings with fewer comparisons than this are served first.
    pub min_comparisons: u64,
    /// Partner drawn uniformly among this many closest-scoring candidates.
    pub top_k: usize,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            min_comparisons: 3,
            top_k: 5,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InsightsConfig {
    /// Percentile floor of the "top band" used for neighborhood insights.
    pub top_band_percentile: f64,
    pub max_neighborhoods: usize,
}

impl Default for InsightsConfig {
    fn default() -> Self {
        Self {
            top_band_percentile: 75.0,
            max_neighborhoods: 5,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct DataConfig {
    /// Seed population loaded at boot, JSON array of listings.
    pub listings_path: Option<PathBuf>,
    /// Durable snapshot directory; omit to run fully in-memory.
    pub snapshot_dir: Option<PathBuf>,
}

impl EngineConfig {
    /// Load from the resolved config path; errors if the file exists but
    /// cannot be read or parsed.
    pub fn from_toml() -> anyhow::Result<Self> {
        let path = std::env::var(ENV_CONFIG_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));
        let content = fs::read_to_string(&path).map_err(|e| {
            anyhow::anyhow!("failed to read ranking config at {}: {}", path.display(), e)
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(toml_str: &str) -> anyhow::Result<Self> {
        let mut cfg: EngineConfig = toml::from_str(toml_str)?;
        cfg.apply_env_overrides();
        cfg.validate()?;
        Ok(cfg)
    }

    /// Defaults when no config file is present; still honors env overrides.
    pub fn load_or_default() -> Self {
        let path = std::env::var(ENV_CONFIG_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));
        if path.exists() {
            match Self::from_toml() {
                Ok(cfg) => return cfg,
                Err(e) => {
                    tracing::warn!(error = %e, "ranking config unreadable, using defaults");
                }
            }
        }
        let mut cfg = Self::default();
        cfg.apply_env_overrides();
        cfg
    }

    fn apply_env_overrides(&mut self) {
        if let Some(lr) = std::env::var(ENV_LEARNING_RATE)
            .ok()
            .and_then(|s| s.trim().parse::<f64>().ok())
        {
            self.learning.learning_rate = lr.clamp(1e-6, 1.0);
        }
    }

    fn validate(&self) -> anyhow::Result<()> {
        if !(self.learning.learning_rate > 0.0) {
            anyhow::bail!("learning_rate must be positive");
        }
        if self.learning.normalization_refresh_every == 0 {
            anyhow::bail!("normalization_refresh_every must be at least 1");
        }
        if self.sampler.top_k == 0 {
            anyhow::bail!("sampler top_k must be at least 1");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn defaults_are_sane() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.learning.learning_rate, 0.05);
        assert_eq!(cfg.learning.tie_rate(), 0.025);
        assert_eq!(cfg.sampler.min_comparisons, 3);
        assert!(cfg.data.snapshot_dir.is_none());
    }

    #[test]
    #[serial]
    fn parses_partial_toml_with_defaults() {
        std::env::remove_var(ENV_LEARNING_RATE);
        let cfg = EngineConfig::from_toml_str(
            r#"
            [learning]
            learning_rate = 0.01

            [sampler]
            top_k = 9
            "#,
        )
        .unwrap();
        assert_eq!(cfg.learning.learning_rate, 0.01);
        assert_eq!(cfg.learning.tie_rate(), 0.005);
        assert_eq!(cfg.sampler.top_k, 9);
        assert_eq!(cfg.sampler.min_comparisons, 3);
    }

    #[test]
    #[serial]
    fn env_learning_rate_wins_over_toml() {
        std::env::set_var(ENV_LEARNING_RATE, "0.2");
        let cfg = EngineConfig::from_toml_str("[learning]\nlearning_rate = 0.01\n").unwrap();
        std::env::remove_var(ENV_LEARNING_RATE);
        assert_eq!(cfg.learning.learning_rate, 0.2);
    }

    #[test]
    #[serial]
    fn rejects_nonsense_values() {
        std::env::remove_var(ENV_LEARNING_RATE);
        assert!(EngineConfig::from_toml_str("[learning]\nlearning_rate = 0.0\n").is_err());
        assert!(EngineConfig::from_toml_str("[sampler]\ntop_k = 0\n").is_err());
    }
}
