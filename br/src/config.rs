//! Barrage configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::cli::OutputFormat;

/// Main Barrage configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BarrageConfig {
    /// Simulation clock settings
    pub simulation: SimulationConfig,

    /// Random source settings
    pub rng: RngConfig,

    /// Output settings for the CLI
    pub output: OutputConfig,
}

impl BarrageConfig {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .barrage.yml
        let local_config = PathBuf::from(".barrage.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/barrage/barrage.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("barrage").join("barrage.yml");
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
}

/// Simulation clock settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Ticks per second; frame time is its reciprocal
    #[serde(rename = "frame-rate")]
    pub frame_rate: u32,

    /// Safety bound on the number of ticks a single run may take
    #[serde(rename = "max-ticks")]
    pub max_ticks: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            frame_rate: 120,
            max_ticks: 36_000,
        }
    }
}

impl SimulationConfig {
    /// Seconds per tick
    pub fn frame_time(&self) -> f64 {
        1.0 / f64::from(self.frame_rate.max(1))
    }
}

/// Random source settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RngConfig {
    /// Seed for the emitter-wide random source
    pub seed: u64,
}

/// Output settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Default format for `br run`
    pub format: OutputFormat,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Text,
        }
    }
}
