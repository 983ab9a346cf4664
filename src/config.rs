//! # Configuration Management
//!
//! This module handles loading and parsing configuration from the flipbook-config.toml
//! file. It provides a centralized way to configure frame directories, playback timing,
//! CPU sampling cadence and where the icon and status text are published.

use crate::engine::Timing;
use crate::sampler::SamplerTiming;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Default configuration file, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "flipbook-config.toml";

/// Application configuration loaded from flipbook-config.toml
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Where the two flipbooks live and how fast they play
    pub frames: FramesConfig,
    /// Render loop limits
    pub engine: EngineConfig,
    /// CPU sampling cadence
    pub sampler: SamplerConfig,
    /// Status text refresh
    pub status: StatusConfig,
    /// Icon output
    pub sink: SinkConfig,
}

/// Flipbook sources
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct FramesConfig {
    /// Directory of `.ico` frames shown while CPU is low
    pub idle_dir: PathBuf,
    /// Directory of `.ico` frames shown while CPU is busy
    pub active_dir: PathBuf,
    /// Nominal frame duration in milliseconds at 1.0x speed
    pub base_frame_ms: u64,
}

/// Render loop limits
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Shortest time between icon updates (33 ms ≈ 30 updates per second)
    pub min_delay_ms: u64,
    /// Wait before retrying when the selected flipbook is missing
    pub missing_book_wait_ms: u64,
}

/// CPU sampling cadence
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SamplerConfig {
    /// Measurement window between the two CPU counter snapshots
    pub window_ms: u64,
    /// Pause between measurements
    pub interval_ms: u64,
}

/// Status text refresh
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct StatusConfig {
    pub refresh_ms: u64,
    /// Optional file that receives the tooltip text on every refresh
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

/// Icon output
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SinkConfig {
    /// File kept up to date with the current frame. Without it, frames are only traced.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_file: Option<PathBuf>,
}

impl Default for FramesConfig {
    fn default() -> Self {
        FramesConfig {
            idle_dir: PathBuf::from("idle_frames"),
            active_dir: PathBuf::from("active_frames"),
            base_frame_ms: 50,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            min_delay_ms: 33,
            missing_book_wait_ms: 100,
        }
    }
}

impl Default for SamplerConfig {
    fn default() -> Self {
        SamplerConfig {
            window_ms: 500,
            interval_ms: 500,
        }
    }
}

impl Default for StatusConfig {
    fn default() -> Self {
        StatusConfig {
            refresh_ms: 1000,
            file: None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            frames: FramesConfig::default(),
            engine: EngineConfig::default(),
            sampler: SamplerConfig::default(),
            status: StatusConfig::default(),
            sink: SinkConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from flipbook-config.toml
    /// Falls back to default configuration if file doesn't exist or is invalid
    pub fn load() -> Self {
        Self::load_from_path(DEFAULT_CONFIG_FILE)
    }

    /// Load configuration from specified path
    /// Falls back to default configuration if file doesn't exist or is invalid
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(contents) => match toml::from_str::<Config>(&contents) {
                Ok(config) => {
                    info!("loaded configuration from {}", path.display());
                    config
                }
                Err(e) => {
                    warn!("invalid config file format in {}: {}", path.display(), e);
                    warn!("using default configuration");
                    Self::default()
                }
            },
            Err(_) => {
                info!("no config file at {}, using defaults", path.display());
                Self::default()
            }
        }
    }

    /// Save current configuration to `path`
    pub fn save<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path.as_ref(), contents)?;
        info!("configuration saved to {}", path.as_ref().display());
        Ok(())
    }

    pub fn base_frame_rate(&self) -> Duration {
        Duration::from_millis(self.frames.base_frame_ms)
    }

    pub fn timing(&self) -> Timing {
        Timing {
            min_delay: Duration::from_millis(self.engine.min_delay_ms),
            missing_book_wait: Duration::from_millis(self.engine.missing_book_wait_ms),
        }
    }

    pub fn sampler_timing(&self) -> SamplerTiming {
        SamplerTiming {
            window: Duration::from_millis(self.sampler.window_ms),
            interval: Duration::from_millis(self.sampler.interval_ms),
        }
    }

    pub fn status_period(&self) -> Duration {
        Duration::from_millis(self.status.refresh_ms)
    }
}
