//! Application configuration management.
//!
//! Settings that rarely change live in `~/.config/runscout/config.json`:
//! the region base URL, the milestone interval for the CSV export, the
//! politeness delay bounds, and an optional cache directory override.
//! Everything per-invocation (location, radius, person) comes from the CLI.

use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Application name used for config/cache directory paths
const APP_NAME: &str = "runscout";

/// Config file name
const CONFIG_FILE: &str = "config.json";

fn default_base_url() -> String {
    "https://www.parkrun.org.uk".to_string()
}

fn default_milestone_interval() -> u32 {
    50
}

fn default_min_delay_ms() -> u64 {
    800
}

fn default_max_delay_ms() -> u64 {
    2000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Region base URL; also defines the canonical regional subset.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Occurrence numbers divisible by this are milestones.
    #[serde(default = "default_milestone_interval")]
    pub milestone_interval: u32,

    /// Bounds for the randomized delay between consecutive fetches.
    #[serde(default = "default_min_delay_ms")]
    pub min_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Override for the cache directory; defaults to the platform cache dir.
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            milestone_interval: default_milestone_interval(),
            min_delay_ms: default_min_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            cache_dir: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            Ok(serde_json::from_str(&contents)?)
        } else {
            Ok(Self::default())
        }
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        if let Some(ref dir) = self.cache_dir {
            return Ok(dir.clone());
        }
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }
}
