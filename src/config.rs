//! Configuration for the churn driver

use std::fs;
use std::path::Path;
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::ecs::MAX_ENTITIES;

/// Settings for a deterministic churn run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StressConfig {
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default = "default_ticks")]
    pub ticks: u64,
    #[serde(default = "default_spawn_per_tick")]
    pub spawn_per_tick: u32,
    #[serde(default = "default_despawn_chance")]
    pub despawn_chance: f64,
    #[serde(default = "default_toggle_chance")]
    pub component_toggle_chance: f64,
    #[serde(default = "default_max_live")]
    pub max_live: u32,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_seed() -> u64 {
    7
}

fn default_ticks() -> u64 {
    120
}

fn default_spawn_per_tick() -> u32 {
    64
}

fn default_despawn_chance() -> f64 {
    0.05
}

fn default_toggle_chance() -> f64 {
    0.1
}

fn default_max_live() -> u32 {
    4_000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            ticks: default_ticks(),
            spawn_per_tick: default_spawn_per_tick(),
            despawn_chance: default_despawn_chance(),
            component_toggle_chance: default_toggle_chance(),
            max_live: default_max_live(),
            logging: LoggingConfig::default(),
        }
    }
}

impl StressConfig {
    /// Load configuration from YAML file
    pub fn from_yaml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        contents
            .parse::<Self>()
            .with_context(|| format!("failed to load config {}", path.display()))
    }

    /// Save configuration to YAML file
    pub fn to_yaml<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        fs::write(path.as_ref(), yaml)
            .with_context(|| format!("failed to write config {}", path.as_ref().display()))?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        for (name, chance) in [
            ("despawn_chance", self.despawn_chance),
            ("component_toggle_chance", self.component_toggle_chance),
        ] {
            if !(0.0..=1.0).contains(&chance) {
                bail!("{name} must be within [0, 1], got {chance}");
            }
        }
        if self.max_live == 0 || self.max_live > MAX_ENTITIES {
            bail!("max_live must be within [1, {MAX_ENTITIES}], got {}", self.max_live);
        }
        Ok(())
    }
}

impl FromStr for StressConfig {
    type Err = anyhow::Error;

    /// Parse YAML text and validate it.
    fn from_str(text: &str) -> Result<Self> {
        let config: StressConfig = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_missing_fields() {
        let config = StressConfig::from_str("seed: 99\nticks: 5\n").unwrap();

        assert_eq!(config.seed, 99);
        assert_eq!(config.ticks, 5);
        assert_eq!(config.spawn_per_tick, 64);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        assert!(StressConfig::from_str("despawn_chance: 1.5\n").is_err());
        assert!(StressConfig::from_str("max_live: 0\n").is_err());
        assert!(StressConfig::from_str(&format!("max_live: {}\n", MAX_ENTITIES + 1)).is_err());
        assert!(StressConfig::default().validate().is_ok());
    }

    #[test]
    fn test_parses_through_from_str() {
        let config: StressConfig = "seed: 3\nlogging:\n  level: debug\n".parse().unwrap();
        assert_eq!(config.seed, 3);
        assert_eq!(config.logging.level, "debug");
        assert!("ticks: [1, 2]\n".parse::<StressConfig>().is_err());
    }
}
