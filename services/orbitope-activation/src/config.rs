use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use crate::detectors::colorcomp::ComponentStrategy;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub handlers: HandlersConfig,
    #[serde(default)]
    pub colorcomp: ColorCompConfig,
    #[serde(default)]
    pub suborbitope: SuborbitopeConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_filter")]
    pub filter: String,
}

/// Which built-in handlers get included.
#[derive(Debug, Clone, Deserialize)]
pub struct HandlersConfig {
    #[serde(default = "default_true")]
    pub colorcomp: bool,
    #[serde(default = "default_true")]
    pub makespan: bool,
    #[serde(default = "default_true")]
    pub suborbitope: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ColorCompConfig {
    #[serde(default = "default_false")]
    pub all_color_pairs: bool,
    #[serde(default)]
    pub strategy: ComponentStrategy,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SuborbitopeConfig {
    #[serde(default = "default_tower_height")]
    pub zero_height: usize,
    #[serde(default = "default_tower_height")]
    pub one_height: usize,
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config from {:?}", path.as_ref()))?;
        let config: Config = toml::from_str(&content)
            .context("Failed to parse config TOML")?;
        Ok(config)
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
        }
    }
}

impl Default for HandlersConfig {
    fn default() -> Self {
        Self {
            colorcomp: true,
            makespan: true,
            suborbitope: true,
        }
    }
}

impl Default for ColorCompConfig {
    fn default() -> Self {
        Self {
            all_color_pairs: false,
            strategy: ComponentStrategy::Default,
        }
    }
}

impl Default for SuborbitopeConfig {
    fn default() -> Self {
        Self {
            zero_height: default_tower_height(),
            one_height: default_tower_height(),
        }
    }
}

fn default_filter() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_false() -> bool {
    false
}

fn default_tower_height() -> usize {
    2
}
