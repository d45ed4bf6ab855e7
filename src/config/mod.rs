//! Configuration loading and validation.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

use crate::analysis::MAX_WEEKS;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Default report sizes, used when a request leaves them out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default = "default_blade_limit")]
    pub blade_limit: usize,

    #[serde(default = "default_blade_min_uses")]
    pub blade_min_uses: u32,

    #[serde(default = "default_combo_limit")]
    pub combo_limit: usize,

    #[serde(default = "default_combo_min_uses")]
    pub combo_min_uses: u32,

    #[serde(default = "default_part_limit")]
    pub part_limit: usize,

    #[serde(default = "default_part_min_uses")]
    pub part_min_uses: u32,

    /// Combos listed per blade
    #[serde(default = "default_blade_combo_limit")]
    pub blade_combo_limit: usize,

    /// Window of the meta snapshot in days
    #[serde(default = "default_snapshot_days")]
    pub snapshot_days: i64,

    #[serde(default = "default_distribution_top")]
    pub distribution_top: usize,

    #[serde(default = "default_share_top")]
    pub share_top: usize,

    #[serde(default = "default_evolution_top")]
    pub evolution_top: usize,

    #[serde(default = "default_sparkline_weeks")]
    pub sparkline_weeks: usize,
}

fn default_blade_limit() -> usize {
    20
}

fn default_blade_min_uses() -> u32 {
    3
}

fn default_combo_limit() -> usize {
    20
}

fn default_combo_min_uses() -> u32 {
    2
}

fn default_part_limit() -> usize {
    15
}

fn default_part_min_uses() -> u32 {
    3
}

fn default_blade_combo_limit() -> usize {
    10
}

fn default_snapshot_days() -> i64 {
    30
}

fn default_distribution_top() -> usize {
    8
}

fn default_share_top() -> usize {
    6
}

fn default_evolution_top() -> usize {
    8
}

fn default_sparkline_weeks() -> usize {
    8
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            blade_limit: default_blade_limit(),
            blade_min_uses: default_blade_min_uses(),
            combo_limit: default_combo_limit(),
            combo_min_uses: default_combo_min_uses(),
            part_limit: default_part_limit(),
            part_min_uses: default_part_min_uses(),
            blade_combo_limit: default_blade_combo_limit(),
            snapshot_days: default_snapshot_days(),
            distribution_top: default_distribution_top(),
            share_top: default_share_top(),
            evolution_top: default_evolution_top(),
            sparkline_weeks: default_sparkline_weeks(),
        }
    }
}

impl AnalysisConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        let limits = [
            ("blade_limit", self.blade_limit),
            ("combo_limit", self.combo_limit),
            ("part_limit", self.part_limit),
            ("blade_combo_limit", self.blade_combo_limit),
            ("distribution_top", self.distribution_top),
            ("share_top", self.share_top),
            ("evolution_top", self.evolution_top),
            ("sparkline_weeks", self.sparkline_weeks),
        ];
        if let Some((name, _)) = limits.iter().find(|(_, value)| *value == 0) {
            return Err(ConfigError::ValidationError(format!(
                "analysis.{} must be greater than 0",
                name
            )));
        }

        if self.sparkline_weeks > MAX_WEEKS {
            return Err(ConfigError::ValidationError(format!(
                "analysis.sparkline_weeks must be at most {}",
                MAX_WEEKS
            )));
        }

        if self.snapshot_days <= 0 {
            return Err(ConfigError::ValidationError(
                "analysis.snapshot_days must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_cors_origin() -> String {
    "*".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origin: default_cors_origin(),
        }
    }
}

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Fixed "today" for recency weighting; the current date when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_date: Option<NaiveDate>,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub analysis: AnalysisConfig,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            log_level: default_log_level(),
            reference_date: None,
            server: ServerConfig::default(),
            analysis: AnalysisConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &PathBuf) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::ValidationError(
                "Server port must be greater than 0".to_string(),
            ));
        }

        self.analysis.validate()
    }
}
