//! Configuration loading and validation
//!
//! Configuration is a single TOML file. Every field has a built-in default, so a
//! missing or partial file is valid; only values that are present but malformed
//! are rejected.
//!
//! # Config file resolution
//!
//! 1. Command-line argument (highest priority)
//! 2. `ACCEL_CONFIG` environment variable
//! 3. `<config_dir>/accel/config.toml`
//! 4. Compiled defaults (fallback)

use crate::{time, Error, Result};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming the config file
pub const CONFIG_ENV_VAR: &str = "ACCEL_CONFIG";

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Where engine state is persisted between cycles
    #[serde(default)]
    pub storage: StorageConfig,

    /// Affinity scoring, tiering and rate limits
    #[serde(default)]
    pub acceleration: AccelerationConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// State persistence configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// JSON state file, loaded at cycle start and saved at cycle end
    #[serde(default = "default_state_path")]
    pub state_path: PathBuf,

    /// Directory holding the file-backed collaborators (history, labels, outbox)
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            state_path: default_state_path(),
            data_dir: default_data_dir(),
        }
    }
}

/// One row of the tier table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierSpec {
    /// Minimum affinity ratio (inclusive) for this tier
    pub min_ratio: f64,
    /// Display name written into the label
    pub name: String,
}

impl TierSpec {
    pub fn new(min_ratio: f64, name: &str) -> Self {
        Self {
            min_ratio,
            name: name.to_string(),
        }
    }
}

/// Acceleration feature settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AccelerationConfig {
    /// Global feature switch
    pub enabled: bool,

    /// Communities whose karma counts toward affinity (matched case-insensitively)
    pub topic_communities: Vec<String>,

    /// Max items scanned per stream for opted-in users
    pub scan_limit: usize,

    /// Max items scanned per stream for background checks
    pub background_scan_limit: usize,

    /// Min days between recalculations for opted-in users
    pub refresh_days: u32,

    /// Min days between background scans of the same user
    pub background_refresh_days: u32,

    /// Max queue entries drained per cycle
    pub max_scans_per_cycle: usize,

    /// Treat every opted-in user as due on the next refresh
    pub force_refresh: bool,

    /// Tier table, strictly descending by `min_ratio`
    pub tiers: Vec<TierSpec>,

    /// Tier for a ratio of zero or below
    pub zero_tier: String,

    /// Moderators are alerted when topic karma is strictly below this
    pub alert_threshold: i64,

    /// Compute and record state without writing labels or sending notices
    pub dry_run: bool,
}

impl Default for AccelerationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            topic_communities: [
                "accelerate",
                "ProAI",
                "TheMachineGod",
                "DefendingAIArt",
                "aiArt",
                "aivideos",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            scan_limit: 1000,
            background_scan_limit: 500,
            refresh_days: 7,
            background_refresh_days: 30,
            max_scans_per_cycle: 1,
            force_refresh: false,
            tiers: default_tiers(),
            zero_tier: "Stationary".to_string(),
            alert_threshold: -50,
            dry_run: false,
        }
    }
}

impl AccelerationConfig {
    /// Refresh interval for opted-in users
    pub fn refresh_ttl(&self) -> Duration {
        time::days(self.refresh_days)
    }

    /// Rescan interval for background-scanned users
    pub fn background_refresh_ttl(&self) -> Duration {
        time::days(self.background_refresh_days)
    }

    /// Check internal consistency of the settings
    pub fn validate(&self) -> Result<()> {
        if self.tiers.is_empty() {
            return Err(Error::Config("tier table must not be empty".to_string()));
        }
        for tier in &self.tiers {
            if !(tier.min_ratio > 0.0 && tier.min_ratio <= 1.0) {
                return Err(Error::Config(format!(
                    "tier '{}' threshold {} outside (0, 1]",
                    tier.name, tier.min_ratio
                )));
            }
            check_label_name("tier", &tier.name)?;
        }
        for pair in self.tiers.windows(2) {
            if pair[1].min_ratio >= pair[0].min_ratio {
                return Err(Error::Config(format!(
                    "tier thresholds must be strictly descending ('{}' {} then '{}' {})",
                    pair[0].name, pair[0].min_ratio, pair[1].name, pair[1].min_ratio
                )));
            }
        }
        check_label_name("zero_tier", &self.zero_tier)?;
        if self.scan_limit == 0 || self.background_scan_limit == 0 {
            return Err(Error::Config("scan limits must be greater than zero".to_string()));
        }
        if self.topic_communities.is_empty() {
            warn!("No topic communities configured; every user will score zero affinity");
        }
        Ok(())
    }
}

impl Config {
    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.acceleration.validate()?;
        Ok(config)
    }

    /// Load configuration from an explicit file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        let config = Self::from_toml_str(&content)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Resolve the config file per priority order and load it
    ///
    /// Explicit paths (CLI or environment) must exist. The per-user default
    /// location is optional; when absent, compiled defaults are used.
    pub fn resolve(cli_arg: Option<&Path>) -> Result<Self> {
        if let Some(path) = cli_arg {
            return Self::load(path);
        }

        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            return Self::load(Path::new(&path));
        }

        if let Some(path) = default_config_file() {
            if path.exists() {
                return Self::load(&path);
            }
        }

        warn!("No config file found, using compiled defaults");
        Ok(Self::default())
    }
}

/// Tier names end up inside a `key: value | ...` label and must survive a
/// split on `|` and `:` with trimming
fn check_label_name(field: &str, name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::Config(format!("{} name must not be empty", field)));
    }
    if name.trim() != name {
        return Err(Error::Config(format!(
            "{} name '{}' has leading or trailing whitespace",
            field, name
        )));
    }
    if name.contains(|c| c == '|' || c == ':') {
        return Err(Error::Config(format!(
            "{} name '{}' must not contain '|' or ':'",
            field, name
        )));
    }
    Ok(())
}

/// Per-user default config file location for the platform
pub fn default_config_file() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("accel").join("config.toml"))
}

/// Tier table used when none is configured
pub fn default_tiers() -> Vec<TierSpec> {
    vec![
        TierSpec::new(0.90, "Light-speed"),
        TierSpec::new(0.70, "Hypersonic"),
        TierSpec::new(0.50, "Supersonic"),
        TierSpec::new(0.30, "Speeding"),
        TierSpec::new(0.15, "Cruising"),
        TierSpec::new(0.01, "Crawling"),
    ]
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_state_path() -> PathBuf {
    PathBuf::from("accel_state.json")
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("accel_data")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let config = AccelerationConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.tiers.len(), 6);
        assert_eq!(config.zero_tier, "Stationary");
        assert_eq!(config.alert_threshold, -50);
    }

    #[test]
    fn test_ttls_in_days() {
        let config = AccelerationConfig::default();
        assert_eq!(config.refresh_ttl(), Duration::days(7));
        assert_eq!(config.background_refresh_ttl(), Duration::days(30));
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.storage.state_path, PathBuf::from("accel_state.json"));
        assert_eq!(config.acceleration.scan_limit, 1000);
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        let config = Config::from_toml_str(
            r#"
            [acceleration]
            max_scans_per_cycle = 5
            "#,
        )
        .unwrap();
        assert_eq!(config.acceleration.max_scans_per_cycle, 5);
        assert_eq!(config.acceleration.background_scan_limit, 500);
        assert!(config.acceleration.enabled);
    }

    #[test]
    fn test_rejects_non_descending_tiers() {
        let mut config = AccelerationConfig::default();
        config.tiers = vec![TierSpec::new(0.5, "A"), TierSpec::new(0.5, "B")];
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_rejects_threshold_out_of_range() {
        let mut config = AccelerationConfig::default();
        config.tiers = vec![TierSpec::new(1.5, "Over")];
        assert!(config.validate().is_err());

        config.tiers = vec![TierSpec::new(0.0, "Zero")];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_empty_tier_table() {
        let mut config = AccelerationConfig::default();
        config.tiers.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_scan_limit() {
        let mut config = AccelerationConfig::default();
        config.background_scan_limit = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_delimiter_in_tier_name() {
        let mut config = AccelerationConfig::default();
        config.tiers[0].name = "Fast|Loud".to_string();
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        config.tiers[0].name = "Fast: Loud".to_string();
        assert!(config.validate().is_err());

        config.tiers[0].name = "Fast ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_delimiter_in_zero_tier() {
        let mut config = AccelerationConfig::default();
        config.zero_tier = "Still | Parked".to_string();
        assert!(config.validate().is_err());

        config.zero_tier = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_drain_budget_allowed() {
        let mut config = AccelerationConfig::default();
        config.max_scans_per_cycle = 0;
        assert!(config.validate().is_ok());
    }
}
