// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Application settings.
//!
//! Settings live in one YAML file. Every field has a default, so a partial
//! or missing file still yields a usable configuration.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::Level;

use crate::storage::SavePolicy;

/// Directory name used under the platform config and data dirs
pub const APP_DIR: &str = "scoreplay";

/// Root settings file
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    /// Where scores and their files live
    #[serde(default)]
    pub storage: StorageSettings,
    /// Transport tunables
    #[serde(default)]
    pub playback: PlaybackSettings,
    /// Transient messages
    #[serde(default)]
    pub notices: NoticeSettings,
    /// Log output
    #[serde(default)]
    pub logging: LoggingSettings,
}

impl Settings {
    /// Load settings from a YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read settings file: {:?}", path.as_ref()))?;
        Self::from_yaml(&contents)
    }

    /// Load settings, falling back to defaults when the file does not exist
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse settings from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let settings: Self = serde_yaml::from_str(yaml).context("Failed to parse YAML settings")?;
        settings
            .playback
            .validate()
            .context("Invalid playback settings")?;
        Ok(settings)
    }

    /// Serialize to a YAML string
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Failed to serialize settings to YAML")
    }

    /// Save settings to a YAML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml = self.to_yaml()?;
        fs::write(path.as_ref(), yaml)
            .with_context(|| format!("Failed to write settings file: {:?}", path.as_ref()))
    }

    /// Platform default location of the settings file
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
            .join("settings.yaml")
    }
}

/// Storage locations and save timing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StorageSettings {
    /// Directory holding imported files and the library
    #[serde(default = "default_root")]
    pub root: PathBuf,
    /// Library file name inside `root`
    #[serde(default = "default_library_file")]
    pub library_file: String,
    /// When library changes are written
    #[serde(default)]
    pub save_policy: SavePolicy,
}

fn default_root() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}
fn default_library_file() -> String {
    "scores.json".to_string()
}

impl StorageSettings {
    /// Full path of the library file
    pub fn library_path(&self) -> PathBuf {
        self.root.join(&self.library_file)
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            root: default_root(),
            library_file: default_library_file(),
            save_policy: SavePolicy::default(),
        }
    }
}

/// Transport tunables
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlaybackSettings {
    /// Position polling interval
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Loop wraps this long before the loop end
    #[serde(default = "default_loop_preroll_secs")]
    pub loop_preroll_secs: f64,
    /// Nothing playing below this position counts as the natural end
    #[serde(default = "default_end_detect_secs")]
    pub end_detect_secs: f64,
    /// Shortest loop region enforced while looping
    #[serde(default = "default_min_loop_secs")]
    pub min_loop_secs: f64,
    #[serde(default = "default_rate_min")]
    pub rate_min: f64,
    #[serde(default = "default_rate_max")]
    pub rate_max: f64,
    #[serde(default = "default_rate_step")]
    pub rate_step: f64,
}

fn default_poll_interval_ms() -> u64 {
    200
}
fn default_loop_preroll_secs() -> f64 {
    0.3
}
fn default_end_detect_secs() -> f64 {
    0.05
}
fn default_min_loop_secs() -> f64 {
    0.5
}
fn default_rate_min() -> f64 {
    0.5
}
fn default_rate_max() -> f64 {
    1.5
}
fn default_rate_step() -> f64 {
    0.1
}

impl PlaybackSettings {
    /// Polling interval as a duration, never zero
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    /// Check the tunables for values the transport cannot run with
    pub fn validate(&self) -> Result<()> {
        if !self.rate_min.is_finite() || !self.rate_max.is_finite() {
            bail!("rate bounds must be finite");
        }
        if self.rate_min <= 0.0 || self.rate_min > self.rate_max {
            bail!(
                "rate range {}..{} must be positive and ordered",
                self.rate_min,
                self.rate_max
            );
        }
        if !self.rate_step.is_finite() || self.rate_step <= 0.0 {
            bail!("rate_step must be positive, got {}", self.rate_step);
        }
        for (name, value) in [
            ("loop_preroll_secs", self.loop_preroll_secs),
            ("end_detect_secs", self.end_detect_secs),
            ("min_loop_secs", self.min_loop_secs),
        ] {
            if !value.is_finite() || value < 0.0 {
                bail!("{} must be a non-negative number, got {}", name, value);
            }
        }
        if self.min_loop_secs <= self.loop_preroll_secs {
            bail!(
                "min_loop_secs ({}) must exceed loop_preroll_secs ({})",
                self.min_loop_secs,
                self.loop_preroll_secs
            );
        }
        Ok(())
    }

    /// Clamp `rate` to the allowed range and snap it to the rate step.
    ///
    /// Bounds given in the wrong order are swapped; with no usable bound the
    /// rate is left at 1.0.
    pub fn snap_rate(&self, rate: f64) -> f64 {
        let lo = self.rate_min.min(self.rate_max);
        let hi = self.rate_min.max(self.rate_max);
        if lo.is_nan() {
            return 1.0;
        }
        let rate = rate.clamp(lo, hi);
        if !self.rate_step.is_finite() || self.rate_step <= 0.0 {
            return rate;
        }
        let steps = ((rate - lo) / self.rate_step).round();
        let snapped = (lo + steps * self.rate_step).clamp(lo, hi);
        // Drop float noise like 1.2000000000000002
        (snapped * 1e6).round() / 1e6
    }
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            loop_preroll_secs: default_loop_preroll_secs(),
            end_detect_secs: default_end_detect_secs(),
            min_loop_secs: default_min_loop_secs(),
            rate_min: default_rate_min(),
            rate_max: default_rate_max(),
            rate_step: default_rate_step(),
        }
    }
}

/// Transient message settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NoticeSettings {
    /// How long a notice stays up
    #[serde(default = "default_display_ms")]
    pub display_ms: u64,
}

fn default_display_ms() -> u64 {
    1500
}

impl NoticeSettings {
    pub fn display_time(&self) -> Duration {
        Duration::from_millis(self.display_ms)
    }
}

impl Default for NoticeSettings {
    fn default() -> Self {
        Self {
            display_ms: default_display_ms(),
        }
    }
}

/// Log output settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingSettings {
    /// One of trace, debug, info, warn, error
    #[serde(default = "default_level")]
    pub level: String,
}

fn default_level() -> String {
    "info".to_string()
}

impl LoggingSettings {
    /// Parsed log level
    pub fn level(&self) -> Result<Level> {
        self.level
            .parse::<Level>()
            .with_context(|| format!("Unknown log level: {}", self.level))
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_parse_full_settings() {
        let yaml = r#"
storage:
  root: /srv/scores
  library_file: library.json
  save_policy:
    mode: write_through

playback:
  poll_interval_ms: 100
  loop_preroll_secs: 0.2
  min_loop_secs: 1.0

notices:
  display_ms: 3000

logging:
  level: debug
"#;

        let settings = Settings::from_yaml(yaml).unwrap();
        assert_eq!(settings.storage.library_path(), PathBuf::from("/srv/scores/library.json"));
        assert_eq!(settings.storage.save_policy, SavePolicy::WriteThrough);
        assert_eq!(settings.playback.poll_interval(), Duration::from_millis(100));
        assert_eq!(settings.playback.loop_preroll_secs, 0.2);
        assert_eq!(settings.playback.rate_max, 1.5);
        assert_eq!(settings.notices.display_ms, 3000);
        assert_eq!(settings.logging.level().unwrap(), Level::DEBUG);
    }

    #[test]
    fn test_default_values() {
        let settings = Settings::from_yaml("{}").unwrap();
        assert_eq!(settings.storage.library_file, "scores.json");
        assert_eq!(
            settings.storage.save_policy,
            SavePolicy::Debounced { delay_ms: 500 }
        );
        assert_eq!(settings.playback, PlaybackSettings::default());
        assert_eq!(settings.playback.poll_interval_ms, 200);
        assert_eq!(settings.notices.display_ms, 1500);
        assert_eq!(settings.logging.level().unwrap(), Level::INFO);
    }

    #[test]
    fn test_debounced_policy() {
        let yaml = r#"
storage:
  save_policy:
    mode: debounced
    delay_ms: 250
"#;
        let settings = Settings::from_yaml(yaml).unwrap();
        assert_eq!(
            settings.storage.save_policy,
            SavePolicy::Debounced { delay_ms: 250 }
        );
    }

    #[test]
    fn test_snap_rate() {
        let playback = PlaybackSettings::default();
        assert_eq!(playback.snap_rate(2.0), 1.5);
        assert_eq!(playback.snap_rate(0.1), 0.5);
        assert_eq!(playback.snap_rate(1.0), 1.0);
        assert_eq!(playback.snap_rate(1.23), 1.2);
        assert_eq!(playback.snap_rate(0.76), 0.8);
    }

    #[test]
    fn test_inverted_rate_range_is_rejected() {
        let err = Settings::from_yaml("playback:\n  rate_min: 1.5\n  rate_max: 0.5\n");
        assert!(err.is_err());
        assert!(Settings::from_yaml("playback:\n  rate_step: 0\n").is_err());
        assert!(Settings::from_yaml("playback:\n  rate_max: .nan\n").is_err());
        assert!(Settings::from_yaml("playback:\n  loop_preroll_secs: -1.0\n").is_err());
        assert!(Settings::from_yaml("playback:\n  min_loop_secs: 0.2\n").is_err());
    }

    #[test]
    fn test_snap_rate_survives_bad_bounds() {
        let playback = PlaybackSettings {
            rate_min: 1.5,
            rate_max: 0.5,
            ..Default::default()
        };
        assert_eq!(playback.snap_rate(1.0), 1.0);
        assert_eq!(playback.snap_rate(3.0), 1.5);

        let playback = PlaybackSettings {
            rate_min: f64::NAN,
            rate_max: f64::NAN,
            rate_step: 0.0,
            ..Default::default()
        };
        assert_eq!(playback.snap_rate(1.2), 1.0);
    }

    #[test]
    fn test_bad_level_is_error() {
        let logging = LoggingSettings {
            level: "chatty".to_string(),
        };
        assert!(logging.level().is_err());
    }

    #[test]
    fn test_round_trip_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.yaml");

        let mut original = Settings::default();
        original.storage.root = dir.path().to_path_buf();
        original.playback.rate_step = 0.05;
        original.save(&path).unwrap();

        let loaded = Settings::load(&path).unwrap();
        assert_eq!(loaded, original);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let settings = Settings::load_or_default(dir.path().join("absent.yaml")).unwrap();
        assert_eq!(settings.playback, PlaybackSettings::default());
        assert!(Settings::load(dir.path().join("absent.yaml")).is_err());
    }

    #[test]
    fn test_invalid_yaml_is_error() {
        assert!(Settings::from_yaml("storage: [").is_err());
    }
}
