//! Configuration parsing, validation, and persisted settings

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use crate::constants;
use crate::error::{AppError, AppResult};
use crate::monitor::MonitorConfig;

/// Command line arguments for the screamguard application
#[derive(Parser)]
#[command(name = "screamguard")]
#[command(about = "Microphone level monitoring with warning and alarm overlays")]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Monitor a microphone and raise overlays on loud input
    Monitor(MonitorArgs),
    /// List available audio input devices
    List(ListArgs),
}

#[derive(Parser)]
pub struct MonitorArgs {
    /// Warning threshold in percent
    #[arg(long)]
    pub warning: Option<f32>,

    /// Alarm threshold in percent
    #[arg(long)]
    pub alarm: Option<f32>,

    /// Moving median window size in samples
    #[arg(long)]
    pub window: Option<usize>,

    /// Sampling interval in milliseconds
    #[arg(long)]
    pub interval: Option<u64>,

    /// Audio input device name (uses the saved or default device if not specified)
    #[arg(long)]
    pub device: Option<String>,

    /// Path to the settings file
    #[arg(long, default_value = constants::settings::FILE_NAME)]
    pub settings: PathBuf,
}

#[derive(Parser)]
pub struct ListArgs {}

/// Persisted settings; the field names keep the schema of earlier releases
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(rename = "WarningLevel")]
    pub warning_level: f32,
    #[serde(rename = "AlarmLevel")]
    pub alarm_level: f32,
    #[serde(rename = "MovingAveragePeriod")]
    pub moving_average_period: usize,
    #[serde(rename = "SamplingRate")]
    pub sampling_rate: u64,
    #[serde(rename = "MicrophoneId")]
    pub microphone_id: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            warning_level: constants::levels::DEFAULT_WARNING_LEVEL,
            alarm_level: constants::levels::DEFAULT_ALARM_LEVEL,
            moving_average_period: constants::sampling::DEFAULT_WINDOW_SIZE,
            sampling_rate: constants::sampling::DEFAULT_INTERVAL_MS,
            microphone_id: None,
        }
    }
}

impl Settings {
    /// Load settings from `path`, falling back to defaults when the file
    /// does not exist
    pub fn load(path: &Path) -> AppResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let json = fs::read_to_string(path)?;
        serde_json::from_str(&json)
            .map_err(|e| AppError::Settings(format!("failed to parse {}: {}", path.display(), e)))
    }

    /// Write settings to `path`
    pub fn save(&self, path: &Path) -> AppResult<()> {
        let json =
            serde_json::to_string_pretty(self).map_err(|e| AppError::Settings(e.to_string()))?;
        fs::write(path, json)?;
        Ok(())
    }
}

/// Validated application configuration for a monitoring session
#[derive(Debug, Clone)]
pub struct Config {
    pub warning_level: f32,
    pub alarm_level: f32,
    pub window_size: usize,
    pub sampling_interval_ms: u64,
    pub device_name: Option<String>,
    pub settings_path: PathBuf,
}

impl Config {
    /// Build configuration from monitor arguments layered over saved settings
    pub fn from_monitor_args(args: MonitorArgs) -> AppResult<Self> {
        let saved = Settings::load(&args.settings)?;

        let config = Config {
            warning_level: args.warning.unwrap_or(saved.warning_level),
            alarm_level: args.alarm.unwrap_or(saved.alarm_level),
            window_size: args.window.unwrap_or(saved.moving_average_period),
            sampling_interval_ms: args.interval.unwrap_or(saved.sampling_rate),
            device_name: args.device.or(saved.microphone_id),
            settings_path: args.settings,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> AppResult<()> {
        if !self.warning_level.is_finite() || self.warning_level < 0.0 {
            return Err(AppError::Config(format!(
                "warning level must be a non-negative percentage, got {}",
                self.warning_level
            )));
        }
        if !self.alarm_level.is_finite() || self.alarm_level < 0.0 {
            return Err(AppError::Config(format!(
                "alarm level must be a non-negative percentage, got {}",
                self.alarm_level
            )));
        }
        if self.warning_level >= self.alarm_level {
            return Err(AppError::Config(format!(
                "warning level ({}) must be below alarm level ({})",
                self.warning_level, self.alarm_level
            )));
        }
        if self.window_size == 0 {
            return Err(AppError::Config(
                "window size must be positive".to_string(),
            ));
        }
        if self.sampling_interval_ms == 0 {
            return Err(AppError::Config(
                "sampling interval must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Immutable snapshot handed to the monitoring task
    pub fn monitor_config(&self) -> MonitorConfig {
        MonitorConfig {
            warning_level: self.warning_level,
            alarm_level: self.alarm_level,
            window_size: self.window_size,
            sampling_interval: Duration::from_millis(self.sampling_interval_ms),
        }
    }

    /// Settings snapshot to persist, recording the device that was resolved
    /// for the session
    pub fn to_settings(&self, device_name: Option<String>) -> Settings {
        Settings {
            warning_level: self.warning_level,
            alarm_level: self.alarm_level,
            moving_average_period: self.window_size,
            sampling_rate: self.sampling_interval_ms,
            microphone_id: device_name.or_else(|| self.device_name.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args_with(settings: PathBuf) -> MonitorArgs {
        MonitorArgs {
            warning: None,
            alarm: None,
            window: None,
            interval: None,
            device: None,
            settings,
        }
    }

    fn missing_settings_path() -> PathBuf {
        PathBuf::from("does_not_exist_settings.json")
    }

    #[test]
    fn defaults_apply_when_no_settings_file_exists() {
        let config = Config::from_monitor_args(args_with(missing_settings_path())).unwrap();
        assert_eq!(config.warning_level, 20.0);
        assert_eq!(config.alarm_level, 30.0);
        assert_eq!(config.window_size, 20);
        assert_eq!(config.sampling_interval_ms, 100);
        assert_eq!(config.device_name, None);
    }

    #[test]
    fn flags_override_saved_settings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        Settings {
            warning_level: 10.0,
            alarm_level: 40.0,
            moving_average_period: 5,
            sampling_rate: 250,
            microphone_id: Some("Mic A".to_string()),
        }
        .save(&path)
        .unwrap();

        let mut args = args_with(path);
        args.warning = Some(15.0);
        let config = Config::from_monitor_args(args).unwrap();

        assert_eq!(config.warning_level, 15.0);
        assert_eq!(config.alarm_level, 40.0);
        assert_eq!(config.window_size, 5);
        assert_eq!(config.sampling_interval_ms, 250);
        assert_eq!(config.device_name.as_deref(), Some("Mic A"));
    }

    #[test]
    fn settings_serialize_with_pascal_case_keys() {
        let value = serde_json::to_value(Settings::default()).unwrap();
        for key in [
            "WarningLevel",
            "AlarmLevel",
            "MovingAveragePeriod",
            "SamplingRate",
            "MicrophoneId",
        ] {
            assert!(value.get(key).is_some(), "missing key {}", key);
        }
    }

    #[test]
    fn settings_round_trip_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let settings = Settings {
            warning_level: 25.0,
            alarm_level: 55.0,
            moving_average_period: 10,
            sampling_rate: 200,
            microphone_id: Some("USB Microphone".to_string()),
        };
        settings.save(&path).unwrap();
        assert_eq!(Settings::load(&path).unwrap(), settings);
    }

    #[test]
    fn zero_window_size_is_rejected() {
        let mut args = args_with(missing_settings_path());
        args.window = Some(0);
        assert!(matches!(
            Config::from_monitor_args(args),
            Err(AppError::Config(_))
        ));
    }

    #[test]
    fn zero_sampling_interval_is_rejected() {
        let mut args = args_with(missing_settings_path());
        args.interval = Some(0);
        assert!(matches!(
            Config::from_monitor_args(args),
            Err(AppError::Config(_))
        ));
    }

    #[test]
    fn inverted_thresholds_are_rejected() {
        let mut args = args_with(missing_settings_path());
        args.warning = Some(50.0);
        args.alarm = Some(30.0);
        assert!(matches!(
            Config::from_monitor_args(args),
            Err(AppError::Config(_))
        ));
    }

    #[test]
    fn monitor_config_snapshot_carries_the_interval() {
        let mut args = args_with(missing_settings_path());
        args.interval = Some(250);
        let config = Config::from_monitor_args(args).unwrap();
        let snapshot = config.monitor_config();
        assert_eq!(snapshot.sampling_interval, Duration::from_millis(250));
        assert_eq!(snapshot.window_size, 20);
    }
}
