//! TOML-based engine configuration.
//!
//! Stores:
//! - Working hours and the fixed UTC offset used to resolve day windows
//! - Priority scorer weights
//! - Calendar sync settings
//!
//! Configuration is stored at `~/.config/timeblock/config.toml`.

use std::path::{Path, PathBuf};

use chrono::{Duration, FixedOffset};
use serde::{Deserialize, Serialize};

use super::data_dir;
use crate::error::ConfigError;
use crate::sync::{ReconcilerConfig, DEFAULT_API_BASE};
use crate::timeline::{parse_hhmm, PriorityWeights, WorkingHours};

/// Working-day configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Local start of the working day, `HH:MM`
    #[serde(default = "default_day_start")]
    pub day_start: String,
    /// Local end of the working day, `HH:MM`; earlier than `day_start` means next day
    #[serde(default = "default_day_end")]
    pub day_end: String,
    /// Fixed offset of local time from UTC, in minutes
    #[serde(default)]
    pub utc_offset_minutes: i32,
    /// Smallest gap worth reporting as a free slot
    #[serde(default = "default_min_slot_minutes")]
    pub min_slot_minutes: i64,
}

/// Calendar sync configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default = "default_calendar_id")]
    pub calendar_id: String,
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_token_expiry_warning_secs")]
    pub token_expiry_warning_secs: i64,
    /// Delete owned remote events whose block no longer exists
    #[serde(default)]
    pub prune_missing: bool,
}

/// Engine configuration.
///
/// Serialized to/from TOML at `~/.config/timeblock/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub priority: PriorityWeights,
    #[serde(default)]
    pub sync: SyncConfig,
}

// Default functions
fn default_day_start() -> String {
    "08:00".into()
}
fn default_day_end() -> String {
    "18:00".into()
}
fn default_min_slot_minutes() -> i64 {
    15
}
fn default_calendar_id() -> String {
    "primary".into()
}
fn default_api_base_url() -> String {
    DEFAULT_API_BASE.into()
}
fn default_timeout_secs() -> u64 {
    15
}
fn default_token_expiry_warning_secs() -> i64 {
    300
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            day_start: default_day_start(),
            day_end: default_day_end(),
            utc_offset_minutes: 0,
            min_slot_minutes: default_min_slot_minutes(),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            calendar_id: default_calendar_id(),
            api_base_url: default_api_base_url(),
            timeout_secs: default_timeout_secs(),
            token_expiry_warning_secs: default_token_expiry_warning_secs(),
            prune_missing: false,
        }
    }
}

impl ScheduleConfig {
    /// Resolve the configured working hours.
    ///
    /// # Errors
    /// [`ConfigError::InvalidValue`] for a malformed time or an offset outside ±24h.
    pub fn working_hours(&self) -> Result<WorkingHours, ConfigError> {
        let day_start = parse_hhmm(&self.day_start)
            .ok_or_else(|| invalid("schedule.day_start", format!("'{}' is not HH:MM", self.day_start)))?;
        let day_end = parse_hhmm(&self.day_end)
            .ok_or_else(|| invalid("schedule.day_end", format!("'{}' is not HH:MM", self.day_end)))?;
        let offset = FixedOffset::east_opt(self.utc_offset_minutes * 60).ok_or_else(|| {
            invalid(
                "schedule.utc_offset_minutes",
                format!("{} is out of range", self.utc_offset_minutes),
            )
        })?;
        Ok(WorkingHours::new(day_start, day_end, offset))
    }

    pub fn min_slot(&self) -> Duration {
        Duration::minutes(self.min_slot_minutes.max(0))
    }
}

impl SyncConfig {
    pub fn reconciler_config(&self) -> ReconcilerConfig {
        ReconcilerConfig::default()
            .with_calendar_id(self.calendar_id.clone())
            .with_timeout(std::time::Duration::from_secs(self.timeout_secs))
            .with_token_expiry_warning(Duration::seconds(self.token_expiry_warning_secs))
    }
}

fn invalid(key: &str, message: String) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        message,
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let mut parts = key.split('.').peekable();
        if key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_some() {
                current = current.get_mut(part).ok_or_else(unknown)?;
                continue;
            }

            let obj = current.as_object_mut().ok_or_else(unknown)?;
            let existing = obj.get(part).ok_or_else(unknown)?;
            let new_value = match existing {
                serde_json::Value::Bool(_) => value
                    .parse::<bool>()
                    .map(serde_json::Value::Bool)
                    .map_err(|e| invalid(key, e.to_string()))?,
                serde_json::Value::Number(_) => parse_number(value)
                    .ok_or_else(|| invalid(key, format!("cannot parse '{value}' as number")))?,
                serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                    serde_json::from_str(value).map_err(|e| invalid(key, e.to_string()))?
                }
                _ => serde_json::Value::String(value.into()),
            };
            obj.insert(part.to_string(), new_value);
            return Ok(());
        }

        Err(unknown())
    }

    fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the data directory, or defaults if no file exists yet.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    /// Load from a specific file, or defaults if it does not exist.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let load_failed = |message: String| ConfigError::LoadFailed {
            path: path.to_path_buf(),
            message,
        };

        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: Config = toml::from_str(&content).map_err(|e| load_failed(e.to_string()))?;
                cfg.validate()?;
                Ok(cfg)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(load_failed(e.to_string())),
        }
    }

    /// Persist to the data directory.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    /// Persist to a specific file as pretty TOML.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by dot-separated key. Does not save.
    ///
    /// # Errors
    /// Unknown key, unparsable value, or a value that fails validation. The
    /// config is unchanged on error.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json = serde_json::to_value(&*self).map_err(|e| invalid(key, e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json).map_err(|e| invalid(key, e.to_string()))?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Check values that serde alone cannot.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.schedule.working_hours()?;
        if self.sync.timeout_secs == 0 {
            return Err(invalid("sync.timeout_secs", "must be at least 1".into()));
        }
        url::Url::parse(&self.sync.api_base_url)
            .map_err(|e| invalid("sync.api_base_url", e.to_string()))?;
        Ok(())
    }

    /// Load from disk, returning defaults on error.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }
}

fn parse_number(value: &str) -> Option<serde_json::Value> {
    if let Ok(n) = value.parse::<i64>() {
        return Some(serde_json::Value::Number(n.into()));
    }
    value
        .parse::<f64>()
        .ok()
        .and_then(serde_json::Number::from_f64)
        .map(serde_json::Value::Number)
}
