//! Core configuration.
//!
//! # Responsibility
//! - Carry reminder defaults and the host UTC offset into the core.
//! - Parse host-provided JSON with per-field defaults.
//!
//! # Invariants
//! - A config that passed `validate()` yields a valid `FixedOffset` and
//!   retry defaults accepted by `Task::validate()`.

use crate::logging::LoggingConfig;
use crate::model::task::{DEFAULT_MAX_RETRIES, DEFAULT_RETRY_INTERVAL_HOURS, MAX_RETRIES_LIMIT};
use crate::schedule::recurrence::utc_offset;
use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;

/// Longest default retry interval offered to users.
pub const MAX_DEFAULT_RETRY_INTERVAL_HOURS: u32 = 12;

const DEFAULT_NOTIFICATION_TITLE: &str = "Todo Reminder";

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(serde_json::Error),
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "failed to read config: {err}"),
            Self::Parse(err) => write!(f, "failed to parse config: {err}"),
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Parse(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value)
    }
}

/// Reminder policy defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReminderConfig {
    /// Applied when a new task omits `max_retries`.
    pub default_max_retries: u32,
    /// Applied when a new task omits `retry_interval_hours`.
    pub default_retry_interval_hours: u32,
    /// Host wall-clock offset for weekly/monthly calendar steps.
    pub utc_offset_minutes: i32,
    /// Notification heading; the body is the task title.
    pub notification_title: String,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            default_max_retries: DEFAULT_MAX_RETRIES,
            default_retry_interval_hours: DEFAULT_RETRY_INTERVAL_HOURS,
            utc_offset_minutes: 0,
            notification_title: DEFAULT_NOTIFICATION_TITLE.to_string(),
        }
    }
}

impl ReminderConfig {
    /// Checks bounds.
    ///
    /// # Errors
    /// - `ConfigError::Invalid` naming the first out-of-range field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_max_retries > MAX_RETRIES_LIMIT {
            return Err(ConfigError::Invalid(format!(
                "default_max_retries must be <= {MAX_RETRIES_LIMIT}, got {}",
                self.default_max_retries
            )));
        }
        if !(1..=MAX_DEFAULT_RETRY_INTERVAL_HOURS).contains(&self.default_retry_interval_hours) {
            return Err(ConfigError::Invalid(format!(
                "default_retry_interval_hours must be within 1..={MAX_DEFAULT_RETRY_INTERVAL_HOURS}, got {}",
                self.default_retry_interval_hours
            )));
        }
        if self.notification_title.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "notification_title cannot be blank".to_string(),
            ));
        }
        self.offset()?;
        Ok(())
    }

    /// Returns the configured calendar offset.
    pub fn offset(&self) -> Result<FixedOffset, ConfigError> {
        utc_offset(self.utc_offset_minutes).map_err(|err| ConfigError::Invalid(err.to_string()))
    }
}

/// Top-level core configuration document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub reminder: ReminderConfig,
    /// File logging; hosts that own their log sink leave this out.
    pub logging: Option<LoggingConfig>,
}

impl CoreConfig {
    /// Parses and validates a JSON config document.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.reminder.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON config file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, CoreConfig, ReminderConfig};

    #[test]
    fn empty_document_uses_defaults() {
        let config = CoreConfig::from_json_str("{}").expect("empty config should parse");
        assert_eq!(config.reminder, ReminderConfig::default());
        assert_eq!(config.reminder.default_max_retries, 3);
        assert_eq!(config.reminder.default_retry_interval_hours, 1);
        assert!(config.logging.is_none());
    }

    #[test]
    fn partial_reminder_section_keeps_other_defaults() {
        let config =
            CoreConfig::from_json_str(r#"{"reminder":{"utc_offset_minutes":-300}}"#).unwrap();
        assert_eq!(config.reminder.utc_offset_minutes, -300);
        assert_eq!(config.reminder.notification_title, "Todo Reminder");
        assert_eq!(
            config.reminder.offset().unwrap().local_minus_utc(),
            -300 * 60
        );
    }

    #[test]
    fn rejects_out_of_range_values() {
        let err = CoreConfig::from_json_str(r#"{"reminder":{"default_retry_interval_hours":0}}"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = CoreConfig::from_json_str(r#"{"reminder":{"default_max_retries":9}}"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err =
            CoreConfig::from_json_str(r#"{"reminder":{"utc_offset_minutes":2000}}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn from_json_file_reads_document_and_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("simpletodo.json");
        std::fs::write(
            &path,
            r#"{"reminder":{"default_max_retries":5,"notification_title":"Heads up"}}"#,
        )
        .unwrap();

        let config = CoreConfig::from_json_file(&path).unwrap();
        assert_eq!(config.reminder.default_max_retries, 5);
        assert_eq!(config.reminder.notification_title, "Heads up");
        assert_eq!(config.reminder.default_retry_interval_hours, 1);

        let err = CoreConfig::from_json_file(dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn malformed_json_is_parse_error() {
        let err = CoreConfig::from_json_str("{not json").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
