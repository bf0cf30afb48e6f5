//! Common types and utilities shared across Veriweb crates.
//!
//! This crate defines the per-session search configuration, the named option
//! surface used by `SetConfig`/`ResetConfig`, observability helpers, and the
//! configuration error type. It is intentionally lightweight so every crate in
//! the workspace can depend on it.
//!
//! # Overview
//!
//! - [`SearchConfig`]: defaults consulted when a search request leaves a field unset
//! - [`ConfigOption`]: the named options a test can set or reset
//! - [`observability`]: centralised tracing/logging initialisation
//! - [`ConfigError`]: invalid option names or values
//!
//! # Examples
//!
//! ```rust
//! use veriweb_common::SearchConfig;
//!
//! let mut cfg = SearchConfig::default();
//! let previous = cfg.set("ShadowDOM", "on").unwrap();
//! assert_eq!(previous, "false");
//! assert!(cfg.shadow_dom);
//! ```
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

pub mod observability;

/// Search defaults for one browser session.
///
/// A `SearchConfig` is owned by the session that uses it and passed into every
/// search request explicitly; there is no process-wide copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Descend into shadow roots while collecting elements.
    pub shadow_dom: bool,
    /// Match targets as substrings instead of requiring equality.
    pub partial_match: bool,
    /// Only consider elements that are rendered and not occluded.
    pub visibility: bool,
    /// Compare text without regard to case.
    pub case_insensitive: bool,
    /// Look inside iframes when the top document has no match.
    pub search_frames: bool,
    /// Outline colour applied to resolved elements. Empty disables highlighting.
    pub highlight_color: String,
    /// Time budget for a keyword when the caller does not pass one.
    #[serde(
        serialize_with = "humantime_serde_compat::serialize",
        deserialize_with = "humantime_serde_compat::timeout"
    )]
    pub default_timeout: Duration,
    /// Sleep between two poll ticks. Never zero.
    #[serde(
        serialize_with = "humantime_serde_compat::serialize",
        deserialize_with = "humantime_serde_compat::interval"
    )]
    pub poll_interval: Duration,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            shadow_dom: false,
            partial_match: true,
            visibility: true,
            case_insensitive: false,
            search_frames: true,
            highlight_color: "blue".to_string(),
            default_timeout: Duration::from_secs(10),
            poll_interval: Duration::from_millis(200),
        }
    }
}

impl SearchConfig {
    /// Set a named option and return its previous value rendered as a string.
    pub fn set(&mut self, name: &str, value: &str) -> Result<String, ConfigError> {
        let option: ConfigOption = name.parse()?;
        let previous = self.get(option);
        match option {
            ConfigOption::ShadowDom => self.shadow_dom = parse_bool(option, value)?,
            ConfigOption::PartialMatch => self.partial_match = parse_bool(option, value)?,
            ConfigOption::Visibility => self.visibility = parse_bool(option, value)?,
            ConfigOption::CaseInsensitive => self.case_insensitive = parse_bool(option, value)?,
            ConfigOption::SearchFrames => self.search_frames = parse_bool(option, value)?,
            ConfigOption::HighlightColor => self.highlight_color = value.trim().to_string(),
            ConfigOption::DefaultTimeout => self.default_timeout = parse_duration(option, value)?,
            ConfigOption::RetryInterval => self.poll_interval = parse_interval(option, value)?,
        }
        Ok(previous)
    }

    /// Read a named option as a string.
    pub fn get(&self, option: ConfigOption) -> String {
        match option {
            ConfigOption::ShadowDom => self.shadow_dom.to_string(),
            ConfigOption::PartialMatch => self.partial_match.to_string(),
            ConfigOption::Visibility => self.visibility.to_string(),
            ConfigOption::CaseInsensitive => self.case_insensitive.to_string(),
            ConfigOption::SearchFrames => self.search_frames.to_string(),
            ConfigOption::HighlightColor => self.highlight_color.clone(),
            ConfigOption::DefaultTimeout => humantime::format_duration(self.default_timeout).to_string(),
            ConfigOption::RetryInterval => humantime::format_duration(self.poll_interval).to_string(),
        }
    }
}

/// Named options understood by [`SearchConfig::set`].
///
/// Names are matched case-insensitively and ignore spaces, dashes and
/// underscores, so `ShadowDOM`, `shadow_dom` and `Shadow DOM` are the same.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigOption {
    ShadowDom,
    PartialMatch,
    Visibility,
    CaseInsensitive,
    SearchFrames,
    HighlightColor,
    DefaultTimeout,
    RetryInterval,
}

impl ConfigOption {
    pub const ALL: [ConfigOption; 8] = [
        ConfigOption::ShadowDom,
        ConfigOption::PartialMatch,
        ConfigOption::Visibility,
        ConfigOption::CaseInsensitive,
        ConfigOption::SearchFrames,
        ConfigOption::HighlightColor,
        ConfigOption::DefaultTimeout,
        ConfigOption::RetryInterval,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ConfigOption::ShadowDom => "ShadowDOM",
            ConfigOption::PartialMatch => "PartialMatch",
            ConfigOption::Visibility => "Visibility",
            ConfigOption::CaseInsensitive => "CaseInsensitive",
            ConfigOption::SearchFrames => "SearchFrames",
            ConfigOption::HighlightColor => "HighlightColor",
            ConfigOption::DefaultTimeout => "DefaultTimeout",
            ConfigOption::RetryInterval => "RetryInterval",
        }
    }
}

impl fmt::Display for ConfigOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ConfigOption {
    type Err = ConfigError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let key: String = raw
            .chars()
            .filter(|c| !matches!(c, ' ' | '_' | '-'))
            .flat_map(char::to_lowercase)
            .collect();
        match key.as_str() {
            "shadowdom" => Ok(ConfigOption::ShadowDom),
            "partialmatch" => Ok(ConfigOption::PartialMatch),
            "visibility" => Ok(ConfigOption::Visibility),
            "caseinsensitive" => Ok(ConfigOption::CaseInsensitive),
            "searchframes" => Ok(ConfigOption::SearchFrames),
            "highlightcolor" | "highlightcolour" => Ok(ConfigOption::HighlightColor),
            "defaulttimeout" | "timeout" => Ok(ConfigOption::DefaultTimeout),
            "retryinterval" | "pollinterval" => Ok(ConfigOption::RetryInterval),
            _ => Err(ConfigError::UnknownOption(raw.to_string())),
        }
    }
}

/// Parse a boolean option value (`true/false`, `on/off`, `yes/no`, `1/0`).
pub fn parse_bool(option: ConfigOption, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "on" | "yes" | "1" => Ok(true),
        "false" | "off" | "no" | "0" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            option: option.to_string(),
            value: value.to_string(),
            reason: "expected a boolean".to_string(),
        }),
    }
}

/// Longest duration any option accepts.
pub const MAX_DURATION: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Parse a duration written as humantime (`2s`, `500ms`) or bare seconds (`1.5`).
///
/// Values above [`MAX_DURATION`] are rejected.
pub fn parse_duration(option: ConfigOption, value: &str) -> Result<Duration, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidValue {
        option: option.to_string(),
        value: value.to_string(),
        reason,
    };
    let trimmed = value.trim();
    let parsed = match trimmed.parse::<f64>() {
        Ok(secs) => Duration::try_from_secs_f64(secs).map_err(|e| invalid(e.to_string()))?,
        Err(_) => humantime::parse_duration(trimmed).map_err(|e| invalid(e.to_string()))?,
    };
    if parsed > MAX_DURATION {
        return Err(invalid(format!(
            "must be at most {}",
            humantime::format_duration(MAX_DURATION)
        )));
    }
    Ok(parsed)
}

/// [`parse_duration`] for poll intervals, which must be greater than zero.
pub fn parse_interval(option: ConfigOption, value: &str) -> Result<Duration, ConfigError> {
    let interval = parse_duration(option, value)?;
    if interval.is_zero() {
        return Err(ConfigError::InvalidValue {
            option: option.to_string(),
            value: value.to_string(),
            reason: "retry interval must be greater than zero".to_string(),
        });
    }
    Ok(interval)
}

/// Errors raised while reading or changing configuration.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The option name is not one of [`ConfigOption::ALL`].
    #[error("Unknown configuration option: {0}")]
    UnknownOption(String),

    /// The value could not be parsed for the option.
    #[error("Invalid value {value:?} for {option}: {reason}")]
    InvalidValue {
        option: String,
        value: String,
        reason: String,
    },

    /// Loading configuration sources failed.
    #[error("Configuration error: {0}")]
    Load(String),
}

/// Serde adapter so durations read as `10s` in YAML and env overrides.
mod humantime_serde_compat {
    use super::ConfigOption;
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&humantime::format_duration(*value))
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Seconds(f64),
        Text(String),
    }

    fn raw<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
        Ok(match Raw::deserialize(deserializer)? {
            Raw::Seconds(secs) => secs.to_string(),
            Raw::Text(text) => text,
        })
    }

    pub fn timeout<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = raw(deserializer)?;
        super::parse_duration(ConfigOption::DefaultTimeout, &raw).map_err(serde::de::Error::custom)
    }

    pub fn interval<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = raw(deserializer)?;
        super::parse_interval(ConfigOption::RetryInterval, &raw).map_err(serde::de::Error::custom)
    }
}
