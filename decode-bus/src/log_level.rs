//! Host log level to ffmpeg `-loglevel` mapping.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

/// Log level of the host application.
///
/// Deserializes from any string; unknown names become `Info`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HostLogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Success,
    Warning,
    Error,
    Critical,
}

/// Verbosity understood by ffmpeg's `-loglevel` flag.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FfmpegLogLevel {
    Trace,
    Debug,
    Info,
    Warning,
    Error,
    Fatal,
}

impl FfmpegLogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            FfmpegLogLevel::Trace => "trace",
            FfmpegLogLevel::Debug => "debug",
            FfmpegLogLevel::Info => "info",
            FfmpegLogLevel::Warning => "warning",
            FfmpegLogLevel::Error => "error",
            FfmpegLogLevel::Fatal => "fatal",
        }
    }

    /// Resolves a host level by name. Unknown names fall back to `info`.
    pub fn from_host_name(name: &str) -> Self {
        HostLogLevel::from_name(name).into()
    }
}

impl fmt::Display for FfmpegLogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<HostLogLevel> for FfmpegLogLevel {
    fn from(level: HostLogLevel) -> Self {
        match level {
            HostLogLevel::Trace => FfmpegLogLevel::Trace,
            HostLogLevel::Debug => FfmpegLogLevel::Debug,
            HostLogLevel::Info | HostLogLevel::Success => FfmpegLogLevel::Info,
            HostLogLevel::Warning => FfmpegLogLevel::Warning,
            HostLogLevel::Error => FfmpegLogLevel::Error,
            HostLogLevel::Critical => FfmpegLogLevel::Fatal,
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown log level: {0}")]
pub struct UnknownLogLevel(pub String);

impl HostLogLevel {
    /// Lenient counterpart of `parse`: unknown names map to `Info`.
    pub fn from_name(name: &str) -> Self {
        name.parse().unwrap_or_else(|e: UnknownLogLevel| {
            log::warn!("{}, using info", e);
            HostLogLevel::Info
        })
    }
}

impl FromStr for HostLogLevel {
    type Err = UnknownLogLevel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(HostLogLevel::Trace),
            "debug" => Ok(HostLogLevel::Debug),
            "info" => Ok(HostLogLevel::Info),
            "success" => Ok(HostLogLevel::Success),
            "warning" | "warn" => Ok(HostLogLevel::Warning),
            "error" => Ok(HostLogLevel::Error),
            "critical" => Ok(HostLogLevel::Critical),
            _ => Err(UnknownLogLevel(s.to_string())),
        }
    }
}

impl<'de> Deserialize<'de> for HostLogLevel {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let name = String::deserialize(deserializer)?;
        Ok(HostLogLevel::from_name(&name))
    }
}

impl From<log::Level> for HostLogLevel {
    fn from(level: log::Level) -> Self {
        match level {
            log::Level::Trace => HostLogLevel::Trace,
            log::Level::Debug => HostLogLevel::Debug,
            log::Level::Info => HostLogLevel::Info,
            log::Level::Warn => HostLogLevel::Warning,
            log::Level::Error => HostLogLevel::Error,
        }
    }
}

impl From<log::LevelFilter> for HostLogLevel {
    fn from(filter: log::LevelFilter) -> Self {
        // Off has no log::Level; keep ffmpeg as quiet as the table allows
        filter
            .to_level()
            .map(HostLogLevel::from)
            .unwrap_or(HostLogLevel::Critical)
    }
}

#[cfg(test)]
#[path = "log_level_test.rs"]
mod log_level_test;
