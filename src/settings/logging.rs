use std::str::FromStr;

use serde::{Deserialize, Deserializer};
use tracing::Level;

use super::{parse_env_var, SettingsError};

#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            _ => Err(format!("Invalid log format: {}", s)),
        }
    }
}

/// 로그 출력 대상: 표준 출력 또는 파일 경로
#[derive(Debug, Clone, Default, PartialEq)]
pub enum LogOutput {
    #[default]
    Stdout,
    File(String),
}

impl FromStr for LogOutput {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "" | "stdout" => Ok(LogOutput::Stdout),
            _ => Ok(LogOutput::File(s.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LogSettings {
    pub format: LogFormat,
    pub level: Level,
    pub output: LogOutput,
}

impl LogSettings {
    pub fn from_env() -> Result<Self, SettingsError> {
        let level: String = parse_env_var("PROXY_LOG_LEVEL", || "info".to_string())?;
        let level = parse_log_level(&level).ok_or_else(|| SettingsError::EnvVarInvalid {
            var_name: "PROXY_LOG_LEVEL".to_string(),
            value: level.clone(),
            reason: "유효하지 않은 로그 레벨".to_string(),
        })?;

        Ok(Self {
            format: parse_env_var("PROXY_LOG_FORMAT", LogFormat::default)?,
            level,
            output: parse_env_var("PROXY_LOG_OUTPUT", LogOutput::default)?,
        })
    }
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            level: Level::INFO,
            output: LogOutput::default(),
        }
    }
}

fn parse_log_level(level: &str) -> Option<Level> {
    match level.to_lowercase().as_str() {
        "error" => Some(Level::ERROR),
        "warn" => Some(Level::WARN),
        "info" => Some(Level::INFO),
        "debug" => Some(Level::DEBUG),
        "trace" => Some(Level::TRACE),
        _ => None,
    }
}

impl<'de> Deserialize<'de> for LogSettings {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Helper {
            #[serde(default)]
            format: LogFormat,
            #[serde(default = "default_log_level_string")]
            level: String,
            #[serde(default)]
            output: Option<String>,
        }

        let helper = Helper::deserialize(deserializer)?;
        let level = parse_log_level(&helper.level).ok_or_else(|| {
            serde::de::Error::custom(format!("유효하지 않은 로그 레벨: {}", helper.level))
        })?;
        let output = match helper.output {
            Some(output) => output.parse().map_err(serde::de::Error::custom)?,
            None => LogOutput::default(),
        };

        Ok(LogSettings {
            format: helper.format,
            level,
            output,
        })
    }
}

fn default_log_level_string() -> String {
    "info".to_string()
}
