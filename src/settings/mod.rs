//! 환경 변수 또는 TOML 파일에서 읽는 실행 설정입니다.

use std::{env, fs, path::Path};
use serde::Deserialize;
use tracing::debug;

mod error;
pub mod logging;
pub mod docker;
mod rules;

pub use error::SettingsError;
pub use logging::{LogFormat, LogOutput, LogSettings};
pub use docker::{DockerSettings, RetrySettings};
pub use rules::{FileSettings, StaticSettings};

pub type Result<T> = std::result::Result<T, SettingsError>;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    // 로깅 설정
    #[serde(default)]
    pub logging: LogSettings,

    // Docker 프로바이더 설정
    #[serde(default)]
    pub docker: DockerSettings,

    // 규칙 파일 프로바이더 설정
    #[serde(default)]
    pub file: FileSettings,

    // 정적 규칙 프로바이더 설정
    #[serde(default, rename = "static")]
    pub static_rules: StaticSettings,
}

impl Settings {
    /// `PROXY_CONFIG_FILE`이 있으면 TOML 파일에서, 없으면 환경 변수에서 설정을 읽습니다.
    pub fn load() -> Result<Self> {
        if let Ok(config_path) = env::var("PROXY_CONFIG_FILE") {
            Self::from_toml_file(&config_path)
        } else {
            Self::from_env()
        }
    }

    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).map_err(|e| SettingsError::FileError {
            path: path.as_ref().to_string_lossy().to_string(),
            error: e,
        })?;

        let settings: Self = toml::from_str(&content)
            .map_err(|e| SettingsError::ParseError { source: e })?;
        debug!(path = %path.as_ref().display(), "설정 파일 로드");

        settings.validate()?;
        Ok(settings)
    }

    pub fn from_env() -> Result<Self> {
        let settings = Self {
            logging: LogSettings::from_env()?,
            docker: DockerSettings::from_env()?,
            file: FileSettings::from_env()?,
            static_rules: StaticSettings::from_env()?,
        };

        // 설정 생성 시점에 바로 검증
        settings.validate()?;
        Ok(settings)
    }

    /// 설정 유효성 검증
    pub fn validate(&self) -> Result<()> {
        self.docker.validate()?;
        self.file.validate()?;
        self.static_rules.validate()?;
        Ok(())
    }
}

/// 환경 변수를 파싱하고, 없으면 기본값을 사용합니다.
pub fn parse_env_var<T: std::str::FromStr, F: FnOnce() -> T>(name: &str, default: F) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(val) => val.trim().parse().map_err(|e: T::Err| SettingsError::EnvVarInvalid {
            var_name: name.to_string(),
            value: val,
            reason: e.to_string(),
        }),
        Err(env::VarError::NotPresent) => Ok(default()),
        Err(e) => Err(SettingsError::EnvVarInvalid {
            var_name: name.to_string(),
            value: "".to_string(),
            reason: e.to_string(),
        }),
    }
}

/// 구분자로 나뉜 목록 형태의 환경 변수를 읽습니다. 빈 항목은 버립니다.
pub fn parse_env_list(name: &str, separator: char) -> Result<Vec<String>> {
    let raw: String = parse_env_var(name, String::new)?;
    Ok(raw.split(separator)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect())
}
