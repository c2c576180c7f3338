use serde::Deserialize;
use super::{parse_env_list, parse_env_var, Result, SettingsError};

/// Docker 목록 조회 재시도 설정
#[derive(Debug, Clone, Deserialize)]
pub struct RetrySettings {
    /// 최대 시도 횟수
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// 재시도 간격 (초)
    #[serde(default = "default_retry_interval")]
    pub interval: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            interval: default_retry_interval(),
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_interval() -> u64 {
    2 // 2초
}

#[derive(Debug, Clone, Deserialize)]
pub struct DockerSettings {
    /// Docker 프로바이더 사용 여부
    #[serde(default)]
    pub enabled: bool,

    /// 컨테이너 IP를 가져올 네트워크 이름 (비어 있으면 아무 네트워크)
    #[serde(default)]
    pub network: String,

    /// 라벨 접두사
    #[serde(default = "default_label_prefix")]
    pub label_prefix: String,

    /// 라우팅에서 제외할 컨테이너 이름
    #[serde(default)]
    pub excluded: Vec<String>,

    #[serde(default)]
    pub retry: RetrySettings,
}

impl DockerSettings {
    /// 환경 변수에서 읽기만 하고, 검증은 `Settings::validate`에서 한 번에 합니다.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            enabled: parse_env_var("PROXY_DOCKER_ENABLED", || false)?,
            network: parse_env_var("PROXY_DOCKER_NETWORK", String::new)?,
            label_prefix: parse_env_var("PROXY_LABEL_PREFIX", default_label_prefix)?,
            excluded: parse_env_list("PROXY_DOCKER_EXCLUDE", ',')?,
            retry: RetrySettings {
                max_attempts: parse_env_var("PROXY_DOCKER_RETRY_ATTEMPTS", default_max_attempts)?,
                interval: parse_env_var("PROXY_DOCKER_RETRY_INTERVAL", default_retry_interval)?,
            },
        })
    }

    pub fn validate(&self) -> Result<()> {
        // Docker 네트워크 이름 검증
        if !self.network.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.') {
            return Err(SettingsError::EnvVarInvalid {
                var_name: "PROXY_DOCKER_NETWORK".to_string(),
                value: self.network.clone(),
                reason: "Docker 네트워크 이름은 영숫자와 -_. 만 포함할 수 있습니다".to_string(),
            });
        }

        // 라벨 접두사 길이 제한
        if self.label_prefix.len() > 100 {
            return Err(SettingsError::EnvVarInvalid {
                var_name: "PROXY_LABEL_PREFIX".to_string(),
                value: self.label_prefix.clone(),
                reason: "라벨 접두사가 너무 깁니다 (최대 100자)".to_string(),
            });
        }

        if !self.label_prefix.ends_with('.') {
            return Err(SettingsError::EnvVarInvalid {
                var_name: "PROXY_LABEL_PREFIX".to_string(),
                value: self.label_prefix.clone(),
                reason: "라벨 접두사는 '.'으로 끝나야 합니다".to_string(),
            });
        }

        if self.retry.max_attempts == 0 {
            return Err(SettingsError::EnvVarInvalid {
                var_name: "PROXY_DOCKER_RETRY_ATTEMPTS".to_string(),
                value: self.retry.max_attempts.to_string(),
                reason: "최소 1회 이상 시도해야 합니다".to_string(),
            });
        }

        Ok(())
    }
}

impl Default for DockerSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            network: String::new(),
            label_prefix: default_label_prefix(),
            excluded: Vec::new(),
            retry: RetrySettings::default(),
        }
    }
}

fn default_label_prefix() -> String {
    "reproxy.".to_string()
}
