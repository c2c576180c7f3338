use serde::Deserialize;
use super::{parse_env_list, parse_env_var, Result, SettingsError};

/// 규칙 파일 프로바이더 설정
#[derive(Debug, Clone, Deserialize)]
pub struct FileSettings {
    #[serde(default)]
    pub enabled: bool,

    /// TOML 규칙 파일 경로
    #[serde(default = "default_rules_path")]
    pub path: String,
}

impl FileSettings {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            enabled: parse_env_var("PROXY_FILE_ENABLED", || false)?,
            path: parse_env_var("PROXY_FILE_PATH", default_rules_path)?,
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.enabled && self.path.trim().is_empty() {
            return Err(SettingsError::EnvVarMissing {
                var_name: "PROXY_FILE_PATH".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for FileSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            path: default_rules_path(),
        }
    }
}

fn default_rules_path() -> String {
    "routes.toml".to_string()
}

/// 정적 규칙 프로바이더 설정
///
/// 규칙 하나는 `server,source,destination[,ping]` 형식이며,
/// 환경 변수 `PROXY_STATIC_RULES`에서는 `;`로 구분합니다.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StaticSettings {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub rules: Vec<String>,
}

impl StaticSettings {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            enabled: parse_env_var("PROXY_STATIC_ENABLED", || false)?,
            rules: parse_env_list("PROXY_STATIC_RULES", ';')?,
        })
    }

    pub fn validate(&self) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }

        for rule in &self.rules {
            let fields = rule.split(',').count();
            if fields != 3 && fields != 4 {
                return Err(SettingsError::EnvVarInvalid {
                    var_name: "PROXY_STATIC_RULES".to_string(),
                    value: rule.clone(),
                    reason: format!("규칙은 필드가 3개 또는 4개여야 합니다 (현재 {}개)", fields),
                });
            }
        }
        Ok(())
    }
}
