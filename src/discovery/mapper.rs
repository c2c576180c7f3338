use std::fmt;

use regex_lite::Regex;

use crate::discovery::DiscoveryError;

/// 규칙을 만든 프로바이더의 식별자입니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderId {
    Docker,
    Static,
    File,
}

impl ProviderId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::Docker => "docker",
            ProviderId::Static => "static",
            ProviderId::File => "file",
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 하나의 라우팅 규칙: (server, 경로 정규식) -> 목적지 템플릿
///
/// # 필드
///
/// * `server` - 호스트 매칭 문자열, `""` 또는 `"*"`는 모든 호스트에 매칭
/// * `src_match` - 요청 경로에 적용할 정규식
/// * `dst` - `$1`, `$2` 같은 캡처 참조를 담을 수 있는 목적지 템플릿
/// * `provider_id` - 규칙을 만든 프로바이더
/// * `ping_url` - 외부 헬스 체크가 사용할 URL (코어에서는 그대로 전달만 함)
#[derive(Debug, Clone)]
pub struct UrlMapper {
    pub server: String,
    pub src_match: Regex,
    pub dst: String,
    pub provider_id: ProviderId,
    pub ping_url: Option<String>,
}

impl UrlMapper {
    /// 소스 패턴을 컴파일해 새 규칙을 만듭니다.
    ///
    /// ```
    /// use reverse_proxy_discovery::discovery::{ProviderId, UrlMapper};
    ///
    /// let m = UrlMapper::new(ProviderId::Static, "*", "^/api/(.*)", "http://127.0.0.1:8080/$1").unwrap();
    /// assert!(m.is_catch_all());
    /// assert_eq!(m.src_match.as_str(), "^/api/(.*)");
    /// ```
    pub fn new(
        provider_id: ProviderId,
        server: impl Into<String>,
        src: &str,
        dst: impl Into<String>,
    ) -> Result<Self, DiscoveryError> {
        let src_match = Regex::new(src).map_err(|e| DiscoveryError::InvalidPattern {
            pattern: src.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            server: server.into(),
            src_match,
            dst: dst.into(),
            provider_id,
            ping_url: None,
        })
    }

    pub fn with_ping(mut self, ping_url: impl Into<String>) -> Self {
        self.ping_url = Some(ping_url.into());
        self
    }

    /// server가 비어 있거나 `*`이면 모든 호스트에 매칭되는 규칙입니다.
    pub fn is_catch_all(&self) -> bool {
        self.server.is_empty() || self.server == "*"
    }
}

impl PartialEq for UrlMapper {
    fn eq(&self, other: &Self) -> bool {
        self.server == other.server
            && self.src_match.as_str() == other.src_match.as_str()
            && self.dst == other.dst
            && self.provider_id == other.provider_id
            && self.ping_url == other.ping_url
    }
}

impl Eq for UrlMapper {}
