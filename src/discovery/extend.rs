use regex_lite::Regex;
use tracing::warn;

use crate::discovery::UrlMapper;

/// 접두사 형태의 규칙을 캡처 기반 재작성 규칙으로 확장합니다.
///
/// `/api/blah/ -> http://host/` 는 `^/api/blah/(.*) -> http://host/$1` 이 됩니다.
/// 목적지에 이미 `$1`이 있거나, 소스에 `(`가 있거나, 소스가 `/`로 끝나지 않으면
/// 규칙을 그대로 돌려줍니다. `(` 검사는 정규식 파싱이 아닌 단순 문자열 검사입니다.
///
/// ```
/// use reverse_proxy_discovery::discovery::{extend_rule, ProviderId, UrlMapper};
///
/// let rule = UrlMapper::new(ProviderId::File, "*", "/api/blah/", "http://localhost:8080/").unwrap();
/// let extended = extend_rule(rule);
/// assert_eq!(extended.src_match.as_str(), "^/api/blah/(.*)");
/// assert_eq!(extended.dst, "http://localhost:8080/$1");
/// ```
pub fn extend_rule(m: UrlMapper) -> UrlMapper {
    let src = m.src_match.as_str();

    if m.dst.contains("$1") || src.contains('(') || !src.ends_with('/') {
        return m;
    }

    let pattern = format!("^{}/(.*)", src.strip_suffix('/').unwrap_or(src));
    let src_match = match Regex::new(&pattern) {
        Ok(rx) => rx,
        Err(e) => {
            warn!(src = %src, error = %e, "규칙 확장 실패, 원래 규칙 유지");
            return m;
        }
    };

    let dst = format!("{}/$1", m.dst.strip_suffix('/').unwrap_or(&m.dst));

    UrlMapper {
        server: m.server,
        src_match,
        dst,
        provider_id: m.provider_id,
        ping_url: m.ping_url,
    }
}
