use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::discovery::{Provider, ProviderError, ProviderId, UrlMapper};

/// 설정에 고정된 규칙 목록을 제공하는 프로바이더입니다.
///
/// 규칙 형식은 `server,source,destination[,ping]` 이며 server가 비어 있으면 `*`로 취급합니다.
#[derive(Debug, Clone, Default)]
pub struct StaticProvider {
    rules: Vec<String>,
}

impl StaticProvider {
    pub fn new(rules: Vec<String>) -> Self {
        Self { rules }
    }

    fn parse_rule(rule: &str) -> Result<UrlMapper, ProviderError> {
        let invalid = |reason: String| ProviderError::InvalidRule {
            rule: rule.to_string(),
            reason,
        };

        let elems: Vec<&str> = rule.split(',').map(str::trim).collect();
        if elems.len() != 3 && elems.len() != 4 {
            return Err(invalid(format!("필드가 3개 또는 4개여야 함 (현재 {}개)", elems.len())));
        }

        let server = if elems[0].is_empty() { "*" } else { elems[0] };
        let mapper = UrlMapper::new(ProviderId::Static, server, elems[1], elems[2])
            .map_err(|e| invalid(e.to_string()))?;

        match elems.get(3) {
            Some(ping) if !ping.is_empty() => Ok(mapper.with_ping(*ping)),
            _ => Ok(mapper),
        }
    }
}

#[async_trait]
impl Provider for StaticProvider {
    async fn list(&self) -> Result<Vec<UrlMapper>, ProviderError> {
        self.rules.iter().map(|r| Self::parse_rule(r)).collect()
    }

    /// 최초 신호를 한 번 보내고, 취소될 때까지 채널을 열어 둡니다.
    fn events(&self, shutdown: CancellationToken) -> mpsc::Receiver<()> {
        let (tx, rx) = mpsc::channel(1);
        let _ = tx.try_send(());

        tokio::spawn(async move {
            shutdown.cancelled().await;
            drop(tx);
        });

        rx
    }

    fn id(&self) -> ProviderId {
        ProviderId::Static
    }
}
