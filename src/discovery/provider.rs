use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::discovery::{ProviderError, ProviderId, UrlMapper};

/// 라우팅 규칙의 출처 (Docker, 정적 설정, 규칙 파일)
#[async_trait]
pub trait Provider: Send + Sync {
    /// 현재 규칙 전체를 반환합니다. 변경분이 아닌 스냅샷입니다.
    async fn list(&self) -> Result<Vec<UrlMapper>, ProviderError>;

    /// 규칙이 바뀌었을 수 있을 때마다 `()`를 보내는 수신자를 반환합니다.
    /// `shutdown`이 취소되면 더 이상 신호를 보내지 않고 채널을 닫아야 합니다.
    fn events(&self, shutdown: CancellationToken) -> mpsc::Receiver<()>;

    fn id(&self) -> ProviderId;
}
