use std::future::Future;
use std::io;

use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// 종료 신호가 오면 `shutdown`을 취소합니다.
///
/// 신호 대기 자체가 실패하면 취소하지 않고 에러만 남깁니다. 이 경우 서비스는
/// 계속 실행되며 프로세스 종료는 외부(SIGKILL, 컨테이너 중지)에 맡깁니다.
pub async fn cancel_on_signal<F>(signal: F, shutdown: CancellationToken)
where
    F: Future<Output = io::Result<()>>,
{
    match signal.await {
        Ok(()) => {
            info!("종료 신호 수신");
            shutdown.cancel();
        }
        Err(e) => error!(error = %e, "종료 신호 대기 실패, 신호 처리 없이 계속 실행"),
    }
}
