use async_trait::async_trait;
use tokio::time::{sleep, Duration};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::DockerError;
use crate::settings::RetrySettings;

/// Docker 작업 재시도 정책
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// 최대 시도 횟수 (첫 시도 포함)
    pub max_attempts: u32,
    /// 재시도 간격
    pub interval: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        Self { max_attempts, interval }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(2))
    }
}

impl From<&RetrySettings> for RetryPolicy {
    fn from(settings: &RetrySettings) -> Self {
        Self::new(settings.max_attempts, Duration::from_secs(settings.interval))
    }
}

#[async_trait]
pub trait RetryableOperation: Send + Sync {
    type Output: Send;

    async fn execute(&self) -> Result<Self::Output, DockerError>;

    fn should_retry(&self, error: &DockerError) -> bool {
        error.is_retryable()
    }
}

/// 정책에 따라 작업을 반복 실행합니다.
///
/// `shutdown`이 취소되면 진행 중인 시도는 버리고 `DockerError::Cancelled`를,
/// 재시도 대기 중이면 마지막 에러를 바로 반환합니다.
pub async fn with_retry<T: RetryableOperation>(
    operation: T,
    policy: &RetryPolicy,
    shutdown: &CancellationToken,
) -> Result<T::Output, DockerError> {
    let mut attempt = 0;

    loop {
        attempt += 1;
        let result = tokio::select! {
            biased;
            _ = shutdown.cancelled() => return Err(DockerError::Cancelled),
            result = operation.execute() => result,
        };

        let error = match result {
            Ok(output) => return Ok(output),
            Err(error) if attempt >= policy.max_attempts || !operation.should_retry(&error) => {
                return Err(error);
            }
            Err(error) => error,
        };

        warn!(
            error = %error,
            attempt,
            max_attempts = policy.max_attempts,
            retry_in = ?policy.interval,
            "Docker 작업 실패, 재시도 예정"
        );

        tokio::select! {
            biased;
            _ = shutdown.cancelled() => {
                debug!(attempt, "종료 요청으로 재시도 중단");
                return Err(error);
            }
            _ = sleep(policy.interval) => {}
        }
    }
}
