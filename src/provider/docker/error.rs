use std::fmt;

#[derive(Debug)]
pub enum DockerError {
    /// Docker 데몬 연결 실패
    ConnectionError {
        source: bollard::errors::Error,
        context: String,
    },
    /// 컨테이너 목록 조회 실패
    ListContainersError {
        source: bollard::errors::Error,
        context: String,
    },
    /// 종료 요청으로 작업이 중단됨
    Cancelled,
}

impl DockerError {
    /// 다시 시도하면 성공할 수 있는 에러인지 여부
    ///
    /// 연결 문제와 데몬의 5xx 응답만 재시도 대상입니다.
    pub fn is_retryable(&self) -> bool {
        match self {
            DockerError::ConnectionError { .. } => true,
            DockerError::ListContainersError { source, .. } => !matches!(
                source,
                bollard::errors::Error::DockerResponseServerError { status_code, .. } if *status_code < 500
            ),
            DockerError::Cancelled => false,
        }
    }
}

impl fmt::Display for DockerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DockerError::ConnectionError { source, context } =>
                write!(f, "Docker 데몬 연결 실패 ({}): {}", context, source),
            DockerError::ListContainersError { source, context } =>
                write!(f, "컨테이너 목록 조회 실패 ({}): {}", context, source),
            DockerError::Cancelled =>
                write!(f, "Docker 작업이 취소됨"),
        }
    }
}

impl std::error::Error for DockerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DockerError::ConnectionError { source, .. } => Some(source),
            DockerError::ListContainersError { source, .. } => Some(source),
            DockerError::Cancelled => None,
        }
    }
}

impl From<bollard::errors::Error> for DockerError {
    fn from(err: bollard::errors::Error) -> Self {
        DockerError::ConnectionError {
            source: err,
            context: "Docker 데몬 연결 실패".to_string(),
        }
    }
}
