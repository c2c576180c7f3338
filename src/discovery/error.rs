use std::fmt;

use crate::provider::docker::DockerError;

/// 디스커버리 코어에서 발생하는 에러입니다.
#[derive(Debug, PartialEq)]
pub enum DiscoveryError {
    /// 실행 루프를 구동하는 취소 토큰이 취소됨 (정상 종료 경로)
    Cancelled,
    /// 소스 패턴이 정규식으로 컴파일되지 않음
    InvalidPattern {
        pattern: String,
        reason: String,
    },
}

impl fmt::Display for DiscoveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiscoveryError::Cancelled =>
                write!(f, "디스커버리 실행이 취소됨"),
            DiscoveryError::InvalidPattern { pattern, reason } =>
                write!(f, "잘못된 소스 패턴: {} ({})", pattern, reason),
        }
    }
}

impl std::error::Error for DiscoveryError {}

/// 프로바이더가 규칙 목록을 만들지 못했을 때의 에러입니다.
#[derive(Debug)]
pub enum ProviderError {
    /// Docker 데몬 조회 실패
    Docker(DockerError),
    /// 규칙 파일 읽기 실패
    FileRead {
        path: String,
        error: std::io::Error,
    },
    /// 규칙 파일 파싱 실패
    FileParse {
        path: String,
        reason: String,
    },
    /// 잘못된 규칙 정의
    InvalidRule {
        rule: String,
        reason: String,
    },
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderError::Docker(e) =>
                write!(f, "Docker 프로바이더 오류: {}", e),
            ProviderError::FileRead { path, error } =>
                write!(f, "규칙 파일 {} 읽기 실패: {}", path, error),
            ProviderError::FileParse { path, reason } =>
                write!(f, "규칙 파일 {} 파싱 실패: {}", path, reason),
            ProviderError::InvalidRule { rule, reason } =>
                write!(f, "잘못된 규칙 {:?}: {}", rule, reason),
        }
    }
}

impl std::error::Error for ProviderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProviderError::Docker(e) => Some(e),
            ProviderError::FileRead { error, .. } => Some(error),
            _ => None,
        }
    }
}

impl From<DockerError> for ProviderError {
    fn from(err: DockerError) -> Self {
        ProviderError::Docker(err)
    }
}
