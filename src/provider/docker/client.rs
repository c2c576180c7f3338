use std::pin::Pin;

use async_trait::async_trait;
use bollard::container::ListContainersOptions;
use bollard::models::{ContainerSummary, EventMessage};
use bollard::system::EventsOptions;
use bollard::Docker;
use futures_util::{Stream, StreamExt};

use super::DockerError;

pub type EventStream = Pin<Box<dyn Stream<Item = Result<EventMessage, DockerError>> + Send>>;

/// Docker 데몬 접근을 추상화한 트레이트 (테스트에서는 목 구현을 사용)
#[async_trait]
pub trait DockerClient: Send + Sync {
    async fn list_containers(
        &self,
        options: Option<ListContainersOptions<String>>,
    ) -> Result<Vec<ContainerSummary>, DockerError>;

    fn events(&self, options: Option<EventsOptions<String>>) -> EventStream;
}

// 실제 Docker 클라이언트 구현
pub struct BollardDockerClient(Docker);

impl BollardDockerClient {
    pub fn new(docker: Docker) -> Self {
        Self(docker)
    }

    /// 로컬 기본 설정(소켓, DOCKER_HOST)으로 연결합니다.
    pub fn connect_with_local_defaults() -> Result<Self, DockerError> {
        Ok(Self(Docker::connect_with_local_defaults()?))
    }
}

#[async_trait]
impl DockerClient for BollardDockerClient {
    async fn list_containers(
        &self,
        options: Option<ListContainersOptions<String>>,
    ) -> Result<Vec<ContainerSummary>, DockerError> {
        self.0.list_containers(options).await.map_err(|e| DockerError::ListContainersError {
            source: e,
            context: "라우팅 가능한 컨테이너 조회 중 오류".to_string(),
        })
    }

    fn events(&self, options: Option<EventsOptions<String>>) -> EventStream {
        Box::pin(self.0.events(options).map(|res| res.map_err(DockerError::from)))
    }
}
