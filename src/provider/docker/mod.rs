//! Docker 컨테이너 라벨로부터 라우팅 규칙을 만드는 프로바이더입니다.

mod client;
mod error;
mod retry;

pub use client::{BollardDockerClient, DockerClient, EventStream};
pub use error::DockerError;
pub use retry::{with_retry, RetryPolicy, RetryableOperation};

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bollard::container::ListContainersOptions;
use bollard::models::{ContainerSummary, EventMessage, EventMessageTypeEnum};
use bollard::system::EventsOptions;
use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::discovery::{Provider, ProviderError, ProviderId, UrlMapper};
use crate::settings::DockerSettings;

/// 규칙 재구성이 필요한 컨테이너 이벤트
const WATCHED_ACTIONS: [&str; 7] = ["start", "stop", "die", "destroy", "restart", "pause", "unpause"];

/// 이벤트 스트림 재연결 최소 대기 시간
const MIN_RECONNECT_DELAY: Duration = Duration::from_secs(1);

pub struct DockerProvider {
    client: Arc<dyn DockerClient>,
    settings: DockerSettings,
    retry: RetryPolicy,
    shutdown: CancellationToken,
}

impl DockerProvider {
    pub fn new(client: Arc<dyn DockerClient>, settings: DockerSettings) -> Self {
        let retry = RetryPolicy::from(&settings.retry);
        Self {
            client,
            settings,
            retry,
            shutdown: CancellationToken::new(),
        }
    }

    /// 목록 조회 재시도를 중단시킬 종료 토큰을 지정합니다.
    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }

    fn reconnect_delay(&self) -> Duration {
        self.retry.interval.max(MIN_RECONNECT_DELAY)
    }

    /// 실행 중인 컨테이너 목록 조회 (재시도 없이 한 번)
    async fn try_list_containers(&self) -> Result<Vec<ContainerSummary>, DockerError> {
        let options = Some(ListContainersOptions::<String> {
            all: false,
            ..Default::default()
        });

        let containers = self.client.list_containers(options).await?;
        debug!(count = containers.len(), "컨테이너 목록 조회 성공");
        Ok(containers)
    }

    fn label<'a>(&self, labels: Option<&'a HashMap<String, String>>, name: &str) -> Option<&'a str> {
        labels
            .and_then(|l| l.get(&format!("{}{}", self.settings.label_prefix, name)))
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    fn is_excluded(&self, name: &str) -> bool {
        self.settings.excluded.iter().any(|e| e == name)
    }

    /// 단일 컨테이너에서 라우팅 규칙을 추출합니다.
    /// 규칙을 만들 수 없는 컨테이너는 `None`을 반환하고 건너뜁니다.
    fn container_to_mapper(&self, container: &ContainerSummary) -> Option<UrlMapper> {
        let name = container_name(container);

        if self.is_excluded(&name) {
            debug!(container = %name, "제외 목록에 있는 컨테이너");
            return None;
        }

        if container.state.as_deref() != Some("running") {
            debug!(container = %name, state = ?container.state, "실행 중이 아닌 컨테이너");
            return None;
        }

        let Some(ip) = self.container_ip(container) else {
            debug!(container = %name, network = %self.settings.network, "네트워크 IP를 찾을 수 없음");
            return None;
        };

        let labels = container.labels.as_ref();
        let port = self.label(labels, "port")
            .and_then(|p| p.parse::<u16>().ok())
            .or_else(|| container.ports.as_ref().and_then(|p| p.first()).map(|p| p.private_port));
        let Some(port) = port else {
            debug!(container = %name, "노출된 포트가 없음");
            return None;
        };

        let base = format!("http://{}:{}", ip, port);
        let route = self.label(labels, "route")
            .map(String::from)
            .unwrap_or_else(|| format!("^/api/{}/(.*)", name));
        let dest = match self.label(labels, "dest") {
            Some(dest) if dest.starts_with('/') => format!("{}{}", base, dest),
            Some(dest) => dest.to_string(),
            None => format!("{}/$1", base),
        };
        let server = self.label(labels, "server").unwrap_or("*");
        let ping = match self.label(labels, "ping") {
            Some(ping) if ping.starts_with('/') => format!("{}{}", base, ping),
            Some(ping) => ping.to_string(),
            None => format!("{}/ping", base),
        };

        match UrlMapper::new(ProviderId::Docker, server, &route, dest) {
            Ok(mapper) => Some(mapper.with_ping(ping)),
            Err(e) => {
                warn!(container = %name, error = %e, "컨테이너 라우트 규칙이 잘못됨");
                None
            }
        }
    }

    // 설정된 네트워크의 IP, 네트워크가 지정되지 않았으면 이름순 첫 네트워크의 IP
    fn container_ip(&self, container: &ContainerSummary) -> Option<String> {
        let networks = container.network_settings.as_ref()?.networks.as_ref()?;

        let endpoint = if self.settings.network.is_empty() {
            networks.iter().min_by(|a, b| a.0.cmp(b.0)).map(|(_, e)| e)
        } else {
            networks.get(&self.settings.network)
        }?;

        endpoint.ip_address.clone().filter(|ip| !ip.is_empty())
    }

    fn create_event_filters() -> HashMap<String, Vec<String>> {
        let mut filters = HashMap::new();
        filters.insert("type".to_string(), vec!["container".to_string()]);
        filters.insert(
            "event".to_string(),
            WATCHED_ACTIONS.iter().map(|a| a.to_string()).collect(),
        );
        filters
    }
}

fn subscribe(client: &Arc<dyn DockerClient>) -> EventStream {
    client.events(Some(EventsOptions {
        filters: DockerProvider::create_event_filters(),
        ..Default::default()
    }))
}

// 신호를 보내고, 취소되었거나 수신 측이 사라졌으면 false
async fn notify(tx: &mpsc::Sender<()>, shutdown: &CancellationToken) -> bool {
    tokio::select! {
        biased;
        _ = shutdown.cancelled() => false,
        sent = tx.send(()) => sent.is_ok(),
    }
}

fn container_name(container: &ContainerSummary) -> String {
    container.names.as_ref()
        .and_then(|names| names.first())
        .map(|n| n.trim_start_matches('/').to_string())
        .or_else(|| container.id.clone())
        .unwrap_or_else(|| "unknown".to_string())
}

// 재구성이 필요한 이벤트면 컨테이너 이름을 반환
fn watched_container(event: &EventMessage) -> Option<String> {
    if event.typ != Some(EventMessageTypeEnum::CONTAINER) {
        return None;
    }
    if !WATCHED_ACTIONS.contains(&event.action.as_deref()?) {
        return None;
    }

    let actor = event.actor.as_ref()?;
    actor.attributes.as_ref()
        .and_then(|attrs| attrs.get("name"))
        .map(|n| n.trim_start_matches('/').to_string())
        .or_else(|| actor.id.clone())
}

struct ListContainersRetry<'a> {
    provider: &'a DockerProvider,
}

#[async_trait]
impl<'a> RetryableOperation for ListContainersRetry<'a> {
    type Output = Vec<ContainerSummary>;

    async fn execute(&self) -> Result<Self::Output, DockerError> {
        self.provider.try_list_containers().await
    }
}

#[async_trait]
impl Provider for DockerProvider {
    async fn list(&self) -> Result<Vec<UrlMapper>, ProviderError> {
        let containers = with_retry(ListContainersRetry { provider: self }, &self.retry, &self.shutdown).await?;

        let mappers: Vec<UrlMapper> = containers
            .iter()
            .filter_map(|c| self.container_to_mapper(c))
            .collect();

        if mappers.is_empty() {
            warn!(containers = containers.len(), "라우팅 가능한 컨테이너가 없음");
        } else {
            info!(mappers = mappers.len(), "컨테이너 라우트 조회 완료");
        }
        Ok(mappers)
    }

    /// 최초 신호 한 번과, 감시 대상 컨테이너 이벤트마다 신호를 보냅니다.
    ///
    /// 데몬 이벤트 스트림이 끊기면 잠시 후 다시 구독하고, 끊긴 동안의 변경을
    /// 반영하도록 신호를 한 번 보냅니다. 채널은 `shutdown` 취소 시에만 닫힙니다.
    fn events(&self, shutdown: CancellationToken) -> mpsc::Receiver<()> {
        let (tx, rx) = mpsc::channel(1);
        let _ = tx.try_send(());

        let client = self.client.clone();
        let excluded = self.settings.excluded.clone();
        let reconnect_delay = self.reconnect_delay();
        let mut events = subscribe(&client);

        tokio::spawn(async move {
            loop {
                let item = tokio::select! {
                    biased;
                    _ = shutdown.cancelled() => break,
                    item = events.next() => item,
                };

                let event = match item {
                    Some(Ok(event)) => event,
                    Some(Err(e)) => {
                        warn!(error = %e, "Docker 이벤트 수신 오류");
                        continue;
                    }
                    None => {
                        warn!(retry_in = ?reconnect_delay, "Docker 이벤트 스트림 종료, 재구독 예정");
                        tokio::select! {
                            biased;
                            _ = shutdown.cancelled() => break,
                            _ = tokio::time::sleep(reconnect_delay) => {}
                        }
                        events = subscribe(&client);
                        info!("Docker 이벤트 재구독");
                        if !notify(&tx, &shutdown).await {
                            break;
                        }
                        continue;
                    }
                };

                let Some(container) = watched_container(&event) else {
                    continue;
                };
                if excluded.iter().any(|e| *e == container) {
                    debug!(container = %container, "제외된 컨테이너 이벤트 무시");
                    continue;
                }

                info!(
                    container = %container,
                    action = %event.action.as_deref().unwrap_or("unknown"),
                    "컨테이너 이벤트 수신"
                );

                if !notify(&tx, &shutdown).await {
                    break;
                }
            }
        });

        rx
    }

    fn id(&self) -> ProviderId {
        ProviderId::Docker
    }
}
