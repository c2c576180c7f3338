use std::sync::{Arc, PoisonError, RwLock};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::discovery::{extend_rule, merge_events, DiscoveryError, Provider, UrlMapper};

/// 여러 프로바이더의 규칙을 병합해 들고 있는 라우팅 테이블 서비스입니다.
///
/// 테이블은 재구성될 때마다 통째로 교체되며, 읽기 쪽(`match_url`, `servers`,
/// `mappers`)은 교체 전 또는 교체 후의 완전한 스냅샷만 보게 됩니다.
pub struct Service {
    providers: Vec<Arc<dyn Provider>>,
    mappers: RwLock<Vec<UrlMapper>>,
}

impl Service {
    /// 순서가 고정된 프로바이더 목록으로 서비스를 만듭니다.
    /// 프로바이더 순서가 곧 매칭 우선순위입니다.
    pub fn new(providers: Vec<Arc<dyn Provider>>) -> Self {
        Self {
            providers,
            mappers: RwLock::new(Vec::new()),
        }
    }

    /// 이벤트를 기다리며 규칙 테이블을 재구성하는 블로킹 루프입니다.
    ///
    /// 유일한 종료 경로는 `shutdown` 취소이며, 이때 `Err(DiscoveryError::Cancelled)`를 반환합니다.
    #[instrument(skip_all, fields(providers = self.providers.len()))]
    pub async fn run(&self, shutdown: CancellationToken) -> Result<(), DiscoveryError> {
        let sources = self.providers
            .iter()
            .map(|p| p.events(shutdown.clone()))
            .collect();
        let mut events = merge_events(&shutdown, sources);

        loop {
            let event = tokio::select! {
                biased;
                _ = shutdown.cancelled() => return Err(DiscoveryError::Cancelled),
                event = events.recv() => event,
            };

            if event.is_none() {
                // 모든 이벤트 소스가 닫힘, 더 이상 재구성할 일이 없으므로 취소만 기다림
                warn!("모든 프로바이더 이벤트 스트림 종료");
                shutdown.cancelled().await;
                return Err(DiscoveryError::Cancelled);
            }

            debug!("새 업데이트 이벤트 수신");
            // 재구성 도중 취소되면 진행 중인 list 호출을 버리고 이전 스냅샷을 유지
            let lst = tokio::select! {
                biased;
                _ = shutdown.cancelled() => return Err(DiscoveryError::Cancelled),
                lst = self.merge_lists() => lst,
            };
            for m in &lst {
                info!(
                    provider = %m.provider_id,
                    server = %m.server,
                    src = %m.src_match.as_str(),
                    dst = %m.dst,
                    "매핑 규칙"
                );
            }
            info!(mappers = lst.len(), "라우팅 규칙 테이블 갱신");

            *self.mappers.write().unwrap_or_else(PoisonError::into_inner) = lst;
        }
    }

    /// 서버와 경로에 매칭되는 규칙을 찾아 재작성된 목적지를 반환합니다.
    ///
    /// 스냅샷 순서대로 규칙을 훑으며 server가 맞는 규칙의 치환 결과가 원래 경로와
    /// 다르면 매칭으로 봅니다. 매칭이 없으면 `(path, false)`를 반환합니다.
    pub fn match_url(&self, server: &str, path: &str) -> (String, bool) {
        let mappers = self.mappers.read().unwrap_or_else(PoisonError::into_inner);

        for m in mappers.iter() {
            if !m.is_catch_all() && m.server != server {
                continue;
            }
            let dest = m.src_match.replace_all(path, m.dst.as_str());
            if dest != path {
                return (dest.into_owned(), true);
            }
        }

        (path.to_string(), false)
    }

    /// catch-all(`*`, 빈 값)을 제외한 server 목록을 스냅샷 순서대로 반환합니다.
    /// 중복은 제거하지 않습니다.
    pub fn servers(&self) -> Vec<String> {
        let mappers = self.mappers.read().unwrap_or_else(PoisonError::into_inner);
        mappers
            .iter()
            .filter(|m| !m.is_catch_all())
            .map(|m| m.server.clone())
            .collect()
    }

    /// 현재 스냅샷의 복사본을 반환합니다.
    pub fn mappers(&self) -> Vec<UrlMapper> {
        self.mappers.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    // 프로바이더 선언 순서대로 규칙을 모아 확장하고 프로바이더 ID를 붙임
    async fn merge_lists(&self) -> Vec<UrlMapper> {
        let mut res = Vec::new();

        for p in &self.providers {
            let lst = match p.list().await {
                Ok(lst) => lst,
                Err(e) => {
                    warn!(provider = %p.id(), error = %e, "프로바이더 규칙 조회 실패");
                    continue;
                }
            };

            let id = p.id();
            res.extend(lst.into_iter().map(|m| {
                let mut m = extend_rule(m);
                m.provider_id = id;
                m
            }));
        }

        res
    }
}
