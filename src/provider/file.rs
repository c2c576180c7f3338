use std::collections::BTreeMap;
use std::path::PathBuf;

use async_trait::async_trait;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::discovery::{Provider, ProviderError, ProviderId, UrlMapper};

/// 규칙 파일에서 catch-all server를 뜻하는 키
const DEFAULT_SERVER_KEY: &str = "default";

#[derive(Debug, Deserialize)]
struct FileRule {
    route: String,
    dest: String,
    #[serde(default)]
    ping: Option<String>,
}

/// TOML 규칙 파일을 읽고 변경을 감시하는 프로바이더입니다.
///
/// ```toml
/// [[default]]
/// route = "^/api/svc1/(.*)"
/// dest = "http://127.0.0.1:8080/blah1/$1"
///
/// [["srv.example.com"]]
/// route = "/api/svc2/"
/// dest = "http://127.0.0.2:8080/"
/// ping = "http://127.0.0.2:8080/ping"
/// ```
#[derive(Debug, Clone)]
pub struct FileProvider {
    path: PathBuf,
}

impl FileProvider {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    fn parse(&self, content: &str) -> Result<Vec<UrlMapper>, ProviderError> {
        let path = self.path.display().to_string();
        let servers: BTreeMap<String, Vec<FileRule>> = toml::from_str(content)
            .map_err(|e| ProviderError::FileParse {
                path: path.clone(),
                reason: e.to_string(),
            })?;

        // 특정 호스트 규칙이 catch-all 규칙보다 먼저 매칭되도록 default는 마지막에 둠
        let (defaults, specific): (Vec<_>, Vec<_>) = servers
            .into_iter()
            .partition(|(server, _)| server == DEFAULT_SERVER_KEY);

        let mut res = Vec::new();
        for (server, rules) in specific.into_iter().chain(defaults) {
            let server = if server == DEFAULT_SERVER_KEY { "*".to_string() } else { server };
            for rule in rules {
                let mapper = UrlMapper::new(ProviderId::File, server.as_str(), &rule.route, rule.dest)
                    .map_err(|e| ProviderError::FileParse {
                        path: path.clone(),
                        reason: e.to_string(),
                    })?;
                res.push(match rule.ping {
                    Some(ping) => mapper.with_ping(ping),
                    None => mapper,
                });
            }
        }

        Ok(res)
    }

    // notify 감시자를 만들고, 대상 파일이 바뀔 때마다 신호를 보냄
    fn start_watcher(&self, tx: mpsc::Sender<()>) -> notify::Result<RecommendedWatcher> {
        let target = self.path.file_name().map(|name| name.to_os_string());
        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            match res {
                Ok(event) => {
                    let relevant = matches!(
                        event.kind,
                        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
                    ) && event.paths.iter().any(|p| p.file_name() == target.as_deref());

                    if relevant {
                        debug!(paths = ?event.paths, "규칙 파일 변경 감지");
                        // 이미 대기 중인 신호가 있으면 합쳐짐
                        let _ = tx.try_send(());
                    }
                }
                Err(e) => warn!(error = %e, "규칙 파일 감시 오류"),
            }
        })?;

        watcher.watch(&dir, RecursiveMode::NonRecursive)?;
        info!(path = %self.path.display(), "규칙 파일 감시 시작");
        Ok(watcher)
    }
}

#[async_trait]
impl Provider for FileProvider {
    async fn list(&self) -> Result<Vec<UrlMapper>, ProviderError> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| ProviderError::FileRead {
                path: self.path.display().to_string(),
                error: e,
            })?;

        self.parse(&content)
    }

    fn events(&self, shutdown: CancellationToken) -> mpsc::Receiver<()> {
        let (tx, rx) = mpsc::channel(1);
        let _ = tx.try_send(());

        let watcher = match self.start_watcher(tx.clone()) {
            Ok(watcher) => Some(watcher),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "규칙 파일 감시 시작 실패");
                None
            }
        };

        tokio::spawn(async move {
            shutdown.cancelled().await;
            // 감시자가 가진 송신자까지 정리되어야 수신 채널이 닫힘
            drop(watcher);
            drop(tx);
        });

        rx
    }

    fn id(&self) -> ProviderId {
        ProviderId::File
    }
}
