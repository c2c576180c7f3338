use std::process::ExitCode;
use std::sync::Arc;

use reverse_proxy_discovery::discovery::{DiscoveryError, Provider, Service};
use reverse_proxy_discovery::logging::init_logging;
use reverse_proxy_discovery::provider::docker::BollardDockerClient;
use reverse_proxy_discovery::provider::{DockerProvider, FileProvider, StaticProvider};
use reverse_proxy_discovery::settings::Settings;
use reverse_proxy_discovery::shutdown::cancel_on_signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

// 프로바이더 순서가 매칭 우선순위: 규칙 파일, Docker, 정적 규칙
fn make_providers(settings: &Settings, shutdown: &CancellationToken) -> Vec<Arc<dyn Provider>> {
    let mut providers: Vec<Arc<dyn Provider>> = Vec::new();

    if settings.file.enabled {
        info!(path = %settings.file.path, "규칙 파일 프로바이더 사용");
        providers.push(Arc::new(FileProvider::new(&settings.file.path)));
    }

    if settings.docker.enabled {
        match BollardDockerClient::connect_with_local_defaults() {
            Ok(client) => {
                info!(network = %settings.docker.network, "Docker 프로바이더 사용");
                let provider = DockerProvider::new(Arc::new(client), settings.docker.clone())
                    .with_shutdown(shutdown.clone());
                providers.push(Arc::new(provider));
            }
            Err(e) => error!(error = %e, "Docker 클라이언트 초기화 실패, Docker 프로바이더 제외"),
        }
    }

    if settings.static_rules.enabled {
        info!(rules = settings.static_rules.rules.len(), "정적 규칙 프로바이더 사용");
        providers.push(Arc::new(StaticProvider::new(settings.static_rules.rules.clone())));
    }

    providers
}

#[tokio::main]
async fn main() -> ExitCode {
    let settings = match Settings::load() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("설정 로드 실패: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let _guard = init_logging(&settings.logging);

    let shutdown = CancellationToken::new();
    let providers = make_providers(&settings, &shutdown);
    if providers.is_empty() {
        warn!("활성화된 프로바이더가 없음");
    }

    let service = Service::new(providers);
    tokio::spawn(cancel_on_signal(tokio::signal::ctrl_c(), shutdown.clone()));

    match service.run(shutdown).await {
        Err(DiscoveryError::Cancelled) | Ok(()) => {
            info!("디스커버리 서비스 종료");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "디스커버리 서비스 비정상 종료");
            ExitCode::FAILURE
        }
    }
}
