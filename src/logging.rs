use std::ffi::OsStr;
use std::path::Path;

use tracing::warn;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

use crate::settings::{LogFormat, LogOutput, LogSettings};

const DEFAULT_LOG_FILE: &str = "reverse_proxy_discovery.log";

/// 설정에 맞춰 전역 tracing 구독자를 설치합니다.
///
/// `RUST_LOG`가 있으면 그 지시어가 함께 적용됩니다. 반환된 guard가 살아 있는 동안
/// 비동기 writer가 로그를 flush 하므로 프로세스 종료 시점까지 들고 있어야 합니다.
/// 이미 구독자가 설치된 경우(테스트 등)에는 경고만 남기고 계속 진행합니다.
pub fn init_logging(settings: &LogSettings) -> WorkerGuard {
    let filter = EnvFilter::from_default_env()
        .add_directive(settings.level.into());

    let (writer, guard) = match &settings.output {
        LogOutput::Stdout => tracing_appender::non_blocking(std::io::stdout()),
        LogOutput::File(path) => {
            let path = Path::new(path);
            let dir = path.parent()
                .filter(|d| !d.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let file_name = path.file_name().unwrap_or_else(|| OsStr::new(DEFAULT_LOG_FILE));
            tracing_appender::non_blocking(tracing_appender::rolling::daily(dir, file_name))
        }
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(settings.output == LogOutput::Stdout)
        .with_timer(UtcTime::rfc_3339())
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    let result = match settings.format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    if let Err(e) = result {
        warn!(error = %e, "로깅 초기화 건너뜀");
    }

    guard
}
