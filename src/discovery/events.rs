use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

/// 여러 이벤트 수신자를 하나로 병합합니다.
///
/// 소스마다 전달 태스크를 하나씩 띄우고, 조정 태스크가 전부 끝날 때까지 기다립니다.
/// 출력 채널은 마지막 전달 태스크가 종료될 때 (모든 소스가 닫히거나 `shutdown`이
/// 취소되었을 때) 한 번만 닫힙니다. 소스 간 순서는 보장하지 않습니다.
pub fn merge_events(
    shutdown: &CancellationToken,
    sources: Vec<mpsc::Receiver<()>>,
) -> mpsc::Receiver<()> {
    let (tx, rx) = mpsc::channel(1);
    let mut forwarders = JoinSet::new();

    for (source_idx, source) in sources.into_iter().enumerate() {
        forwarders.spawn(forward(source_idx, source, tx.clone(), shutdown.clone()));
    }
    // 전달 태스크들이 가진 송신자만 남겨야 출력이 제때 닫힘
    drop(tx);

    tokio::spawn(async move {
        let mut forwarded = 0usize;
        while let Some(result) = forwarders.join_next().await {
            match result {
                Ok(count) => forwarded += count,
                Err(e) => error!(error = %e, "이벤트 전달 태스크 비정상 종료"),
            }
        }
        debug!(forwarded, "모든 이벤트 소스 종료, 병합 스트림 닫힘");
    });

    rx
}

async fn forward(
    source_idx: usize,
    mut source: mpsc::Receiver<()>,
    out: mpsc::Sender<()>,
    shutdown: CancellationToken,
) -> usize {
    let mut forwarded = 0;

    loop {
        let signal = tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            signal = source.recv() => signal,
        };

        let Some(signal) = signal else {
            debug!(source_idx, "이벤트 소스 닫힘");
            break;
        };

        let sent = tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            sent = out.send(signal) => sent,
        };
        if sent.is_err() {
            break;
        }
        forwarded += 1;
    }

    forwarded
}
