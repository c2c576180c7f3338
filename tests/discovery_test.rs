use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use reverse_proxy_discovery::discovery::{
    DiscoveryError, Provider, ProviderError, ProviderId, Service, UrlMapper,
};
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout, Duration};
use tokio_util::sync::CancellationToken;

// Mock Provider
struct MockProvider {
    id: ProviderId,
    rules: Vec<(&'static str, &'static str, &'static str)>,
    initial_event: bool,
    close_events: bool,
    fail: bool,
    list_calls: AtomicUsize,
    events_calls: AtomicUsize,
}

impl MockProvider {
    fn new(id: ProviderId, rules: Vec<(&'static str, &'static str, &'static str)>) -> Self {
        Self {
            id,
            rules,
            initial_event: true,
            close_events: false,
            fail: false,
            list_calls: AtomicUsize::new(0),
            events_calls: AtomicUsize::new(0),
        }
    }

    // 이벤트를 보내지 않는 프로바이더
    fn silent(mut self) -> Self {
        self.initial_event = false;
        self
    }

    // 최초 이벤트 후 바로 스트림을 닫는 프로바이더
    fn closing(mut self) -> Self {
        self.close_events = true;
        self
    }

    fn failing(mut self) -> Self {
        self.fail = true;
        self
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn list(&self) -> Result<Vec<UrlMapper>, ProviderError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(ProviderError::InvalidRule {
                rule: "broken".to_string(),
                reason: "테스트용 실패".to_string(),
            });
        }

        Ok(self.rules
            .iter()
            // 서비스가 프로바이더 ID를 다시 붙이는지 확인하기 위해 일부러 다른 ID 사용
            .map(|(server, src, dst)| UrlMapper::new(ProviderId::Static, *server, src, *dst).unwrap())
            .collect())
    }

    fn events(&self, shutdown: CancellationToken) -> mpsc::Receiver<()> {
        self.events_calls.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = mpsc::channel(1);
        if self.initial_event {
            tx.try_send(()).unwrap();
        }
        if !self.close_events {
            tokio::spawn(async move {
                shutdown.cancelled().await;
                drop(tx);
            });
        }
        rx
    }

    fn id(&self) -> ProviderId {
        self.id
    }
}

// 서비스를 주어진 시간 동안 실행한 뒤 취소
async fn run_for(service: &Service, duration: Duration) -> Result<(), DiscoveryError> {
    let shutdown = CancellationToken::new();
    let canceller = shutdown.clone();
    tokio::spawn(async move {
        sleep(duration).await;
        canceller.cancel();
    });
    service.run(shutdown).await
}

fn match_table_providers() -> (Arc<MockProvider>, Arc<MockProvider>) {
    let p1 = Arc::new(MockProvider::new(ProviderId::File, vec![
        ("", "^/api/svc1/(.*)", "http://127.0.0.1:8080/blah1/$1"),
        ("m.example.com", "^/api/svc2/(.*)", "http://127.0.0.2:8080/blah2/$1/abc"),
    ]));
    let p2 = Arc::new(MockProvider::new(ProviderId::Docker, vec![
        ("", "/api/svc3/xyz", "http://127.0.0.3:8080/blah3/xyz"),
    ]).silent());
    (p1, p2)
}

#[tokio::test]
async fn test_service_run_merges_providers() {
    let p1 = Arc::new(MockProvider::new(ProviderId::File, vec![
        ("*", "^/api/svc1/(.*)", "http://127.0.0.1:8080/blah1/$1"),
        ("*", "^/api/svc2/(.*)", "http://127.0.0.2:8080/blah2/$1/abc"),
    ]));
    let p2 = Arc::new(MockProvider::new(ProviderId::Docker, vec![
        ("localhost", "/api/svc3/xyz", "http://127.0.0.3:8080/blah3/xyz"),
    ]).silent());
    let service = Service::new(vec![p1.clone(), p2.clone()]);

    let result = run_for(&service, Duration::from_millis(300)).await;
    assert_eq!(result, Err(DiscoveryError::Cancelled));

    let mappers = service.mappers();
    assert_eq!(mappers.len(), 3);
    assert_eq!(mappers[0].provider_id, ProviderId::File);
    assert_eq!(mappers[0].server, "*");
    assert_eq!(mappers[0].src_match.as_str(), "^/api/svc1/(.*)");
    assert_eq!(mappers[0].dst, "http://127.0.0.1:8080/blah1/$1");
    assert_eq!(mappers[1].provider_id, ProviderId::File);
    assert_eq!(mappers[2].provider_id, ProviderId::Docker);
    assert_eq!(mappers[2].server, "localhost");

    assert_eq!(p1.events_calls.load(Ordering::SeqCst), 1);
    assert_eq!(p2.events_calls.load(Ordering::SeqCst), 1);
    // 최초 이벤트는 p1에서 한 번뿐이므로 재구성도 한 번
    assert_eq!(p1.list_calls.load(Ordering::SeqCst), 1);
    assert_eq!(p2.list_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_service_match() {
    let (p1, p2) = match_table_providers();
    let service = Service::new(vec![p1, p2]);

    let result = run_for(&service, Duration::from_millis(300)).await;
    assert_eq!(result, Err(DiscoveryError::Cancelled));
    assert_eq!(service.mappers().len(), 3);

    let cases = [
        ("example.com", "/api/svc3/xyz", "http://127.0.0.3:8080/blah3/xyz", true),
        ("abc.example.com", "/api/svc1/1234", "http://127.0.0.1:8080/blah1/1234", true),
        ("zzz.example.com", "/aaa/api/svc1/1234", "/aaa/api/svc1/1234", false),
        ("m.example.com", "/api/svc2/1234", "http://127.0.0.2:8080/blah2/1234/abc", true),
        ("m1.example.com", "/api/svc2/1234", "/api/svc2/1234", false),
    ];

    for (server, src, dest, ok) in cases {
        let (res, matched) = service.match_url(server, src);
        assert_eq!(matched, ok, "server={} src={}", server, src);
        assert_eq!(res, dest, "server={} src={}", server, src);
    }
}

#[tokio::test]
async fn test_service_servers() {
    let p1 = Arc::new(MockProvider::new(ProviderId::File, vec![
        ("", "^/api/svc1/(.*)", "http://127.0.0.1:8080/blah1/$1"),
        ("m.example.com", "^/api/svc2/(.*)", "http://127.0.0.2:8080/blah2/$1/abc"),
    ]));
    let p2 = Arc::new(MockProvider::new(ProviderId::Docker, vec![
        ("xx.reproxy.io", "/api/svc3/xyz", "http://127.0.0.3:8080/blah3/xyz"),
        ("*", "/api/svc4/xyz", "http://127.0.0.4:8080/blah4/xyz"),
        ("m.example.com", "^/api/svc5/(.*)", "http://127.0.0.5:8080/$1"),
    ]).silent());
    let service = Service::new(vec![p1, p2]);

    let _ = run_for(&service, Duration::from_millis(300)).await;

    // catch-all은 제외, 중복은 그대로 유지
    assert_eq!(
        service.servers(),
        vec!["m.example.com", "xx.reproxy.io", "m.example.com"]
    );
}

#[tokio::test]
async fn test_service_end_to_end_scenario() {
    let a = Arc::new(MockProvider::new(ProviderId::File, vec![
        ("*", "^/api/svc1/(.*)", "http://h1/blah1/$1"),
    ]));
    let b = Arc::new(MockProvider::new(ProviderId::Docker, vec![
        ("localhost", "/api/svc3/xyz", "http://h3/blah3/xyz"),
    ]));
    let service = Service::new(vec![a, b]);

    let _ = run_for(&service, Duration::from_millis(300)).await;

    assert_eq!(service.match_url("any-host", "/api/svc1/42"), ("http://h1/blah1/42".to_string(), true));
    assert_eq!(service.match_url("localhost", "/api/svc3/xyz"), ("http://h3/blah3/xyz".to_string(), true));
    assert_eq!(service.match_url("other-host", "/api/svc3/xyz"), ("/api/svc3/xyz".to_string(), false));
}

#[tokio::test]
async fn test_service_extends_prefix_rules() {
    let p = Arc::new(MockProvider::new(ProviderId::Static, vec![
        ("*", "/api/blah/", "http://localhost:8080/"),
    ]));
    let service = Service::new(vec![p]);

    let _ = run_for(&service, Duration::from_millis(300)).await;

    let mappers = service.mappers();
    assert_eq!(mappers[0].src_match.as_str(), "^/api/blah/(.*)");
    assert_eq!(mappers[0].dst, "http://localhost:8080/$1");
    assert_eq!(
        service.match_url("example.com", "/api/blah/users/1"),
        ("http://localhost:8080/users/1".to_string(), true)
    );
}

#[tokio::test]
async fn test_service_first_rule_wins_across_providers() {
    let p1 = Arc::new(MockProvider::new(ProviderId::File, vec![
        ("*", "^/api/(.*)", "http://first/$1"),
    ]));
    let p2 = Arc::new(MockProvider::new(ProviderId::Docker, vec![
        ("*", "^/api/(.*)", "http://second/$1"),
    ]));
    let service = Service::new(vec![p1, p2]);

    let _ = run_for(&service, Duration::from_millis(300)).await;

    assert_eq!(service.match_url("example.com", "/api/x"), ("http://first/x".to_string(), true));
}

#[tokio::test]
async fn test_service_noop_rewrite_is_not_a_match() {
    let p = Arc::new(MockProvider::new(ProviderId::Static, vec![
        ("*", "^/same$", "/same"),
        ("*", "^/other$", "http://backend/other"),
    ]));
    let service = Service::new(vec![p]);

    let _ = run_for(&service, Duration::from_millis(300)).await;

    // 재작성 결과가 원래 경로와 같으면 매칭되지 않은 것으로 봄
    assert_eq!(service.match_url("example.com", "/same"), ("/same".to_string(), false));
    assert_eq!(service.match_url("example.com", "/other"), ("http://backend/other".to_string(), true));
}

#[tokio::test]
async fn test_service_skips_failing_provider() {
    let broken = Arc::new(MockProvider::new(ProviderId::Docker, vec![
        ("*", "^/broken/(.*)", "http://broken/$1"),
    ]).failing());
    let healthy = Arc::new(MockProvider::new(ProviderId::File, vec![
        ("*", "^/api/(.*)", "http://healthy/$1"),
    ]));
    let service = Service::new(vec![broken.clone(), healthy]);

    let result = run_for(&service, Duration::from_millis(300)).await;
    assert_eq!(result, Err(DiscoveryError::Cancelled));

    let mappers = service.mappers();
    assert_eq!(mappers.len(), 1);
    assert_eq!(mappers[0].provider_id, ProviderId::File);
    assert!(broken.list_calls.load(Ordering::SeqCst) >= 1);
}

#[tokio::test]
async fn test_service_cancellation_without_events() {
    let p = Arc::new(MockProvider::new(ProviderId::File, vec![
        ("*", "^/api/(.*)", "http://backend/$1"),
    ]).silent());
    let service = Service::new(vec![p.clone()]);

    let result = timeout(Duration::from_secs(2), run_for(&service, Duration::from_millis(100)))
        .await
        .expect("취소 후 run이 종료되어야 함");

    assert_eq!(result, Err(DiscoveryError::Cancelled));
    assert!(service.mappers().is_empty());
    assert_eq!(p.list_calls.load(Ordering::SeqCst), 0);
    assert_eq!(service.match_url("example.com", "/api/x"), ("/api/x".to_string(), false));
}

#[tokio::test]
async fn test_service_keeps_running_after_event_streams_close() {
    let p = Arc::new(MockProvider::new(ProviderId::File, vec![
        ("*", "^/api/(.*)", "http://backend/$1"),
    ]).closing());
    let service = Arc::new(Service::new(vec![p.clone()]));
    let shutdown = CancellationToken::new();

    let runner = {
        let service = service.clone();
        let shutdown = shutdown.clone();
        tokio::spawn(async move { service.run(shutdown).await })
    };

    sleep(Duration::from_millis(200)).await;
    assert!(!runner.is_finished(), "취소 전에는 종료되지 않아야 함");
    assert_eq!(service.mappers().len(), 1);
    assert_eq!(p.list_calls.load(Ordering::SeqCst), 1);

    shutdown.cancel();
    let result = timeout(Duration::from_secs(2), runner).await.unwrap().unwrap();
    assert_eq!(result, Err(DiscoveryError::Cancelled));
}

// 재구성마다 규칙 세트를 번갈아 돌려주고 이벤트를 계속 보내는 프로바이더
struct FlappingProvider {
    rebuilds: AtomicUsize,
}

#[async_trait]
impl Provider for FlappingProvider {
    async fn list(&self) -> Result<Vec<UrlMapper>, ProviderError> {
        let n = self.rebuilds.fetch_add(1, Ordering::SeqCst);
        let (count, dst) = if n % 2 == 0 { (2, "http://even/$1") } else { (3, "http://odd/$1") };

        Ok((0..count)
            .map(|i| UrlMapper::new(ProviderId::File, "*", &format!("^/svc{}/(.*)", i), dst).unwrap())
            .collect())
    }

    fn events(&self, shutdown: CancellationToken) -> mpsc::Receiver<()> {
        let (tx, rx) = mpsc::channel(1);
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    sent = tx.send(()) => if sent.is_err() { break },
                }
                tokio::task::yield_now().await;
            }
        });
        rx
    }

    fn id(&self) -> ProviderId {
        ProviderId::File
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_service_readers_see_whole_snapshots() {
    let provider = Arc::new(FlappingProvider { rebuilds: AtomicUsize::new(0) });
    let service = Arc::new(Service::new(vec![provider.clone()]));
    let shutdown = CancellationToken::new();

    let runner = {
        let service = service.clone();
        let shutdown = shutdown.clone();
        tokio::spawn(async move { service.run(shutdown).await })
    };

    let mut readers = Vec::new();
    for _ in 0..3 {
        let service = service.clone();
        readers.push(tokio::spawn(async move {
            for _ in 0..2000 {
                let mappers = service.mappers();
                match mappers.len() {
                    0 => {}
                    2 => assert!(mappers.iter().all(|m| m.dst == "http://even/$1")),
                    3 => assert!(mappers.iter().all(|m| m.dst == "http://odd/$1")),
                    n => panic!("부분적으로 만들어진 스냅샷: {}개", n),
                }
                tokio::task::yield_now().await;
            }
        }));
    }

    for reader in readers {
        reader.await.unwrap();
    }
    shutdown.cancel();

    let result = timeout(Duration::from_secs(2), runner).await.unwrap().unwrap();
    assert_eq!(result, Err(DiscoveryError::Cancelled));
    assert!(provider.rebuilds.load(Ordering::SeqCst) > 1);
}

// 규칙 조회가 오래 걸리는 프로바이더 (응답 없는 Docker 소켓 등)
struct SlowProvider {
    delay: Duration,
    list_calls: AtomicUsize,
}

#[async_trait]
impl Provider for SlowProvider {
    async fn list(&self) -> Result<Vec<UrlMapper>, ProviderError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        sleep(self.delay).await;
        Ok(vec![UrlMapper::new(ProviderId::Docker, "*", "^/api/(.*)", "http://slow/$1").unwrap()])
    }

    fn events(&self, shutdown: CancellationToken) -> mpsc::Receiver<()> {
        let (tx, rx) = mpsc::channel(1);
        tx.try_send(()).unwrap();
        tokio::spawn(async move {
            shutdown.cancelled().await;
            drop(tx);
        });
        rx
    }

    fn id(&self) -> ProviderId {
        ProviderId::Docker
    }
}

#[tokio::test]
async fn test_service_cancellation_during_rebuild() {
    let slow = Arc::new(SlowProvider {
        delay: Duration::from_secs(30),
        list_calls: AtomicUsize::new(0),
    });
    let service = Service::new(vec![slow.clone()]);

    let started = tokio::time::Instant::now();
    let result = timeout(Duration::from_secs(2), run_for(&service, Duration::from_millis(100)))
        .await
        .expect("재구성 중에도 취소되면 run이 바로 종료되어야 함");

    assert_eq!(result, Err(DiscoveryError::Cancelled));
    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(slow.list_calls.load(Ordering::SeqCst), 1);
    // 끝나지 않은 재구성 결과는 반영되지 않음
    assert!(service.mappers().is_empty());
}
