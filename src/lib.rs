//! 리버스 프록시의 동적 라우트 디스커버리 코어입니다.
//!
//! # 주요 기능
//!
//! - 여러 프로바이더(Docker, 규칙 파일, 정적 설정)의 규칙 병합
//! - 변경 이벤트에 반응하는 라우팅 테이블 재구성
//! - server/경로 기반 매칭과 정규식 캡처를 이용한 목적지 재작성
//!
//! # 예제
//!
//! ```
//! use std::sync::Arc;
//! use reverse_proxy_discovery::discovery::{Provider, Service};
//! use reverse_proxy_discovery::provider::StaticProvider;
//! use tokio_util::sync::CancellationToken;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let provider = StaticProvider::new(vec![
//!     "*,/api/svc1/,http://127.0.0.1:8080/".to_string(),
//! ]);
//! let service = Arc::new(Service::new(vec![Arc::new(provider) as Arc<dyn Provider>]));
//!
//! let shutdown = CancellationToken::new();
//! let runner = {
//!     let service = service.clone();
//!     let shutdown = shutdown.clone();
//!     tokio::spawn(async move { service.run(shutdown).await })
//! };
//!
//! // 최초 이벤트로 테이블이 채워질 때까지 대기
//! while service.mappers().is_empty() {
//!     tokio::time::sleep(std::time::Duration::from_millis(10)).await;
//! }
//!
//! let (dest, ok) = service.match_url("example.com", "/api/svc1/42");
//! assert!(ok);
//! assert_eq!(dest, "http://127.0.0.1:8080/42");
//!
//! shutdown.cancel();
//! assert!(runner.await.unwrap().is_err());
//! # }
//! ```

pub mod discovery;
pub mod logging;
pub mod provider;
pub mod settings;
pub mod shutdown;
