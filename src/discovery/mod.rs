//! 여러 프로바이더의 라우팅 규칙을 하나의 매칭 테이블로 병합하는 핵심 모듈입니다.
//!
//! 프로바이더는 `list`로 현재 규칙 전체를, `events`로 "규칙이 바뀌었을 수 있음"
//! 신호를 제공합니다. `Service`는 모든 신호를 하나로 병합해 기다리다가
//! 신호가 오면 테이블을 새로 만들어 통째로 교체합니다.

mod error;
mod events;
mod extend;
mod mapper;
mod provider;
mod service;

pub use error::{DiscoveryError, ProviderError};
pub use events::merge_events;
pub use extend::extend_rule;
pub use mapper::{ProviderId, UrlMapper};
pub use provider::Provider;
pub use service::Service;
