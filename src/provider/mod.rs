//! 라우팅 규칙 프로바이더 구현체들입니다.

pub mod docker;
mod file;
mod static_rules;

pub use docker::DockerProvider;
pub use file::FileProvider;
pub use static_rules::StaticProvider;
