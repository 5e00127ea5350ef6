pub mod config;
pub mod ecs;
pub mod error;
pub mod logging;
pub mod stress;

pub use config::StressConfig;
pub use ecs::{Component, Coordinator, Entity, Signature, System};
pub use error::{EcsError, EcsResult};
pub use logging::{Logger, NullLogger, RecordingLogger, Severity, TracingLogger};
