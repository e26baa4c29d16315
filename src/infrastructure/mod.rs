//! Infrastructure layer module
//!
//! Cross-cutting concerns shared by the services and the CLI:
//! - Configuration loading and validation (figment)
//! - Logging setup (tracing)
//! - Retry policy for service and tool calls
//! - Summary persistence (JSON)

pub mod config;
pub mod logging;
pub mod persistence;
pub mod retry;

pub use config::{ConfigError, ConfigLoader};
pub use logging::{LogConfig, LoggerImpl};
pub use persistence::SummaryWriter;
pub use retry::RetryPolicy;
