pub mod config;
pub mod handlers;
pub mod metrics;
pub mod observability;
pub mod server;

pub use crate::config::{AppConfig, ConfigError};
pub use crate::observability::init_tracing;
pub use crate::server::{AppState, BanlistServer, build_app};
