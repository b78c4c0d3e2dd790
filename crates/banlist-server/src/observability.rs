//! Logging setup.
//!
//! The filter sits behind a reload layer so the level from the config file can
//! be applied after the subscriber is installed. `RUST_LOG` always wins.

use std::sync::OnceLock;

use tracing_subscriber::{EnvFilter, Registry, fmt, prelude::*, reload};

type FilterHandle = reload::Handle<EnvFilter, Registry>;

static FILTER_HANDLE: OnceLock<FilterHandle> = OnceLock::new();

/// Level used until the configuration is loaded.
pub const DEFAULT_LEVEL: &str = "info";

/// Install the global subscriber with [`DEFAULT_LEVEL`].
pub fn init_tracing() {
    init_tracing_with_level(DEFAULT_LEVEL);
}

pub fn init_tracing_with_level(level: &str) {
    let filter = EnvFilter::try_from_env("RUST_LOG").unwrap_or_else(|_| level_filter(level));

    let (filter_layer, handle) = reload::Layer::new(filter);
    let _ = FILTER_HANDLE.set(handle);

    let _ = tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt::layer().with_target(true))
        .try_init();
}

/// Switch to `level` unless `RUST_LOG` is set.
///
/// Returns `true` if the filter changed.
pub fn apply_logging_level(level: &str) -> bool {
    if std::env::var_os("RUST_LOG").is_some() {
        return false;
    }
    let Some(handle) = FILTER_HANDLE.get() else {
        return false;
    };

    match handle.modify(|filter| *filter = level_filter(level)) {
        Ok(()) => {
            tracing::info!(level, "Log level applied");
            true
        }
        Err(e) => {
            tracing::warn!(level, error = %e, "Failed to apply log level");
            false
        }
    }
}

/// Filter for `level`, keeping driver chatter at warn unless tracing.
fn level_filter(level: &str) -> EnvFilter {
    let level = level.to_ascii_lowercase();
    if level == "trace" {
        return EnvFilter::new(level);
    }
    EnvFilter::new(format!("{level},sqlx=warn"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_filter_quiets_sqlx() {
        let filter = level_filter("DEBUG").to_string();
        assert!(filter.contains("sqlx=warn"), "{filter}");
        assert!(filter.contains("debug"), "{filter}");
        assert!(!level_filter("trace").to_string().contains("sqlx"));
    }
}
