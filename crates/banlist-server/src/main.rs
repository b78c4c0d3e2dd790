use std::sync::Arc;

use banlist_core::BannedUsersRegistry;
use banlist_postgres::PgCluster;
use banlist_server::config::loader::{DEFAULT_CONFIG_PATH, load_config};
use banlist_server::server::shutdown_signal;
use banlist_server::{AppConfig, AppState, BanlistServer};

/// Exit code for configuration and startup errors.
const EXIT_CONFIG: i32 = 2;

#[tokio::main]
async fn main() {
    match dotenvy::dotenv() {
        Ok(_) => {}
        Err(dotenvy::Error::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => eprintln!("Ignoring unreadable .env file: {e}"),
    }

    banlist_server::observability::init_tracing();

    let (path, origin) = config_path(std::env::args().skip(1));
    let cfg = load_config(Some(&path)).unwrap_or_else(|e| {
        eprintln!("Invalid configuration in {path}: {e}");
        std::process::exit(EXIT_CONFIG);
    });
    tracing::info!(path = %path, origin, "Configuration loaded");
    banlist_server::observability::apply_logging_level(&cfg.logging.level);

    if let Err(e) = run(cfg).await {
        tracing::error!(error = %e, "Banlist server failed");
        std::process::exit(1);
    }
}

async fn run(cfg: AppConfig) -> anyhow::Result<()> {
    let cluster = match PgCluster::connect(&cfg.cluster_config()) {
        Ok(cluster) => Arc::new(cluster),
        Err(e) => {
            eprintln!("Postgres cluster initialization failed: {e}");
            std::process::exit(EXIT_CONFIG);
        }
    };

    let registry = match BannedUsersRegistry::builder()
        .node_selector(cluster.clone())
        .options(cfg.refresh_options())
        .build()
    {
        Ok(registry) => Arc::new(registry),
        Err(e) => {
            eprintln!("Banned users registry initialization failed: {e}");
            std::process::exit(EXIT_CONFIG);
        }
    };

    if banlist_server::metrics::init_metrics() {
        banlist_server::metrics::describe(registry.metrics());
    }

    // Learn node roles before the first refresh tick
    let topology = cluster.check_once().await;
    tracing::info!(
        alive = topology.alive().len(),
        primary = topology.primary().is_some(),
        "Initial cluster check done"
    );

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let checker = cluster.spawn_checker(shutdown_rx.clone());
    let poller = registry.spawn_poller(shutdown_rx);

    let state = AppState::new(registry, cfg.sampling.lookup_log_modulo);
    let served = BanlistServer::new(cfg.addr(), state)
        .run(shutdown_signal())
        .await;

    let _ = shutdown_tx.send(true);
    for (task, handle) in [("poller", poller), ("cluster checker", checker)] {
        if let Err(e) = handle.await {
            tracing::warn!(task, error = %e, "Background task ended abnormally");
        }
    }

    served
}

/// Config file location: `--config <path>`, then `BANLIST_CONFIG`, then
/// [`DEFAULT_CONFIG_PATH`]. Also returns where the path came from.
fn config_path(mut args: impl Iterator<Item = String>) -> (String, &'static str) {
    while let Some(arg) = args.next() {
        if let Some(path) = arg.strip_prefix("--config=") {
            return (path.to_string(), "cli");
        }
        if arg == "--config" {
            if let Some(path) = args.next() {
                return (path, "cli");
            }
        }
    }

    match std::env::var("BANLIST_CONFIG") {
        Ok(path) if !path.is_empty() => (path, "env"),
        _ => (DEFAULT_CONFIG_PATH.to_string(), "default"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> impl Iterator<Item = String> {
        list.iter().map(|s| s.to_string()).collect::<Vec<_>>().into_iter()
    }

    #[test]
    fn test_config_flag_wins() {
        assert_eq!(config_path(args(&["--config", "/etc/banlist.toml"])), ("/etc/banlist.toml".into(), "cli"));
        assert_eq!(config_path(args(&["-v", "--config=local.toml"])), ("local.toml".into(), "cli"));
    }
}
