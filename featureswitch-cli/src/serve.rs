use std::sync::Arc;

use anyhow::{Context, Result};
use featureswitch_lib::{FeatureStore, MemoryStore, RetryPolicy, SledStore};
use tracing::info;

use crate::server::config::{ServerConfig, StorageBackend};
use crate::server::metrics::metrics;
use crate::server::{build_router, AppState};

/// Command-line values that take precedence over the config file and environment.
#[derive(Debug, Default, Clone)]
pub struct ServeOverrides {
    pub port: Option<u16>,
    pub hostname: Option<String>,
    pub data_dir: Option<String>,
    pub storage: Option<StorageBackend>,
}

impl ServeOverrides {
    pub fn apply(self, config: &mut ServerConfig) {
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(hostname) = self.hostname {
            config.server.hostname = hostname;
        }
        if let Some(data_dir) = self.data_dir {
            config.storage.data_dir = data_dir;
        }
        if let Some(storage) = self.storage {
            config.storage.backend = storage;
        }
    }
}

/// Resolve the effective configuration: defaults, then file, then
/// environment, then CLI flags.
pub fn resolve_config(config_path: &str, overrides: ServeOverrides) -> ServerConfig {
    let mut config = ServerConfig::load(config_path);
    config.apply_env_overrides();
    overrides.apply(&mut config);
    config
}

/// Open the configured storage backend.
pub fn open_store(config: &ServerConfig) -> Result<Arc<dyn FeatureStore>> {
    let retry = RetryPolicy::new(config.storage.retry_attempts);
    let store: Arc<dyn FeatureStore> = match config.storage.backend {
        StorageBackend::Sled => {
            let store = SledStore::open(&config.storage.data_dir, retry).with_context(|| {
                format!("failed to open sled store at {}", config.storage.data_dir)
            })?;
            Arc::new(store)
        }
        StorageBackend::Memory => Arc::new(MemoryStore::new()),
    };
    Ok(store)
}

pub async fn run_serve(config_path: &str, overrides: ServeOverrides) -> Result<()> {
    let config = resolve_config(config_path, overrides);
    let store = open_store(&config)?;

    let count = store.count().await.context("failed to count stored features")?;
    metrics().features_total.set(count as i64);
    info!(
        backend = config.storage.backend.as_str(),
        data_dir = %config.storage.data_dir,
        retry_attempts = config.storage.retry_attempts,
        features = count,
        "store opened"
    );

    let state = Arc::new(AppState::new(store));
    let app = build_router(state);

    let addr = config.listen_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind to {}", addr))?;
    info!("Serving feature switches on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {},
                    _ = sigterm.recv() => {},
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to install SIGTERM handler");
                ctrl_c.await.ok();
            }
        }
    }

    #[cfg(not(unix))]
    ctrl_c.await.ok();

    info!("Shutdown signal received, finishing in-flight requests...");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_overrides_win() {
        let mut config = ServerConfig::default();
        ServeOverrides {
            port: Some(9999),
            hostname: None,
            data_dir: Some("/tmp/fsw".to_string()),
            storage: Some(StorageBackend::Memory),
        }
        .apply(&mut config);

        assert_eq!(config.server.port, 9999);
        assert_eq!(config.server.hostname, "0.0.0.0");
        assert_eq!(config.storage.data_dir, "/tmp/fsw");
        assert_eq!(config.storage.backend, StorageBackend::Memory);
    }

    #[tokio::test]
    async fn test_open_sled_store_in_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = ServerConfig::default();
        config.storage.data_dir = dir.path().join("db").to_string_lossy().into_owned();

        let store = open_store(&config).unwrap();
        assert_eq!(store.count().await.unwrap(), 0);
    }
}
