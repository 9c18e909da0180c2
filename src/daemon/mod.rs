// Daemon: config resolution, logging, and the bootstrap that wires the
// scrape service to the HTTP server.

pub mod pool;
pub mod queue;
pub mod service;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};

use crate::daemon::service::ScrapeService;
use crate::models::DaemonConfig;
use crate::server::{self, AppState};
use crate::storage::{InMemoryJobStore, JobStore, JsonJobStore};

const APP_DIR: &str = "lead-scrape-queue";

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

fn read_config_file(path: &Path) -> Result<DaemonConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let config: DaemonConfig = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse config file {}", path.display()))?;
    tracing::info!("Loaded config from: {}", path.display());
    Ok(config)
}

/// Load the DaemonConfig, first match wins:
///   1. `config_path` (the `--config` flag); must exist
///   2. `LSQ_CONFIG_DIR/config.json`
///   3. `dirs::config_dir()/lead-scrape-queue/config.json`
///   4. `{data_dir}/config.json`
///   5. `DaemonConfig::default()`
pub fn load_config(config_path: Option<&Path>) -> Result<DaemonConfig> {
    if let Some(path) = config_path {
        if path.exists() {
            return read_config_file(path);
        }
        return Err(anyhow::anyhow!("Config file not found: {}", path.display()));
    }

    let mut candidates = Vec::new();
    if let Ok(dir) = std::env::var("LSQ_CONFIG_DIR") {
        candidates.push(PathBuf::from(dir).join("config.json"));
    }
    if let Some(dir) = dirs::config_dir() {
        candidates.push(dir.join(APP_DIR).join("config.json"));
    }
    candidates.push(resolve_data_dir(None).join("config.json"));

    for path in candidates {
        if path.exists() {
            return read_config_file(&path);
        }
    }

    tracing::info!("No config file found, using defaults");
    Ok(DaemonConfig::default())
}

/// Apply `LSQ_WORKERS` and `LSQ_LIVE_SCRAPER_URL` on top of a loaded config.
pub fn apply_env_overrides(config: &mut DaemonConfig) -> Result<()> {
    apply_overrides(config, |key| std::env::var(key).ok())
}

fn apply_overrides(
    config: &mut DaemonConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<()> {
    if let Some(workers) = lookup("LSQ_WORKERS") {
        config.worker_count = workers
            .trim()
            .parse()
            .with_context(|| format!("LSQ_WORKERS is not a number: '{}'", workers))?;
    }
    if let Some(url) = lookup("LSQ_LIVE_SCRAPER_URL") {
        let url = url.trim();
        config.live_scraper_url = if url.is_empty() {
            None
        } else {
            Some(url.to_string())
        };
    }
    Ok(())
}

/// Resolve the data directory: `override_dir`, then `LSQ_DATA_DIR`, then
/// the platform data dir (`~/.local/share/lead-scrape-queue` on Linux).
pub fn resolve_data_dir(override_dir: Option<&Path>) -> PathBuf {
    if let Some(dir) = override_dir {
        return dir.to_path_buf();
    }

    if let Ok(d) = std::env::var("LSQ_DATA_DIR") {
        return PathBuf::from(d);
    }

    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

/// Log to stderr and, when the file can be opened, to `{data_dir}/daemon.log`.
/// A subscriber installed earlier (e.g. by `--verbose`) is left in place.
fn init_tracing(data_dir: &Path) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let log_path = data_dir.join("daemon.log");

    // Each daemon session starts with a fresh log.
    match std::fs::File::create(&log_path) {
        Ok(_) => {
            let appender = tracing_appender::rolling::never(data_dir, "daemon.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            let file_layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false);

            let result = tracing_subscriber::registry()
                .with(env_filter)
                .with(stderr_layer)
                .with(file_layer)
                .try_init();

            if result.is_ok() {
                tracing::info!("Logging to stderr and {}", log_path.display());
            }

            // The writer thread must outlive the daemon.
            std::mem::forget(guard);
        }
        Err(e) => {
            let result = tracing_subscriber::registry()
                .with(env_filter)
                .with(stderr_layer)
                .try_init();

            if result.is_ok() {
                tracing::warn!(
                    "Could not open log file {}: {}. Logging to stderr only.",
                    log_path.display(),
                    e
                );
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Bootstrap
// ---------------------------------------------------------------------------

/// Fully resolved configuration for one daemon run. CLI flags beat
/// environment overrides, which beat the config file.
pub fn resolve_config(
    config_path: Option<&Path>,
    data_dir_override: Option<&Path>,
    port_override: Option<u16>,
    workers_override: Option<usize>,
) -> Result<DaemonConfig> {
    let mut config = load_config(config_path)?;
    apply_env_overrides(&mut config)?;

    if let Some(p) = port_override {
        config.port = p;
    }
    if let Some(w) = workers_override {
        config.worker_count = w;
    }

    let data_dir = match (data_dir_override, config.data_dir.as_deref()) {
        (Some(d), _) => d.to_path_buf(),
        (None, Some(d)) => d.to_path_buf(),
        (None, None) => resolve_data_dir(None),
    };
    config.data_dir = Some(data_dir);

    config.validate()?;
    Ok(config)
}

async fn open_store(config: &DaemonConfig, data_dir: &Path) -> Result<Arc<dyn JobStore>> {
    if config.persist_jobs {
        let store = JsonJobStore::new(data_dir.to_path_buf()).await?;
        tracing::info!("Persisting job history to {}", data_dir.join("jobs.json").display());
        Ok(Arc::new(store))
    } else {
        Ok(Arc::new(InMemoryJobStore::new()))
    }
}

/// Run the daemon until Ctrl+C, SIGTERM or `POST /api/shutdown`.
pub async fn start_daemon(
    config_path: Option<&Path>,
    data_dir_override: Option<&Path>,
    port_override: Option<u16>,
    workers_override: Option<usize>,
) -> Result<()> {
    let config = resolve_config(config_path, data_dir_override, port_override, workers_override)?;
    let data_dir = config
        .data_dir
        .clone()
        .unwrap_or_else(|| resolve_data_dir(None));

    tokio::fs::create_dir_all(&data_dir)
        .await
        .context("Failed to create data directory")?;

    init_tracing(&data_dir);
    tracing::info!("Data directory: {}", data_dir.display());

    let store = open_store(&config, &data_dir).await?;
    let service = Arc::new(ScrapeService::launch(&config, store).await?);
    let config = Arc::new(config);

    let (shutdown_tx, mut shutdown_rx) = tokio::sync::watch::channel(());

    let state = Arc::new(AppState {
        service: Arc::clone(&service),
        config: Arc::clone(&config),
        start_time: Instant::now(),
        shutdown_tx: Some(shutdown_tx.clone()),
    });

    let router = server::create_router(state);
    let bind_addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;

    tracing::info!("Daemon started. Listening on http://{}", bind_addr);

    let server_handle = tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                shutdown_rx.changed().await.ok();
                tracing::info!("HTTP server received shutdown signal");
            })
            .await
            .ok();
    });

    let mut api_shutdown_rx = shutdown_tx.subscribe();

    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Received Ctrl+C signal");
            }
            _ = sigterm.recv() => {
                tracing::info!("Received SIGTERM signal");
            }
            _ = api_shutdown_rx.changed() => {
                tracing::info!("Received API shutdown signal");
            }
        }
    }
    #[cfg(not(unix))]
    {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Received Ctrl+C signal");
            }
            _ = api_shutdown_rx.changed() => {
                tracing::info!("Received API shutdown signal");
            }
        }
    }

    let _ = shutdown_tx.send(());

    // In-flight scrapes run to completion; nothing new is claimed.
    service.shutdown().await;

    let _ = server_handle.await;

    tracing::info!("Daemon exited cleanly.");
    Ok(())
}
