use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};

use mindfulness_daemon::categorization::{CategorizationManager, LoggingPrompt};
use mindfulness_daemon::enforcement::NoEnforcement;
use mindfulness_daemon::event::DaemonEvent;
use mindfulness_daemon::repository::ApplicationRepository;
use mindfulness_daemon::snapshot::SystemSnapshotSource;
use mindfulness_daemon::{config, logging, monitor, paths, pipeline};

#[tokio::main]
async fn main() {
    // ── App data directory ────────────────────────────────────────────────────
    let app_dir = paths::app_data_dir();
    if let Err(e) = std::fs::create_dir_all(&app_dir) {
        eprintln!("Failed to create app data directory {}: {e}", app_dir.display());
        std::process::exit(1);
    }

    // ── Logging ───────────────────────────────────────────────────────────────
    logging::init(&paths::log_file_path());

    // ── Configuration ─────────────────────────────────────────────────────────
    let config_path = paths::config_file_path();
    let initial_config = config::load_or_default(&config_path).unwrap_or_else(|e| {
        log::warn!("Config error (using defaults): {e}");
        config::Config::default()
    });
    let limits = initial_config.limits.clone();
    let shared_config = Arc::new(RwLock::new(initial_config));

    // ── Catalog and main-context consumers ────────────────────────────────────
    let repo = ApplicationRepository::open(paths::catalog_file_path());
    log::info!("Catalog loaded: {} applications", repo.count());

    let mut pipeline = pipeline::Pipeline::new(
        repo,
        CategorizationManager::new(Box::new(LoggingPrompt)),
        Box::new(NoEnforcement),
        limits,
    );

    let (event_tx, mut event_rx) = mpsc::channel::<DaemonEvent>(32);

    // ── Background tasks ──────────────────────────────────────────────────────
    tokio::spawn(config::watch_config(config_path, event_tx.clone()));
    let monitor_handle = monitor::start(
        SystemSnapshotSource::new(),
        Arc::clone(&shared_config),
        event_tx.clone(),
    );

    // Graceful shutdown on Ctrl+C.
    {
        let tx = event_tx.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                let _ = tx.send(DaemonEvent::Shutdown).await;
            }
        });
    }

    log::info!("mindfulness-daemon v{} started", env!("CARGO_PKG_VERSION"));

    // ── Event loop ────────────────────────────────────────────────────────────
    while let Some(evt) = event_rx.recv().await {
        match evt {
            DaemonEvent::ConfigReloaded(new_config) => {
                log::info!("Config reloaded");
                *shared_config.write().await = new_config.clone();
                pipeline.handle(DaemonEvent::ConfigReloaded(new_config));
            }
            DaemonEvent::Shutdown => {
                log::info!("Shutting down");
                break;
            }
            other => pipeline.handle(other),
        }
    }

    // Signal stop, let any in-flight poll cycle finish, and join the monitor
    // before the catalog flush so no event can arrive mid-write.
    monitor_handle.stop().await;
    pipeline.flush();
}
