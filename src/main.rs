//! launcher-daemon: background monitor for a run-dialog launcher
//!
//! The daemon provides:
//! - A live index of the executables in every `$PATH` directory
//! - A global X11 hotkey that asks the front-end to show the dialog
//! - An IPC socket for index queries and change/activation notifications
//!
//! Both listeners run on dedicated threads and report back through one
//! channel that the main loop drains and re-publishes to IPC subscribers.

mod config;
mod events;
mod hotkey;
mod index;
mod ipc;
mod lifecycle;
mod watcher;

use anyhow::{bail, Context, Result};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::events::MonitorEvent;
use crate::hotkey::X11Session;
use crate::index::PathIndex;
use crate::ipc::Server;
use crate::lifecycle::{Monitor, ShutdownSignal};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "launcher-daemon starting"
    );

    // Load configuration
    let config = Config::load()?;
    info!(
        directories = config.search_path.len(),
        hotkey = %config.hotkey,
        ?config.socket_path,
        "configuration loaded"
    );

    // Create shutdown signal handler
    let mut shutdown = ShutdownSignal::new().context("failed to install signal handlers")?;

    // Listener threads -> main loop
    let (mut monitor, mut monitor_rx) = Monitor::new(config.poll_interval);

    let registered = monitor.register_directories(&config.search_path);
    if registered < config.search_path.len() {
        warn!(
            registered,
            configured = config.search_path.len(),
            "some PATH entries are not directories"
        );
    }

    let session = X11Session::connect().context("unable to open display")?;
    match monitor.bind_hotkey(session, &config.hotkey) {
        Ok(true) => info!(hotkey = %config.hotkey, "hotkey bound"),
        Ok(false) => warn!(hotkey = %config.hotkey, "hotkey not bound, continuing without activation"),
        Err(e) => error!(error = %e, "failed to grab hotkey"),
    }

    let report = monitor.start();
    if report.watched.is_none() && !report.hotkey_running {
        bail!("neither the directory watcher nor the hotkey listener could start");
    }

    // Main loop -> IPC subscribers
    let (event_tx, _) = broadcast::channel::<MonitorEvent>(64);

    let server = Server::new(&config.socket_path, monitor.status(), event_tx.clone())?;
    let index = monitor.index().clone();

    info!("daemon initialized, entering main loop");

    tokio::select! {
        _ = relay_events(&mut monitor_rx, &index, &event_tx) => {
            info!("monitor event channel closed");
        }

        result = server.run() => {
            if let Err(e) = result {
                error!(?e, "IPC server error");
            }
        }

        _ = shutdown.wait() => {
            info!("shutdown signal received");
        }
    }

    // Cleanup
    info!("shutting down...");

    tokio::task::spawn_blocking(move || monitor.shutdown())
        .await
        .context("monitor shutdown panicked")?;
    server.shutdown().await;

    info!("launcher-daemon stopped");

    Ok(())
}

/// Log each monitor event and re-publish it to IPC subscribers
async fn relay_events(
    rx: &mut mpsc::UnboundedReceiver<MonitorEvent>,
    index: &PathIndex,
    events: &broadcast::Sender<MonitorEvent>,
) {
    while let Some(event) = rx.recv().await {
        debug!(%event, "monitor event");
        match &event {
            MonitorEvent::PathsChanged => info!(
                directories = index.directory_count(),
                files = index.file_count(),
                "path index changed"
            ),
            MonitorEvent::Activated => info!("activation hotkey pressed"),
            MonitorEvent::ListenerFailed { listener, message } => {
                error!(%listener, %message, "listener failed")
            }
        }

        // No subscribers is not an error
        let _ = events.send(event);
    }
}
