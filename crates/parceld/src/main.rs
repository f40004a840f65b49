// # parceld - Parcel Tracking Daemon
//
// Thin integration layer over parcel-core. All polling, staleness and
// entity logic lives in the library; this binary only wires it up.
//
// The daemon is responsible for:
// 1. Reading configuration from environment variables
// 2. Initializing logging and the runtime
// 3. Validating the API key through the setup flow
// 4. Running the coordinator and rendering entity state
//
// ## Configuration
//
// - `PARCEL_API_KEY`: API key from the Parcel app (required)
// - `PARCEL_API_URL`: API base URL (default `https://api.parcel.app/v1`)
// - `PARCEL_NAME`: Entity name prefix (default `Parcel`)
// - `PARCEL_SCAN_INTERVAL_SECS`: Poll interval, 60..=86400 (default 1800)
// - `PARCEL_MIN_REFRESH_INTERVAL_SECS`: Throttle for scheduled polls (default 60)
// - `PARCEL_HTTP_TIMEOUT_SECS`: HTTP timeout, 1..=120 (default 10)
// - `PARCEL_ENTRY_STORE_PATH`: Persist validated entries to this JSON file (optional)
// - `PARCEL_LOG_LEVEL`: trace, debug, info, warn, error (default `info`)
//
// ## Signals
//
// - `SIGHUP`: refresh now
// - `SIGINT` / `SIGTERM`: shut down
//
// ## Example
//
// ```bash
// export PARCEL_API_KEY=your_key
// export PARCEL_ENTRY_STORE_PATH=/var/lib/parceld/entries.json
//
// parceld
// ```

mod config;

use anyhow::Result;
use config::Config;
use parcel_core::{
    ConfigEntry, CoordinatorEvent, EntryStore, FileEntryStore, MemoryEntryStore, RefreshHandle,
    SensorSet, SetupError, SetupFlow, ShipmentCoordinator, SourceRegistry,
};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio_stream::StreamExt;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Upper bound on waiting for the coordinator to stop
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration error or rejected API key
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParcelExitCode {
    CleanShutdown = 0,
    ConfigError = 1,
    RuntimeError = 2,
}

impl From<ParcelExitCode> for ExitCode {
    fn from(code: ParcelExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

fn main() -> ExitCode {
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return ParcelExitCode::ConfigError.into();
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {}", e);
        return ParcelExitCode::ConfigError.into();
    }

    let log_level = match config.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return ParcelExitCode::ConfigError.into();
    }

    info!("Starting parceld daemon");
    debug!("Configuration: {:?}", config);

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return ParcelExitCode::RuntimeError.into();
        }
    };

    let code = rt.block_on(async {
        match run_daemon(config).await {
            Ok(code) => code,
            Err(e) => {
                error!("Daemon error: {:#}", e);
                ParcelExitCode::RuntimeError
            }
        }
    });

    code.into()
}

/// Run the daemon until a shutdown signal arrives
async fn run_daemon(config: Config) -> Result<ParcelExitCode> {
    let registry = Arc::new(SourceRegistry::new());
    parcel_source_http::register(&registry);
    debug!("Registered sources: {:?}", registry.list_sources());

    let store: Arc<dyn EntryStore> = match &config.entry_store_path {
        Some(path) => {
            info!("Using file entry store: {}", path.display());
            Arc::new(FileEntryStore::new(path).await?)
        }
        None => Arc::new(MemoryEntryStore::new()),
    };

    let Some(account) = resolve_account(&config, &registry, &store).await? else {
        return Ok(ParcelExitCode::ConfigError);
    };

    let parcel_config = config.parcel_config(&account.api_key, &account.base_url);
    parcel_config.validate()?;

    let source = Arc::from(registry.create_source(&parcel_config.source)?);
    let (coordinator, events) = ShipmentCoordinator::new(source, &parcel_config.coordinator)?;
    let coordinator = Arc::new(coordinator);
    let handle = coordinator.handle();

    let event_logger = tokio::spawn(log_events(events));

    let renderer = {
        let snapshots = coordinator.snapshot_stream();
        let sensors = SensorSet::new(parcel_config.sensors.name_prefix.clone());
        tokio::spawn(render_entities(snapshots, sensors))
    };

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let runner = {
        let coordinator = Arc::clone(&coordinator);
        tokio::spawn(async move { coordinator.run_with_shutdown(Some(shutdown_rx)).await })
    };

    info!(
        "Polling {} every {}s",
        account.base_url, config.scan_interval_secs
    );

    let signal = wait_for_shutdown(&handle).await?;
    info!("Received shutdown signal: {}", signal);

    // The runner may already be gone if it failed at startup
    let _ = shutdown_tx.send(());

    match tokio::time::timeout(SHUTDOWN_TIMEOUT, runner).await {
        Ok(Ok(result)) => result?,
        Ok(Err(e)) => anyhow::bail!("Coordinator task panicked: {}", e),
        Err(_) => anyhow::bail!("Shutdown timeout after {:?}", SHUTDOWN_TIMEOUT),
    }

    // Dropping the last coordinator closes the snapshot and event streams
    drop(handle);
    drop(coordinator);
    let _ = renderer.await;
    let _ = event_logger.await;

    store.flush().await?;
    info!("Shutting down daemon");
    Ok(ParcelExitCode::CleanShutdown)
}

/// API key and base URL the coordinator polls with
struct Account {
    api_key: String,
    base_url: String,
}

impl From<ConfigEntry> for Account {
    fn from(entry: ConfigEntry) -> Self {
        Self {
            api_key: entry.api_key,
            base_url: entry.base_url,
        }
    }
}

/// Find a stored entry for the configured key, or create one through the setup flow
///
/// Returns `None` when the key is rejected.
async fn resolve_account(
    config: &Config,
    registry: &Arc<SourceRegistry>,
    store: &Arc<dyn EntryStore>,
) -> Result<Option<Account>> {
    let api_key = config.api_key.trim();

    let existing = store
        .list_entries()
        .await?
        .into_iter()
        .find(|entry| entry.api_key == api_key && entry.base_url == config.api_url);
    if let Some(entry) = existing {
        info!("Using stored config entry {}", entry.entry_id);
        return Ok(Some(entry.into()));
    }

    let flow = SetupFlow::new(Arc::clone(registry), Arc::clone(store))
        .with_base_url(config.api_url.clone())
        .with_timeout_secs(config.http_timeout_secs);

    match flow.submit(api_key).await {
        Ok(entry) => Ok(Some(entry.into())),
        Err(SetupError::InvalidAuth) => {
            error!("PARCEL_API_KEY was rejected by the tracking API");
            Ok(None)
        }
        Err(SetupError::EmptyApiKey) => {
            error!("PARCEL_API_KEY is empty");
            Ok(None)
        }
        Err(SetupError::CannotConnect(e)) => {
            // Not persisted; the coordinator retries on every tick
            warn!("Could not validate API key, polling anyway: {}", e);
            Ok(Some(Account {
                api_key: api_key.to_string(),
                base_url: config.api_url.clone(),
            }))
        }
        Err(e) => Err(e.into()),
    }
}

/// Log coordinator events until the coordinator goes away
async fn log_events(mut events: mpsc::Receiver<CoordinatorEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            CoordinatorEvent::RefreshFailed { error } => {
                warn!("Refresh failed, keeping last known shipments: {}", error)
            }
            other => debug!("Coordinator event: {:?}", other),
        }
    }
}

/// Keep the sensor set in line with the coordinator and log entity state
async fn render_entities(
    mut snapshots: impl tokio_stream::Stream<Item = Arc<parcel_core::Snapshot>> + Unpin,
    mut sensors: SensorSet,
) {
    while let Some(snapshot) = snapshots.next().await {
        if !snapshot.is_initialized() {
            continue;
        }

        let report = sensors.apply(&snapshot);
        if report.is_empty() {
            continue;
        }

        info!(
            "Entities: {} added, {} removed, {} updated ({} total)",
            report.added.len(),
            report.removed.len(),
            report.updated.len(),
            sensors.len()
        );

        for view in sensors.render() {
            match serde_json::to_string(&view) {
                Ok(json) => info!("{}", json),
                Err(e) => warn!("Failed to render entity {}: {}", view.unique_id, e),
            }
        }
    }
}

/// Wait for SIGTERM or SIGINT, refreshing on every SIGHUP
///
/// Returns the name of the signal that stopped the daemon.
#[cfg(unix)]
async fn wait_for_shutdown(handle: &RefreshHandle) -> Result<&'static str> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;
    let mut sighup = signal(SignalKind::hangup())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGHUP handler: {}", e))?;

    loop {
        tokio::select! {
            _ = sigterm.recv() => return Ok("SIGTERM"),
            _ = sigint.recv() => return Ok("SIGINT"),
            _ = sighup.recv() => {
                if handle.trigger() {
                    info!("SIGHUP received, refreshing shipments");
                } else {
                    warn!("SIGHUP received but the refresh request was not accepted");
                }
            }
        }
    }
}

/// Wait for SIGINT
///
/// Fallback implementation for non-Unix platforms, without manual refresh.
#[cfg(not(unix))]
async fn wait_for_shutdown(_handle: &RefreshHandle) -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
    Ok("SIGINT")
}
