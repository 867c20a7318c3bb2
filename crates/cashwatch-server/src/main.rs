//! Cashwatch — keeps a deduplicated, timestamped list of cashtags and
//! contract addresses reported by a browser agent.

use std::path::PathBuf;
use std::sync::Arc;

use cashwatch_core::{CashwatchConfig, DataPaths};
use cashwatch_runtime::{CycleStatus, Scheduler};
use cashwatch_server::routes;
use cashwatch_server::{build_reconciler, resolve_data_dir, AppState};
use cashwatch_store::{JsonRecordStore, LoadOutcome};
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();

    match args.get(1).map(String::as_str) {
        None | Some("run") => run_service().await,
        Some("once") => {
            let config = CashwatchConfig::from_env(resolve_data_dir())?;
            let reconciler = build_reconciler(&config)?;
            let report = reconciler.run_cycle().await;
            println!("{}", serde_json::to_string_pretty(&report)?);
            std::process::exit(if report.status == CycleStatus::Completed { 0 } else { 1 });
        }
        Some("show") => {
            let data_dir = args.get(2).map(PathBuf::from).unwrap_or_else(resolve_data_dir);
            let store = JsonRecordStore::new(DataPaths::new(&data_dir)?.store_file);
            match store.load() {
                LoadOutcome::Loaded(records) => {
                    println!("{}", serde_json::to_string_pretty(&records)?);
                }
                LoadOutcome::Salvaged { records, reason } => {
                    eprintln!("Warning: {} needs repair: {}", store.path().display(), reason);
                    println!("{}", serde_json::to_string_pretty(&records)?);
                }
                LoadOutcome::Missing => println!("[]"),
                LoadOutcome::Corrupt { reason } | LoadOutcome::Unreadable { reason } => {
                    eprintln!("Cannot read {}: {}", store.path().display(), reason);
                    std::process::exit(1);
                }
            }
            Ok(())
        }
        Some("--help" | "-h" | "help") => {
            println!("Cashwatch — cashtag / contract address reconciler");
            println!();
            println!("Usage: cashwatch [command]");
            println!();
            println!("Commands:");
            println!("  (none), run              Run the scheduler and the status API");
            println!("  once                     Run a single reconciliation cycle");
            println!("  show [data-dir]          Print the stored records");
            println!("  help                     Show this help message");
            Ok(())
        }
        Some(other) => {
            eprintln!("Unknown command: {}. Use 'cashwatch help' for usage.", other);
            std::process::exit(1);
        }
    }
}

async fn run_service() -> anyhow::Result<()> {
    let data_dir = resolve_data_dir();
    info!("Data directory: {}", data_dir.display());

    let config = CashwatchConfig::from_env(&data_dir)?;
    let reconciler = Arc::new(build_reconciler(&config)?);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {}", e);
            // Keep the sender alive; dropping it would stop the service.
            std::future::pending::<()>().await;
        }
        info!("Shutdown requested");
        let _ = shutdown_tx.send(true);
    });

    let scheduler = Scheduler::new(reconciler.clone(), config.interval(), config.run_on_start);
    let scheduler_handle = tokio::spawn(scheduler.run(shutdown_rx.clone()));

    let addr = format!("0.0.0.0:{}", config.port);
    let state = Arc::new(AppState::new(config, reconciler));
    let app = routes::build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Cashwatch status API listening on {}", addr);

    let mut server_shutdown = shutdown_rx;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = server_shutdown.wait_for(|stop| *stop).await;
        })
        .await?;

    scheduler_handle.await?;
    info!("Cashwatch stopped");
    Ok(())
}
