//! Builds the runtime from configuration.

use std::path::PathBuf;
use std::sync::Arc;

use cashwatch_agent::{AgentSettings, GradioAgent};
use cashwatch_core::{CashwatchConfig, Result};
use cashwatch_reconcile::{parse_utc_offset, SystemClock};
use cashwatch_runtime::{CycleOptions, Reconciler};
use cashwatch_store::JsonRecordStore;
use tracing::{info, warn};

pub fn resolve_data_dir() -> PathBuf {
    std::env::var("CASHWATCH_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("data"))
}

/// Wire the Gradio agent, the JSON store and the system clock together.
///
/// Writes default agent settings on first run so they can be edited.
pub fn build_reconciler(config: &CashwatchConfig) -> Result<Reconciler> {
    let offset = parse_utc_offset(&config.utc_offset)?;

    let settings_path = &config.data_paths.agent_config_file;
    let first_run = !settings_path.exists();
    let mut settings = AgentSettings::load(settings_path);
    if first_run {
        match settings.save() {
            Ok(()) => info!("Wrote default agent settings to {}", settings_path.display()),
            Err(e) => warn!("Could not write default agent settings: {}", e),
        }
    }
    if let Some(url) = &config.agent_url {
        settings = settings.with_base_url(url.clone());
    }
    info!(
        "Agent: {} ({} / {})",
        settings.call_url(),
        settings.llm_provider,
        settings.llm_model_name
    );

    Ok(Reconciler::new(
        Arc::new(GradioAgent::new(settings)),
        JsonRecordStore::new(&config.data_paths.store_file),
        Arc::new(SystemClock::new(offset)),
        CycleOptions {
            fetch_timeout: config.fetch_timeout(),
            strict_reads: config.strict_reads,
        },
    ))
}
