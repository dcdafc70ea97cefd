mod config;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use chrono::Local;
use supplier_engine::{BatchScheduler, ReqwestLookup};
use supplier_logging::supplier_info;

use config::{AppConfig, DEFAULT_CONFIG_PATH};

fn main() -> anyhow::Result<()> {
    let config_path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
    let config = AppConfig::load(&config_path)?;

    supplier_logging::initialize(
        config.log_destination.into(),
        config.log_level.into(),
        &config.log_path,
    );

    let started = Local::now();
    supplier_info!("Supplier lookup started at {}", started.to_rfc3339());
    config.log_summary();

    let lookup = ReqwestLookup::new(config.lookup_settings()).context("failed to build HTTP client")?;
    let scheduler = BatchScheduler::new(config.run_config(), Arc::new(lookup));

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start tokio runtime")?;
    let summary = runtime
        .block_on(scheduler.run())
        .context("supplier lookup could not start")?;

    let elapsed = Local::now() - started;
    if summary.already_complete {
        supplier_info!("Nothing to do; delete the progress file to start a new run");
    } else {
        supplier_info!(
            "Processing completed successfully in {} s",
            elapsed.num_seconds()
        );
    }
    Ok(())
}
