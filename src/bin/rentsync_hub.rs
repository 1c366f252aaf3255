//! rentsync-hub: central booking service
//!
//! Writes bookings to the platform's own store for brands in `integrated`
//! mode, serves occupancy and finance KPIs, runs the daily snapshot
//! scheduler and hosts the audited admin routes.
//!
//! ## Configuration
//! - `--config <path>` or `RENTSYNC_CONFIG`: YAML configuration file
//! - `RENTSYNC__SECTION__KEY`: per-key overrides
//! - `admin.token`: enables the `/admin` routes
//! - `--policy-version`: print the linked writer policy version and exit

use std::time::Duration;

use backon::Retryable;
use tracing::{error, info, warn};

use rentsync::config::Config;
use rentsync::policy::{WriterRole, POLICY_VERSION};
use rentsync::runtime::Runtime;
use rentsync::storage::init_storage;
use rentsync::utils::bootstrap::{config_path_arg, init_tracing, print_policy_version_if_requested};
use rentsync::utils::retry::connection_backoff;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();
    if print_policy_version_if_requested(&args) {
        return Ok(());
    }

    init_tracing();

    let config = Config::load(config_path_arg(&args)).map_err(|e| {
        error!(error = %e, "failed to load configuration");
        e
    })?;
    config.check_role(WriterRole::Hub)?;

    info!(policy_version = POLICY_VERSION, "starting rentsync-hub");

    let storage = config.storage.clone();
    let (stores, _pool) = (|| {
        let storage = storage.clone();
        async move { init_storage(&storage).await.map_err(|e| e.to_string()) }
    })
    .retry(connection_backoff())
    .notify(|err: &String, dur: Duration| {
        warn!(error = %err, delay = ?dur, "storage unavailable, retrying");
    })
    .await?;

    let runtime = Runtime::builder(WriterRole::Hub, config)
        .with_stores(stores)
        .build()?;

    runtime
        .run()
        .await
        .map_err(|e| -> Box<dyn std::error::Error> { e })
}
