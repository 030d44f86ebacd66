//! Zenoh bridge for etcd.
//!
//! This bridge polls an etcd member's stats and metrics endpoints and
//! publishes the values to Zenoh as telemetry.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};
use zenoh_bridge_etcd::{
    BridgeStatus, EtcdBridgeConfig, EtcdPoller, HttpFetcher, LoggingConfig, PollSettings,
    PolledMember, ZenohSink,
};

/// Zenoh bridge for etcd cluster telemetry.
#[derive(Parser, Debug)]
#[command(name = "zenoh-bridge-etcd")]
#[command(about = "Polls an etcd member and publishes its metrics to Zenoh")]
#[command(version)]
struct Args {
    /// Path to configuration file (JSON5 format)
    #[arg(short, long, default_value = "etcd.json5")]
    config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let config = EtcdBridgeConfig::load_from_file(&args.config)
        .with_context(|| format!("Failed to load config from {:?}", args.config))?;

    // Initialize logging
    let log_config = LoggingConfig {
        level: args
            .log_level
            .clone()
            .unwrap_or_else(|| config.logging.level.clone()),
        format: config.logging.format,
    };
    zenoh_bridge_etcd::init_tracing(&log_config)?;

    info!("Starting zenoh-bridge-etcd");
    info!("Loaded configuration from {:?}", args.config);

    let etcd = &config.etcd;
    let fetcher = HttpFetcher::new(etcd.http_timeout(), &etcd.tls)
        .context("Failed to build HTTP client")?;

    // Connect to Zenoh
    let session = Arc::new(
        zenoh_bridge_etcd::connect(&config.zenoh)
            .await
            .context("Failed to connect to Zenoh")?,
    );

    let sink = ZenohSink::new(
        session.clone(),
        &etcd.key_prefix,
        &etcd.cluster,
        config.serialization,
    );
    let poller = EtcdPoller::new(PollSettings::from_config(etcd), fetcher, sink.clone());
    let task = tokio::spawn(poller.run());

    info!(
        member = %etcd.member_id(),
        cluster = %etcd.cluster,
        "etcd bridge running"
    );

    // Publish bridge status
    let status = BridgeStatus::running(PolledMember::from_config(etcd));
    if let Err(e) = sink.publish_status(&status).await {
        error!("Failed to publish bridge status: {}", e);
    }

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("Received shutdown signal");

    task.abort();

    let _ = sink.publish_status(&BridgeStatus::offline()).await;

    session
        .close()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to close Zenoh session: {}", e))?;
    info!("etcd bridge stopped");

    Ok(())
}
