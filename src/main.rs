//! respondd collector daemon
//!
//! # Architecture
//! - **udp**: socket, request scheduler, receiver
//! - **pipeline**: decoder, queue consumer, node updater
//! - **core**: node ids, responses, merged nodes, registry
//! - **aggregator**: once-a-minute global stats
//! - **infrastructure**: config, logging, metrics

use anyhow::Context;
use respond_collector::infrastructure::config::Config;
use respond_collector::infrastructure::logging::init_logging;
use respond_collector::{Collector, LogSink, Nodes, StatsSink};
use std::sync::Arc;

/// Main application state
pub struct CollectorApp {
    config: Config,
}

impl CollectorApp {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Run until Ctrl-C
    pub async fn run(&self) -> anyhow::Result<()> {
        tracing::info!(
            interface = %self.config.collector.interface,
            interval_secs = self.config.collector.interval_secs,
            sink = self.config.sink.enabled,
            "starting respondd collector"
        );

        let registry = Arc::new(Nodes::new());
        let sink = self
            .config
            .sink
            .enabled
            .then(|| Arc::new(LogSink::new()) as Arc<dyn StatsSink>);

        let mut collector = Collector::new(&self.config.collector, registry.clone(), sink)
            .context("failed to create collector")?;
        collector
            .start(self.config.collector.interval())
            .context("failed to start request scheduler")?;
        let metrics = collector.metrics();

        tokio::signal::ctrl_c()
            .await
            .context("failed to listen for shutdown signal")?;
        tracing::info!("shutdown signal received");

        collector.close().wait().await;

        let snapshot = metrics.snapshot();
        tracing::info!(
            nodes = registry.len(),
            requests_sent = snapshot.requests_sent,
            send_failures = snapshot.send_failures,
            datagrams_received = snapshot.datagrams_received,
            decode_failures = snapshot.decode_failures,
            invalid_node_ids = snapshot.invalid_node_ids,
            nodes_updated = snapshot.nodes_updated,
            datagram_rate = snapshot.datagram_rate,
            idle_ms = metrics.idle_ms(),
            uptime_seconds = snapshot.uptime_seconds,
            "collector finished"
        );
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load config or use defaults
    let config = Config::load().context("failed to load configuration")?;

    // Guards flush file logs on exit
    let _guards = init_logging(&config.logging).context("failed to initialise logging")?;

    let app = CollectorApp::new(config);
    app.run().await
}
