//! Request scheduler
//!
//! Sends the respondd request once immediately, then on every interval tick
//! until the stop token fires. Runs in a background task.

use super::socket::{CollectorSocket, REQUEST};
use crate::infrastructure::CollectorMetrics;
use crate::{CollectorError, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Periodic request sender
pub struct RequestScheduler {
    socket: Arc<CollectorSocket>,
    target: SocketAddr,
    stop: CancellationToken,
    metrics: Arc<CollectorMetrics>,
    /// Set once by `start`
    interval: Option<Duration>,
    handle: Option<JoinHandle<()>>,
}

impl RequestScheduler {
    pub fn new(
        socket: Arc<CollectorSocket>,
        target: SocketAddr,
        stop: CancellationToken,
        metrics: Arc<CollectorMetrics>,
    ) -> Self {
        Self {
            socket,
            target,
            stop,
            metrics,
            interval: None,
            handle: None,
        }
    }

    /// Start sending requests every `interval`
    ///
    /// # Errors
    /// `AlreadyStarted` on a second call, `InvalidInterval` for a zero
    /// interval. Neither spawns anything.
    pub fn start(&mut self, interval: Duration) -> Result<()> {
        if self.interval.is_some() {
            return Err(CollectorError::AlreadyStarted);
        }
        if interval.is_zero() {
            return Err(CollectorError::InvalidInterval(interval));
        }
        self.interval = Some(interval);

        tracing::info!(destination = %self.target, ?interval, "starting request scheduler");
        self.handle = Some(tokio::spawn(run_scheduler(
            self.socket.clone(),
            self.target,
            interval,
            self.stop.clone(),
            self.metrics.clone(),
        )));
        Ok(())
    }

    /// Configured interval, once started
    pub fn interval(&self) -> Option<Duration> {
        self.interval
    }

    pub fn target(&self) -> SocketAddr {
        self.target
    }

    /// Hand over the background task, if one was started
    pub fn take_handle(&mut self) -> Option<JoinHandle<()>> {
        self.handle.take()
    }
}

async fn run_scheduler(
    socket: Arc<CollectorSocket>,
    target: SocketAddr,
    period: Duration,
    stop: CancellationToken,
    metrics: Arc<CollectorMetrics>,
) {
    // First tick completes immediately
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = stop.cancelled() => {
                tracing::debug!("request scheduler stopping");
                return;
            }
            _ = ticker.tick() => send_once(&socket, target, &metrics).await,
        }
    }
}

/// Send one request; failures are logged and counted
pub async fn send_once(socket: &CollectorSocket, target: SocketAddr, metrics: &CollectorMetrics) {
    match socket.send_to(REQUEST, target).await {
        Ok(_) => metrics.record_request_sent(),
        Err(e) => {
            metrics.record_send_failure();
            tracing::warn!(destination = %target, error = %e, "send_to failed");
        }
    }
}
