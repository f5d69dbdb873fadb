//! Collector metrics
//!
//! Lock-free counters updated by the pipeline tasks.
//! Snapshots are taken for logging at shutdown and in tests.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Instant, SystemTime};

/// Upper bound reported by [`CollectorMetrics::idle_ms`]
const MAX_IDLE_MS: u64 = 3_600_000;

/// Pipeline counters
///
/// Shared by every task through an `Arc`.
pub struct CollectorMetrics {
    /// Requests written to the socket
    requests_sent: AtomicU64,
    /// Requests the socket refused
    send_failures: AtomicU64,
    /// Datagrams read from the socket
    datagrams_received: AtomicU64,
    /// Datagrams that failed inflate or JSON decoding
    decode_failures: AtomicU64,
    /// Responses dropped for a missing or malformed node id
    invalid_node_ids: AtomicU64,
    /// Registry updates
    nodes_updated: AtomicU64,
    /// Merged nodes forwarded to the sink
    sink_forwards: AtomicU64,
    /// Global stats worker ticks
    global_stats_ticks: AtomicU64,
    /// Last datagram timestamp (Unix millis)
    last_datagram_time: AtomicU64,
    /// Start time for uptime calculation
    start_time: Instant,
}

/// Metrics snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MetricsSnapshot {
    pub requests_sent: u64,
    pub send_failures: u64,
    pub datagrams_received: u64,
    pub decode_failures: u64,
    pub invalid_node_ids: u64,
    pub nodes_updated: u64,
    pub sink_forwards: u64,
    pub global_stats_ticks: u64,
    pub datagram_rate: f64, // datagrams per second
    pub uptime_seconds: u64,
}

impl CollectorMetrics {
    pub fn new() -> Self {
        Self {
            requests_sent: AtomicU64::new(0),
            send_failures: AtomicU64::new(0),
            datagrams_received: AtomicU64::new(0),
            decode_failures: AtomicU64::new(0),
            invalid_node_ids: AtomicU64::new(0),
            nodes_updated: AtomicU64::new(0),
            sink_forwards: AtomicU64::new(0),
            global_stats_ticks: AtomicU64::new(0),
            last_datagram_time: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    #[inline]
    pub fn record_request_sent(&self) {
        self.requests_sent.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_send_failure(&self) {
        self.send_failures.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_datagram(&self) {
        self.datagrams_received.fetch_add(1, Ordering::Relaxed);
        self.last_datagram_time.store(unix_millis(), Ordering::Relaxed);
    }

    #[inline]
    pub fn record_decode_failure(&self) {
        self.decode_failures.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_invalid_node_id(&self) {
        self.invalid_node_ids.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_node_updated(&self) {
        self.nodes_updated.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_sink_forward(&self) {
        self.sink_forwards.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_global_stats_tick(&self) {
        self.global_stats_ticks.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current snapshot of metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        let datagrams = self.datagrams_received.load(Ordering::Relaxed);

        let uptime = self.start_time.elapsed().as_secs();
        let rate = if uptime > 0 {
            datagrams as f64 / uptime as f64
        } else {
            0.0
        };

        MetricsSnapshot {
            requests_sent: self.requests_sent.load(Ordering::Relaxed),
            send_failures: self.send_failures.load(Ordering::Relaxed),
            datagrams_received: datagrams,
            decode_failures: self.decode_failures.load(Ordering::Relaxed),
            invalid_node_ids: self.invalid_node_ids.load(Ordering::Relaxed),
            nodes_updated: self.nodes_updated.load(Ordering::Relaxed),
            sink_forwards: self.sink_forwards.load(Ordering::Relaxed),
            global_stats_ticks: self.global_stats_ticks.load(Ordering::Relaxed),
            datagram_rate: rate,
            uptime_seconds: uptime,
        }
    }

    /// Milliseconds since the last datagram, capped at one hour
    pub fn idle_ms(&self) -> u64 {
        let last = self.last_datagram_time.load(Ordering::Relaxed);
        if last == 0 {
            return MAX_IDLE_MS; // Nothing received yet
        }

        unix_millis().saturating_sub(last).min(MAX_IDLE_MS)
    }
}

impl Default for CollectorMetrics {
    fn default() -> Self {
        Self::new()
    }
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = CollectorMetrics::new();
        let snapshot = metrics.snapshot();

        assert_eq!(snapshot.requests_sent, 0);
        assert_eq!(snapshot.datagrams_received, 0);
        assert_eq!(snapshot.nodes_updated, 0);
        assert_eq!(snapshot.global_stats_ticks, 0);
    }

    #[test]
    fn test_record_counters() {
        let metrics = CollectorMetrics::new();

        metrics.record_request_sent();
        metrics.record_request_sent();
        metrics.record_send_failure();
        metrics.record_datagram();
        metrics.record_decode_failure();
        metrics.record_invalid_node_id();
        metrics.record_node_updated();
        metrics.record_sink_forward();
        metrics.record_global_stats_tick();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.requests_sent, 2);
        assert_eq!(snapshot.send_failures, 1);
        assert_eq!(snapshot.datagrams_received, 1);
        assert_eq!(snapshot.decode_failures, 1);
        assert_eq!(snapshot.invalid_node_ids, 1);
        assert_eq!(snapshot.nodes_updated, 1);
        assert_eq!(snapshot.sink_forwards, 1);
        assert_eq!(snapshot.global_stats_ticks, 1);
    }

    #[test]
    fn test_idle_without_datagrams() {
        let metrics = CollectorMetrics::new();
        assert_eq!(metrics.idle_ms(), MAX_IDLE_MS);

        metrics.record_datagram();
        assert!(metrics.idle_ms() < MAX_IDLE_MS);
    }

    #[test]
    fn test_datagram_rate() {
        let metrics = CollectorMetrics::new();
        for _ in 0..100 {
            metrics.record_datagram();
        }

        let snapshot = metrics.snapshot();
        assert!(snapshot.datagram_rate >= 0.0);
        assert_eq!(snapshot.datagrams_received, 100);
    }
}
