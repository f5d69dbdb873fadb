//! Global stats worker
//!
//! Once a minute, snapshots the registry and writes the global aggregates to
//! the sink. Only runs when a sink is configured. The period is fixed and
//! independent of the request interval.

use crate::core::{GlobalStats, NodeRegistry};
use crate::infrastructure::CollectorMetrics;
use crate::sink::{StatsSink, Tags, MEASUREMENT_FIRMWARE, MEASUREMENT_GLOBAL, MEASUREMENT_MODEL};
use std::sync::Arc;
use std::time::Duration;
use time::OffsetDateTime;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Aggregation period
pub const GLOBAL_STATS_INTERVAL: Duration = Duration::from_secs(60);

/// Worker loop. The first write happens one period after start.
pub async fn run_global_stats(
    registry: Arc<dyn NodeRegistry>,
    sink: Arc<dyn StatsSink>,
    stop: CancellationToken,
    metrics: Arc<CollectorMetrics>,
) {
    let mut ticker = interval_at(Instant::now() + GLOBAL_STATS_INTERVAL, GLOBAL_STATS_INTERVAL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = stop.cancelled() => {
                tracing::debug!("global stats worker stopping");
                return;
            }
            _ = ticker.tick() => {
                let stats = save_global_stats(registry.as_ref(), sink.as_ref());
                metrics.record_global_stats_tick();
                tracing::debug!(nodes = stats.nodes, clients = stats.clients, "global stats saved");
            }
        }
    }
}

/// Compute the aggregates and write them: one point, two counter maps.
/// All three writes happen even when the counter maps are empty.
pub fn save_global_stats(registry: &dyn NodeRegistry, sink: &dyn StatsSink) -> GlobalStats {
    let stats = GlobalStats::from_nodes(&registry.snapshot());

    sink.add_point(
        MEASUREMENT_GLOBAL,
        &Tags::new(),
        &stats.fields(),
        OffsetDateTime::now_utc(),
    );
    sink.add_counter_map(MEASUREMENT_FIRMWARE, &stats.firmwares);
    sink.add_counter_map(MEASUREMENT_MODEL, &stats.models);

    stats
}
