//! Queue consumer
//!
//! Drains the receiver queue, decodes each datagram and hands the result to
//! the updater. Per-message failures are logged and dropped here; nothing
//! propagates further. Once every sender is gone the remaining entries are
//! still processed before the loop ends.

use super::decoder::decode;
use super::updater::NodeUpdater;
use crate::infrastructure::CollectorMetrics;
use crate::udp::RawDatagram;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Parser loop
pub async fn run_parser(
    mut queue: mpsc::Receiver<RawDatagram>,
    updater: NodeUpdater,
    metrics: Arc<CollectorMetrics>,
) {
    while let Some(datagram) = queue.recv().await {
        match decode(&datagram) {
            Ok(response) => {
                tracing::trace!(
                    source = %datagram.source,
                    queued_us = datagram.received_at.elapsed().as_micros() as u64,
                    "decoded response"
                );
                updater.save_response(datagram.source, response);
            }
            Err(e) => {
                metrics.record_decode_failure();
                tracing::warn!(
                    source = %e.address,
                    error = %e.kind,
                    raw = %hex::encode(&e.raw),
                    "unable to decode response"
                );
            }
        }
    }

    tracing::debug!("queue closed, parser stopping");
}
