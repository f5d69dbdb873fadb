//! Test doubles for the registry and sink, plus payload helpers

use crate::core::{CounterMap, Fields, Node, NodeId, NodeRegistry, Nodes, ResponseData};
use crate::infrastructure::config::CollectorConfig;
use crate::sink::{StatsSink, Tags};
use flate2::write::DeflateEncoder;
use flate2::Compression;
use parking_lot::Mutex;
use std::io::Write;
use std::sync::Arc;
use time::OffsetDateTime;
use tracing::subscriber::DefaultGuard;
use tracing_subscriber::fmt::MakeWriter;

/// Compress JSON text the way respondd does (raw deflate)
pub fn deflate(json: &str) -> Vec<u8> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(json.as_bytes()).unwrap();
    encoder.finish().unwrap()
}

/// Collector config bound to loopback, sending requests to `request_address`
pub fn loopback_config(request_address: &str) -> CollectorConfig {
    CollectorConfig {
        interface: "lo".to_string(),
        interval_secs: 60,
        listen_address: "127.0.0.1:0".to_string(),
        request_address: Some(request_address.to_string()),
    }
}

/// Registry that records every update before applying it
#[derive(Default)]
pub struct RecordingRegistry {
    inner: Nodes,
    updates: Mutex<Vec<(String, ResponseData)>>,
}

impl RecordingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Updates in call order: (node id, response)
    pub fn updates(&self) -> Vec<(String, ResponseData)> {
        self.updates.lock().clone()
    }
}

impl NodeRegistry for RecordingRegistry {
    fn update(&self, node_id: &NodeId, response: ResponseData) -> Node {
        self.updates
            .lock()
            .push((node_id.as_str().to_string(), response.clone()));
        self.inner.update(node_id, response)
    }

    fn snapshot(&self) -> Vec<Node> {
        self.inner.snapshot()
    }
}

/// One sink call
#[derive(Debug, Clone, PartialEq)]
pub enum SinkWrite {
    Add(String),
    Point(String),
    CounterMap(String, CounterMap),
}

/// Sink that records every write
#[derive(Default)]
pub struct RecordingSink {
    writes: Mutex<Vec<SinkWrite>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn writes(&self) -> Vec<SinkWrite> {
        self.writes.lock().clone()
    }
}

impl StatsSink for RecordingSink {
    fn add(&self, node_id: &NodeId, _node: &Node) {
        self.writes.lock().push(SinkWrite::Add(node_id.as_str().to_string()));
    }

    fn add_point(&self, measurement: &str, _tags: &Tags, _fields: &Fields, _time: OffsetDateTime) {
        self.writes.lock().push(SinkWrite::Point(measurement.to_string()));
    }

    fn add_counter_map(&self, measurement: &str, counts: &CounterMap) {
        self.writes
            .lock()
            .push(SinkWrite::CounterMap(measurement.to_string(), counts.clone()));
    }
}

/// Collects formatted log lines written on the current thread
#[derive(Clone, Default)]
pub struct LogCapture {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl LogCapture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make this the thread's subscriber until the guard is dropped
    pub fn install(&self) -> DefaultGuard {
        let subscriber = tracing_subscriber::fmt()
            .with_writer(self.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::TRACE)
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    /// Captured lines containing `needle`
    pub fn lines_containing(&self, needle: &str) -> Vec<String> {
        String::from_utf8_lossy(&self.buf.lock())
            .lines()
            .filter(|line| line.contains(needle))
            .map(str::to_string)
            .collect()
    }
}

impl Write for LogCapture {
    fn write(&mut self, data: &[u8]) -> std::io::Result<usize> {
        self.buf.lock().extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogCapture {
    type Writer = LogCapture;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
