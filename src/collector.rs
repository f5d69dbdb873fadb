//! Collector lifecycle
//!
//! Wires the socket, the bounded parser queue and the background tasks
//! together:
//!
//! - Receiver: socket -> queue
//! - Parser: queue -> decoder -> updater -> registry / sink
//! - Scheduler: periodic requests, spawned by `start`
//! - Global stats worker: only with a sink
//!
//! Shutdown is ordered: stop token, then socket, then (implicitly) the queue.

use crate::aggregator::run_global_stats;
use crate::core::NodeRegistry;
use crate::infrastructure::config::CollectorConfig;
use crate::infrastructure::CollectorMetrics;
use crate::pipeline::{run_parser, NodeUpdater};
use crate::sink::StatsSink;
use crate::udp::{resolve_address, run_receiver, CollectorSocket, RequestScheduler};
use crate::Result;
use futures_util::future::join_all;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Parser queue capacity. When full, the receiver blocks and excess
/// datagrams are dropped by the kernel.
pub const QUEUE_CAPACITY: usize = 400;

/// A running collector
pub struct Collector {
    socket: Arc<CollectorSocket>,
    scheduler: RequestScheduler,
    stop: CancellationToken,
    metrics: Arc<CollectorMetrics>,
    tasks: Vec<JoinHandle<()>>,
}

impl Collector {
    /// Bind the socket and spawn the receive side
    ///
    /// Requests are not sent until [`Collector::start`]. Must be called
    /// inside a tokio runtime.
    ///
    /// # Errors
    /// Fails if the request target or listen address cannot be resolved, or
    /// the socket cannot be bound. Nothing is spawned in that case.
    pub fn new(
        config: &CollectorConfig,
        registry: Arc<dyn NodeRegistry>,
        sink: Option<Arc<dyn StatsSink>>,
    ) -> Result<Self> {
        let target = resolve_address(&config.request_address())?;
        let listen = resolve_address(&config.listen_address)?;
        let socket = Arc::new(CollectorSocket::bind(listen)?);
        let local = socket.local_addr()?;

        let stop = CancellationToken::new();
        let metrics = Arc::new(CollectorMetrics::new());
        let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
        let mut tasks = Vec::with_capacity(3);

        let receiver_socket = socket.clone();
        let receiver_metrics = metrics.clone();
        tasks.push(tokio::spawn(async move {
            let exit = run_receiver(receiver_socket, tx, receiver_metrics).await;
            tracing::info!(?exit, "receiver stopped");
        }));

        let updater = NodeUpdater::new(registry.clone(), sink.clone(), metrics.clone());
        tasks.push(tokio::spawn(run_parser(rx, updater, metrics.clone())));

        if let Some(sink) = sink {
            tasks.push(tokio::spawn(run_global_stats(
                registry,
                sink,
                stop.clone(),
                metrics.clone(),
            )));
        }

        let scheduler = RequestScheduler::new(socket.clone(), target, stop.clone(), metrics.clone());
        tracing::info!(
            local = %local,
            destination = %scheduler.target(),
            tasks = tasks.len(),
            "collector listening"
        );

        Ok(Self {
            socket,
            scheduler,
            stop,
            metrics,
            tasks,
        })
    }

    /// Start sending requests every `interval`, the first one immediately
    ///
    /// # Errors
    /// `AlreadyStarted` on a second call, `InvalidInterval` for zero.
    pub fn start(&mut self, interval: Duration) -> Result<()> {
        self.scheduler.start(interval)
    }

    /// Send a single request to a unicast or multicast address
    pub async fn send_request(&self, address: &str) -> Result<()> {
        self.socket.send_request(address).await
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    pub fn metrics(&self) -> Arc<CollectorMetrics> {
        self.metrics.clone()
    }

    /// Stop the collector
    ///
    /// Datagrams already queued are still handed to the registry before the
    /// parser exits. Await [`Shutdown::wait`] to know when that happened.
    pub fn close(mut self) -> Shutdown {
        tracing::info!("closing collector");
        self.signal_stop();

        let mut tasks = std::mem::take(&mut self.tasks);
        if let Some(handle) = self.scheduler.take_handle() {
            tasks.push(handle);
        }
        Shutdown { tasks }
    }

    fn signal_stop(&self) {
        self.stop.cancel();
        // Receiver exits and drops the only queue sender
        self.socket.close();
    }
}

impl Drop for Collector {
    fn drop(&mut self) {
        self.signal_stop();
    }
}

/// Background tasks of a closed collector
#[must_use = "tasks keep running until they observe the stop; call wait() to join them"]
pub struct Shutdown {
    tasks: Vec<JoinHandle<()>>,
}

impl Shutdown {
    /// Wait for every background task to finish
    pub async fn wait(self) {
        for result in join_all(self.tasks).await {
            if let Err(e) = result {
                tracing::error!(error = %e, "collector task failed");
            }
        }
        tracing::info!("collector stopped");
    }
}
