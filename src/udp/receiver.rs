//! Datagram receiver
//!
//! Reads datagrams into one reusable buffer and pushes private copies onto
//! the bounded parser queue. A full queue suspends the loop; the kernel's
//! receive buffer then absorbs datagrams until it overflows and drops them.
//! A datagram still waiting for queue space when the socket closes is
//! discarded, so nothing enters the queue after close.
//!
//! Any read error ends the receiver for good. The collector keeps sending
//! requests, but nothing is ingested until it is recreated.

use super::socket::{CollectorSocket, MAX_DATAGRAM_SIZE};
use crate::infrastructure::CollectorMetrics;
use bytes::Bytes;
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;

/// One received datagram
#[derive(Debug, Clone)]
pub struct RawDatagram {
    /// Used bytes only, copied out of the read buffer
    pub payload: Bytes,
    pub source: SocketAddr,
    pub received_at: Instant,
}

impl RawDatagram {
    pub fn new(payload: Bytes, source: SocketAddr) -> Self {
        Self {
            payload,
            source,
            received_at: Instant::now(),
        }
    }
}

/// Why the receiver stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiverExit {
    /// The socket was closed by the collector
    SocketClosed,
    /// The socket returned an error
    ReadFailed,
    /// The parser side of the queue is gone
    QueueClosed,
}

/// Where the receiver reads datagrams from
pub trait DatagramSource: Send + Sync {
    /// Read one datagram into `buf`
    fn recv_from(&self, buf: &mut [u8]) -> impl Future<Output = io::Result<(usize, SocketAddr)>> + Send;

    fn is_closed(&self) -> bool;

    /// Resolves once the source is closed
    fn wait_closed(&self) -> impl Future<Output = ()> + Send;
}

impl DatagramSource for CollectorSocket {
    fn recv_from(&self, buf: &mut [u8]) -> impl Future<Output = io::Result<(usize, SocketAddr)>> + Send {
        CollectorSocket::recv_from(self, buf)
    }

    fn is_closed(&self) -> bool {
        CollectorSocket::is_closed(self)
    }

    fn wait_closed(&self) -> impl Future<Output = ()> + Send {
        CollectorSocket::wait_closed(self)
    }
}

/// Receive loop. Owns the only sender of the queue, so returning closes it.
pub async fn run_receiver<S: DatagramSource>(
    socket: Arc<S>,
    queue: mpsc::Sender<RawDatagram>,
    metrics: Arc<CollectorMetrics>,
) -> ReceiverExit {
    let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];

    loop {
        let (len, source) = match socket.recv_from(&mut buf).await {
            Ok(received) => received,
            Err(_) if socket.is_closed() => {
                tracing::debug!("socket closed, receiver stopping");
                return ReceiverExit::SocketClosed;
            }
            Err(e) => {
                tracing::error!(error = %e, "recv_from failed, receiver stopping");
                return ReceiverExit::ReadFailed;
            }
        };

        metrics.record_datagram();
        let datagram = RawDatagram::new(Bytes::copy_from_slice(&buf[..len]), source);

        tokio::select! {
            biased;
            _ = socket.wait_closed() => {
                tracing::debug!(%source, "socket closed while queue full, datagram dropped");
                return ReceiverExit::SocketClosed;
            }
            sent = queue.send(datagram) => {
                if sent.is_err() {
                    tracing::debug!("queue closed, receiver stopping");
                    return ReceiverExit::QueueClosed;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::LogCapture;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::net::UdpSocket;
    use tokio::time::timeout;

    /// Source that replays fixed read results, then blocks
    struct ScriptedSource {
        reads: Mutex<VecDeque<io::Result<(Vec<u8>, SocketAddr)>>>,
        calls: AtomicUsize,
    }

    impl ScriptedSource {
        fn new(reads: Vec<io::Result<(Vec<u8>, SocketAddr)>>) -> Self {
            Self {
                reads: Mutex::new(reads.into()),
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn remaining(&self) -> usize {
            self.reads.lock().len()
        }
    }

    impl DatagramSource for ScriptedSource {
        async fn recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = self.reads.lock().pop_front();
            match next {
                Some(Ok((payload, source))) => {
                    buf[..payload.len()].copy_from_slice(&payload);
                    Ok((payload.len(), source))
                }
                Some(Err(e)) => Err(e),
                None => std::future::pending().await,
            }
        }

        fn is_closed(&self) -> bool {
            false
        }

        async fn wait_closed(&self) {
            std::future::pending::<()>().await
        }
    }

    async fn wait_for_datagrams(metrics: &CollectorMetrics, count: u64) {
        timeout(Duration::from_secs(2), async {
            while metrics.snapshot().datagrams_received < count {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
    }

    async fn setup() -> (Arc<CollectorSocket>, UdpSocket, SocketAddr) {
        let socket = Arc::new(CollectorSocket::bind("127.0.0.1:0".parse().unwrap()).unwrap());
        let target = socket.local_addr().unwrap();
        let peer = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        (socket, peer, target)
    }

    #[tokio::test]
    async fn test_datagrams_are_copied_with_source() {
        let (socket, peer, target) = setup().await;
        let metrics = Arc::new(CollectorMetrics::new());
        let (tx, mut rx) = mpsc::channel(8);
        let task = tokio::spawn(run_receiver(socket.clone(), tx, metrics.clone()));

        peer.send_to(b"first datagram", target).await.unwrap();
        peer.send_to(b"2nd", target).await.unwrap();

        let first = timeout(Duration::from_secs(2), rx.recv()).await.unwrap().unwrap();
        let second = timeout(Duration::from_secs(2), rx.recv()).await.unwrap().unwrap();

        // Each datagram holds only its own bytes, not the shared buffer
        assert_eq!(&first.payload[..], b"first datagram");
        assert_eq!(&second.payload[..], b"2nd");
        assert_eq!(first.source, peer.local_addr().unwrap());
        assert_eq!(metrics.snapshot().datagrams_received, 2);

        socket.close();
        assert_eq!(task.await.unwrap(), ReceiverExit::SocketClosed);
        // Receiver dropped its sender: the queue is closed
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_stops_when_queue_closed() {
        let (socket, peer, target) = setup().await;
        let metrics = Arc::new(CollectorMetrics::new());
        let (tx, rx) = mpsc::channel(1);
        drop(rx);

        let task = tokio::spawn(run_receiver(socket, tx, metrics));
        peer.send_to(b"x", target).await.unwrap();

        let exit = timeout(Duration::from_secs(2), task).await.unwrap().unwrap();
        assert_eq!(exit, ReceiverExit::QueueClosed);
    }

    #[tokio::test]
    async fn test_full_queue_applies_backpressure() {
        let (socket, peer, target) = setup().await;
        let metrics = Arc::new(CollectorMetrics::new());
        let (tx, mut rx) = mpsc::channel(1);
        let _task = tokio::spawn(run_receiver(socket.clone(), tx, metrics.clone()));

        for i in 0..3u8 {
            peer.send_to(&[i], target).await.unwrap();
        }

        // Everything is eventually delivered in arrival order once drained
        for i in 0..3u8 {
            let datagram = timeout(Duration::from_secs(2), rx.recv()).await.unwrap().unwrap();
            assert_eq!(&datagram.payload[..], &[i]);
        }
        socket.close();
    }

    #[tokio::test]
    async fn test_closed_socket_is_not_read() {
        let (socket, peer, target) = setup().await;
        let metrics = Arc::new(CollectorMetrics::new());
        let (tx, mut rx) = mpsc::channel(8);

        socket.close();
        peer.send_to(b"late", target).await.unwrap();

        let exit = run_receiver(socket, tx, metrics.clone()).await;
        assert_eq!(exit, ReceiverExit::SocketClosed);
        assert_eq!(metrics.snapshot().datagrams_received, 0);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_read_error_stops_receiver_for_good() {
        let from: SocketAddr = "203.0.113.5:1234".parse().unwrap();
        let source = Arc::new(ScriptedSource::new(vec![
            Ok((b"before".to_vec(), from)),
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "connection reset")),
            Ok((b"after".to_vec(), from)),
        ]));
        let metrics = Arc::new(CollectorMetrics::new());
        let (tx, mut rx) = mpsc::channel(8);
        let logs = LogCapture::new();
        let _guard = logs.install();

        let exit = timeout(
            Duration::from_secs(2),
            run_receiver(source.clone(), tx, metrics.clone()),
        )
        .await
        .unwrap();

        assert_eq!(exit, ReceiverExit::ReadFailed);
        // No read after the failing one
        assert_eq!(source.calls(), 2);
        assert_eq!(source.remaining(), 1);
        assert_eq!(metrics.snapshot().datagrams_received, 1);

        let errors = logs.lines_containing("recv_from failed");
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("ERROR"));
        assert!(errors[0].contains("connection reset"));

        let first = rx.recv().await.unwrap();
        assert_eq!(&first.payload[..], b"before");
        assert_eq!(first.source, from);
        // Only sender dropped with the receiver
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_close_drops_datagram_waiting_for_queue() {
        let (socket, peer, target) = setup().await;
        let metrics = Arc::new(CollectorMetrics::new());
        let (tx, mut rx) = mpsc::channel(1);
        let task = tokio::spawn(run_receiver(socket.clone(), tx, metrics.clone()));

        peer.send_to(b"queued", target).await.unwrap();
        peer.send_to(b"waiting", target).await.unwrap();
        // Second datagram read, receiver now blocked on the full queue
        wait_for_datagrams(&metrics, 2).await;

        socket.close();
        let exit = timeout(Duration::from_secs(2), task).await.unwrap().unwrap();
        assert_eq!(exit, ReceiverExit::SocketClosed);

        assert_eq!(&rx.recv().await.unwrap().payload[..], b"queued");
        assert!(rx.recv().await.is_none());
    }
}
