//! Collector UDP socket
//!
//! One socket per collector, bound to an ephemeral port. Requests go out and
//! responses come back through the same socket.
//!
//! Setup is done through socket2 so the receive buffer and dual-stack mode
//! can be set before tokio takes ownership.

use crate::{CollectorError, Result};
use socket2::{Domain, Protocol, Socket, Type};
use std::ffi::CString;
use std::io;
use std::net::{Ipv6Addr, SocketAddr, SocketAddrV6, ToSocketAddrs};
use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;

/// Multicast group respondd nodes listen on
pub const MULTICAST_GROUP: Ipv6Addr = Ipv6Addr::new(0xff02, 0, 0, 0, 0, 0, 2, 0x1001);

/// respondd port
pub const PORT: u16 = 1001;

/// Largest datagram accepted; also the socket receive buffer size
pub const MAX_DATAGRAM_SIZE: usize = 8192;

/// Request payload understood by respondd
pub const REQUEST: &[u8] = b"GET nodeinfo statistics neighbours";

/// Interface-scoped multicast target, e.g. `[ff02::2:1001%bat0]:1001`
pub fn multicast_address(interface: &str) -> String {
    format!("[{}%{}]:{}", MULTICAST_GROUP, interface, PORT)
}

/// Socket shared by the receiver and the request scheduler
pub struct CollectorSocket {
    inner: UdpSocket,
    closed: CancellationToken,
}

impl CollectorSocket {
    /// Bind a new socket
    ///
    /// IPv6 sockets accept IPv4 traffic too. Must be called inside a tokio
    /// runtime.
    pub fn bind(listen: SocketAddr) -> io::Result<Self> {
        let socket = Socket::new(Domain::for_address(listen), Type::DGRAM, Some(Protocol::UDP))?;
        if listen.is_ipv6() {
            socket.set_only_v6(false)?;
        }
        socket.set_recv_buffer_size(MAX_DATAGRAM_SIZE)?;
        socket.set_nonblocking(true)?;
        socket.bind(&listen.into())?;

        let inner = UdpSocket::from_std(socket.into())?;
        Ok(Self {
            inner,
            closed: CancellationToken::new(),
        })
    }

    /// Local address, including the OS-assigned port
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.inner.local_addr()
    }

    /// Send one request datagram to a textual address
    ///
    /// Resolution failures are returned. A failed write is logged and
    /// swallowed: the next scheduled request retries implicitly.
    pub async fn send_request(&self, address: &str) -> Result<()> {
        let target = resolve_address(address)?;
        if let Err(e) = self.send_to(REQUEST, target).await {
            tracing::warn!(destination = %target, error = %e, "send_to failed");
        }
        Ok(())
    }

    /// Write one datagram
    pub async fn send_to(&self, payload: &[u8], target: SocketAddr) -> io::Result<usize> {
        if self.is_closed() {
            return Err(closed_error());
        }
        self.inner.send_to(payload, target).await
    }

    /// Read one datagram
    ///
    /// Fails with `NotConnected` once the socket is closed, including a read
    /// that is already waiting.
    pub async fn recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
        tokio::select! {
            biased;
            _ = self.closed.cancelled() => Err(closed_error()),
            result = self.inner.recv_from(buf) => result,
        }
    }

    /// Close the socket for reading and writing. Idempotent.
    pub fn close(&self) {
        self.closed.cancel();
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    /// Resolves once [`CollectorSocket::close`] has been called
    pub async fn wait_closed(&self) {
        self.closed.cancelled().await
    }
}

fn closed_error() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "socket closed")
}

/// Resolve a unicast or multicast address
///
/// Accepts plain socket addresses, interface-scoped IPv6 addresses
/// (`[ff02::2:1001%bat0]:1001`, zone by name or index) and `host:port`.
pub fn resolve_address(address: &str) -> Result<SocketAddr> {
    if let Ok(addr) = address.parse::<SocketAddr>() {
        return Ok(addr);
    }

    if let Some(addr) = parse_scoped_v6(address)? {
        return Ok(addr);
    }

    address
        .to_socket_addrs()
        .map_err(|e| address_error(address, e.to_string()))?
        .next()
        .ok_or_else(|| address_error(address, "no addresses found".to_string()))
}

fn parse_scoped_v6(address: &str) -> Result<Option<SocketAddr>> {
    let Some(rest) = address.strip_prefix('[') else {
        return Ok(None);
    };
    let Some((host, port)) = rest.rsplit_once("]:") else {
        return Ok(None);
    };
    let Some((ip, zone)) = host.split_once('%') else {
        return Ok(None);
    };

    let ip: Ipv6Addr = ip
        .parse()
        .map_err(|e: std::net::AddrParseError| address_error(address, e.to_string()))?;
    let port: u16 = port
        .parse()
        .map_err(|e: std::num::ParseIntError| address_error(address, e.to_string()))?;
    let scope_id = interface_index(zone).ok_or_else(|| {
        address_error(address, format!("unknown interface '{}'", zone))
    })?;

    Ok(Some(SocketAddr::V6(SocketAddrV6::new(ip, port, 0, scope_id))))
}

/// Interface index for a zone given by number or by name
fn interface_index(zone: &str) -> Option<u32> {
    if let Ok(index) = zone.parse::<u32>() {
        return Some(index);
    }

    let name = CString::new(zone).ok()?;
    // SAFETY: `name` is a valid NUL-terminated string for the whole call.
    let index = unsafe { libc::if_nametoindex(name.as_ptr()) };
    (index != 0).then_some(index)
}

fn address_error(address: &str, reason: String) -> CollectorError {
    CollectorError::Address {
        address: address.to_string(),
        reason,
    }
}
