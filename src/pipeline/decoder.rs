//! Response decoder
//!
//! respondd replies are JSON compressed as a raw deflate stream (no zlib
//! header, no checksum). Decoding either fully succeeds or yields an error
//! that still carries the original bytes and sender.

use crate::core::ResponseData;
use crate::udp::RawDatagram;
use bytes::Bytes;
use flate2::read::DeflateDecoder;
use std::io::{self, Read};
use std::net::SocketAddr;

/// Initial inflate buffer size relative to the compressed payload
const INFLATE_RATIO: usize = 4;

/// Failed stage of decoding
#[derive(Debug, thiserror::Error)]
pub enum DecodeErrorKind {
    #[error("inflate failed: {0}")]
    Inflate(#[source] io::Error),

    #[error("invalid JSON: {0}")]
    Json(#[source] serde_json::Error),
}

/// Undecodable datagram
#[derive(Debug, thiserror::Error)]
#[error("unable to decode response from {address}: {kind}")]
pub struct DecodeError {
    /// Sender of the datagram
    pub address: SocketAddr,
    /// Original compressed bytes
    pub raw: Bytes,
    #[source]
    pub kind: DecodeErrorKind,
}

/// Inflate and decode one datagram
pub fn decode(datagram: &RawDatagram) -> Result<ResponseData, DecodeError> {
    decode_payload(&datagram.payload).map_err(|kind| DecodeError {
        address: datagram.source,
        raw: datagram.payload.clone(),
        kind,
    })
}

/// Inflate and decode raw bytes
pub fn decode_payload(payload: &[u8]) -> Result<ResponseData, DecodeErrorKind> {
    let json = inflate(payload).map_err(DecodeErrorKind::Inflate)?;
    serde_json::from_slice(&json).map_err(DecodeErrorKind::Json)
}

fn inflate(payload: &[u8]) -> io::Result<Vec<u8>> {
    let mut out = Vec::with_capacity(payload.len() * INFLATE_RATIO);
    DeflateDecoder::new(payload).read_to_end(&mut out)?;
    Ok(out)
}
