//! UDP transport: socket, receive loop and request scheduling

pub mod receiver;
pub mod request;
pub mod socket;

pub use receiver::{run_receiver, RawDatagram, ReceiverExit};
pub use request::RequestScheduler;
pub use socket::{
    multicast_address, resolve_address, CollectorSocket, MAX_DATAGRAM_SIZE, MULTICAST_GROUP,
    PORT, REQUEST,
};
