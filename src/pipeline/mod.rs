//! Response pipeline: decode, identify, merge

pub mod decoder;
pub mod parser;
pub mod updater;

pub use decoder::{decode, decode_payload, DecodeError, DecodeErrorKind};
pub use parser::run_parser;
pub use updater::{NodeUpdater, UpdateOutcome};
