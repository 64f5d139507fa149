//! Transport layer for the smart meter adapter
//!
//! This crate provides the serial connection to the adapter, split into a
//! command side ([`TransportLayer`]) and a response side ([`LineSource`]).

pub mod line;
pub mod serial;
pub mod stream;

pub use line::{LineSource, LINE_QUEUE_CAPACITY, line_to_bytes};
pub use serial::{SerialSettings, SerialTransport, open_serial, open_stream, DEFAULT_BAUD_RATE};
pub use stream::{StreamTransport, TransportLayer};
