//! ECHONET Lite application layer
//!
//! This crate provides the ECHONET Lite frame codec, request/response
//! correlation and the property value description table. It has no
//! dependency on the adapter transport.

pub mod describe;
pub mod frame;
pub mod property;

pub use describe::{describe, describe_frame};
pub use frame::{
    EchonetObject, Frame, ServiceCode, ECHONET_LITE_HEADER, FRAME_HEADER_LENGTH, MIN_FRAME_LENGTH,
};
pub use property::{node_profile, smart_meter, Property, PropertyCode, MAX_EDT_LENGTH};
