//! Smart meter B-route client
//!
//! This crate provides the [`Device`] façade: it programs the adapter,
//! scans for the meter, joins its PAN and exchanges ECHONET Lite frames
//! with it.

pub mod device;

pub use device::{Device, DeviceBuilder, DeviceOptions, JoinState};
