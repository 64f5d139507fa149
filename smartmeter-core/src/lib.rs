//! Core types and utilities for the B-route smart meter client stack
//!
//! This crate provides the error taxonomy and the small value types shared by
//! the transport, SK stack, ECHONET Lite and client crates.

pub mod channel;
pub mod error;
pub mod verbosity;

pub use channel::Channel;
pub use error::{MeterError, MeterResult};
pub use verbosity::Verbosity;
