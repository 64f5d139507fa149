//! smartmeter - B-route smart meter client over SK command adapters
//!
//! This library talks to a low-voltage smart electric energy meter through
//! a Wi-SUN B-route adapter (BP35A1, BP35C0, RL7023 and compatibles)
//! connected over a serial line.
//!
//! # Architecture
//!
//! This library is organized as a workspace with multiple crates:
//!
//! - `smartmeter-core`: Error type, channel and verbosity
//! - `smartmeter-transport`: Serial transport and line source
//! - `smartmeter-skstack`: SK command query engine and response parsers
//! - `smartmeter-echonet`: ECHONET Lite frame codec and property descriptions
//! - `smartmeter-client`: Device façade (scan, join, ECHONET Lite exchange)
//!
//! # Usage
//!
//! ```no_run
//! use smartmeter::client::DeviceBuilder;
//! use smartmeter::echonet::{EchonetObject, Frame, describe_frame, smart_meter};
//! use smartmeter::skstack::QueryOptions;
//! use std::time::Duration;
//!
//! # async fn demo() -> smartmeter::MeterResult<()> {
//! let mut device = DeviceBuilder::new()
//!     .id("00112233445566778899AABBCCDDEEFF")
//!     .password("0123456789AB")
//!     .timeout(Duration::from_secs(60))
//!     .open_serial("/dev/ttyUSB0")?;
//! device.authenticate(&QueryOptions::new().retry(3)).await?;
//!
//! let request = Frame::get_request(
//!     EchonetObject::LV_SMART_ELECTRIC_ENERGY_METER,
//!     &[smart_meter::INSTANTANEOUS_ELECTRIC_POWER],
//! )?;
//! let response = device.query_echonet_lite(&request, &QueryOptions::default()).await?;
//! for line in describe_frame(&response) {
//!     println!("{}", line);
//! }
//! # Ok(())
//! # }
//! ```

// Re-export core types
pub use smartmeter_core::{Channel, MeterError, MeterResult, Verbosity};

// Re-export client API
pub mod client {
    pub use smartmeter_client::*;
}

// Re-export ECHONET Lite codec
pub mod echonet {
    pub use smartmeter_echonet::*;
}

// Re-export SK command layer
pub mod skstack {
    pub use smartmeter_skstack::*;
}

// Re-export transport
pub mod transport {
    pub use smartmeter_transport::*;
}
