//! Device builder
//!
//! # Usage Example
//!
//! ```rust,no_run
//! use smartmeter_client::DeviceBuilder;
//!
//! # fn demo() -> smartmeter_core::MeterResult<()> {
//! let mut device = DeviceBuilder::new()
//!     .id("00112233445566778899AABBCCDDEEFF")
//!     .password("0123456789AB")
//!     .channel_hex("33")?
//!     .open_serial("/dev/ttyUSB0")?;
//! # Ok(())
//! # }
//! ```

use super::{Device, DeviceOptions};
use smartmeter_core::{Channel, MeterResult, Verbosity};
use smartmeter_transport::{SerialSettings, SerialTransport, StreamTransport};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, WriteHalf};

/// Fluent construction of [`DeviceOptions`] and the device using them
#[derive(Debug, Clone, Default)]
pub struct DeviceBuilder {
    options: DeviceOptions,
    baud_rate: Option<u32>,
}

impl DeviceBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from existing options, e.g. loaded from a config file
    pub fn from_options(options: DeviceOptions) -> Self {
        Self {
            options,
            baud_rate: None,
        }
    }

    /// B-route authentication ID
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.options.id = Some(id.into());
        self
    }

    /// B-route password
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.options.password = Some(password.into());
        self
    }

    pub fn channel(mut self, channel: Channel) -> Self {
        self.options.channel = Some(channel);
        self
    }

    /// Channel as the adapter writes it (`"21"` to `"3C"`)
    ///
    /// # Errors
    ///
    /// Returns `MeterError::InvalidInput` if `channel` is not a usable channel
    pub fn channel_hex(self, channel: &str) -> MeterResult<Self> {
        Ok(self.channel(Channel::from_hex(channel)?))
    }

    /// Skip scanning for the meter's address
    pub fn ip_addr(mut self, ip_addr: impl Into<String>) -> Self {
        self.options.ip_addr = Some(ip_addr.into());
        self
    }

    pub fn dual_stack(mut self, dual_stack: bool) -> Self {
        self.options.dual_stack = dual_stack;
        self
    }

    pub fn verbosity(mut self, verbosity: Verbosity) -> Self {
        self.options.verbosity = verbosity;
        self
    }

    /// Default retry budget of every query
    pub fn retry(mut self, count: u32) -> Self {
        self.options.query.retry = Some(count);
        self
    }

    /// Default pause between attempts of every query
    pub fn retry_interval(mut self, interval: Duration) -> Self {
        self.options.query.retry_interval = Some(interval);
        self
    }

    /// Default timeout of every query
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.options.query.timeout = Some(timeout);
        self
    }

    /// Serial baud rate, if the adapter is not at 115200
    pub fn baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = Some(baud_rate);
        self
    }

    pub fn options(&self) -> &DeviceOptions {
        &self.options
    }

    pub fn build_options(self) -> DeviceOptions {
        self.options
    }

    /// Open the device on the serial port `port_name`
    pub fn open_serial(self, port_name: &str) -> MeterResult<Device<SerialTransport>> {
        let settings = match self.baud_rate {
            Some(baud_rate) => SerialSettings::with_baud_rate(port_name, baud_rate),
            None => SerialSettings::new(port_name),
        };
        Device::open_serial(&settings, self.options)
    }

    /// Open the device over an arbitrary byte stream
    pub fn open_stream<S>(self, stream: S) -> Device<StreamTransport<WriteHalf<S>>>
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        Device::open_stream(stream, self.options)
    }
}
