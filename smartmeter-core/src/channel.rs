use crate::error::{MeterError, MeterResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Wi-SUN B-route radio channel
///
/// The adapter reports and accepts channels as two hex digits. Only the
/// range `0x21..=0x3C` is usable for active scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Channel(u8);

impl Channel {
    /// Lowest scannable channel
    pub const MIN: u8 = 0x21;
    /// Highest scannable channel
    pub const MAX: u8 = 0x3C;

    /// Create a channel from its numeric value
    ///
    /// # Errors
    ///
    /// Returns `MeterError::InvalidInput` if `value` is outside `0x21..=0x3C`
    pub fn new(value: u8) -> MeterResult<Self> {
        if !(Self::MIN..=Self::MAX).contains(&value) {
            return Err(MeterError::InvalidInput(format!(
                "Channel must be 21-3C: \"{:02X}\"",
                value
            )));
        }
        Ok(Self(value))
    }

    /// Parse a channel from its hex representation (e.g. `"33"`)
    ///
    /// # Errors
    ///
    /// Returns `MeterError::InvalidInput` if `s` is not hex or is out of range
    pub fn from_hex(s: &str) -> MeterResult<Self> {
        let value = u8::from_str_radix(s.trim(), 16).map_err(|_| {
            MeterError::InvalidInput(format!("Specified channel is invalid: \"{}\"", s))
        })?;
        Self::new(value)
    }

    /// Numeric channel value
    pub fn value(&self) -> u8 {
        self.0
    }

    /// Active scan channel mask with only this channel's bit set
    pub fn scan_mask(&self) -> u32 {
        1 << (self.0 - Self::MIN)
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02X}", self.0)
    }
}

impl TryFrom<String> for Channel {
    type Error = MeterError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_hex(&value)
    }
}

impl From<Channel> for String {
    fn from(value: Channel) -> Self {
        value.to_string()
    }
}
