//! ECHONET property element (EPC + PDC + EDT)

use smartmeter_core::{MeterError, MeterResult};
use std::fmt;

/// Maximum EDT length (the PDC field is one byte)
pub const MAX_EDT_LENGTH: usize = 255;

/// ECHONET property code (EPC)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PropertyCode(pub u8);

impl fmt::Display for PropertyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02X}", self.0)
    }
}

/// Node profile properties (0x0EF001)
pub mod node_profile {
    use super::PropertyCode;

    pub const VERSION_INFORMATION: PropertyCode = PropertyCode(0x82);
    pub const IDENTIFICATION_NUMBER: PropertyCode = PropertyCode(0x83);
    pub const FAULT_STATUS: PropertyCode = PropertyCode(0x88);
    pub const FAULT_CONTENT: PropertyCode = PropertyCode(0x89);
    pub const MANUFACTURER_CODE: PropertyCode = PropertyCode(0x8A);
    pub const BUSINESS_FACILITY_CODE: PropertyCode = PropertyCode(0x8B);
    pub const PRODUCT_CODE: PropertyCode = PropertyCode(0x8C);
    pub const PRODUCTION_NUMBER: PropertyCode = PropertyCode(0x8D);
    pub const PRODUCTION_DATE: PropertyCode = PropertyCode(0x8E);
    pub const UNIQUE_IDENTIFIER_DATA: PropertyCode = PropertyCode(0xBF);
    pub const NUMBER_OF_SELF_NODE_INSTANCES: PropertyCode = PropertyCode(0xD3);
    pub const NUMBER_OF_SELF_NODE_CLASSES: PropertyCode = PropertyCode(0xD4);
    pub const INSTANCE_LIST_NOTIFICATION: PropertyCode = PropertyCode(0xD5);
    pub const SELF_NODE_INSTANCE_LIST_S: PropertyCode = PropertyCode(0xD6);
    pub const SELF_NODE_CLASS_LIST_S: PropertyCode = PropertyCode(0xD7);
}

/// Low-voltage smart electric energy meter properties (0x028801)
pub mod smart_meter {
    use super::PropertyCode;

    pub const COEFFICIENT: PropertyCode = PropertyCode(0xD3);
    pub const NORMAL_DIRECTION_CUMULATIVE_ENERGY: PropertyCode = PropertyCode(0xE0);
    pub const UNIT_FOR_CUMULATIVE_ENERGY: PropertyCode = PropertyCode(0xE1);
    pub const REVERSE_DIRECTION_CUMULATIVE_ENERGY: PropertyCode = PropertyCode(0xE3);
    pub const INSTANTANEOUS_ELECTRIC_POWER: PropertyCode = PropertyCode(0xE7);
    pub const INSTANTANEOUS_CURRENT: PropertyCode = PropertyCode(0xE8);
    pub const NORMAL_DIRECTION_CUMULATIVE_ENERGY_FIXED_TIME: PropertyCode = PropertyCode(0xEA);
    pub const REVERSE_DIRECTION_CUMULATIVE_ENERGY_FIXED_TIME: PropertyCode = PropertyCode(0xEB);
}

/// One property element inside a frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    epc: PropertyCode,
    edt: Vec<u8>,
}

impl Property {
    /// Create a property with a payload
    ///
    /// # Errors
    ///
    /// Returns `MeterError::InvalidInput` if `edt` is longer than 255 bytes
    pub fn new(epc: PropertyCode, edt: Vec<u8>) -> MeterResult<Self> {
        if edt.len() > MAX_EDT_LENGTH {
            return Err(MeterError::InvalidInput(format!(
                "EDT of {} is {} bytes long, at most {} allowed",
                epc,
                edt.len(),
                MAX_EDT_LENGTH
            )));
        }
        Ok(Self { epc, edt })
    }

    /// Create a property with an empty payload, as used in Get requests
    pub fn request(epc: PropertyCode) -> Self {
        Self { epc, edt: Vec::new() }
    }

    pub fn epc(&self) -> PropertyCode {
        self.epc
    }

    pub fn edt(&self) -> &[u8] {
        &self.edt
    }

    /// Encoded length: EPC + PDC + EDT
    pub fn encoded_len(&self) -> usize {
        2 + self.edt.len()
    }
}
