//! ECHONET Lite frame (format 1) encoding, decoding and request/response correlation
//!
//! # Wire Layout (big-endian)
//!
//! ```text
//! 0       2       4          7          10    11    12
//! +-------+-------+----------+----------+-----+-----+------------------------+
//! | EHD   | TID   | SEOJ     | DEOJ     | ESV | OPC | OPC x (EPC, PDC, EDT)  |
//! | 1081  |       | 3 bytes  | 3 bytes  |     |     |                        |
//! +-------+-------+----------+----------+-----+-----+------------------------+
//! ```
//!
//! References: ECHONET Lite Specification Part 2, chapter 3 (frame format);
//! APPENDIX Detailed Requirements for ECHONET Device Objects, 3.3.25.

use crate::property::{Property, PropertyCode};
use bytes::{BufMut, BytesMut};
use smartmeter_core::{MeterError, MeterResult};
use std::fmt;

/// EHD1 = 0x10 (ECHONET Lite), EHD2 = 0x81 (format 1)
pub const ECHONET_LITE_HEADER: u16 = 0x1081;

/// Bytes before the first property: EHD, TID, SEOJ, DEOJ, ESV, OPC
pub const FRAME_HEADER_LENGTH: usize = 12;

/// Shortest frame accepted by [`Frame::parse`]
pub const MIN_FRAME_LENGTH: usize = 14;

/// Distance between a request ESV and its response ESV (Get 0x62 / Get_Res 0x72)
pub const RESPONSE_SERVICE_OFFSET: i16 = 0x10;

/// Maximum number of properties in one frame (OPC is one byte)
pub const MAX_PROPERTIES: usize = 255;

/// ECHONET Lite object (EOJ): class group, class and instance in 24 bits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EchonetObject(u32);

impl EchonetObject {
    /// Controller (0x05FF01), the source object of every request we send
    pub const CONTROLLER: Self = Self(0x05FF01);
    /// Node profile (0x0EF001)
    pub const NODE_PROFILE: Self = Self(0x0EF001);
    /// Low-voltage smart electric energy meter (0x028801)
    pub const LV_SMART_ELECTRIC_ENERGY_METER: Self = Self(0x028801);

    /// Create an object code, keeping the low 24 bits
    pub const fn new(code: u32) -> Self {
        Self(code & 0x00FF_FFFF)
    }

    pub const fn code(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for EchonetObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:06X}", self.0)
    }
}

/// ECHONET Lite service (ESV)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ServiceCode(pub u8);

impl ServiceCode {
    /// Property value read request
    pub const GET: Self = Self(0x62);
    /// Property value read response
    pub const GET_RES: Self = Self(0x72);
    /// Property value read request not possible
    pub const GET_SNA: Self = Self(0x52);
    /// Property value notification
    pub const INF: Self = Self(0x73);
}

impl fmt::Display for ServiceCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02X}", self.0)
    }
}

/// One ECHONET Lite message
///
/// Several property operations can be bundled into one frame; their order is
/// the wire order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    tid: u16,
    seoj: EchonetObject,
    deoj: EchonetObject,
    esv: ServiceCode,
    properties: Vec<Property>,
}

impl Frame {
    /// Create a request from the controller to `deoj` with a fresh random TID
    ///
    /// # Errors
    ///
    /// Returns `MeterError::InvalidInput` if there are no properties or more
    /// than 255
    pub fn new(deoj: EchonetObject, esv: ServiceCode, properties: Vec<Property>) -> MeterResult<Self> {
        let mut frame = Self::with_tid(0, EchonetObject::CONTROLLER, deoj, esv, properties)?;
        frame.regenerate_tid();
        Ok(frame)
    }

    /// Create a frame with every header field given explicitly
    ///
    /// # Errors
    ///
    /// Returns `MeterError::InvalidInput` if there are no properties or more
    /// than 255
    pub fn with_tid(
        tid: u16,
        seoj: EchonetObject,
        deoj: EchonetObject,
        esv: ServiceCode,
        properties: Vec<Property>,
    ) -> MeterResult<Self> {
        if properties.is_empty() {
            return Err(MeterError::InvalidInput(
                "ECHONET Lite frame needs at least one property".to_string(),
            ));
        }
        if properties.len() > MAX_PROPERTIES {
            return Err(MeterError::InvalidInput(format!(
                "Too many properties for one frame: {}",
                properties.len()
            )));
        }
        Ok(Self {
            tid,
            seoj,
            deoj,
            esv,
            properties,
        })
    }

    /// Convenience for a Get request reading `codes` from `deoj`
    pub fn get_request(deoj: EchonetObject, codes: &[PropertyCode]) -> MeterResult<Self> {
        Self::new(
            deoj,
            ServiceCode::GET,
            codes.iter().copied().map(Property::request).collect(),
        )
    }

    /// Transaction ID
    pub fn tid(&self) -> u16 {
        self.tid
    }

    /// Source object
    pub fn seoj(&self) -> EchonetObject {
        self.seoj
    }

    /// Destination object
    pub fn deoj(&self) -> EchonetObject {
        self.deoj
    }

    pub fn esv(&self) -> ServiceCode {
        self.esv
    }

    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    /// Length of [`Frame::build`]'s output
    pub fn encoded_len(&self) -> usize {
        FRAME_HEADER_LENGTH + self.properties.iter().map(Property::encoded_len).sum::<usize>()
    }

    /// Encode the frame
    pub fn build(&self) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(self.encoded_len());
        buf.put_u16(ECHONET_LITE_HEADER);
        buf.put_u16(self.tid);
        put_object(&mut buf, self.seoj);
        put_object(&mut buf, self.deoj);
        buf.put_u8(self.esv.0);
        // OPC; bounded by MAX_PROPERTIES at construction
        buf.put_u8(self.properties.len() as u8);
        for property in &self.properties {
            buf.put_u8(property.epc().0);
            buf.put_u8(property.edt().len() as u8);
            buf.put_slice(property.edt());
        }
        buf.to_vec()
    }

    /// Decode a frame
    ///
    /// Bytes following the last property are ignored.
    ///
    /// # Errors
    ///
    /// Returns `MeterError::MalformedFrame` if:
    /// - `raw` is shorter than 14 bytes
    /// - the header is not `0x1081`
    /// - a property header or payload runs past the end of `raw`
    pub fn parse(raw: &[u8]) -> MeterResult<Self> {
        if raw.len() < MIN_FRAME_LENGTH {
            return Err(MeterError::MalformedFrame(format!(
                "Too short ECHONET Lite frame: {} bytes",
                raw.len()
            )));
        }
        let header = u16::from_be_bytes([raw[0], raw[1]]);
        if header != ECHONET_LITE_HEADER {
            return Err(MeterError::MalformedFrame(format!(
                "Unknown ECHONET Lite header: {:04X}",
                header
            )));
        }

        let tid = u16::from_be_bytes([raw[2], raw[3]]);
        // SEOJ at [4..7], DEOJ at [7..10], read as the low 24 bits of a u32
        let seoj = EchonetObject::new(u32::from_be_bytes([raw[3], raw[4], raw[5], raw[6]]));
        let deoj = EchonetObject::new(u32::from_be_bytes([raw[6], raw[7], raw[8], raw[9]]));
        let esv = ServiceCode(raw[10]);
        let opc = raw[11] as usize;

        let mut properties = Vec::with_capacity(opc);
        let mut pos = FRAME_HEADER_LENGTH;
        for index in 0..opc {
            if raw.len() < pos + 2 {
                return Err(MeterError::MalformedFrame(format!(
                    "Too short ECHONET Lite frame: property {} header missing",
                    index
                )));
            }
            let epc = PropertyCode(raw[pos]);
            let pdc = raw[pos + 1] as usize;
            if raw.len() < pos + 2 + pdc {
                return Err(MeterError::MalformedFrame(format!(
                    "Too short ECHONET Lite frame: EDT of {} needs {} bytes, {} left",
                    epc,
                    pdc,
                    raw.len() - pos - 2
                )));
            }
            properties.push(Property::new(epc, raw[pos + 2..pos + 2 + pdc].to_vec())?);
            pos += 2 + pdc;
        }

        Ok(Self {
            tid,
            seoj,
            deoj,
            esv,
            properties,
        })
    }

    /// Check whether `self` and `request` form a request/response pair
    ///
    /// Property contents are not compared. A response split over several
    /// datagrams by the adapter has a different OPC and does not correlate.
    pub fn correspond_to(&self, request: &Frame) -> bool {
        if self.tid != request.tid {
            return false;
        }
        if self.seoj != request.deoj || self.deoj != request.seoj {
            return false;
        }
        let delta = i16::from(self.esv.0) - i16::from(request.esv.0);
        if delta.abs() != RESPONSE_SERVICE_OFFSET {
            return false;
        }
        // TODO: correlate multi-datagram responses by merging OPCs per TID
        !request.properties.is_empty() && self.properties.len() == request.properties.len()
    }

    /// Assign a new pseudo-random TID
    ///
    /// Uniqueness is not guaranteed and collisions are not re-rolled; a stale
    /// response with a colliding TID still has to pass [`Frame::correspond_to`].
    pub fn regenerate_tid(&mut self) {
        self.tid = rand::random();
    }
}

fn put_object(buf: &mut BytesMut, object: EchonetObject) {
    buf.put_u8((object.code() >> 16 & 0xFF) as u8);
    buf.put_u16((object.code() & 0xFFFF) as u16);
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TID={:04X} SEOJ={} DEOJ={} ESV={} OPC={}",
            self.tid,
            self.seoj,
            self.deoj,
            self.esv,
            self.properties.len()
        )
    }
}
