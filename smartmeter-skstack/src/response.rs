//! Parsers for SK command responses and adapter events

use once_cell::sync::Lazy;
use regex::Regex;
use smartmeter_core::{Channel, MeterError, MeterResult};
use smartmeter_transport::line_to_bytes;

/// UDP port of ECHONET Lite (3610)
pub const ECHONET_LITE_PORT: u16 = 0x0E1A;

/// Event line prefixes
pub mod event {
    /// UDP send finished; the last field is the result code
    pub const UDP_SENT: &str = "EVENT 21 ";
    /// Active scan finished
    pub const SCAN_DONE: &str = "EVENT 22 ";
    /// PANA connection failed
    pub const PANA_FAILED: &str = "EVENT 24 ";
    /// PANA connection established
    pub const PANA_JOINED: &str = "EVENT 25 ";

    /// `EVENT 21` result: send failed
    pub const UDP_SEND_FAILED: &str = " 01";
    /// `EVENT 21` result: neighbor solicitation, no PANA session
    pub const UDP_NO_SESSION: &str = " 02";
}

/// Inbound UDP notification line prefix
pub const ERXUDP_PREFIX: &str = "ERXUDP ";

static RE_VERSION: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^EVER\s+(.*)$").unwrap());
static RE_INFO: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^EINFO\s+(.*)$").unwrap());
static RE_REGISTER_VALUE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^ESREG\s+(.*)$").unwrap());
static RE_PAN_DESC: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^EPANDESC$").unwrap());
static RE_PAN_CHANNEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s+Channel:([23][0-9A-F])$").unwrap());
static RE_PAN_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^\s+Pan ID:(.*)$").unwrap());
static RE_PAN_MAC_ADDR: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^\s+Addr:(.*)$").unwrap());
static RE_IP_ADDR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^(?:[0-9A-F]{4}:){7}[0-9A-F]{4}$").unwrap());
static RE_NEIGHBOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^((?:[0-9A-F]{4}:){7}[0-9A-F]{4}) [0-9A-F]{16} FFFF$").unwrap()
});
static RE_ERXUDP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"^ERXUDP ((?:[0-9A-F]{4}:){7}[0-9A-F]{4}) ((?:[0-9A-F]{4}:){7}[0-9A-F]{4}) ",
        r"([0-9A-F]{4}) ([0-9A-F]{4}) ([0-9A-F]{16}) ([0-9])(?: ([0-9]+))? ([0-9A-F]+) (.*)$",
    ))
    .unwrap()
});

/// Firmware version from an `SKVER` response
pub fn parse_version(res: &str) -> MeterResult<String> {
    capture(&RE_VERSION, res).ok_or_else(|| MeterError::unexpected("SKVER", res))
}

/// Register value from an `SKSREG` (get) response
pub fn parse_register_value(res: &str) -> MeterResult<String> {
    capture(&RE_REGISTER_VALUE, res).ok_or_else(|| MeterError::unexpected("SKSREG", res))
}

/// Link-local IPv6 address from an `SKLL64` response
pub fn parse_link_local(res: &str) -> MeterResult<String> {
    RE_IP_ADDR
        .find(res)
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| MeterError::unexpected("SKLL64", res))
}

/// The only neighbor in an `SKTABLE 2` response
///
/// # Errors
///
/// Returns `MeterError::UnexpectedResponse` unless exactly one neighbor is listed
pub fn parse_neighbor(res: &str) -> MeterResult<String> {
    let mut neighbors = RE_NEIGHBOR.captures_iter(res);
    match (neighbors.next(), neighbors.next()) {
        (Some(only), None) => Ok(only[1].to_string()),
        _ => Err(MeterError::unexpected("SKTABLE 2", res)),
    }
}

fn capture(re: &Regex, res: &str) -> Option<String> {
    re.captures(res).map(|c| c[1].to_string())
}

/// Adapter identity reported by `SKINFO`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterInfo {
    pub ip_addr: String,
    pub addr64: String,
    pub channel: String,
    pub pan_id: String,
    pub addr16: String,
    /// Everything after `EINFO `, as reported
    pub raw: String,
}

impl AdapterInfo {
    pub fn parse(res: &str) -> MeterResult<Self> {
        let raw = capture(&RE_INFO, res).ok_or_else(|| MeterError::unexpected("SKINFO", res))?;
        let fields: Vec<&str> = raw.split_whitespace().collect();
        let [ip_addr, addr64, channel, pan_id, addr16, ..] = fields[..] else {
            return Err(MeterError::unexpected("SKINFO", res));
        };
        Ok(Self {
            ip_addr: ip_addr.to_string(),
            addr64: addr64.to_string(),
            channel: channel.to_string(),
            pan_id: pan_id.to_string(),
            addr16: addr16.to_string(),
            raw,
        })
    }
}

/// PAN descriptor reported by an active scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanDescriptor {
    pub channel: Channel,
    pub pan_id: String,
    /// MAC address of the coordinator (the meter)
    pub mac_addr: String,
}

impl PanDescriptor {
    /// Extract the first `EPANDESC` block of an `SKSCAN` response
    ///
    /// # Errors
    ///
    /// - `MeterError::ScanFailed` if the response has no `EPANDESC` block
    /// - `MeterError::InvalidScanResult` if channel, PAN ID or address is
    ///   missing or invalid
    pub fn parse(res: &str) -> MeterResult<Self> {
        if !RE_PAN_DESC.is_match(res) {
            return Err(MeterError::ScanFailed(res.to_string()));
        }
        let channel = capture(&RE_PAN_CHANNEL, res).unwrap_or_default();
        let pan_id = capture(&RE_PAN_ID, res).unwrap_or_default();
        let mac_addr = capture(&RE_PAN_MAC_ADDR, res).unwrap_or_default();

        let parsed = Channel::from_hex(&channel).ok();
        match parsed {
            Some(channel) if !pan_id.is_empty() && !mac_addr.is_empty() => Ok(Self {
                channel,
                pan_id,
                mac_addr,
            }),
            _ => Err(MeterError::InvalidScanResult {
                channel,
                pan_id,
                mac_addr,
            }),
        }
    }
}

/// Inbound UDP datagram notification (`ERXUDP`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErxUdp {
    pub sender: String,
    pub destination: String,
    pub source_port: u16,
    pub destination_port: u16,
    /// MAC address of the sender
    pub sender_lla: String,
    pub secured: bool,
    /// Interface side; only reported by dual-stack firmware
    pub side: Option<u8>,
    pub payload: Vec<u8>,
}

impl ErxUdp {
    /// Parse a notification line
    ///
    /// The payload encoding is inferred from its length: as long as the
    /// declared length means raw bytes, twice as long means hex ASCII.
    pub fn parse(line: &str) -> MeterResult<Self> {
        let caps = RE_ERXUDP
            .captures(line)
            .ok_or_else(|| MeterError::unexpected("ERXUDP", line))?;
        let hex_u16 = |i: usize| {
            u16::from_str_radix(&caps[i], 16).map_err(|_| MeterError::unexpected("ERXUDP", line))
        };
        let source_port = hex_u16(3)?;
        let destination_port = hex_u16(4)?;
        let declared = usize::from(hex_u16(8)?);
        let side = match caps.get(7) {
            Some(m) => Some(
                m.as_str()
                    .parse::<u8>()
                    .map_err(|_| MeterError::unexpected("ERXUDP", line))?,
            ),
            None => None,
        };

        let data = &caps[9];
        let length = data.chars().count();
        let payload = if length == declared {
            line_to_bytes(data)
        } else if length == declared * 2 {
            hex::decode(data).ok()
        } else {
            None
        }
        .ok_or_else(|| {
            MeterError::unexpected(
                "ERXUDP",
                format!("data length mismatch ({} declared): {}", declared, line),
            )
        })?;

        Ok(Self {
            sender: caps[1].to_string(),
            destination: caps[2].to_string(),
            source_port,
            destination_port,
            sender_lla: caps[5].to_string(),
            secured: &caps[6] != "0",
            side,
            payload,
        })
    }

    /// Whether the datagram was exchanged between ECHONET Lite ports
    pub fn is_echonet_lite(&self) -> bool {
        self.source_port == ECHONET_LITE_PORT && self.destination_port == ECHONET_LITE_PORT
    }
}
