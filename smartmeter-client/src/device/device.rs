//! Device façade over one B-route adapter
//!
//! A [`Device`] owns the command side of the adapter and the line source
//! draining its replies. Every operation is one or more SK command queries;
//! since each takes `&mut self`, only one query is ever in flight.
//!
//! # Usage Example
//!
//! ```rust,no_run
//! use smartmeter_client::{Device, DeviceOptions};
//! use smartmeter_echonet::{EchonetObject, Frame, smart_meter};
//! use smartmeter_skstack::QueryOptions;
//! use smartmeter_transport::SerialSettings;
//! use std::time::Duration;
//!
//! # async fn demo() -> smartmeter_core::MeterResult<()> {
//! let options = DeviceOptions {
//!     id: Some("00112233445566778899AABBCCDDEEFF".to_string()),
//!     password: Some("0123456789AB".to_string()),
//!     ..DeviceOptions::default()
//! };
//! let mut device = Device::open_serial(&SerialSettings::new("/dev/ttyUSB0"), options)?;
//!
//! let slow = QueryOptions::new().timeout(Duration::from_secs(60)).retry(3);
//! device.authenticate(&slow).await?;
//!
//! let request = Frame::get_request(
//!     EchonetObject::LV_SMART_ELECTRIC_ENERGY_METER,
//!     &[smart_meter::INSTANTANEOUS_ELECTRIC_POWER],
//! )?;
//! let response = device.query_echonet_lite(&request, &QueryOptions::default()).await?;
//! # Ok(())
//! # }
//! ```

use super::{DeviceOptions, JoinState};
use smartmeter_core::{Channel, MeterError, MeterResult, Verbosity};
use smartmeter_echonet::Frame;
use smartmeter_skstack::{
    AdapterInfo, ECHONET_LITE_PORT, ERXUDP_PREFIX, ErxUdp, PanDescriptor, QueryOptions, SkQuery,
    event, parse_link_local, parse_neighbor, parse_register_value, parse_version,
};
use smartmeter_transport::{
    LineSource, SerialSettings, SerialTransport, StreamTransport, TransportLayer, open_serial,
    open_stream,
};
use tokio::io::{AsyncRead, AsyncWrite, WriteHalf};

const LOG_TARGET: &str = "smartmeter::client";

/// One B-route adapter and what is known about the meter behind it
pub struct Device<T = SerialTransport> {
    transport: T,
    lines: LineSource,
    port_name: Option<String>,
    options: DeviceOptions,
    channel: Option<Channel>,
    pan_id: Option<String>,
    mac_addr: Option<String>,
    ip_addr: Option<String>,
    state: JoinState,
}

impl Device<SerialTransport> {
    /// Open the adapter on a serial port
    ///
    /// # Errors
    ///
    /// Returns `MeterError::Connection` if the port cannot be opened
    pub fn open_serial(settings: &SerialSettings, options: DeviceOptions) -> MeterResult<Self> {
        let (transport, lines) = open_serial(settings)?;
        Ok(Self::new(transport, lines, options).with_port_name(&settings.port_name))
    }
}

impl<S> Device<StreamTransport<WriteHalf<S>>>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    /// Use an adapter reachable through any byte stream
    pub fn open_stream(stream: S, options: DeviceOptions) -> Self {
        let (transport, lines) = open_stream(stream);
        Self::new(transport, lines, options)
    }
}

impl<T> Device<T> {
    /// Assemble a device from an already opened transport
    pub fn new(transport: T, lines: LineSource, options: DeviceOptions) -> Self {
        Self {
            transport,
            lines,
            port_name: None,
            channel: options.channel,
            ip_addr: options.ip_addr.clone(),
            pan_id: None,
            mac_addr: None,
            state: JoinState::Idle,
            options,
        }
    }

    fn with_port_name(mut self, port_name: &str) -> Self {
        self.port_name = Some(port_name.to_string());
        self
    }

    /// Serial port the adapter was opened on; `None` for other streams
    pub fn port_name(&self) -> Option<&str> {
        self.port_name.as_deref()
    }

    /// Channel of the PAN, as configured or found by scan
    pub fn channel(&self) -> Option<Channel> {
        self.channel
    }

    /// PAN ID found by scan
    pub fn pan_id(&self) -> Option<&str> {
        self.pan_id.as_deref()
    }

    /// MAC address of the meter found by scan
    pub fn mac_addr(&self) -> Option<&str> {
        self.mac_addr.as_deref()
    }

    /// Link-local IPv6 address of the meter
    pub fn ip_addr(&self) -> Option<&str> {
        self.ip_addr.as_deref()
    }

    pub fn set_ip_addr(&mut self, ip_addr: impl Into<String>) {
        self.ip_addr = Some(ip_addr.into());
    }

    pub fn is_dual_stack(&self) -> bool {
        self.options.dual_stack
    }

    pub fn join_state(&self) -> JoinState {
        self.state
    }

    pub fn options(&self) -> &DeviceOptions {
        &self.options
    }

    fn enter(&mut self, next: JoinState) -> MeterResult<()> {
        self.state.validate_transition(next)?;
        if self.options.verbosity.info_enabled() {
            log::info!(target: LOG_TARGET, "Join state: {} -> {}", self.state, next);
        }
        self.state = next;
        Ok(())
    }

    fn settle<R>(&mut self, result: MeterResult<R>) -> MeterResult<R> {
        if result.is_err() {
            if self.options.verbosity.info_enabled() {
                log::info!(target: LOG_TARGET, "Join state: {} -> {}", self.state, JoinState::Failed);
            }
            self.state = JoinState::Failed;
        }
        result
    }
}

impl<T: TransportLayer> Device<T> {
    /// Firmware version (`SKVER`)
    pub async fn get_version(&mut self, opts: &QueryOptions) -> MeterResult<String> {
        let res = self.query_sk_command("SKVER", opts).await?;
        parse_version(&res)
    }

    /// Adapter identity (`SKINFO`)
    pub async fn get_info(&mut self, opts: &QueryOptions) -> MeterResult<AdapterInfo> {
        let res = self.query_sk_command("SKINFO", opts).await?;
        AdapterInfo::parse(&res)
    }

    /// Read a virtual register (`SKSREG Sxx`)
    ///
    /// # Errors
    ///
    /// Returns `MeterError::InvalidInput` if `name` does not start with `S`
    pub async fn get_register_value(&mut self, name: &str, opts: &QueryOptions) -> MeterResult<String> {
        check_register_name(name)?;
        let res = self.query_sk_command(&format!("SKSREG {}", name), opts).await?;
        parse_register_value(&res)
    }

    /// Write a virtual register (`SKSREG Sxx value`)
    ///
    /// # Errors
    ///
    /// Returns `MeterError::InvalidInput` if `name` does not start with `S`
    pub async fn set_register_value(
        &mut self,
        name: &str,
        value: &str,
        opts: &QueryOptions,
    ) -> MeterResult<()> {
        check_register_name(name)?;
        self.query_sk_command(&format!("SKSREG {} {}", name, value), opts)
            .await?;
        Ok(())
    }

    /// Program the configured B-route ID (`SKSETRBID`)
    pub async fn set_id(&mut self, opts: &QueryOptions) -> MeterResult<()> {
        let id = match self.options.id.as_deref() {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => return Err(MeterError::InvalidInput("ID not specified".to_string())),
        };
        self.query_sk_command(&format!("SKSETRBID {}", id), opts).await?;
        Ok(())
    }

    /// Program the configured B-route password (`SKSETPWD`)
    pub async fn set_password(&mut self, opts: &QueryOptions) -> MeterResult<()> {
        let password = match self.options.password.as_deref() {
            Some(password) if !password.is_empty() => password.to_string(),
            _ => return Err(MeterError::InvalidInput("Password not specified".to_string())),
        };
        let command = format!("SKSETPWD {:X} {}", password.len(), password);
        self.query_sk_command(&command, opts).await?;
        Ok(())
    }

    /// Address of the single neighbor in the adapter's table (`SKTABLE 2`)
    pub async fn neighbor_ip(&mut self, opts: &QueryOptions) -> MeterResult<String> {
        let res = self.query_sk_command("SKTABLE 2", opts).await?;
        parse_neighbor(&res)
    }

    /// Find the meter's PAN by active scan and resolve its address
    ///
    /// Programs ID and password first. On success channel, PAN ID, MAC
    /// address and IP address are all updated.
    ///
    /// # Errors
    ///
    /// - `MeterError::InvalidInput` if ID or password is not configured
    /// - `MeterError::ScanFailed` if no PAN was found
    /// - `MeterError::InvalidScanResult` if the PAN descriptor is incomplete
    pub async fn scan(&mut self, opts: &QueryOptions) -> MeterResult<()> {
        let result = self.scan_pan(opts).await;
        self.settle(result).map(|_| ())
    }

    /// Start a PANA session with the meter (`SKJOIN`)
    ///
    /// `EVENT 24` is retried within the query's retry budget.
    ///
    /// # Errors
    ///
    /// Returns `MeterError::NoPeerAddress` if the meter's address is unknown
    pub async fn join(&mut self, opts: &QueryOptions) -> MeterResult<()> {
        let result = self.join_pan(opts).await;
        self.settle(result)
    }

    /// Scan, program channel and PAN ID, then join
    pub async fn authenticate(&mut self, opts: &QueryOptions) -> MeterResult<()> {
        let result = self.authenticate_pan(opts).await;
        self.settle(result)
    }

    async fn scan_pan(&mut self, opts: &QueryOptions) -> MeterResult<PanDescriptor> {
        self.set_id(opts).await?;
        self.set_password(opts).await?;
        self.enter(JoinState::Scanning)?;

        let mask = self.channel.map_or(u32::MAX, |channel| channel.scan_mask());
        let mut command = format!("SKSCAN 2 {:08X} 7", mask);
        if self.options.dual_stack {
            command.push_str(" 0");
        }
        let res = self
            .query_sk_command_with(&command, opts, |line| Ok(line.starts_with(event::SCAN_DONE)))
            .await?;
        let desc = PanDescriptor::parse(&res)?;

        // SKLL64 answers with the address alone, without OK
        let res = self
            .query_sk_command_with(&format!("SKLL64 {}", desc.mac_addr), opts, |_| Ok(true))
            .await?;
        let ip_addr = parse_link_local(&res)?;

        self.channel = Some(desc.channel);
        self.pan_id = Some(desc.pan_id.clone());
        self.mac_addr = Some(desc.mac_addr.clone());
        self.ip_addr = Some(ip_addr);
        self.enter(JoinState::Scanned)?;
        Ok(desc)
    }

    async fn join_pan(&mut self, opts: &QueryOptions) -> MeterResult<()> {
        let ip_addr = self.ip_addr.clone().ok_or(MeterError::NoPeerAddress)?;
        self.enter(JoinState::Joining)?;
        self.query_sk_command_with(&format!("SKJOIN {}", ip_addr), opts, |line| {
            if line.starts_with(event::PANA_FAILED) {
                Err(MeterError::Retryable(format!("PANA connection error ({})", line)))
            } else {
                Ok(line.starts_with(event::PANA_JOINED))
            }
        })
        .await?;
        self.enter(JoinState::Joined)
    }

    async fn authenticate_pan(&mut self, opts: &QueryOptions) -> MeterResult<()> {
        let desc = self.scan_pan(opts).await?;
        self.enter(JoinState::Authenticating)?;
        self.set_register_value("S02", &desc.channel.to_string(), opts)
            .await?;
        self.set_register_value("S03", &desc.pan_id, opts).await?;
        self.join_pan(opts).await
    }

    /// Run an SK command completed by an `OK` line
    pub async fn query_sk_command(&mut self, command: &str, opts: &QueryOptions) -> MeterResult<String> {
        let query = SkQuery::new(command, self.options.query_config(opts));
        self.run(query).await
    }

    /// Run an SK command with a custom completion predicate
    ///
    /// See [`SkQuery`] for the predicate contract.
    pub async fn query_sk_command_with<F>(
        &mut self,
        command: &str,
        opts: &QueryOptions,
        reader: F,
    ) -> MeterResult<String>
    where
        F: FnMut(&str) -> MeterResult<bool> + Send,
    {
        let query = SkQuery::new(command, self.options.query_config(opts)).with_reader(reader);
        self.run(query).await
    }

    /// Send an ECHONET Lite request to the meter and wait for its response
    ///
    /// Unrelated or unparsable `ERXUDP` notifications are skipped. A failed
    /// UDP send (`EVENT 21 .. 01`) is retried within the retry budget.
    ///
    /// # Errors
    ///
    /// - `MeterError::NoPeerAddress` if the meter's address is unknown
    /// - `MeterError::PanaUnconnected` on `EVENT 21 .. 02`
    /// - `MeterError::Timeout` if no matching response arrives
    pub async fn query_echonet_lite(&mut self, request: &Frame, opts: &QueryOptions) -> MeterResult<Frame> {
        let ip_addr = self.ip_addr.as_deref().ok_or(MeterError::NoPeerAddress)?;
        let payload = request.build();
        let side = if self.options.dual_stack { "0 " } else { "" };
        let mut command = format!(
            "SKSENDTO 1 {} {:04X} 1 {}{:04X} ",
            ip_addr,
            ECHONET_LITE_PORT,
            side,
            payload.len()
        )
        .into_bytes();
        command.extend_from_slice(&payload);

        let config = self.options.query_config(opts);
        let verbosity = config.verbosity;
        let mut response = None;
        let query = SkQuery::new(command, config).with_reader(|line: &str| {
            let frame = match_response(line, request, verbosity)?;
            let done = frame.is_some();
            if done {
                response = frame;
            }
            Ok(done)
        });
        self.run(query).await?;
        response.ok_or_else(|| MeterError::unexpected("SKSENDTO", "no ECHONET Lite response"))
    }

    /// Close the command side of the adapter
    pub async fn close(&mut self) -> MeterResult<()> {
        self.transport.close().await
    }

    /// Check whether the adapter connection is gone
    pub fn is_closed(&self) -> bool {
        self.transport.is_closed() || self.lines.is_finished()
    }

    async fn run(&mut self, query: SkQuery<'_>) -> MeterResult<String> {
        let command = query.command().to_vec();
        let verbosity = query.config().verbosity;
        let result = query.exec(&mut self.transport, &mut self.lines).await;
        if let Err(e) = &result {
            if verbosity.warn_enabled() {
                log::warn!(
                    target: LOG_TARGET,
                    "Error for SK command \"{}\": {}",
                    command.escape_ascii(),
                    e
                );
            }
        }
        result
    }
}

fn check_register_name(name: &str) -> MeterResult<()> {
    if name.starts_with('S') {
        Ok(())
    } else {
        Err(MeterError::InvalidInput(format!("Invalid register name: {}", name)))
    }
}

/// Completion step of an ECHONET Lite exchange
///
/// Returns the response frame once a line carries it, `None` for lines to
/// skip.
fn match_response(line: &str, request: &Frame, verbosity: Verbosity) -> MeterResult<Option<Frame>> {
    if line.starts_with(event::UDP_SENT) {
        if line.ends_with(event::UDP_SEND_FAILED) {
            return Err(MeterError::Retryable(
                "Failed to send UDP packet (EVENT 21/01)".to_string(),
            ));
        }
        if line.ends_with(event::UDP_NO_SESSION) {
            return Err(MeterError::PanaUnconnected(line.to_string()));
        }
        return Ok(None);
    }
    if !line.starts_with(ERXUDP_PREFIX) {
        return Ok(None);
    }

    let datagram = match ErxUdp::parse(line) {
        Ok(datagram) => datagram,
        Err(e) => {
            if verbosity.warn_enabled() {
                log::warn!(target: LOG_TARGET, "ERXUDP parse error: {}", e);
            }
            return Ok(None);
        }
    };
    if !datagram.is_echonet_lite() {
        if verbosity.info_enabled() {
            log::info!(
                target: LOG_TARGET,
                "ERXUDP ignored: port {:04X} from {}",
                datagram.source_port,
                datagram.sender
            );
        }
        return Ok(None);
    }

    match Frame::parse(&datagram.payload) {
        Ok(frame) if frame.correspond_to(request) => Ok(Some(frame)),
        Ok(frame) => {
            if verbosity.info_enabled() {
                log::info!(target: LOG_TARGET, "ERXUDP ignorable: [{}] for [{}]", frame, request);
            }
            Ok(None)
        }
        Err(e) => {
            if verbosity.warn_enabled() {
                log::warn!(target: LOG_TARGET, "ERXUDP parse error: {}", e);
            }
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{ADAPTER_IP, METER_IP, fake_device, replies};
    use super::*;
    use smartmeter_echonet::{EchonetObject, Property, ServiceCode, smart_meter};
    use std::time::Duration;

    fn credentials() -> DeviceOptions {
        DeviceOptions {
            id: Some("00112233445566778899AABBCCDDEEFF".to_string()),
            password: Some("0123456789AB".to_string()),
            ..DeviceOptions::default()
        }
    }

    fn fast(retry: u32) -> QueryOptions {
        QueryOptions::new()
            .retry(retry)
            .retry_interval(Duration::from_millis(10))
            .timeout(Duration::from_millis(500))
    }

    fn scan_script() -> Vec<Vec<String>> {
        vec![
            replies(&["OK"]),
            replies(&["OK"]),
            replies(&[
                "OK",
                "EVENT 20 FE80:0000:0000:0000:021D:1290:0003:C890",
                "EPANDESC",
                "  Channel:21",
                "  Channel Page:09",
                "  Pan ID:ABCD",
                "  Addr:0011223344556677",
                "  LQI:E1",
                "  PairID:00AABBCC",
                "EVENT 22 FE80:0000:0000:0000:021D:1290:0003:C890",
            ]),
            replies(&[METER_IP]),
        ]
    }

    fn erxudp(frame: &Frame) -> String {
        let raw = frame.build();
        format!(
            "ERXUDP {} {} 0E1A 0E1A 0011223344556677 1 {:04X} {}",
            METER_IP,
            ADAPTER_IP,
            raw.len(),
            hex::encode_upper(&raw)
        )
    }

    fn power_request() -> Frame {
        Frame::with_tid(
            0x1234,
            EchonetObject::CONTROLLER,
            EchonetObject::LV_SMART_ELECTRIC_ENERGY_METER,
            ServiceCode::GET,
            vec![Property::request(smart_meter::INSTANTANEOUS_ELECTRIC_POWER)],
        )
        .unwrap()
    }

    fn power_response(tid: u16) -> Frame {
        Frame::with_tid(
            tid,
            EchonetObject::LV_SMART_ELECTRIC_ENERGY_METER,
            EchonetObject::CONTROLLER,
            ServiceCode::GET_RES,
            vec![
                Property::new(smart_meter::INSTANTANEOUS_ELECTRIC_POWER, vec![0, 0, 1, 0x2C]).unwrap(),
            ],
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_get_version_and_register() {
        let (mut device, commands) = fake_device(
            vec![replies(&["EVER 1.2.10", "OK"]), replies(&["ESREG 21", "OK"])],
            DeviceOptions::default(),
        );
        assert_eq!(device.get_version(&fast(0)).await.unwrap(), "1.2.10");
        assert_eq!(device.get_register_value("S02", &fast(0)).await.unwrap(), "21");
        assert_eq!(commands.sent(), vec!["SKVER", "SKSREG S02"]);
    }

    #[tokio::test]
    async fn test_invalid_register_name_sends_nothing() {
        let (mut device, commands) = fake_device(vec![], DeviceOptions::default());
        let err = device.set_register_value("X02", "21", &fast(0)).await.unwrap_err();
        assert!(matches!(err, MeterError::InvalidInput(_)));
        assert!(commands.sent().is_empty());
    }

    #[tokio::test]
    async fn test_get_info() {
        let line = format!("EINFO {} 001D129000030C89 21 ABCD FFFE", ADAPTER_IP);
        let (mut device, _) = fake_device(
            vec![vec![line, "OK".to_string()]],
            DeviceOptions::default(),
        );
        let info = device.get_info(&fast(0)).await.unwrap();
        assert_eq!(info.ip_addr, ADAPTER_IP);
        assert_eq!(info.pan_id, "ABCD");
    }

    #[tokio::test]
    async fn test_neighbor_ip() {
        let line = format!("{} 0011223344556677 FFFF", METER_IP);
        let (mut device, _) = fake_device(
            vec![vec!["EADDR".to_string(), line, "OK".to_string()]],
            DeviceOptions::default(),
        );
        assert_eq!(device.neighbor_ip(&fast(0)).await.unwrap(), METER_IP);
    }

    #[tokio::test]
    async fn test_scan() {
        let (mut device, commands) = fake_device(scan_script(), credentials());
        device.scan(&fast(0)).await.unwrap();

        assert_eq!(device.channel(), Some(Channel::new(0x21).unwrap()));
        assert_eq!(device.pan_id(), Some("ABCD"));
        assert_eq!(device.mac_addr(), Some("0011223344556677"));
        assert_eq!(device.ip_addr(), Some(METER_IP));
        assert_eq!(device.join_state(), JoinState::Scanned);
        assert_eq!(
            commands.sent(),
            vec![
                "SKSETRBID 00112233445566778899AABBCCDDEEFF",
                "SKSETPWD C 0123456789AB",
                "SKSCAN 2 FFFFFFFF 7",
                "SKLL64 0011223344556677",
            ]
        );
    }

    #[tokio::test]
    async fn test_scan_single_channel_dual_stack() {
        let options = DeviceOptions {
            channel: Some(Channel::new(0x23).unwrap()),
            dual_stack: true,
            ..credentials()
        };
        let (mut device, commands) = fake_device(scan_script(), options);
        device.scan(&fast(0)).await.unwrap();
        assert_eq!(commands.sent()[2], "SKSCAN 2 00000004 7 0");
    }

    #[tokio::test]
    async fn test_scan_requires_credentials() {
        let (mut device, commands) = fake_device(vec![], DeviceOptions::default());
        let err = device.scan(&fast(0)).await.unwrap_err();
        assert!(matches!(err, MeterError::InvalidInput(_)));
        assert_eq!(device.join_state(), JoinState::Failed);
        assert!(commands.sent().is_empty());
    }

    #[tokio::test]
    async fn test_scan_without_pan() {
        let (mut device, _) = fake_device(
            vec![
                replies(&["OK"]),
                replies(&["OK"]),
                replies(&["OK", "EVENT 22 FE80:0000:0000:0000:021D:1290:0003:C890"]),
            ],
            credentials(),
        );
        let err = device.scan(&fast(0)).await.unwrap_err();
        assert!(matches!(err, MeterError::ScanFailed(_)));
        assert_eq!(device.join_state(), JoinState::Failed);
        assert_eq!(device.pan_id(), None);
    }

    #[tokio::test]
    async fn test_authenticate_retries_join() {
        let mut script = scan_script();
        script.push(replies(&["OK"]));
        script.push(replies(&["OK"]));
        script.push(vec!["OK".to_string(), format!("EVENT 24 {}", METER_IP)]);
        script.push(vec!["OK".to_string(), format!("EVENT 25 {}", METER_IP)]);
        let (mut device, commands) = fake_device(script, credentials());

        device.authenticate(&fast(1)).await.unwrap();
        assert!(device.join_state().is_joined());

        let sent = commands.sent();
        assert_eq!(sent.len(), 8);
        assert_eq!(sent[4], "SKSREG S02 21");
        assert_eq!(sent[5], "SKSREG S03 ABCD");
        assert_eq!(sent[6], format!("SKJOIN {}", METER_IP));
        assert_eq!(sent[7], sent[6]);
    }

    #[tokio::test]
    async fn test_join_needs_peer_address() {
        let (mut device, commands) = fake_device(vec![], DeviceOptions::default());
        let err = device.join(&fast(0)).await.unwrap_err();
        assert!(matches!(err, MeterError::NoPeerAddress));
        assert_eq!(device.join_state(), JoinState::Failed);
        assert!(commands.sent().is_empty());
    }

    #[tokio::test]
    async fn test_query_echonet_lite() {
        let options = DeviceOptions {
            ip_addr: Some(METER_IP.to_string()),
            ..DeviceOptions::default()
        };
        let request = power_request();
        let expected = power_response(0x1234);
        let script = vec![vec![
            format!("EVENT 21 {} 00", METER_IP),
            "OK".to_string(),
            // stale response of another transaction
            erxudp(&power_response(0x1233)),
            format!("ERXUDP {} {} 0E1A 0E1A 0011223344556677 1 0010 1081", METER_IP, ADAPTER_IP),
            erxudp(&expected),
        ]];
        let (mut device, commands) = fake_device(script, options);

        let response = device.query_echonet_lite(&request, &fast(0)).await.unwrap();
        assert_eq!(response, expected);

        let mut command = format!("SKSENDTO 1 {} 0E1A 1 000E ", METER_IP).into_bytes();
        command.extend_from_slice(&request.build());
        assert_eq!(commands.raw()[0], command);
    }

    #[tokio::test]
    async fn test_query_echonet_lite_binary_payload() {
        let options = DeviceOptions {
            ip_addr: Some(METER_IP.to_string()),
            ..DeviceOptions::default()
        };
        let request = power_request();
        // EDT holds a space, a CR and bytes above 0x7F
        let expected = Frame::with_tid(
            0x1234,
            EchonetObject::LV_SMART_ELECTRIC_ENERGY_METER,
            EchonetObject::CONTROLLER,
            ServiceCode::GET_RES,
            vec![
                Property::new(smart_meter::INSTANTANEOUS_ELECTRIC_POWER, vec![0x20, 0x0D, 0x80, 0xFF])
                    .unwrap(),
            ],
        )
        .unwrap();
        let raw = expected.build();
        let binary = format!(
            "ERXUDP {} {} 0E1A 0E1A 0011223344556677 1 {:04X} {}",
            METER_IP,
            ADAPTER_IP,
            raw.len(),
            raw.iter().map(|&b| char::from(b)).collect::<String>()
        );
        let script = vec![vec![format!("EVENT 21 {} 00", METER_IP), "OK".to_string(), binary]];
        let (mut device, _) = fake_device(script, options);

        let response = device.query_echonet_lite(&request, &fast(0)).await.unwrap();
        assert_eq!(response, expected);
        assert_eq!(response.properties()[0].edt(), &[0x20, 0x0D, 0x80, 0xFF]);
        assert_eq!(device.join_state(), JoinState::Idle);
    }

    #[tokio::test]
    async fn test_query_echonet_lite_retries_send_failure() {
        let options = DeviceOptions {
            ip_addr: Some(METER_IP.to_string()),
            dual_stack: true,
            ..DeviceOptions::default()
        };
        let request = power_request();
        let script = vec![
            vec![format!("EVENT 21 {} 0 01", METER_IP)],
            vec![format!("EVENT 21 {} 0 00", METER_IP), erxudp(&power_response(0x1234))],
        ];
        let (mut device, commands) = fake_device(script, options);

        device.query_echonet_lite(&request, &fast(1)).await.unwrap();
        let raw = commands.raw();
        assert_eq!(raw.len(), 2);
        let prefix = format!("SKSENDTO 1 {} 0E1A 1 0 000E ", METER_IP);
        assert!(raw[0].starts_with(prefix.as_bytes()));
    }

    #[tokio::test]
    async fn test_query_echonet_lite_pana_unconnected() {
        let options = DeviceOptions {
            ip_addr: Some(METER_IP.to_string()),
            ..DeviceOptions::default()
        };
        let script = vec![vec![format!("EVENT 21 {} 02", METER_IP)]];
        let (mut device, commands) = fake_device(script, options);

        let err = device.query_echonet_lite(&power_request(), &fast(3)).await.unwrap_err();
        assert!(matches!(err, MeterError::PanaUnconnected(_)));
        assert_eq!(commands.raw().len(), 1);
    }

    #[tokio::test]
    async fn test_query_echonet_lite_needs_peer_address() {
        let (mut device, commands) = fake_device(vec![], DeviceOptions::default());
        let err = device.query_echonet_lite(&power_request(), &fast(0)).await.unwrap_err();
        assert!(matches!(err, MeterError::NoPeerAddress));
        assert!(commands.raw().is_empty());
    }

    #[tokio::test]
    async fn test_unanswered_request_times_out() {
        let options = DeviceOptions {
            ip_addr: Some(METER_IP.to_string()),
            ..DeviceOptions::default()
        };
        let script = vec![vec![format!("EVENT 21 {} 00", METER_IP), "OK".to_string()]];
        let (mut device, _) = fake_device(script, options);

        let opts = QueryOptions::new().timeout(Duration::from_millis(50));
        let err = device.query_echonet_lite(&power_request(), &opts).await.unwrap_err();
        assert!(matches!(err, MeterError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_port_name() {
        let (device, _) = fake_device(vec![], DeviceOptions::default());
        assert_eq!(device.port_name(), None);
        let device = device.with_port_name("/dev/ttyUSB0");
        assert_eq!(device.port_name(), Some("/dev/ttyUSB0"));

        let missing = SerialSettings::new("/dev/no-such-b-route-adapter");
        assert!(Device::open_serial(&missing, DeviceOptions::default()).is_err());
    }
}
