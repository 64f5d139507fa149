//! Serial port transport implementation

use crate::line::LineSource;
use crate::stream::StreamTransport;
use smartmeter_core::{MeterError, MeterResult};
use tokio::io::{AsyncRead, AsyncWrite, WriteHalf};
use tokio_serial::SerialStream;

/// Baud rate of the B-route adapters (BP35A1, BP35C0, RL7023, WSR35A1)
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Serial port settings
#[derive(Debug, Clone)]
pub struct SerialSettings {
    pub port_name: String,
    pub baud_rate: u32,
    pub data_bits: tokio_serial::DataBits,
    pub stop_bits: tokio_serial::StopBits,
    pub parity: tokio_serial::Parity,
    pub flow_control: tokio_serial::FlowControl,
}

impl SerialSettings {
    /// Create settings for an adapter: 115200 baud, 8N1, no flow control
    pub fn new(port_name: impl Into<String>) -> Self {
        Self::with_baud_rate(port_name, DEFAULT_BAUD_RATE)
    }

    /// Create settings with a non-default baud rate
    pub fn with_baud_rate(port_name: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            port_name: port_name.into(),
            baud_rate,
            data_bits: tokio_serial::DataBits::Eight,
            stop_bits: tokio_serial::StopBits::One,
            parity: tokio_serial::Parity::None,
            flow_control: tokio_serial::FlowControl::None,
        }
    }
}

/// Write half of an open serial port
pub type SerialTransport = StreamTransport<WriteHalf<SerialStream>>;

/// Open the serial port and start draining its read half
///
/// # Returns
///
/// The command transport and the line source fed by the port
///
/// # Errors
///
/// Returns `MeterError::Connection` if the port cannot be opened
pub fn open_serial(settings: &SerialSettings) -> MeterResult<(SerialTransport, LineSource)> {
    let builder = tokio_serial::new(&settings.port_name, settings.baud_rate)
        .data_bits(settings.data_bits)
        .stop_bits(settings.stop_bits)
        .parity(settings.parity)
        .flow_control(settings.flow_control);

    let stream = SerialStream::open(&builder).map_err(|e| {
        MeterError::Connection(std::io::Error::new(
            std::io::ErrorKind::Other,
            format!("Failed to open serial port {}: {}", settings.port_name, e),
        ))
    })?;

    log::debug!(
        target: "smartmeter::transport",
        "Opened {} at {} baud",
        settings.port_name,
        settings.baud_rate
    );
    Ok(open_stream(stream))
}

/// Split any duplex byte stream into a command transport and a line source
///
/// Useful for adapters bridged over TCP and for in-memory test pipes.
pub fn open_stream<S>(stream: S) -> (StreamTransport<WriteHalf<S>>, LineSource)
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let (reader, writer) = tokio::io::split(stream);
    (StreamTransport::new(writer), LineSource::spawn(reader))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::TransportLayer;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    #[test]
    fn test_serial_settings() {
        let settings = SerialSettings::new("/dev/ttyUSB0");
        assert_eq!(settings.port_name, "/dev/ttyUSB0");
        assert_eq!(settings.baud_rate, 115_200);
        assert_eq!(settings.data_bits, tokio_serial::DataBits::Eight);
        assert_eq!(settings.stop_bits, tokio_serial::StopBits::One);
        assert_eq!(settings.parity, tokio_serial::Parity::None);
    }

    #[tokio::test]
    async fn test_open_stream_duplex() {
        let (local, mut remote) = tokio::io::duplex(64);
        let (mut transport, mut lines) = open_stream(local);

        transport.write_all(b"SKVER\r\n").await.unwrap();
        transport.flush().await.unwrap();
        let mut buf = [0u8; 7];
        remote.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"SKVER\r\n");

        remote.write_all(b"EVER 1.2.10\r\nOK\r\n").await.unwrap();
        assert_eq!(lines.next_line().await.as_deref(), Some("EVER 1.2.10"));
        assert_eq!(lines.next_line().await.as_deref(), Some("OK"));

        drop(remote);
        assert_eq!(lines.next_line().await, None);
    }
}
