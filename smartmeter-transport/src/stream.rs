//! Command side of the adapter transport

use async_trait::async_trait;
use smartmeter_core::{MeterError, MeterResult};
use std::fmt;
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Write access to the adapter
///
/// The adapter's replies never come back through this trait: they are
/// drained by a [`LineSource`](crate::LineSource) running on the read half.
#[async_trait]
pub trait TransportLayer: Send {
    /// Write all of `buf` to the adapter
    ///
    /// # Arguments
    ///
    /// * `buf` - Raw bytes. SK commands may carry binary payloads (`SKSENDTO`),
    ///   so this is not restricted to text.
    async fn write_all(&mut self, buf: &[u8]) -> MeterResult<()>;

    /// Flush any buffered data
    async fn flush(&mut self) -> MeterResult<()>;

    /// Check if the transport is closed
    fn is_closed(&self) -> bool;

    /// Close the transport
    async fn close(&mut self) -> MeterResult<()>;
}

/// Transport over any async writer
///
/// Used for the write half of a serial port as well as for in-memory pipes.
pub struct StreamTransport<W> {
    writer: Option<W>,
}

impl<W> StreamTransport<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Some(writer),
        }
    }

    fn writer_mut(&mut self) -> MeterResult<&mut W> {
        self.writer.as_mut().ok_or_else(|| {
            MeterError::Connection(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                "Transport is closed",
            ))
        })
    }
}

impl<W> fmt::Debug for StreamTransport<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamTransport")
            .field("closed", &self.writer.is_none())
            .finish()
    }
}

#[async_trait]
impl<W> TransportLayer for StreamTransport<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn write_all(&mut self, buf: &[u8]) -> MeterResult<()> {
        let writer = self.writer_mut()?;
        let result = writer.write_all(buf).await;
        if result.is_err() {
            self.writer = None;
        }
        result.map_err(MeterError::Connection)
    }

    async fn flush(&mut self) -> MeterResult<()> {
        let writer = self.writer_mut()?;
        writer.flush().await.map_err(MeterError::Connection)
    }

    fn is_closed(&self) -> bool {
        self.writer.is_none()
    }

    async fn close(&mut self) -> MeterResult<()> {
        if let Some(mut writer) = self.writer.take() {
            let _ = writer.flush().await;
            let _ = writer.shutdown().await;
        }
        Ok(())
    }
}
