//! SK command query engine
//!
//! A query writes one command line to the adapter, then consumes response
//! lines until a completion predicate (the *reader*) declares the response
//! complete. The reader sees each line in arrival order and returns:
//!
//! - `Ok(false)`: keep reading
//! - `Ok(true)`: the response is complete
//! - `Err(e)` with `e.is_retryable()`: re-send the command while the retry
//!   budget lasts
//! - any other `Err(e)`: the query fails with `e`
//!
//! Independently of the reader, a line starting with `FAIL ` fails the query
//! with [`MeterError::DeviceRejected`]. A timeout is never retried.

use crate::options::QueryConfig;
use smartmeter_core::{MeterError, MeterResult};
use smartmeter_transport::{LineSource, TransportLayer};
use tokio::time::{Instant, sleep, timeout_at};

/// Prefix of the adapter's error response
pub const FAIL_PREFIX: &str = "FAIL ";

/// Completion predicate of a query
pub type Reader<'a> = Box<dyn FnMut(&str) -> MeterResult<bool> + Send + 'a>;

/// Default completion predicate: the response ends with an `OK` line
pub fn read_until_ok(line: &str) -> MeterResult<bool> {
    Ok(line == "OK")
}

/// One SK command in flight
///
/// # Usage Example
///
/// ```rust,no_run
/// # async fn demo(
/// #     transport: &mut dyn smartmeter_transport::TransportLayer,
/// #     lines: &mut smartmeter_transport::LineSource,
/// # ) -> smartmeter_core::MeterResult<()> {
/// use smartmeter_skstack::{QueryConfig, SkQuery};
///
/// let response = SkQuery::new("SKVER", QueryConfig::default())
///     .exec(transport, lines)
///     .await?;
/// # Ok(())
/// # }
/// ```
pub struct SkQuery<'a> {
    command: Vec<u8>,
    config: QueryConfig,
    reader: Reader<'a>,
}

impl<'a> SkQuery<'a> {
    /// Create a query completed by an `OK` line
    ///
    /// # Arguments
    ///
    /// * `command` - Command bytes without the line terminator; may carry a
    ///   binary payload
    pub fn new(command: impl Into<Vec<u8>>, config: QueryConfig) -> Self {
        Self {
            command: command.into(),
            config,
            reader: Box::new(read_until_ok),
        }
    }

    /// Replace the completion predicate
    pub fn with_reader<F>(mut self, reader: F) -> Self
    where
        F: FnMut(&str) -> MeterResult<bool> + Send + 'a,
    {
        self.reader = Box::new(reader);
        self
    }

    pub fn command(&self) -> &[u8] {
        &self.command
    }

    pub fn config(&self) -> &QueryConfig {
        &self.config
    }

    /// Run the query
    ///
    /// # Returns
    ///
    /// Every line consumed by the final attempt, joined with `\n`, up to and
    /// including the terminal line
    ///
    /// # Errors
    ///
    /// - `MeterError::Timeout` if no terminal line arrives in time
    /// - `MeterError::DeviceRejected` on a `FAIL ` line
    /// - `MeterError::TransportClosed` if the line source ends first
    /// - the reader's error once the retry budget is spent
    pub async fn exec<T>(mut self, transport: &mut T, lines: &mut LineSource) -> MeterResult<String>
    where
        T: TransportLayer + ?Sized,
    {
        let mut remaining = self.config.retry;
        loop {
            match self.attempt(transport, lines).await {
                Err(e) if e.is_retryable() && remaining > 0 => {
                    remaining -= 1;
                    if self.config.verbosity.warn_enabled() {
                        log::warn!(
                            target: "smartmeter::skstack",
                            "{} ({} retries left)",
                            e,
                            remaining
                        );
                    }
                    sleep(self.config.retry_interval).await;
                }
                result => return result,
            }
        }
    }

    async fn attempt<T>(&mut self, transport: &mut T, lines: &mut LineSource) -> MeterResult<String>
    where
        T: TransportLayer + ?Sized,
    {
        let verbosity = self.config.verbosity;
        if verbosity.debug_enabled() {
            log::debug!(target: "smartmeter::skstack", ">> {}", self.command.escape_ascii());
        }

        let mut frame = Vec::with_capacity(self.command.len() + 2);
        frame.extend_from_slice(&self.command);
        frame.extend_from_slice(b"\r\n");
        transport.write_all(&frame).await?;
        transport.flush().await?;

        let deadline = Instant::now() + self.config.timeout;
        let mut response: Vec<String> = Vec::new();
        loop {
            let line = match timeout_at(deadline, lines.next_line()).await {
                Ok(Some(line)) => line,
                Ok(None) => return Err(MeterError::TransportClosed),
                Err(_) => return Err(MeterError::Timeout(self.config.timeout)),
            };
            if verbosity.debug_enabled() {
                log::debug!(target: "smartmeter::skstack", "<< {}", line.escape_debug());
            }

            if line.starts_with(FAIL_PREFIX) {
                return Err(MeterError::DeviceRejected(line));
            }
            let done = (self.reader)(&line)?;
            response.push(line);
            if done {
                return Ok(response.join("\n"));
            }
        }
    }
}
