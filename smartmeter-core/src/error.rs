use std::time::Duration;
use thiserror::Error;

/// Main error type for smart meter adapter operations
#[derive(Error, Debug)]
pub enum MeterError {
    #[error("Connection error: {0}")]
    Connection(#[from] std::io::Error),

    /// No terminal line arrived within the query timeout. Never retried.
    #[error("SK command timeout ({0:?})")]
    Timeout(Duration),

    /// The line source ended before the in-flight command completed
    #[error("SK command read error: line source closed")]
    TransportClosed,

    /// The adapter answered with a `FAIL ...` line
    #[error("SK command response error: {0}")]
    DeviceRejected(String),

    /// Transient condition reported by a completion predicate.
    ///
    /// The query engine re-sends the command while the retry budget lasts.
    #[error("{0} (retrying)")]
    Retryable(String),

    /// Permanent condition reported by a completion predicate
    #[error("Protocol error: {0}")]
    Terminal(String),

    #[error("PANA unconnected: {0}")]
    PanaUnconnected(String),

    #[error("Malformed ECHONET Lite frame: {0}")]
    MalformedFrame(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unexpected response for {command}: {response:?}")]
    UnexpectedResponse { command: String, response: String },

    /// Active scan finished without a PAN descriptor
    #[error("Scan failed. Response is: {0:?}")]
    ScanFailed(String),

    #[error("Channel or PAN ID or MAC address is invalid: {channel:?}, {pan_id:?}, {mac_addr:?}")]
    InvalidScanResult {
        channel: String,
        pan_id: String,
        mac_addr: String,
    },

    #[error("IP address for smart electric energy meter is not specified")]
    NoPeerAddress,
}

impl MeterError {
    /// Whether the query engine may re-send the command after this error
    pub fn is_retryable(&self) -> bool {
        matches!(self, MeterError::Retryable(_))
    }

    /// Build an `UnexpectedResponse` error for `command`
    pub fn unexpected(command: impl Into<String>, response: impl Into<String>) -> Self {
        MeterError::UnexpectedResponse {
            command: command.into(),
            response: response.into(),
        }
    }
}

/// Result type alias for smart meter adapter operations
pub type MeterResult<T> = Result<T, MeterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_retryable_is_retryable() {
        assert!(MeterError::Retryable("EVENT 24".to_string()).is_retryable());
        assert!(!MeterError::Terminal("x".to_string()).is_retryable());
        assert!(!MeterError::PanaUnconnected("x".to_string()).is_retryable());
        assert!(!MeterError::Timeout(Duration::from_millis(50)).is_retryable());
        assert!(!MeterError::DeviceRejected("FAIL ER04".to_string()).is_retryable());
    }

    #[test]
    fn test_display() {
        let err = MeterError::DeviceRejected("FAIL ER10".to_string());
        assert_eq!(err.to_string(), "SK command response error: FAIL ER10");

        let err = MeterError::unexpected("SKVER", "\nOK");
        assert!(err.to_string().starts_with("Unexpected response for SKVER"));
    }
}
