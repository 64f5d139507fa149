//! B-route join state machine

use smartmeter_core::{MeterError, MeterResult};
use std::fmt;

/// Progress of a device towards a PANA session with the meter
///
/// # State Transitions
/// ```text
/// Idle -> Scanning (on scan())
/// Scanning -> Scanned (PAN descriptor and peer address resolved)
/// Scanned -> Authenticating (programming channel and PAN ID)
/// Authenticating -> Joining (on SKJOIN)
/// Joining -> Joined (on EVENT 25)
/// any -> Failed (on error)
/// ```
///
/// `scan()` and `join()` may be called again from any state, so `Scanning`
/// and `Joining` are reachable from everywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JoinState {
    /// Nothing attempted yet (initial state)
    #[default]
    Idle,
    /// Active scan in progress
    Scanning,
    /// Channel, PAN ID, MAC and peer IP are known
    Scanned,
    /// Channel and PAN ID registers are being programmed
    Authenticating,
    /// PANA authentication in progress
    Joining,
    /// PANA session established; ECHONET Lite traffic can flow
    Joined,
    /// The last operation failed
    Failed,
}

impl JoinState {
    /// Check if a PANA session is established
    pub fn is_joined(&self) -> bool {
        matches!(self, JoinState::Joined)
    }

    /// Check if an operation is in progress
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            JoinState::Scanning | JoinState::Authenticating | JoinState::Joining
        )
    }

    /// Validate state transition
    ///
    /// # Returns
    /// `Ok(())` if the transition is valid, `Err` otherwise
    pub fn validate_transition(&self, new_state: JoinState) -> MeterResult<()> {
        let valid = match (*self, new_state) {
            // Entry states of scan() and join()
            (_, JoinState::Scanning) | (_, JoinState::Joining) => true,
            (_, JoinState::Failed) => true,
            (JoinState::Scanning, JoinState::Scanned) => true,
            (JoinState::Scanned, JoinState::Authenticating) => true,
            (JoinState::Joining, JoinState::Joined) => true,
            _ => false,
        };

        if valid {
            Ok(())
        } else {
            Err(MeterError::InvalidInput(format!(
                "Invalid join state transition: {} -> {}",
                self, new_state
            )))
        }
    }
}

impl fmt::Display for JoinState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JoinState::Idle => "idle",
            JoinState::Scanning => "scanning",
            JoinState::Scanned => "scanned",
            JoinState::Authenticating => "authenticating",
            JoinState::Joining => "joining",
            JoinState::Joined => "joined",
            JoinState::Failed => "failed",
        };
        f.write_str(name)
    }
}
