//! Verbosity gate in front of the `log` facade
//!
//! The adapter stack logs every SK command and response line at debug level,
//! which is far too chatty for a polling loop. `Verbosity` lets the owner of a
//! device decide how much of it reaches the installed logger at all.

use serde::{Deserialize, Serialize};

/// How much the stack hands to the `log` facade
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum Verbosity {
    /// Nothing is logged
    #[default]
    Silent,
    /// Failed commands and retries
    Warn,
    /// Ignored notifications
    Info,
    /// Every command and response line
    Debug,
}

impl Verbosity {
    pub fn warn_enabled(self) -> bool {
        self >= Verbosity::Warn
    }

    pub fn info_enabled(self) -> bool {
        self >= Verbosity::Info
    }

    pub fn debug_enabled(self) -> bool {
        self >= Verbosity::Debug
    }
}

impl From<u8> for Verbosity {
    fn from(level: u8) -> Self {
        match level {
            0 => Verbosity::Silent,
            1 => Verbosity::Warn,
            2 => Verbosity::Info,
            _ => Verbosity::Debug,
        }
    }
}

impl From<Verbosity> for u8 {
    fn from(v: Verbosity) -> Self {
        v as u8
    }
}
