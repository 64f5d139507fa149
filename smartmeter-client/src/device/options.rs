//! Device-level configuration

use serde::{Deserialize, Serialize};
use smartmeter_core::{Channel, Verbosity};
use smartmeter_skstack::{QueryConfig, QueryOptions};
use std::fmt;

/// Settings a [`Device`](super::Device) is opened with
///
/// `query` holds the defaults applied to every query the device runs; each
/// call may override them with its own [`QueryOptions`].
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceOptions {
    /// B-route authentication ID
    pub id: Option<String>,
    /// B-route password
    pub password: Option<String>,
    /// Restrict active scan to one channel
    pub channel: Option<Channel>,
    /// Link-local address of the meter, when already known
    pub ip_addr: Option<String>,
    /// Firmware exposes both B-route and HAN interfaces
    pub dual_stack: bool,
    pub verbosity: Verbosity,
    pub query: QueryOptions,
}

impl DeviceOptions {
    /// Resolve the settings of one query
    ///
    /// Fields set in `overrides` win over the device defaults. When neither
    /// sets a verbosity, the device verbosity applies.
    pub fn query_config(&self, overrides: &QueryOptions) -> QueryConfig {
        let mut defaults = self.query.clone();
        defaults.verbosity.get_or_insert(self.verbosity);
        defaults.merge(overrides).resolve()
    }
}

impl fmt::Debug for DeviceOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceOptions")
            .field("id", &self.id)
            .field("password", &self.password.as_ref().map(|_| "********"))
            .field("channel", &self.channel)
            .field("ip_addr", &self.ip_addr)
            .field("dual_stack", &self.dual_stack)
            .field("verbosity", &self.verbosity)
            .field("query", &self.query)
            .finish()
    }
}
