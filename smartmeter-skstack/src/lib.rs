//! SK command layer for B-route adapters
//!
//! This crate provides the query engine that sends one SK command at a time
//! and collects its response lines, plus parsers for the adapter's replies
//! and event notifications.

pub mod options;
pub mod query;
pub mod response;

pub use options::{QueryConfig, QueryOptions, DEFAULT_RETRY, DEFAULT_RETRY_INTERVAL, DEFAULT_TIMEOUT};
pub use query::{FAIL_PREFIX, Reader, SkQuery, read_until_ok};
pub use response::{
    AdapterInfo, ECHONET_LITE_PORT, ERXUDP_PREFIX, ErxUdp, PanDescriptor, event, parse_link_local,
    parse_neighbor, parse_register_value, parse_version,
};
