//! Device façade: adapter configuration, join state machine and queries

pub mod builder;
pub mod device;
pub mod options;
pub mod state;

#[cfg(test)]
mod testing;

pub use builder::DeviceBuilder;
pub use device::Device;
pub use options::DeviceOptions;
pub use state::JoinState;
