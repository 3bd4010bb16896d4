//! Runtime layer of the session keeper.
//!
//! Owns the shared auth state, the host event hub, the session monitor control
//! loop and the driver that ties the monitor's lifetime to the session.

pub mod auth_store;
pub mod deadline;
pub mod driver;
pub mod events;
pub mod session_monitor;

#[cfg(test)]
mod testing;

pub use auth_store::AuthStore;
pub use driver::{DriverHandle, MonitorDriver};
pub use events::{ActivityKind, HostEvent, HostEvents, Visibility};
pub use session_monitor::{MonitorStatus, SessionMonitor};

pub use keeper_client as client;
pub use keeper_core as core;
