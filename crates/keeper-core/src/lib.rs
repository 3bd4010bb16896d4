//! Shared types for the session keeper: errors, timing constants, wire models
//! and CLI / persisted settings.

pub mod error;
pub mod models;
pub mod settings;
pub mod timing;

pub use error::{KeeperError, Result};
pub use models::{SessionState, UserProfile, SESSION_EXPIRED_CODE};
pub use timing::MonitorTimings;
