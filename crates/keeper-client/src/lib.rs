//! Client side of the session backend.
//!
//! Provides:
//! - `SessionApi` - the validate / refresh operations the monitor calls
//! - `HttpSessionApi` - the REST implementation
//! - `ApiFailure` - discriminated failure type for both calls

pub mod api;
pub mod error;
pub mod http;

pub use api::SessionApi;
pub use error::ApiFailure;
pub use http::HttpSessionApi;
