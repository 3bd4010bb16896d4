//! The boundary between the monitor and the session backend.

use async_trait::async_trait;
use keeper_core::models::ValidateResponse;

use crate::error::ApiFailure;

/// Path of the validation endpoint, relative to the base URL.
pub const VALIDATE_PATH: &str = "/auth/validate-session";

/// Path of the refresh endpoint, relative to the base URL.
pub const REFRESH_PATH: &str = "/auth/refresh-session";

/// Backend operations the session monitor depends on.
///
/// Implement this trait to point the monitor at a different transport; the
/// crate ships [`crate::HttpSessionApi`] for the REST backend.
#[async_trait]
pub trait SessionApi: Send + Sync {
    /// Ask the backend whether the session behind `token` is still valid.
    ///
    /// # Errors
    /// Returns an [`ApiFailure`] when no verdict could be obtained.
    async fn validate_session(&self, token: &str) -> Result<ValidateResponse, ApiFailure>;

    /// Extend the session behind `token`. Any 2xx answer counts as success.
    ///
    /// # Errors
    /// Returns an [`ApiFailure`] when the refresh was not accepted.
    async fn refresh_session(&self, token: &str) -> Result<(), ApiFailure>;
}

#[async_trait]
impl<T> SessionApi for std::sync::Arc<T>
where
    T: SessionApi + ?Sized,
{
    async fn validate_session(&self, token: &str) -> Result<ValidateResponse, ApiFailure> {
        (**self).validate_session(token).await
    }

    async fn refresh_session(&self, token: &str) -> Result<(), ApiFailure> {
        (**self).refresh_session(token).await
    }
}
