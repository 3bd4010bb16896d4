//! REST implementation of [`SessionApi`] on top of `reqwest`.

use std::time::Duration;

use async_trait::async_trait;
use keeper_core::error::{KeeperError, Result};
use keeper_core::models::ValidateResponse;

use crate::api::{SessionApi, REFRESH_PATH, VALIDATE_PATH};
use crate::error::ApiFailure;

/// Session backend reached over HTTP.
///
/// The token travels as a bearer `Authorization` header. Every request is
/// bounded by the timeout given at construction; a timed-out request surfaces
/// as [`ApiFailure::Network`].
#[derive(Debug, Clone)]
pub struct HttpSessionApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSessionApi {
    /// Build a client for the backend rooted at `base_url`.
    ///
    /// # Errors
    /// Returns [`KeeperError::Config`] for a URL without an http(s) scheme and
    /// [`KeeperError::HttpClient`] when the client cannot be built.
    pub fn new(base_url: impl Into<String>, request_timeout: Duration) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(KeeperError::Config(format!(
                "base URL must start with http:// or https://, got '{base_url}'"
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .user_agent(concat!("session-keeper/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| KeeperError::HttpClient(e.to_string()))?;

        Ok(Self { client, base_url })
    }

    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

/// Turn a non-2xx response into an [`ApiFailure`], reading the body for a code.
async fn failure_from(response: reqwest::Response) -> ApiFailure {
    let status = response.status().as_u16();
    let body = response.bytes().await.unwrap_or_default();
    ApiFailure::from_response(status, &body)
}

#[async_trait]
impl SessionApi for HttpSessionApi {
    async fn validate_session(&self, token: &str) -> std::result::Result<ValidateResponse, ApiFailure> {
        let response = self
            .client
            .get(self.endpoint(VALIDATE_PATH))
            .bearer_auth(token)
            .send()
            .await?;

        if !response.status().is_success() {
            let failure = failure_from(response).await;
            tracing::debug!(%failure, "validate-session rejected");
            return Err(failure);
        }

        Ok(response.json::<ValidateResponse>().await?)
    }

    async fn refresh_session(&self, token: &str) -> std::result::Result<(), ApiFailure> {
        let response = self
            .client
            .post(self.endpoint(REFRESH_PATH))
            .bearer_auth(token)
            .send()
            .await?;

        if !response.status().is_success() {
            let failure = failure_from(response).await;
            tracing::debug!(%failure, "refresh-session rejected");
            return Err(failure);
        }

        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde_json::json;

    // ── helpers ───────────────────────────────────────────────────────────

    /// Serve `app` on an ephemeral local port and return its base URL.
    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        format!("http://{addr}")
    }

    fn client(base_url: &str) -> HttpSessionApi {
        HttpSessionApi::new(base_url, Duration::from_secs(5)).expect("client")
    }

    // ── construction ──────────────────────────────────────────────────────

    #[test]
    fn test_new_trims_trailing_slash() {
        let api = client("http://localhost:5000/api/");
        assert_eq!(api.base_url(), "http://localhost:5000/api");
        assert_eq!(
            api.endpoint(VALIDATE_PATH),
            "http://localhost:5000/api/auth/validate-session"
        );
    }

    #[test]
    fn test_new_rejects_missing_scheme() {
        let err = HttpSessionApi::new("localhost:5000", Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, KeeperError::Config(_)));
    }

    // ── validate ──────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_validate_success_sends_bearer_token() {
        let app = Router::new().route(
            VALIDATE_PATH,
            get(|headers: HeaderMap| async move {
                let ok = headers
                    .get("authorization")
                    .and_then(|v| v.to_str().ok())
                    == Some("Bearer t-123");
                Json(json!({ "success": ok }))
            }),
        );
        let api = client(&serve(app).await);

        let response = api.validate_session("t-123").await.expect("validate");
        assert!(response.success);
    }

    #[tokio::test]
    async fn test_validate_explicit_invalid() {
        let app = Router::new().route(
            VALIDATE_PATH,
            get(|| async { Json(json!({ "success": false, "message": "Session invalid" })) }),
        );
        let api = client(&serve(app).await);

        let response = api.validate_session("t").await.expect("validate");
        assert!(!response.success);
        assert_eq!(response.message.as_deref(), Some("Session invalid"));
    }

    #[tokio::test]
    async fn test_validate_unauthorized_maps_to_status() {
        let app = Router::new().route(
            VALIDATE_PATH,
            get(|| async {
                (
                    StatusCode::UNAUTHORIZED,
                    Json(json!({ "message": "Not authorized" })),
                )
            }),
        );
        let api = client(&serve(app).await);

        let failure = api.validate_session("t").await.unwrap_err();
        assert_eq!(failure, ApiFailure::Http { status: 401 });
    }

    #[tokio::test]
    async fn test_validate_undecodable_body() {
        let app = Router::new().route(VALIDATE_PATH, get(|| async { "not json" }));
        let api = client(&serve(app).await);

        let failure = api.validate_session("t").await.unwrap_err();
        assert!(matches!(failure, ApiFailure::Decode(_)), "got {failure:?}");
    }

    #[tokio::test]
    async fn test_validate_connection_refused_is_network() {
        // Grab a free port, then close it again.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let api = client(&format!("http://{addr}"));
        let failure = api.validate_session("t").await.unwrap_err();
        assert!(matches!(failure, ApiFailure::Network(_)), "got {failure:?}");
        assert!(failure.status().is_none());
    }

    #[tokio::test]
    async fn test_validate_timeout_is_network() {
        let app = Router::new().route(
            VALIDATE_PATH,
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Json(json!({ "success": true }))
            }),
        );
        let base = serve(app).await;
        let api = HttpSessionApi::new(base, Duration::from_millis(100)).unwrap();

        let failure = api.validate_session("t").await.unwrap_err();
        assert!(matches!(failure, ApiFailure::Network(_)), "got {failure:?}");
    }

    // ── refresh ───────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_refresh_accepts_any_2xx_body() {
        let app = Router::new().route(REFRESH_PATH, post(|| async { StatusCode::NO_CONTENT }));
        let api = client(&serve(app).await);

        api.refresh_session("t").await.expect("refresh");
    }

    #[tokio::test]
    async fn test_refresh_session_expired_code() {
        let app = Router::new().route(
            REFRESH_PATH,
            post(|| async {
                (
                    StatusCode::UNAUTHORIZED,
                    Json(json!({ "code": "SESSION_EXPIRED", "message": "Session expired" })),
                )
            }),
        );
        let api = client(&serve(app).await);

        let failure = api.refresh_session("t").await.unwrap_err();
        assert!(failure.is_session_expired());
        assert_eq!(failure.status(), Some(401));
    }

    #[tokio::test]
    async fn test_refresh_server_error_without_code() {
        let app = Router::new().route(
            REFRESH_PATH,
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "oops") }),
        );
        let api = client(&serve(app).await);

        let failure = api.refresh_session("t").await.unwrap_err();
        assert_eq!(failure, ApiFailure::Http { status: 500 });
        assert!(!failure.is_session_expired());
    }
}
