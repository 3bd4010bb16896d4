use serde::{Deserialize, Serialize};

/// Error code the backend puts in a refresh failure body when the session can
/// no longer be extended.
pub const SESSION_EXPIRED_CODE: &str = "SESSION_EXPIRED";

/// The logged-in user, as far as the keeper cares about it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Backend user identifier.
    pub id: String,
    /// Display name, when the backend supplied one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Contact address, when the backend supplied one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Authentication state shared between the host and the monitor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    /// Whether the host considers the user logged in.
    pub is_authenticated: bool,
    /// Session token sent to the backend.
    pub token: Option<String>,
    /// Profile of the logged-in user.
    pub user: Option<UserProfile>,
}

impl SessionState {
    /// Logged-in state carrying `token`.
    pub fn authenticated(token: impl Into<String>, user: Option<UserProfile>) -> Self {
        Self {
            is_authenticated: true,
            token: Some(token.into()),
            user,
        }
    }

    /// The token, only while the state is authenticated.
    ///
    /// An empty token counts as absent.
    pub fn active_token(&self) -> Option<&str> {
        if !self.is_authenticated {
            return None;
        }
        self.token.as_deref().filter(|t| !t.is_empty())
    }

    /// `true` when both the flag and a token are present.
    pub fn is_active(&self) -> bool {
        self.active_token().is_some()
    }
}

/// Body of `GET /auth/validate-session`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidateResponse {
    /// Explicit validity verdict from the backend.
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Error body the backend attaches to non-2xx responses.
///
/// Every field is optional; bodies that are not JSON at all are handled by
/// the client before this type is involved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}
