use keeper_core::models::{ApiErrorBody, SESSION_EXPIRED_CODE};
use thiserror::Error;

/// Why a call against the session backend failed.
///
/// Callers are expected to match exhaustively: the monitor decides between
/// logging the user out and keeping the session purely on the variant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiFailure {
    /// The request never produced an HTTP status (connect failure, timeout,
    /// reset connection).
    #[error("network error: {0}")]
    Network(String),

    /// Non-2xx response without a recognised error code.
    #[error("HTTP error ({status})")]
    Http { status: u16 },

    /// Non-2xx response whose body carried a structured error code.
    #[error("API error ({status}): {code}")]
    Api {
        status: u16,
        code: String,
        message: Option<String>,
    },

    /// 2xx response whose body could not be decoded.
    #[error("failed to decode response: {0}")]
    Decode(String),
}

impl ApiFailure {
    /// Classify a non-2xx response from its status and raw body.
    pub fn from_response(status: u16, body: &[u8]) -> Self {
        match serde_json::from_slice::<ApiErrorBody>(body) {
            Ok(ApiErrorBody {
                code: Some(code),
                message,
            }) => Self::Api {
                status,
                code,
                message,
            },
            _ => Self::Http { status },
        }
    }

    /// HTTP status, when the backend answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status } | Self::Api { status, .. } => Some(*status),
            Self::Network(_) | Self::Decode(_) => None,
        }
    }

    /// Structured error code, when the body carried one.
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Api { code, .. } => Some(code),
            Self::Network(_) | Self::Http { .. } | Self::Decode(_) => None,
        }
    }

    /// `true` when the backend explicitly reported the session as expired.
    pub fn is_session_expired(&self) -> bool {
        self.code() == Some(SESSION_EXPIRED_CODE)
    }
}

impl From<reqwest::Error> for ApiFailure {
    fn from(value: reqwest::Error) -> Self {
        if value.is_decode() {
            return Self::Decode(value.to_string());
        }
        match value.status() {
            Some(status) => Self::Http {
                status: status.as_u16(),
            },
            None => Self::Network(value.to_string()),
        }
    }
}
