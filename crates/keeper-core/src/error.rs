use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the session keeper outside the request path.
///
/// Request failures against the session backend are modelled separately by
/// `keeper_client::ApiFailure`, because the monitor never propagates them.
#[derive(Error, Debug)]
pub enum KeeperError {
    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The HTTP client could not be constructed.
    #[error("HTTP client error: {0}")]
    HttpClient(String),

    /// The persisted settings file could not be written.
    #[error("Failed to write settings {path}: {source}")]
    SettingsWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A JSON document could not be produced or parsed.
    #[error("JSON error: {0}")]
    JsonParse(#[from] serde_json::Error),
}

/// Convenience alias used throughout the keeper crates.
pub type Result<T> = std::result::Result<T, KeeperError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_config() {
        let err = KeeperError::Config("check interval must be non-zero".to_string());
        assert_eq!(
            err.to_string(),
            "Configuration error: check interval must be non-zero"
        );
    }

    #[test]
    fn test_error_display_http_client() {
        let err = KeeperError::HttpClient("invalid base url".to_string());
        assert_eq!(err.to_string(), "HTTP client error: invalid base url");
    }

    #[test]
    fn test_error_display_settings_write() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
        let err = KeeperError::SettingsWrite {
            path: PathBuf::from("/etc/keeper/last_used.json"),
            source: io_err,
        };
        let msg = err.to_string();
        assert!(msg.contains("Failed to write settings"));
        assert!(msg.contains("/etc/keeper/last_used.json"));
        assert!(msg.contains("read-only"));
    }

    #[test]
    fn test_error_from_serde_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{invalid}").unwrap_err();
        let err: KeeperError = json_err.into();
        assert!(err.to_string().contains("JSON error"));
    }
}
