use clap::{CommandFactory, Parser};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{KeeperError, Result};

use crate::timing::{
    MonitorTimings, ACTIVITY_THROTTLE, SESSION_CHECK_INTERVAL, SESSION_REFRESH_INTERVAL,
    SETTLE_DELAY, VISIBILITY_DEBOUNCE,
};

/// Backend used when neither the CLI nor the persisted params name one.
pub const DEFAULT_BASE_URL: &str = "http://localhost:5000/api";

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Keep an authenticated backend session alive
#[derive(Parser, Debug, Clone)]
#[command(
    name = "session-keeper",
    about = "Keep an authenticated backend session alive",
    version
)]
pub struct Settings {
    /// Base URL of the session backend (the `/auth/...` routes hang off it)
    #[arg(long, env = "SESSION_KEEPER_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Session token to start with (never persisted)
    #[arg(long, env = "SESSION_KEEPER_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Delay before the first validation, in milliseconds
    #[arg(long, default_value_t = SETTLE_DELAY.as_millis() as u64)]
    pub settle_delay_ms: u64,

    /// Seconds between periodic session validations
    #[arg(long, default_value_t = SESSION_CHECK_INTERVAL.as_secs(), value_parser = clap::value_parser!(u64).range(1..))]
    pub check_interval_secs: u64,

    /// Seconds between periodic session refreshes
    #[arg(long, default_value_t = SESSION_REFRESH_INTERVAL.as_secs(), value_parser = clap::value_parser!(u64).range(1..))]
    pub refresh_interval_secs: u64,

    /// Quiet seconds after the last activity before an activity refresh
    #[arg(long, default_value_t = ACTIVITY_THROTTLE.as_secs())]
    pub activity_throttle_secs: u64,

    /// Delay between returning to the foreground and validating, in milliseconds
    #[arg(long, default_value_t = VISIBILITY_DEBOUNCE.as_millis() as u64)]
    pub visibility_debounce_ms: u64,

    /// Per-request timeout in seconds (1-300)
    #[arg(long, default_value = "15", value_parser = clap::value_parser!(u64).range(1..=300))]
    pub request_timeout_secs: u64,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"])]
    pub log_level: String,

    /// Log file path
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// Clear saved configuration
    #[arg(long)]
    pub clear: bool,
}

// ── LastUsedParams ─────────────────────────────────────────────────────────────

/// Persisted last-used parameters saved to `~/.session-keeper/last_used.json`.
#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct LastUsedParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settle_delay_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_interval_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_interval_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activity_throttle_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visibility_debounce_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,
}

impl LastUsedParams {
    /// Return the default path to the persisted config file.
    /// Uses `~/.session-keeper/last_used.json`.
    pub fn config_path() -> PathBuf {
        Self::config_path_in(&dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
    }

    /// Return the config path rooted at `base_dir` (used for testing).
    pub fn config_path_in(base_dir: &std::path::Path) -> PathBuf {
        base_dir.join(".session-keeper").join("last_used.json")
    }

    /// Load persisted params from the default path.
    /// Returns `Default` when the file is absent or cannot be parsed.
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    /// Load persisted params from an explicit path.
    pub fn load_from(path: &std::path::Path) -> Self {
        let Ok(content) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        match serde_json::from_str(&content) {
            Ok(params) => params,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable last-used params");
                Self::default()
            }
        }
    }

    /// Atomically write params to the default path, creating parent directories
    /// if needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path())
    }

    /// Atomically write params to an explicit path.
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(write_error(path))?;
        }

        let json = serde_json::to_string_pretty(self)?;

        // Write to a temp file then rename for atomicity.
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, &json).map_err(write_error(path))?;
        std::fs::rename(&tmp, path).map_err(write_error(path))?;

        Ok(())
    }

    /// Delete the default config file if it exists.
    pub fn clear() -> Result<()> {
        Self::clear_at(&Self::config_path())
    }

    /// Delete the config file at an explicit path if it exists.
    pub fn clear_at(path: &std::path::Path) -> Result<()> {
        if path.exists() {
            std::fs::remove_file(path).map_err(write_error(path))?;
        }
        Ok(())
    }
}

fn write_error(path: &std::path::Path) -> impl FnOnce(std::io::Error) -> KeeperError + '_ {
    move |source| KeeperError::SettingsWrite {
        path: path.to_path_buf(),
        source,
    }
}

// ── Settings impl ──────────────────────────────────────────────────────────────

impl Settings {
    /// Parse CLI arguments, merge with last-used params where no explicit
    /// value was provided, and persist the result.
    pub fn load_with_last_used() -> Self {
        Self::load_with_last_used_impl(
            std::env::args_os().collect(),
            &LastUsedParams::config_path(),
        )
    }

    /// Full implementation – accepts args and an explicit config path so that
    /// tests can redirect to a temporary directory.
    pub fn load_with_last_used_impl(
        args: Vec<std::ffi::OsString>,
        config_path: &std::path::Path,
    ) -> Self {
        // Build raw ArgMatches so we can query ValueSource.
        let matches = Settings::command().get_matches_from(args.clone());

        let mut settings = Settings::parse_from(args);

        if settings.clear {
            if let Err(e) = LastUsedParams::clear_at(config_path) {
                tracing::warn!(error = %e, "failed to clear last-used params");
            }
            return Self::apply_debug_flag(settings);
        }

        let last = LastUsedParams::load_from(config_path);

        // CLI and environment always win. 'token' is never loaded from last-used.
        if !is_arg_explicitly_set(&matches, "base_url") {
            if let Some(v) = last.base_url {
                settings.base_url = v;
            }
        }
        // NOTE: clap stores the arg id using the *field name* (underscores),
        // not the long-flag spelling (hyphens).
        if !is_arg_explicitly_set(&matches, "settle_delay_ms") {
            if let Some(v) = last.settle_delay_ms {
                settings.settle_delay_ms = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "check_interval_secs") {
            if let Some(v) = last.check_interval_secs.filter(|v| *v > 0) {
                settings.check_interval_secs = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "refresh_interval_secs") {
            if let Some(v) = last.refresh_interval_secs.filter(|v| *v > 0) {
                settings.refresh_interval_secs = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "activity_throttle_secs") {
            if let Some(v) = last.activity_throttle_secs {
                settings.activity_throttle_secs = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "visibility_debounce_ms") {
            if let Some(v) = last.visibility_debounce_ms {
                settings.visibility_debounce_ms = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "request_timeout_secs") {
            if let Some(v) = last.request_timeout_secs.filter(|v| (1..=300).contains(v)) {
                settings.request_timeout_secs = v;
            }
        }

        settings = Self::apply_debug_flag(settings);

        // Persist current settings for next run.
        let params = LastUsedParams::from(&settings);
        if let Err(e) = params.save_to(config_path) {
            tracing::warn!(error = %e, "failed to persist last-used params");
        }

        settings
    }

    /// The monitor delays these settings describe.
    pub fn timings(&self) -> MonitorTimings {
        MonitorTimings {
            settle_delay: Duration::from_millis(self.settle_delay_ms),
            check_interval: Duration::from_secs(self.check_interval_secs),
            refresh_interval: Duration::from_secs(self.refresh_interval_secs),
            activity_throttle: Duration::from_secs(self.activity_throttle_secs),
            visibility_debounce: Duration::from_millis(self.visibility_debounce_ms),
        }
    }

    /// Per-request timeout for the session backend.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// `--debug` overrides log level.
    fn apply_debug_flag(mut settings: Settings) -> Settings {
        if settings.debug {
            settings.log_level = "DEBUG".to_string();
        }
        settings
    }
}

// ── Conversion ─────────────────────────────────────────────────────────────────

impl From<&Settings> for LastUsedParams {
    fn from(s: &Settings) -> Self {
        LastUsedParams {
            base_url: Some(s.base_url.clone()),
            settle_delay_ms: Some(s.settle_delay_ms),
            check_interval_secs: Some(s.check_interval_secs),
            refresh_interval_secs: Some(s.refresh_interval_secs),
            activity_throttle_secs: Some(s.activity_throttle_secs),
            visibility_debounce_ms: Some(s.visibility_debounce_ms),
            request_timeout_secs: Some(s.request_timeout_secs),
        }
    }
}

// ── Helper: check if an arg was explicitly set ─────────────────────────────────

/// Returns `true` when `name` was supplied on the command line or through its
/// environment variable (not via default value).
fn is_arg_explicitly_set(matches: &clap::ArgMatches, name: &str) -> bool {
    matches!(
        matches.value_source(name),
        Some(clap::parser::ValueSource::CommandLine | clap::parser::ValueSource::EnvVariable)
    )
}

// ── Tests ──────────────────────────────────────────────────────────────────────
