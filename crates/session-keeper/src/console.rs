//! Line-oriented console host.
//!
//! Stands in for the UI: each stdin line becomes either a host event
//! (activity, visibility) or a direct command against the monitor.

use keeper_client::SessionApi;
use keeper_runtime::{ActivityKind, SessionMonitor, Visibility};

pub const HELP: &str = "\
commands:
  <any text> | key | press | scroll | touch   user activity
  show | hide                                 foreground / background
  validate                                    validate the session now
  refresh                                     refresh the session now
  status                                      print monitor status (JSON)
  logout                                      drop the session locally
  help                                        this text
  quit                                        exit";

/// A parsed console line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Activity(ActivityKind),
    Visibility(Visibility),
    Validate,
    Refresh,
    Status,
    Logout,
    Help,
    Quit,
}

/// Parse one console line. Anything unrecognised counts as typing.
pub fn parse(line: &str) -> Command {
    match line.trim().to_lowercase().as_str() {
        "press" | "click" => Command::Activity(ActivityKind::Press),
        "scroll" => Command::Activity(ActivityKind::Scroll),
        "touch" => Command::Activity(ActivityKind::TouchStart),
        "show" | "visible" | "focus" => Command::Visibility(Visibility::Visible),
        "hide" | "hidden" | "blur" => Command::Visibility(Visibility::Hidden),
        "validate" => Command::Validate,
        "refresh" => Command::Refresh,
        "status" => Command::Status,
        "logout" => Command::Logout,
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        _ => Command::Activity(ActivityKind::Key),
    }
}

/// Run `command` against `monitor` and return the line to print.
///
/// `Quit` is the caller's business and yields an empty reply.
pub async fn execute<A>(command: Command, monitor: &SessionMonitor<A>) -> String
where
    A: SessionApi + 'static,
{
    match command {
        Command::Activity(kind) => {
            let listeners = monitor.events().activity(kind);
            if listeners == 0 {
                "activity ignored: monitor not armed".to_string()
            } else {
                String::new()
            }
        }
        Command::Visibility(visibility) => {
            monitor.events().visibility(visibility);
            format!("visibility: {visibility:?}").to_lowercase()
        }
        Command::Validate => {
            if monitor.validate_session().await {
                "session valid".to_string()
            } else {
                "session invalid".to_string()
            }
        }
        Command::Refresh => {
            monitor.refresh_session().await;
            "refresh sent".to_string()
        }
        Command::Status => serde_json::to_string_pretty(&monitor.status())
            .unwrap_or_else(|e| format!("status unavailable: {e}")),
        Command::Logout => {
            monitor.store().silent_logout();
            "logged out".to_string()
        }
        Command::Help => HELP.to_string(),
        Command::Quit => String::new(),
    }
}
