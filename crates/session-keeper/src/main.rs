mod bootstrap;
mod console;

use anyhow::{bail, Result};
use keeper_client::HttpSessionApi;
use keeper_core::settings::Settings;
use keeper_runtime::{AuthStore, HostEvents, MonitorDriver, SessionMonitor};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::console::Command;

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::load_with_last_used();

    bootstrap::ensure_directories()?;
    bootstrap::setup_logging(&settings.log_level, settings.log_file.as_ref())?;

    tracing::info!("session-keeper v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(base_url = %settings.base_url, "using session backend");

    let timings = settings.timings();
    timings.validate()?;

    let Some(token) = settings.token.clone().filter(|t| !t.is_empty()) else {
        bail!("no session token; pass --token or set SESSION_KEEPER_TOKEN");
    };

    let api = HttpSessionApi::new(settings.base_url.clone(), settings.request_timeout())?;
    let store = AuthStore::new();
    let events = HostEvents::new();
    let monitor = SessionMonitor::new(api, store.clone(), events, timings);

    // Subscribe before logging in so the first state change is observed.
    let mut session = store.subscribe();
    store.login(token, None);
    let driver = MonitorDriver::new(monitor.clone()).start();

    println!("{}", console::HELP);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            line = lines.next_line() => match line? {
                Some(line) => {
                    let command = console::parse(&line);
                    if command == Command::Quit {
                        tracing::info!("quit requested");
                        break;
                    }
                    let reply = console::execute(command, &monitor).await;
                    if !reply.is_empty() {
                        println!("{reply}");
                    }
                }
                None => {
                    tracing::info!("stdin closed; shutting down");
                    break;
                }
            },
            changed = session.changed() => {
                if changed.is_err() || !session.borrow_and_update().is_active() {
                    println!("Session ended. Please log in again.");
                    break;
                }
            }
            _ = &mut ctrl_c => {
                tracing::info!("Ctrl+C received; shutting down");
                break;
            }
        }
    }

    driver.abort();
    monitor.stop();
    tracing::info!(logouts = store.logout_count(), "session-keeper stopped");

    Ok(())
}
