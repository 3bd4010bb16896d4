//! Lifecycle driver for the session monitor.
//!
//! Watches the [`AuthStore`](crate::AuthStore) in a tokio task and arms the [`SessionMonitor`]
//! whenever a session becomes active (or its token changes), and stops it as
//! soon as the session goes away. This is the Rust stand-in for "mount on
//! entering the authenticated layout, tear down on logout".

use keeper_client::SessionApi;

use crate::session_monitor::SessionMonitor;

// ── MonitorDriver ─────────────────────────────────────────────────────────────

/// Couples a monitor's lifetime to the session held in its store.
///
/// Call [`MonitorDriver::start`] to spawn the watch loop and receive a
/// [`DriverHandle`] for it.
pub struct MonitorDriver<A> {
    monitor: SessionMonitor<A>,
}

impl<A> MonitorDriver<A>
where
    A: SessionApi + 'static,
{
    pub fn new(monitor: SessionMonitor<A>) -> Self {
        Self { monitor }
    }

    /// Spawn the watch loop.
    ///
    /// The current store state is applied immediately, so a store that is
    /// already logged in gets an armed monitor right away.
    pub fn start(self) -> DriverHandle {
        let handle = tokio::spawn(async move {
            self.watch_loop().await;
        });
        DriverHandle { handle }
    }

    // ── Private implementation ────────────────────────────────────────────

    /// Runs until the store is dropped or the task is aborted; the monitor
    /// is stopped on either exit.
    async fn watch_loop(self) {
        let mut rx = self.monitor.store().subscribe();
        let guard = StopOnDrop(self.monitor);
        let mut armed_token: Option<String> = None;

        loop {
            let token = rx
                .borrow_and_update()
                .active_token()
                .map(str::to_string);

            if token != armed_token {
                match token.as_deref() {
                    Some(_) => {
                        tracing::debug!("session active; arming monitor");
                        guard.0.start();
                    }
                    None => {
                        tracing::debug!("session gone; stopping monitor");
                        guard.0.stop();
                    }
                }
                armed_token = token;
            }

            if rx.changed().await.is_err() {
                tracing::debug!("auth store dropped; driver exiting");
                break;
            }
        }
    }
}

/// Stops the monitor when the watch loop ends for any reason, including
/// task abort.
struct StopOnDrop<A: SessionApi + 'static>(SessionMonitor<A>);

impl<A: SessionApi + 'static> Drop for StopOnDrop<A> {
    fn drop(&mut self) {
        self.0.stop();
    }
}

// ── DriverHandle ──────────────────────────────────────────────────────────────

/// A handle to the background driver task.
///
/// Call [`DriverHandle::abort`] to stop driving; the monitor is stopped with it.
pub struct DriverHandle {
    handle: tokio::task::JoinHandle<()>,
}

impl DriverHandle {
    /// Immediately abort the driver loop.
    pub fn abort(&self) {
        self.handle.abort();
    }

    /// `true` once the driver loop has exited.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
