//! Session keep-alive control loop.
//!
//! [`SessionMonitor`] periodically validates and refreshes the backend session
//! held in an [`AuthStore`], reacts to host activity and visibility events,
//! and dispatches a silent logout once the backend confirms the session is
//! gone. Transient failures never log the user out.
//!
//! While armed the monitor owns four tasks:
//! - settle: one validation after `settle_delay`
//! - check: a validation every `check_interval`
//! - refresh: a refresh every `refresh_interval`
//! - listener: host events, driving the activity throttle and the
//!   visibility debounce. The requests those deadlines trigger run in tasks
//!   of their own, owned and aborted with the listener.
//!
//! Tasks only hold weak references to the monitor, so dropping every
//! [`SessionMonitor`] handle tears them down just like [`SessionMonitor::stop`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use chrono::{DateTime, Utc};
use keeper_client::{ApiFailure, SessionApi};
use keeper_core::timing::MonitorTimings;
use serde::Serialize;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::auth_store::AuthStore;
use crate::deadline::TrailingDeadline;
use crate::events::{HostEvent, HostEvents, Visibility};

// ── Public types ──────────────────────────────────────────────────────────────

/// Point-in-time view of a monitor, for hosts and diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorStatus {
    /// Armed and the store is authenticated with a token.
    pub monitoring: bool,
    /// A validation request is in flight.
    pub validating: bool,
    /// When the current arming happened.
    pub armed_since: Option<DateTime<Utc>>,
    /// Last activity event seen while armed.
    pub last_activity: Option<DateTime<Utc>>,
    /// Silent logouts the store has dispatched so far.
    pub logout_count: u64,
}

// ── Internal state ────────────────────────────────────────────────────────────

/// Tasks of one arming. Dropping it cancels all of them.
struct Armed {
    since: DateTime<Utc>,
    tasks: Vec<JoinHandle<()>>,
}

impl Drop for Armed {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

struct Inner<A> {
    api: A,
    store: AuthStore,
    events: HostEvents,
    timings: MonitorTimings,
    validating: AtomicBool,
    armed: Mutex<Option<Armed>>,
    last_activity: Mutex<Option<DateTime<Utc>>>,
}

/// Holds the in-flight flag; releases it on drop, including when the
/// validation future is cancelled.
struct ValidationGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> ValidationGuard<'a> {
    fn try_acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for ValidationGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ── SessionMonitor ────────────────────────────────────────────────────────────

/// Keeps one authenticated session alive.
///
/// Cloning yields another handle to the same monitor.
pub struct SessionMonitor<A> {
    inner: Arc<Inner<A>>,
}

impl<A> Clone for SessionMonitor<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A> SessionMonitor<A>
where
    A: SessionApi + 'static,
{
    /// Create a stopped monitor.
    ///
    /// Host events are read from `events`; the session is read from and
    /// logged out through `store`.
    pub fn new(api: A, store: AuthStore, events: HostEvents, timings: MonitorTimings) -> Self {
        Self {
            inner: Arc::new(Inner {
                api,
                store,
                events,
                timings,
                validating: AtomicBool::new(false),
                armed: Mutex::new(None),
                last_activity: Mutex::new(None),
            }),
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────────────────

    /// Arm the monitor for the session currently in the store.
    ///
    /// Any previous arming is torn down first, so calling this repeatedly
    /// never stacks timers. Returns `false` (and stays stopped) when the
    /// store is not authenticated with a token or the timings are invalid.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self) -> bool {
        let mut armed = lock(&self.inner.armed);
        if armed.take().is_some() {
            tracing::debug!("re-arming: previous monitoring tasks cancelled");
        }
        self.inner.validating.store(false, Ordering::Release);

        if let Err(e) = self.inner.timings.validate() {
            tracing::error!(error = %e, "not arming session monitor");
            return false;
        }

        if !self.inner.store.is_active() {
            tracing::debug!("not arming session monitor: no authenticated session");
            return false;
        }

        let timings = self.inner.timings;
        // Subscribe before spawning so events emitted right after `start`
        // are not missed.
        let receiver = self.inner.events.subscribe();
        let weak = Arc::downgrade(&self.inner);

        let tasks = vec![
            tokio::spawn(settle_task(weak.clone(), timings)),
            tokio::spawn(check_task(weak.clone(), timings)),
            tokio::spawn(refresh_task(weak.clone(), timings)),
            tokio::spawn(listener_task(weak, receiver, timings)),
        ];

        *armed = Some(Armed {
            since: Utc::now(),
            tasks,
        });

        tracing::info!(
            settle_ms = timings.settle_delay.as_millis() as u64,
            check_secs = timings.check_interval.as_secs(),
            refresh_secs = timings.refresh_interval.as_secs(),
            "session monitoring started"
        );
        true
    }

    /// Cancel every timer and listener and reset the in-flight flag.
    ///
    /// Requests already in flight inside the monitor's own tasks are dropped
    /// with them; their outcome is never applied. Safe to call at any time.
    pub fn stop(&self) {
        let previous = lock(&self.inner.armed).take();
        self.inner.validating.store(false, Ordering::Release);
        if previous.is_some() {
            tracing::info!("session monitoring stopped");
        }
    }

    // ── Observation ───────────────────────────────────────────────────────

    /// `true` while armed and the store holds an authenticated session.
    pub fn is_monitoring(&self) -> bool {
        lock(&self.inner.armed).is_some() && self.inner.store.is_active()
    }

    /// Snapshot of the monitor's runtime state.
    pub fn status(&self) -> MonitorStatus {
        let armed_since = lock(&self.inner.armed).as_ref().map(|a| a.since);
        MonitorStatus {
            monitoring: armed_since.is_some() && self.inner.store.is_active(),
            validating: self.inner.validating.load(Ordering::Acquire),
            armed_since,
            last_activity: *lock(&self.inner.last_activity),
            logout_count: self.inner.store.logout_count(),
        }
    }

    /// The store this monitor reads from and logs out through.
    pub fn store(&self) -> &AuthStore {
        &self.inner.store
    }

    /// The event hub this monitor listens on while armed.
    pub fn events(&self) -> &HostEvents {
        &self.inner.events
    }

    // ── Backend calls ─────────────────────────────────────────────────────

    /// Validate the current session.
    ///
    /// Returns `false` only when there is no session or the backend confirmed
    /// it invalid (in which case a silent logout has been dispatched).
    /// Transient failures and an already running validation report `true`.
    pub async fn validate_session(&self) -> bool {
        self.inner.validate_session().await
    }

    /// Extend the current session. Logs out only on an explicit expiry code.
    pub async fn refresh_session(&self) {
        self.inner.refresh_session().await;
    }
}

impl<A> Inner<A>
where
    A: SessionApi,
{
    async fn validate_session(&self) -> bool {
        let Some(token) = self.store.active_token() else {
            tracing::debug!("skipping validation: no authenticated session");
            return false;
        };

        let Some(_guard) = ValidationGuard::try_acquire(&self.validating) else {
            tracing::debug!("validation already in flight; reporting valid");
            return true;
        };

        match self.api.validate_session(&token).await {
            Ok(response) if response.success => {
                tracing::debug!("session valid");
                true
            }
            Ok(response) => {
                tracing::info!(reason = ?response.message, "backend reported session invalid");
                self.logout_if_current(&token);
                false
            }
            Err(failure) => match failure {
                ApiFailure::Http { status: 401 } | ApiFailure::Api { status: 401, .. } => {
                    tracing::info!(%failure, "session rejected by backend");
                    self.logout_if_current(&token);
                    false
                }
                ApiFailure::Network(_)
                | ApiFailure::Http { .. }
                | ApiFailure::Api { .. }
                | ApiFailure::Decode(_) => {
                    tracing::warn!(%failure, "could not confirm session; keeping it");
                    true
                }
            },
        }
    }

    async fn refresh_session(&self) {
        let Some(token) = self.store.active_token() else {
            tracing::debug!("skipping refresh: no authenticated session");
            return;
        };

        match self.api.refresh_session(&token).await {
            Ok(()) => tracing::debug!("session refreshed"),
            Err(failure) if failure.is_session_expired() => {
                tracing::info!(%failure, "session expired on refresh");
                self.logout_if_current(&token);
            }
            Err(failure) => {
                tracing::warn!(%failure, "session refresh failed; keeping session");
            }
        }
    }

    /// Log out unless the host already moved on to another session while the
    /// request for `token` was in flight.
    fn logout_if_current(&self, token: &str) {
        if self.store.active_token().as_deref() == Some(token) {
            self.store.silent_logout();
        } else {
            tracing::debug!("session changed while request was in flight; not logging out");
        }
    }

    fn touch_activity(&self) {
        *lock(&self.last_activity) = Some(Utc::now());
    }
}

// ── Tasks ─────────────────────────────────────────────────────────────────────

async fn settle_task<A: SessionApi>(weak: Weak<Inner<A>>, timings: MonitorTimings) {
    time::sleep(timings.settle_delay).await;
    if let Some(inner) = weak.upgrade() {
        inner.validate_session().await;
    }
}

async fn check_task<A: SessionApi>(weak: Weak<Inner<A>>, timings: MonitorTimings) {
    let mut interval = time::interval_at(
        Instant::now() + timings.check_interval,
        timings.check_interval,
    );
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        interval.tick().await;
        let Some(inner) = weak.upgrade() else { break };
        inner.validate_session().await;
    }
}

async fn refresh_task<A: SessionApi>(weak: Weak<Inner<A>>, timings: MonitorTimings) {
    let mut interval = time::interval_at(
        Instant::now() + timings.refresh_interval,
        timings.refresh_interval,
    );
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        interval.tick().await;
        let Some(inner) = weak.upgrade() else { break };
        inner.refresh_session().await;
    }
}

async fn listener_task<A: SessionApi + 'static>(
    weak: Weak<Inner<A>>,
    mut receiver: broadcast::Receiver<HostEvent>,
    timings: MonitorTimings,
) {
    let mut throttle = TrailingDeadline::new();
    let mut visibility = TrailingDeadline::new();
    // The host is in the foreground when monitoring starts.
    let mut hidden = false;
    let mut requests = JoinSet::new();

    loop {
        tokio::select! {
            received = receiver.recv() => {
                let Some(inner) = weak.upgrade() else { break };
                match received {
                    Ok(HostEvent::Activity(kind)) => {
                        tracing::trace!(?kind, "user activity");
                        inner.touch_activity();
                        throttle.reset(timings.activity_throttle);
                    }
                    Ok(HostEvent::Visibility(Visibility::Visible)) => {
                        if hidden && inner.store.is_active() {
                            visibility.reset(timings.visibility_debounce);
                        }
                        hidden = false;
                    }
                    Ok(HostEvent::Visibility(Visibility::Hidden)) => hidden = true,
                    // Dropped events count as one burst of activity.
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::debug!(skipped, "host event listener lagged");
                        inner.touch_activity();
                        throttle.reset(timings.activity_throttle);
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            () = throttle.fired() => {
                let weak = weak.clone();
                requests.spawn(async move {
                    if let Some(inner) = weak.upgrade() {
                        inner.refresh_session().await;
                    }
                });
            }
            () = visibility.fired() => {
                let weak = weak.clone();
                requests.spawn(async move {
                    if let Some(inner) = weak.upgrade() {
                        inner.validate_session().await;
                    }
                });
            }
            Some(_) = requests.join_next(), if !requests.is_empty() => {}
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
