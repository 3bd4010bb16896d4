//! Host-owned authentication state.
//!
//! [`AuthStore`] is the single writer of [`SessionState`]. The host logs in
//! through it, lifecycle observers subscribe to it, and the monitor only ever
//! asks it to perform a silent logout.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use keeper_core::models::{SessionState, UserProfile};
use tokio::sync::watch;

struct Shared {
    state: watch::Sender<SessionState>,
    logouts: AtomicU64,
}

/// Cheaply cloneable handle to the shared session state.
#[derive(Clone)]
pub struct AuthStore {
    shared: Arc<Shared>,
}

impl AuthStore {
    /// Create a logged-out store.
    pub fn new() -> Self {
        Self::with_state(SessionState::default())
    }

    /// Create a store holding `state`.
    pub fn with_state(state: SessionState) -> Self {
        let (tx, _) = watch::channel(state);
        Self {
            shared: Arc::new(Shared {
                state: tx,
                logouts: AtomicU64::new(0),
            }),
        }
    }

    /// Record a successful login.
    pub fn login(&self, token: impl Into<String>, user: Option<UserProfile>) {
        self.shared
            .state
            .send_replace(SessionState::authenticated(token, user));
        tracing::debug!("auth store: logged in");
    }

    /// Clear the token, the user and the authenticated flag without any
    /// user-facing side effect. Observers decide what to do with the logged-out
    /// state.
    pub fn silent_logout(&self) {
        self.shared.logouts.fetch_add(1, Ordering::SeqCst);
        let previous = self.shared.state.send_replace(SessionState::default());
        tracing::info!(
            was_authenticated = previous.is_authenticated,
            "silent logout dispatched"
        );
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> SessionState {
        self.shared.state.borrow().clone()
    }

    /// Current token, only while authenticated.
    pub fn active_token(&self) -> Option<String> {
        self.shared.state.borrow().active_token().map(str::to_string)
    }

    /// `true` while the state is authenticated and carries a token.
    pub fn is_active(&self) -> bool {
        self.shared.state.borrow().is_active()
    }

    /// Number of silent logouts dispatched since the store was created.
    pub fn logout_count(&self) -> u64 {
        self.shared.logouts.load(Ordering::SeqCst)
    }

    /// Receiver that observes every state change.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.shared.state.subscribe()
    }
}

impl Default for AuthStore {
    fn default() -> Self {
        Self::new()
    }
}
