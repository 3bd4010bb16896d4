//! Scripted in-memory backend for monitor and driver tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use keeper_client::{ApiFailure, SessionApi};
use keeper_core::models::ValidateResponse;

/// Backend double that answers with preset outcomes and counts calls.
pub(crate) struct ScriptedApi {
    validate: Mutex<Result<ValidateResponse, ApiFailure>>,
    refresh: Mutex<Result<(), ApiFailure>>,
    validate_delay: Mutex<Duration>,
    refresh_delay: Mutex<Duration>,
    validate_calls: AtomicUsize,
    refresh_calls: AtomicUsize,
    last_token: Mutex<Option<String>>,
}

impl ScriptedApi {
    /// A backend that accepts every session.
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            validate: Mutex::new(Ok(ValidateResponse {
                success: true,
                message: None,
            })),
            refresh: Mutex::new(Ok(())),
            validate_delay: Mutex::new(Duration::ZERO),
            refresh_delay: Mutex::new(Duration::ZERO),
            validate_calls: AtomicUsize::new(0),
            refresh_calls: AtomicUsize::new(0),
            last_token: Mutex::new(None),
        })
    }

    pub(crate) fn set_validate(&self, outcome: Result<ValidateResponse, ApiFailure>) {
        *self.validate.lock().unwrap() = outcome;
    }

    pub(crate) fn set_refresh(&self, outcome: Result<(), ApiFailure>) {
        *self.refresh.lock().unwrap() = outcome;
    }

    /// Make every validation take `delay` before answering.
    pub(crate) fn set_validate_delay(&self, delay: Duration) {
        *self.validate_delay.lock().unwrap() = delay;
    }

    /// Make every refresh take `delay` before answering.
    pub(crate) fn set_refresh_delay(&self, delay: Duration) {
        *self.refresh_delay.lock().unwrap() = delay;
    }

    pub(crate) fn validate_calls(&self) -> usize {
        self.validate_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn last_token(&self) -> Option<String> {
        self.last_token.lock().unwrap().clone()
    }
}

#[async_trait]
impl SessionApi for ScriptedApi {
    async fn validate_session(&self, token: &str) -> Result<ValidateResponse, ApiFailure> {
        self.validate_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_token.lock().unwrap() = Some(token.to_string());

        let delay = *self.validate_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.validate.lock().unwrap().clone()
    }

    async fn refresh_session(&self, token: &str) -> Result<(), ApiFailure> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_token.lock().unwrap() = Some(token.to_string());

        let delay = *self.refresh_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.refresh.lock().unwrap().clone()
    }
}
