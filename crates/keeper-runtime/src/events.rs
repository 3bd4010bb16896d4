//! Host interaction events.
//!
//! The host emits user activity and visibility changes into a [`HostEvents`]
//! hub. An armed monitor holds a subscription; a stopped one holds none, so
//! events emitted while it is stopped are simply dropped.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Buffered events per subscriber before the oldest are dropped.
const EVENT_CAPACITY: usize = 64;

/// The kinds of user interaction that count as activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Press,
    Key,
    Scroll,
    TouchStart,
}

/// Whether the host is in the foreground.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Visible,
    Hidden,
}

/// A single event emitted by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostEvent {
    Activity(ActivityKind),
    Visibility(Visibility),
}

/// Broadcast hub for [`HostEvent`]s.
#[derive(Clone)]
pub struct HostEvents {
    sender: broadcast::Sender<HostEvent>,
}

impl HostEvents {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CAPACITY);
        Self { sender }
    }

    /// Deliver `event` to every current subscriber.
    ///
    /// Returns the number of subscribers that received it; zero means no
    /// monitor is listening.
    pub fn emit(&self, event: HostEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    /// Shorthand for emitting an activity event.
    pub fn activity(&self, kind: ActivityKind) -> usize {
        self.emit(HostEvent::Activity(kind))
    }

    /// Shorthand for emitting a visibility change.
    pub fn visibility(&self, visibility: Visibility) -> usize {
        self.emit(HostEvent::Visibility(visibility))
    }

    /// Attach a new listener.
    pub fn subscribe(&self) -> broadcast::Receiver<HostEvent> {
        self.sender.subscribe()
    }

    /// Number of attached listeners.
    pub fn listener_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for HostEvents {
    fn default() -> Self {
        Self::new()
    }
}
