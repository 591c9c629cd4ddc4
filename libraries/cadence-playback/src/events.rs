//! Playback Events
//!
//! Notifications for collaborators that render views of the engine
//! (now-playing screen, media session, widgets). Every committed mutation
//! emits its events in a fixed order, each paired with the snapshot of the
//! state after the mutation:
//!
//! ```text
//! QueueChanged -> NewPlayback -> QueueReordered -> IndexMoved -> GainChanged -> StateChanged
//!   -> Seeked
//! ```
//!
//! Listeners are called in registration order. A panicking listener is
//! logged and skipped; it never affects other listeners or the mutation.

use crate::snapshot::PlaybackSnapshot;
use crate::types::{PlayerState, RepeatMode};
use serde::{Deserialize, Serialize};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

/// Events emitted by the playback engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PlaybackEvent {
    /// Queue contents changed (tracks added, removed or replaced)
    QueueChanged,

    /// A new playback replaced the queue
    NewPlayback {
        /// Generation of the new playback
        generation: u64,
    },

    /// Active order changed (shuffle, insertion, removal, move)
    QueueReordered,

    /// The current track changed identity
    IndexMoved {
        /// Cursor position in the active order (`None` when empty)
        position: Option<usize>,
        /// ID of the new current track
        track_id: Option<String>,
    },

    /// Effective ReplayGain changed
    GainChanged(f64),

    /// Player state changed
    StateChanged(PlayerState),

    /// Position in the current track jumped (seek or restart)
    Seeked {
        /// New position in milliseconds
        position_ms: u64,
    },

    /// Repeat mode changed
    RepeatChanged(RepeatMode),

    /// Shuffle turned on or off
    ShuffleChanged(bool),

    /// The backend could not load a track; the engine skipped it
    TrackLoadFailed {
        /// ID of the failed track
        track_id: String,
        /// Backend error message
        message: String,
    },
}

impl PlaybackEvent {
    /// Dispatch rank within one mutation
    ///
    /// Events of lower rank are always delivered first.
    pub(crate) fn rank(&self) -> u8 {
        match self {
            Self::QueueChanged => 0,
            Self::NewPlayback { .. } => 1,
            Self::QueueReordered => 2,
            Self::IndexMoved { .. } => 3,
            Self::GainChanged(_) => 4,
            Self::StateChanged(_) => 5,
            Self::Seeked { .. } => 6,
            Self::RepeatChanged(_) | Self::ShuffleChanged(_) => 7,
            Self::TrackLoadFailed { .. } => 8,
        }
    }
}

/// An event together with the committed state it describes
#[derive(Debug, Clone)]
pub struct Notification {
    /// What changed
    pub event: PlaybackEvent,

    /// State after the mutation
    pub snapshot: Arc<PlaybackSnapshot>,
}

/// Receiver of playback notifications
pub trait PlaybackListener: Send + Sync {
    /// Called once per event, in commit order
    fn notify(&self, notification: &Notification);
}

impl<F> PlaybackListener for F
where
    F: Fn(&Notification) + Send + Sync,
{
    fn notify(&self, notification: &Notification) {
        self(notification);
    }
}

/// Handle returned by listener registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ListenerId(pub u64);

/// Ordered set of listeners
#[derive(Default)]
pub struct ListenerRegistry {
    listeners: Vec<(ListenerId, Arc<dyn PlaybackListener>)>,
    next_id: u64,
}

impl ListenerRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener; it is called after every existing one
    pub fn add(&mut self, listener: Arc<dyn PlaybackListener>) -> ListenerId {
        self.next_id += 1;
        let id = ListenerId(self.next_id);
        self.listeners.push((id, listener));
        id
    }

    /// Unregister a listener
    ///
    /// Returns false if the id was unknown (already removed).
    pub fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(existing, _)| *existing != id);
        self.listeners.len() != before
    }

    /// Remove every listener
    pub fn clear(&mut self) {
        self.listeners.clear();
    }

    /// Number of registered listeners
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    /// Check if no listener is registered
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Deliver one notification to every listener in registration order
    pub fn dispatch(&self, notification: &Notification) {
        for (id, listener) in &self.listeners {
            let result = catch_unwind(AssertUnwindSafe(|| listener.notify(notification)));
            if result.is_err() {
                tracing::warn!(
                    listener = id.0,
                    event = ?notification.event,
                    "Playback listener panicked; continuing with the remaining listeners"
                );
            }
        }
    }
}

impl std::fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("listeners", &self.listeners.len())
            .field("next_id", &self.next_id)
            .finish()
    }
}
