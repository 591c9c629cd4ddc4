//! Internal player: transport state on top of a platform backend
//!
//! The manager drives the player; the player never drives the manager.
//! Platform code (desktop output, mobile media player, test doubles)
//! implements [`PlayerBackend`]. Loading is asynchronous: `load` only
//! dispatches, and the outcome comes back later through `poll_event`.

use crate::types::{LoadTicket, PlayerState, Track};
use std::time::Duration;

/// Asynchronous results reported by a backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendEvent {
    /// The track for `ticket` is ready to play
    Loaded { ticket: LoadTicket },

    /// The track for `ticket` could not be opened or decoded
    LoadFailed { ticket: LoadTicket, message: String },

    /// The track for `ticket` played to its natural end
    Finished { ticket: LoadTicket },
}

impl BackendEvent {
    /// Ticket of the load this event belongs to
    pub fn ticket(&self) -> LoadTicket {
        match self {
            Self::Loaded { ticket }
            | Self::LoadFailed { ticket, .. }
            | Self::Finished { ticket } => *ticket,
        }
    }
}

/// Platform-specific playback backend
///
/// Implementors own the actual audio path. None of these calls may block
/// for longer than it takes to hand work to another thread.
pub trait PlayerBackend: Send {
    /// Begin loading `track`; report the outcome as an event for `ticket`
    fn load(&mut self, track: &Track, ticket: LoadTicket);

    /// Start or resume output of the loaded track
    fn start(&mut self);

    /// Pause output, keeping the position
    fn pause(&mut self);

    /// Stop output
    fn stop(&mut self);

    /// Seek within the loaded track
    fn seek(&mut self, position: Duration);

    /// Current position within the loaded track
    fn position(&self) -> Duration;

    /// Apply an output gain in dB
    fn set_gain_db(&mut self, _gain_db: f64) {}

    /// Next pending asynchronous result, if any
    fn poll_event(&mut self) -> Option<BackendEvent>;
}

/// Transport control with a Stopped/Playing/Paused state
pub struct InternalPlayer {
    backend: Box<dyn PlayerBackend>,
    state: PlayerState,

    /// Duration of the loaded track (for clamping)
    duration: Duration,

    /// Ticket of the load in flight or completed
    ticket: Option<LoadTicket>,

    /// Whether the load for `ticket` has completed
    ready: bool,

    /// Whether the load for `ticket` failed
    failed: bool,
}

impl InternalPlayer {
    /// Create a stopped player over a backend
    pub fn new(backend: Box<dyn PlayerBackend>) -> Self {
        Self {
            backend,
            state: PlayerState::Stopped,
            duration: Duration::ZERO,
            ticket: None,
            ready: false,
            failed: false,
        }
    }

    /// Transport state
    pub fn state(&self) -> PlayerState {
        self.state
    }

    /// Ticket of the current load, if a track is loaded or loading
    pub fn ticket(&self) -> Option<LoadTicket> {
        self.ticket
    }

    /// Whether the current load has completed
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Whether the current track must be loaded again before it can play
    pub fn needs_reload(&self) -> bool {
        self.ticket.is_some() && self.failed
    }

    /// Position in the current track, in milliseconds
    ///
    /// Always 0 until the load completes; never beyond the track duration.
    pub fn position_ms(&self) -> u64 {
        if self.ticket.is_none() || !self.ready {
            return 0;
        }
        let position = self.backend.position().min(self.duration);
        u64::try_from(position.as_millis()).unwrap_or(u64::MAX)
    }

    /// Load a track
    ///
    /// Position resets to 0 and the play/pause state is unchanged: a playing
    /// player starts the new track as soon as the backend reports it loaded.
    pub fn load_track(&mut self, track: &Track, ticket: LoadTicket) {
        self.duration = track.duration;
        self.ticket = Some(ticket);
        self.ready = false;
        self.failed = false;
        self.backend.load(track, ticket);
    }

    /// Forget the loaded track (queue emptied)
    pub fn unload(&mut self) {
        self.backend.stop();
        self.state = PlayerState::Stopped;
        self.duration = Duration::ZERO;
        self.ticket = None;
        self.ready = false;
        self.failed = false;
    }

    /// Mark the load for `ticket` as complete
    ///
    /// Returns false (and changes nothing) for any other ticket.
    pub fn on_loaded(&mut self, ticket: LoadTicket) -> bool {
        if self.ticket != Some(ticket) {
            return false;
        }

        self.ready = true;
        if self.state == PlayerState::Playing {
            self.backend.start();
        }
        true
    }

    /// Mark the load for `ticket` as failed
    ///
    /// Returns false (and changes nothing) for any other ticket.
    pub fn on_load_failed(&mut self, ticket: LoadTicket) -> bool {
        if self.ticket != Some(ticket) {
            return false;
        }

        self.failed = true;
        true
    }

    /// Start or resume playback
    pub fn play(&mut self) {
        self.state = PlayerState::Playing;
        if self.ready {
            self.backend.start();
        }
    }

    /// Pause playback
    pub fn pause(&mut self) {
        if self.state == PlayerState::Playing {
            self.state = PlayerState::Paused;
            self.backend.pause();
        }
    }

    /// Stop playback and rewind to the start of the track
    pub fn stop(&mut self) {
        self.state = PlayerState::Stopped;
        self.backend.stop();
        if self.ready {
            self.backend.seek(Duration::ZERO);
        }
    }

    /// Seek within the current track, clamped to `[0, duration]`
    ///
    /// Returns the position actually sought to.
    pub fn seek_to(&mut self, position_ms: u64) -> u64 {
        let target = Duration::from_millis(position_ms).min(self.duration);
        if self.ticket.is_some() {
            self.backend.seek(target);
        }
        u64::try_from(target.as_millis()).unwrap_or(u64::MAX)
    }

    /// Forward the effective gain to the backend
    pub fn set_gain_db(&mut self, gain_db: f64) {
        self.backend.set_gain_db(gain_db);
    }

    /// Next pending backend event
    pub fn poll_event(&mut self) -> Option<BackendEvent> {
        self.backend.poll_event()
    }
}

/// Backend that loads instantly and never produces sound
///
/// Used until a platform backend is attached and in unit tests.
#[derive(Debug, Default)]
pub struct NullBackend {
    pending: std::collections::VecDeque<BackendEvent>,
    position: Duration,
}

impl PlayerBackend for NullBackend {
    fn load(&mut self, _track: &Track, ticket: LoadTicket) {
        self.position = Duration::ZERO;
        self.pending.push_back(BackendEvent::Loaded { ticket });
    }

    fn start(&mut self) {}

    fn pause(&mut self) {}

    fn stop(&mut self) {}

    fn seek(&mut self, position: Duration) {
        self.position = position;
    }

    fn position(&self) -> Duration {
        self.position
    }

    fn poll_event(&mut self) -> Option<BackendEvent> {
        self.pending.pop_front()
    }
}
