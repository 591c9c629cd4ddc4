//! Wall-clock playback position

use std::time::{Duration, Instant};

/// Tracks the playback position of a headless player
///
/// The position advances with wall time while running and holds still while
/// paused.
#[derive(Debug, Clone, Default)]
pub struct PlaybackClock {
    /// Position accumulated before the current run
    base: Duration,
    /// When the current run started
    started_at: Option<Instant>,
}

impl PlaybackClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop and rewind to zero
    pub fn reset(&mut self) {
        self.base = Duration::ZERO;
        self.started_at = None;
    }

    /// Start advancing (no-op if already running)
    pub fn start(&mut self) {
        if self.started_at.is_none() {
            self.started_at = Some(Instant::now());
        }
    }

    /// Stop advancing, keeping the position
    pub fn pause(&mut self) {
        if let Some(started_at) = self.started_at.take() {
            self.base += started_at.elapsed();
        }
    }

    /// Jump to `position`, keeping the running state
    pub fn seek(&mut self, position: Duration) {
        self.base = position;
        if self.started_at.is_some() {
            self.started_at = Some(Instant::now());
        }
    }

    pub fn position(&self) -> Duration {
        match self.started_at {
            Some(started_at) => self.base + started_at.elapsed(),
            None => self.base,
        }
    }

    pub fn is_running(&self) -> bool {
        self.started_at.is_some()
    }
}
