//! Headless player backend
//!
//! Drives the playback engine without an audio device: loads run on the
//! background [`TrackLoader`], the position follows a wall clock, and a track
//! finishes when the clock reaches its duration.

use crate::clock::PlaybackClock;
use crate::error::Result;
use crate::loader::{FileOpener, LoadRequest, TrackLoader, TrackOpener};
use cadence_playback::{BackendEvent, LoadTicket, PlayerBackend, Track};
use std::collections::VecDeque;
use std::time::Duration;

/// The track the backend currently holds
#[derive(Debug, Clone, Copy)]
struct LoadedTrack {
    ticket: LoadTicket,
    duration: Duration,
    ready: bool,
    finished: bool,
}

/// Player backend with a wall-clock position
pub struct HeadlessBackend {
    loader: TrackLoader,
    clock: PlaybackClock,
    current: Option<LoadedTrack>,
    pending: VecDeque<BackendEvent>,
    gain_db: f64,
}

impl HeadlessBackend {
    /// Create a backend whose loads go through `opener`
    pub fn new(opener: Box<dyn TrackOpener>, queue_depth: usize) -> Result<Self> {
        Ok(Self {
            loader: TrackLoader::new(opener, queue_depth)?,
            clock: PlaybackClock::new(),
            current: None,
            pending: VecDeque::new(),
            gain_db: 0.0,
        })
    }

    /// Create a backend that opens audio files on disk
    pub fn with_file_opener(queue_depth: usize) -> Result<Self> {
        Self::new(Box::new(FileOpener), queue_depth)
    }

    /// Gain last applied by the engine
    pub fn gain_db(&self) -> f64 {
        self.gain_db
    }

    /// Apply a finished load to the current track
    fn on_opened(&mut self, ticket: LoadTicket, duration: Duration) {
        if let Some(current) = self.current.as_mut().filter(|c| c.ticket == ticket) {
            if !duration.is_zero() {
                current.duration = duration;
            }
            current.ready = true;
        }
    }
}

impl PlayerBackend for HeadlessBackend {
    fn load(&mut self, track: &Track, ticket: LoadTicket) {
        self.clock.reset();
        self.current = Some(LoadedTrack {
            ticket,
            duration: track.duration,
            ready: false,
            finished: false,
        });

        let request = LoadRequest {
            ticket,
            track: track.clone(),
        };
        if !self.loader.request_load(request) {
            self.pending.push_back(BackendEvent::LoadFailed {
                ticket,
                message: "track loader stopped".to_string(),
            });
        }
    }

    fn start(&mut self) {
        self.clock.start();
    }

    fn pause(&mut self) {
        self.clock.pause();
    }

    fn stop(&mut self) {
        self.clock.pause();
    }

    fn seek(&mut self, position: Duration) {
        self.clock.seek(position);
        if let Some(current) = self.current.as_mut() {
            if position < current.duration {
                current.finished = false;
            }
        }
    }

    fn position(&self) -> Duration {
        self.clock.position()
    }

    fn set_gain_db(&mut self, gain_db: f64) {
        tracing::debug!(gain_db, "Applying gain");
        self.gain_db = gain_db;
    }

    fn poll_event(&mut self) -> Option<BackendEvent> {
        if let Some(event) = self.pending.pop_front() {
            return Some(event);
        }

        // Results for superseded loads are still reported; the engine drops them
        if let Some(result) = self.loader.poll_ready() {
            return Some(match result.outcome {
                Ok(opened) => {
                    self.on_opened(result.ticket, opened.duration);
                    BackendEvent::Loaded {
                        ticket: result.ticket,
                    }
                }
                Err(message) => BackendEvent::LoadFailed {
                    ticket: result.ticket,
                    message,
                },
            });
        }

        let current = self.current.as_mut()?;
        if current.ready
            && !current.finished
            && self.clock.is_running()
            && self.clock.position() >= current.duration
        {
            current.finished = true;
            self.clock.pause();
            return Some(BackendEvent::Finished {
                ticket: current.ticket,
            });
        }

        None
    }
}
