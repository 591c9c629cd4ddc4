//! Immutable views of committed engine state

use crate::types::{PlayerState, RepeatMode, Track};
use cadence_loudness::EffectiveGain;
use serde::{Deserialize, Serialize};

/// Committed state of the engine at one point in time
///
/// Handed out behind an `Arc`; readers never see a half-applied mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackSnapshot {
    /// Playback generation this state belongs to
    pub generation: u64,

    /// Tracks in the active order
    pub tracks: Vec<Track>,

    /// Cursor position in `tracks`
    pub position: Option<usize>,

    /// Transport state
    pub state: PlayerState,

    /// Position in the current track, in milliseconds
    pub position_ms: u64,

    /// Repeat mode
    pub repeat: RepeatMode,

    /// Whether shuffle is on
    pub shuffled: bool,

    /// Effective gain for the current track
    pub gain: EffectiveGain,
}

impl Default for PlaybackSnapshot {
    fn default() -> Self {
        Self {
            generation: 0,
            tracks: Vec::new(),
            position: None,
            state: PlayerState::Stopped,
            position_ms: 0,
            repeat: RepeatMode::Off,
            shuffled: false,
            gain: EffectiveGain::UNITY,
        }
    }
}

impl PlaybackSnapshot {
    /// Currently selected track
    pub fn current_track(&self) -> Option<&Track> {
        self.position.and_then(|p| self.tracks.get(p))
    }

    /// Check if the engine is playing
    pub fn is_playing(&self) -> bool {
        self.state == PlayerState::Playing
    }

    /// Number of tracks in the queue
    pub fn queue_len(&self) -> usize {
        self.tracks.len()
    }
}
