//! Core types for playback management

use cadence_loudness::{GainConfig, ReplayGainTags};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Track information for queue management
///
/// Contains all metadata needed for playback and display.
/// This is eagerly loaded from the library so the engine never does I/O
/// to answer a query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    /// Unique track identifier from the library
    pub id: String,

    /// File path for audio decoding
    pub path: PathBuf,

    /// Track title
    pub title: String,

    /// Artist name
    pub artist: String,

    /// Album name (optional)
    pub album: Option<String>,

    /// Parent artist identifier (optional)
    pub artist_id: Option<String>,

    /// Parent album identifier (optional)
    pub album_id: Option<String>,

    /// Track duration
    pub duration: Duration,

    /// Loudness tags
    #[serde(default)]
    pub replay_gain: ReplayGainTags,
}

impl Track {
    /// Duration in whole milliseconds
    pub fn duration_ms(&self) -> u64 {
        u64::try_from(self.duration.as_millis()).unwrap_or(u64::MAX)
    }

    /// Whether both tracks belong to the same (known) album
    pub fn same_album(&self, other: &Track) -> bool {
        match (&self.album_id, &other.album_id) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

/// Player transport state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerState {
    /// Not playing; position is kept
    #[default]
    Stopped,

    /// Currently playing
    Playing,

    /// Paused mid-track
    Paused,
}

/// Repeat mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepeatMode {
    /// Stop when queue ends
    #[default]
    Off,

    /// Loop entire queue
    All,

    /// Loop current track only
    One,
}

/// Wire codes for each repeat mode, as stored by older clients and media sessions
const REPEAT_MODE_CODES: [(RepeatMode, i32); 3] = [
    (RepeatMode::Off, 0),
    (RepeatMode::All, 1),
    (RepeatMode::One, 2),
];

/// Icon resource names for each repeat mode
const REPEAT_MODE_ICONS: [(RepeatMode, &str); 3] = [
    (RepeatMode::Off, "ic_repeat_off"),
    (RepeatMode::All, "ic_repeat"),
    (RepeatMode::One, "ic_repeat_one"),
];

/// Integer wire code of a repeat mode
pub fn repeat_mode_code(mode: RepeatMode) -> i32 {
    REPEAT_MODE_CODES
        .iter()
        .find(|(m, _)| *m == mode)
        .map(|(_, code)| *code)
        .unwrap_or(0)
}

/// Repeat mode for an integer wire code
pub fn repeat_mode_from_code(code: i32) -> Option<RepeatMode> {
    REPEAT_MODE_CODES
        .iter()
        .find(|(_, c)| *c == code)
        .map(|(mode, _)| *mode)
}

/// Icon resource name of a repeat mode
pub fn repeat_mode_icon(mode: RepeatMode) -> &'static str {
    REPEAT_MODE_ICONS
        .iter()
        .find(|(m, _)| *m == mode)
        .map(|(_, icon)| *icon)
        .unwrap_or("ic_repeat_off")
}

/// Next mode in the Off -> All -> One -> Off cycle used by the repeat button
pub fn next_repeat_mode(mode: RepeatMode) -> RepeatMode {
    match mode {
        RepeatMode::Off => RepeatMode::All,
        RepeatMode::All => RepeatMode::One,
        RepeatMode::One => RepeatMode::Off,
    }
}

/// Identifies one dispatched track load
///
/// `generation` is bumped on every full playback replacement, `sequence` on
/// every load. A backend result is only applied when its ticket equals the
/// ticket of the load currently in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct LoadTicket {
    /// Playback generation the load belongs to
    pub generation: u64,

    /// Per-load sequence number
    pub sequence: u64,
}

/// Configuration for playback manager
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Initial repeat mode (default: Off)
    pub repeat: RepeatMode,

    /// Initial gain configuration
    pub gain: GainConfig,

    /// "Previous" restarts the current track when it has played longer than
    /// this (default: 3s, `None` always goes back)
    pub previous_restart_threshold: Option<Duration>,

    /// Seed for shuffle permutations (default: from entropy)
    pub shuffle_seed: Option<u64>,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            repeat: RepeatMode::Off,
            gain: GainConfig::default(),
            previous_restart_threshold: Some(Duration::from_secs(3)),
            shuffle_seed: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = PlaybackConfig::default();
        assert_eq!(config.repeat, RepeatMode::Off);
        assert_eq!(
            config.previous_restart_threshold,
            Some(Duration::from_secs(3))
        );
        assert!(config.shuffle_seed.is_none());
    }

    #[test]
    fn repeat_mode_codes_round_trip() {
        for mode in [RepeatMode::Off, RepeatMode::All, RepeatMode::One] {
            assert_eq!(repeat_mode_from_code(repeat_mode_code(mode)), Some(mode));
        }
        assert_eq!(repeat_mode_from_code(7), None);
        assert_eq!(repeat_mode_icon(RepeatMode::One), "ic_repeat_one");
    }

    #[test]
    fn repeat_cycle_visits_every_mode() {
        let mut mode = RepeatMode::Off;
        let mut seen = Vec::new();
        for _ in 0..3 {
            mode = next_repeat_mode(mode);
            seen.push(mode);
        }
        assert_eq!(seen, vec![RepeatMode::All, RepeatMode::One, RepeatMode::Off]);
    }

    #[test]
    fn same_album_requires_known_ids() {
        let mut a = Track {
            id: "1".to_string(),
            path: PathBuf::from("/music/1.flac"),
            title: "One".to_string(),
            artist: "Artist".to_string(),
            album: None,
            artist_id: None,
            album_id: None,
            duration: Duration::from_secs(60),
            replay_gain: ReplayGainTags::default(),
        };
        let mut b = a.clone();
        b.id = "2".to_string();

        assert!(!a.same_album(&b));

        a.album_id = Some("al".to_string());
        b.album_id = Some("al".to_string());
        assert!(a.same_album(&b));
    }
}
