//! Session persistence
//!
//! Only what is needed to restore a session is stored: track identities in
//! insertion order, the shuffle permutation, the cursor, repeat and gain
//! settings, and the position in the current track. Track metadata is looked
//! up again from the library on restore.

use crate::error::{PlaybackError, Result};
use crate::queue::Queue;
use crate::shuffle::is_permutation;
use crate::types::{RepeatMode, Track};
use cadence_loudness::GainConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Current on-disk format version
pub const SESSION_VERSION: u32 = 1;

/// Persisted engine state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    /// Format version
    pub version: u32,

    /// Track ids in insertion order
    pub items: Vec<String>,

    /// Shuffle permutation over `items`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shuffled: Option<Vec<usize>>,

    /// Cursor position in the active order
    pub cursor: Option<usize>,

    /// Repeat mode
    #[serde(default)]
    pub repeat: RepeatMode,

    /// Gain configuration
    #[serde(default)]
    pub gain: GainConfig,

    /// Position in the current track, in milliseconds
    #[serde(default)]
    pub position_ms: u64,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            version: SESSION_VERSION,
            items: Vec::new(),
            shuffled: None,
            cursor: None,
            repeat: RepeatMode::Off,
            gain: GainConfig::default(),
            position_ms: 0,
        }
    }
}

impl SessionState {
    /// Check that permutation and cursor are consistent with `items`
    pub fn validate(&self) -> Result<()> {
        if self.version != SESSION_VERSION {
            return Err(PlaybackError::InvalidSession(format!(
                "unsupported session version {}",
                self.version
            )));
        }

        let len = self.items.len();
        if let Some(order) = &self.shuffled {
            if !is_permutation(order, len) {
                return Err(PlaybackError::InvalidSession(format!(
                    "shuffle order is not a permutation of {} items",
                    len
                )));
            }
        }

        match self.cursor {
            Some(c) if c >= len => Err(PlaybackError::InvalidSession(format!(
                "cursor {} out of range for {} items",
                c, len
            ))),
            None if len > 0 => Err(PlaybackError::InvalidSession(
                "non-empty queue without cursor".to_string(),
            )),
            _ => Ok(()),
        }
    }
}

/// Resolves persisted track ids back to tracks
pub trait TrackLookup {
    /// Track for `id`, or `None` if it no longer exists
    fn track(&self, id: &str) -> Option<Track>;
}

impl TrackLookup for HashMap<String, Track> {
    fn track(&self, id: &str) -> Option<Track> {
        self.get(id).cloned()
    }
}

impl TrackLookup for [Track] {
    fn track(&self, id: &str) -> Option<Track> {
        self.iter().find(|t| t.id == id).cloned()
    }
}

/// Queue rebuilt from a session
#[derive(Debug)]
pub(crate) struct RestoredQueue {
    pub queue: Queue,

    /// The persisted current track is still current
    pub current_survived: bool,
}

/// Rebuild the queue from a session, dropping ids the lookup does not know
///
/// The permutation keeps the relative order of the survivors. When the
/// current track is gone the cursor moves to the next surviving entry,
/// wrapping to the first one.
pub(crate) fn rebuild_queue<L>(state: &SessionState, lookup: &L) -> Result<RestoredQueue>
where
    L: TrackLookup + ?Sized,
{
    state.validate()?;

    let mut remap = vec![None; state.items.len()];
    let mut items = Vec::with_capacity(state.items.len());
    for (index, id) in state.items.iter().enumerate() {
        match lookup.track(id) {
            Some(track) => {
                remap[index] = Some(items.len());
                items.push(track);
            }
            None => tracing::warn!(track_id = %id, "Dropping unknown track from restored session"),
        }
    }

    let active: Vec<usize> = match &state.shuffled {
        Some(order) => order.clone(),
        None => (0..state.items.len()).collect(),
    };

    let shuffled = state
        .shuffled
        .as_ref()
        .map(|order| order.iter().filter_map(|&i| remap[i]).collect::<Vec<_>>());

    let cursor = match state.cursor {
        Some(c) if !items.is_empty() => {
            let survivors_before = active[..c].iter().filter(|&&i| remap[i].is_some()).count();
            Some(if survivors_before >= items.len() {
                0
            } else {
                survivors_before
            })
        }
        _ => None,
    };

    let current_survived = state.cursor.is_some_and(|c| remap[active[c]].is_some());

    Ok(RestoredQueue {
        queue: Queue::from_parts(items, shuffled, cursor, state.repeat)?,
        current_survived,
    })
}

/// JSON session file
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    /// Store backed by the file at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the session file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the session atomically (temp file + rename)
    pub fn save(&self, state: &SessionState) -> Result<()> {
        let json = serde_json::to_vec_pretty(state)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;

        tracing::debug!(path = %self.path.display(), tracks = state.items.len(), "Saved session");
        Ok(())
    }

    /// Read the session
    ///
    /// Returns `Ok(None)` when no session has been saved yet.
    pub fn load(&self) -> Result<Option<SessionState>> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let state: SessionState = serde_json::from_slice(&bytes)?;
        state.validate()?;
        Ok(Some(state))
    }

    /// Read the session, falling back to an empty one on any error
    pub fn load_or_default(&self) -> SessionState {
        match self.load() {
            Ok(Some(state)) => state,
            Ok(None) => SessionState::default(),
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Session file unusable, starting with an empty queue"
                );
                SessionState::default()
            }
        }
    }
}
