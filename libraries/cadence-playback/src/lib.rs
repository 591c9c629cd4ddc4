//! Cadence - Playback State & Queue Engine
//!
//! Platform-agnostic authority over what is playing, the ordered queue of
//! upcoming and previous tracks, shuffle and repeat semantics, and the
//! ReplayGain adjustment applied to the current track.
//!
//! This crate provides:
//! - Queue with a non-destructive shuffle permutation and repeat policy
//! - Internal player over a pluggable [`PlayerBackend`]
//! - [`PlaybackStateManager`] applying intents and notifying listeners
//! - Immutable [`PlaybackSnapshot`]s for readers
//! - JSON session persistence
//!
//! # Architecture
//!
//! ```text
//! intents ──> PlaybackStateManager ──> Queue / InternalPlayer
//!                     │                          │
//!                     │ re-resolve gain           └─> PlayerBackend (platform)
//!                     v
//!              listeners (ordered, isolated)
//! ```
//!
//! `cadence-playback` has no threads of its own. It is driven by a single
//! owner; `cadence-service` hosts it on an engine thread.
//!
//! # Example
//!
//! ```rust
//! use cadence_playback::{
//!     NullBackend, Notification, PlaybackConfig, PlaybackStateManager, PlayerState, Track,
//! };
//! use std::path::PathBuf;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let mut manager = PlaybackStateManager::new(
//!     PlaybackConfig::default(),
//!     Box::new(NullBackend::default()),
//! );
//!
//! manager.add_listener(Arc::new(|n: &Notification| {
//!     println!("{:?}", n.event);
//! }));
//!
//! let track = Track {
//!     id: "track1".to_string(),
//!     path: PathBuf::from("/music/song.flac"),
//!     title: "My Song".to_string(),
//!     artist: "Artist Name".to_string(),
//!     album: Some("Album Name".to_string()),
//!     artist_id: None,
//!     album_id: None,
//!     duration: Duration::from_secs(180),
//!     replay_gain: Default::default(),
//! };
//!
//! manager.play(vec![track], 0);
//! assert_eq!(manager.state(), PlayerState::Playing);
//! assert_eq!(manager.snapshot().current_track().unwrap().id, "track1");
//! ```

mod error;
mod events;
mod manager;
mod player;
mod queue;
mod session;
mod shuffle;
mod snapshot;
pub mod types;

// Public exports
pub use error::{PlaybackError, Result};
pub use events::{ListenerId, ListenerRegistry, Notification, PlaybackEvent, PlaybackListener};
pub use manager::PlaybackStateManager;
pub use player::{BackendEvent, InternalPlayer, NullBackend, PlayerBackend};
pub use queue::{Queue, Removal};
pub use session::{SessionState, SessionStore, TrackLookup, SESSION_VERSION};
pub use shuffle::{is_permutation, shuffled_order};
pub use snapshot::PlaybackSnapshot;
pub use types::{
    next_repeat_mode, repeat_mode_code, repeat_mode_from_code, repeat_mode_icon, LoadTicket,
    PlaybackConfig, PlayerState, RepeatMode, Track,
};

pub use cadence_loudness::{EffectiveGain, GainConfig, GainMode, PreAmp, ReplayGainTags};
