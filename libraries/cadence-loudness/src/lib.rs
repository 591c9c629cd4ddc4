//! ReplayGain handling for Cadence
//!
//! This crate provides:
//! - ReplayGain tag parsing and reading (track/album gain and peak)
//! - Gain configuration (mode + pre-amp pair)
//! - Resolution of the effective output gain for the current track
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌────────────────┐     ┌───────────────┐
//! │ Audio File  │ ──► │  Tag Reader    │ ──► │ ReplayGainTags│
//! └─────────────┘     └────────────────┘     └───────────────┘
//!                                                    │
//!                       GainConfig ─────────────────►│
//!                                                    ▼
//!                                            ┌───────────────┐
//!                                            │ EffectiveGain │
//!                                            └───────────────┘
//! ```
//!
//! # Example
//!
//! ```rust
//! use cadence_loudness::{resolve, GainConfig, GainMode, PreAmp, ReplayGainTags};
//!
//! let tags = ReplayGainTags {
//!     track_gain: None,
//!     album_gain: Some(-1.0),
//!     ..ReplayGainTags::default()
//! };
//! let config = GainConfig::new(GainMode::Track, PreAmp::new(2.0, 0.0));
//!
//! let gain = resolve(&tags, &config, false);
//! assert!((gain.gain_db - 1.0).abs() < 1e-9);
//! ```

#![deny(unsafe_code)]

mod error;
mod replaygain;
mod tags;

pub use error::{LoudnessError, Result};
pub use replaygain::{resolve, EffectiveGain, GainConfig, GainMode, GainSource, PreAmp};
pub use tags::{parse_gain, parse_peak, read_replaygain_tags, ReplayGainTags};

/// Maximum pre-amp gain in dB
pub const MAX_PREAMP_DB: f64 = 15.0;

/// Minimum pre-amp gain in dB
pub const MIN_PREAMP_DB: f64 = -15.0;
