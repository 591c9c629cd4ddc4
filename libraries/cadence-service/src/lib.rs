//! Hosting service for the Cadence playback engine
//!
//! Runs a [`cadence_playback::PlaybackStateManager`] on a dedicated engine
//! thread and hands out cloneable [`PlaybackHandle`]s to every collaborator.
//!
//! # Features
//!
//! - Single-writer engine thread fed by a command channel
//! - Background track loading that never blocks intents
//! - One worker thread per listener, in commit order
//! - Headless backend with a wall-clock position
//! - TOML + environment configuration
//! - Session persistence on shutdown
//!
//! # Example
//!
//! ```no_run
//! use cadence_service::{PlaybackService, ServiceConfig, TrackLibrary};
//! use std::path::PathBuf;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ServiceConfig::load(None)?;
//! let service = PlaybackService::start_headless(config)?;
//!
//! let (library, _failed) = TrackLibrary::from_paths(vec![PathBuf::from("/music/song.flac")]);
//! let handle = service.handle();
//! handle.play(library.tracks(), 0)?;
//!
//! println!("{:?}", handle.snapshot()?.current_track());
//! service.shutdown()?;
//! # Ok(())
//! # }
//! ```

mod backend;
mod clock;
mod config;
mod error;
mod library;
mod listener;
mod loader;
mod service;

pub use backend::HeadlessBackend;
pub use clock::PlaybackClock;
pub use config::{EngineSettings, PlaybackSettings, ServiceConfig, SessionSettings};
pub use error::{Result, ServiceError};
pub use library::{is_audio_file, read_track, FileLookup, TrackLibrary, AUDIO_EXTENSIONS};
pub use loader::{FileOpener, LoadRequest, LoadResult, OpenedTrack, TrackLoader, TrackOpener};
pub use service::{PlaybackHandle, PlaybackService};
