//! Track metadata reading using lofty

use crate::error::{Result, ServiceError};
use cadence_loudness::read_replaygain_tags;
use cadence_playback::{Track, TrackLookup};
use lofty::{AudioFile, ItemKey, TaggedFileExt};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// File extensions treated as audio
pub const AUDIO_EXTENSIONS: &[&str] = &["mp3", "flac", "ogg", "opus", "m4a", "aac", "wav", "aiff"];

/// Check if a path looks like an audio file
pub fn is_audio_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| AUDIO_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

/// Read a track from an audio file
///
/// The track id is the file path. Missing title/artist tags fall back to the
/// file name and "Unknown Artist"; missing ReplayGain tags leave the track
/// untagged.
pub fn read_track(path: &Path) -> Result<Track> {
    if !path.exists() {
        return Err(ServiceError::TrackRead {
            path: path.display().to_string(),
            message: "file not found".to_string(),
        });
    }

    let tagged_file = lofty::read_from_path(path).map_err(|e| ServiceError::TrackRead {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;

    let duration = tagged_file.properties().duration();
    let tag = tagged_file
        .primary_tag()
        .or_else(|| tagged_file.tags().first());
    let text = |key: ItemKey| {
        tag.and_then(|t| t.get_string(&key))
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
    };

    let title = text(ItemKey::TrackTitle).unwrap_or_else(|| {
        path.file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    });
    let artist = text(ItemKey::TrackArtist).unwrap_or_else(|| "Unknown Artist".to_string());
    let album = text(ItemKey::AlbumTitle);
    let album_artist = text(ItemKey::AlbumArtist).unwrap_or_else(|| artist.clone());

    let replay_gain = match read_replaygain_tags(path) {
        Ok(tags) => tags,
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "No ReplayGain tags");
            Default::default()
        }
    };

    Ok(Track {
        id: path.to_string_lossy().into_owned(),
        path: path.to_path_buf(),
        artist_id: Some(artist.to_lowercase()),
        album_id: album
            .as_ref()
            .map(|a| format!("{}/{}", album_artist.to_lowercase(), a.to_lowercase())),
        title,
        artist,
        album,
        duration,
        replay_gain,
    })
}

/// In-memory track library keyed by track id
#[derive(Debug, Clone, Default)]
pub struct TrackLibrary {
    tracks: HashMap<String, Track>,
    order: Vec<String>,
}

impl TrackLibrary {
    /// Create an empty library
    pub fn new() -> Self {
        Self::default()
    }

    /// Read every file, skipping the ones that fail
    ///
    /// Returns the library and the files that could not be read.
    pub fn from_paths<I>(paths: I) -> (Self, Vec<(PathBuf, ServiceError)>)
    where
        I: IntoIterator<Item = PathBuf>,
    {
        let mut library = Self::new();
        let mut failed = Vec::new();

        for path in paths {
            match read_track(&path) {
                Ok(track) => library.insert(track),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable file");
                    failed.push((path, e));
                }
            }
        }

        (library, failed)
    }

    /// Add or replace a track
    pub fn insert(&mut self, track: Track) {
        if !self.tracks.contains_key(&track.id) {
            self.order.push(track.id.clone());
        }
        self.tracks.insert(track.id.clone(), track);
    }

    /// Get a track by id
    pub fn get(&self, id: &str) -> Option<&Track> {
        self.tracks.get(id)
    }

    /// All tracks in insertion order
    pub fn tracks(&self) -> Vec<Track> {
        self.order
            .iter()
            .filter_map(|id| self.tracks.get(id))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

impl TrackLookup for TrackLibrary {
    fn track(&self, id: &str) -> Option<Track> {
        self.tracks.get(id).cloned()
    }
}

/// Resolves track ids by reading the file they name
///
/// Works for sessions saved from tracks built by [`read_track`], whose ids
/// are file paths. Files that no longer exist resolve to nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileLookup;

impl TrackLookup for FileLookup {
    fn track(&self, id: &str) -> Option<Track> {
        match read_track(Path::new(id)) {
            Ok(track) => Some(track),
            Err(e) => {
                tracing::debug!(id, error = %e, "Cannot resolve track");
                None
            }
        }
    }
}
