//! ReplayGain tag parsing and reading
//!
//! Supports reading ReplayGain tags in the formats lofty maps onto its
//! generic item keys:
//! - ID3v2 (MP3): TXXX frames with "REPLAYGAIN_*" descriptions
//! - Vorbis Comments (FLAC, OGG): REPLAYGAIN_* fields
//! - APE tags: REPLAYGAIN_* fields
//! - MP4/AAC: iTunes-style ----:com.apple.iTunes:* atoms

use crate::error::{LoudnessError, Result};
use lofty::{ItemKey, Probe, Tag, TaggedFileExt};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// ReplayGain tag values attached to a track
///
/// Values are kept exactly as read. Use the `*_db` accessors to get only
/// usable (finite) values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ReplayGainTags {
    /// Track gain in dB
    pub track_gain: Option<f64>,
    /// Track peak (linear, 0.0-1.0+)
    pub track_peak: Option<f64>,
    /// Album gain in dB
    pub album_gain: Option<f64>,
    /// Album peak (linear, 0.0-1.0+)
    pub album_peak: Option<f64>,
}

impl ReplayGainTags {
    /// Track gain, if present and finite
    pub fn track_gain_db(&self) -> Option<f64> {
        self.track_gain.filter(|g| g.is_finite())
    }

    /// Album gain, if present and finite
    pub fn album_gain_db(&self) -> Option<f64> {
        self.album_gain.filter(|g| g.is_finite())
    }

    /// Track peak, if present, finite and positive
    pub fn track_peak_linear(&self) -> Option<f64> {
        self.track_peak.filter(|p| p.is_finite() && *p > 0.0)
    }

    /// Album peak, if present, finite and positive
    pub fn album_peak_linear(&self) -> Option<f64> {
        self.album_peak.filter(|p| p.is_finite() && *p > 0.0)
    }

    /// Check if a usable track gain is present
    pub fn has_track_tags(&self) -> bool {
        self.track_gain_db().is_some()
    }

    /// Check if a usable album gain is present
    pub fn has_album_tags(&self) -> bool {
        self.album_gain_db().is_some()
    }

    /// Convert track peak from linear to dB
    pub fn track_peak_db(&self) -> Option<f64> {
        self.track_peak_linear().map(|p| 20.0 * p.log10())
    }

    /// Convert album peak from linear to dB
    pub fn album_peak_db(&self) -> Option<f64> {
        self.album_peak_linear().map(|p| 20.0 * p.log10())
    }
}

/// Parse a gain value from a string (e.g., "-5.23 dB" -> -5.23)
///
/// Non-finite values ("nan", "inf") are rejected.
pub fn parse_gain(s: &str) -> Option<f64> {
    let s = s.trim();
    let s = s.strip_suffix(" dB").unwrap_or(s);
    let s = s.strip_suffix("dB").unwrap_or(s);
    s.trim().parse::<f64>().ok().filter(|g| g.is_finite())
}

/// Parse a peak value from a string
pub fn parse_peak(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|p| p.is_finite())
}

/// Copy any ReplayGain items found in `tag` into `tags`, keeping values
/// that were already found.
fn merge_tag(tag: &Tag, tags: &mut ReplayGainTags) {
    if tags.track_gain.is_none() {
        tags.track_gain = tag
            .get_string(&ItemKey::ReplayGainTrackGain)
            .and_then(parse_gain);
    }
    if tags.track_peak.is_none() {
        tags.track_peak = tag
            .get_string(&ItemKey::ReplayGainTrackPeak)
            .and_then(parse_peak);
    }
    if tags.album_gain.is_none() {
        tags.album_gain = tag
            .get_string(&ItemKey::ReplayGainAlbumGain)
            .and_then(parse_gain);
    }
    if tags.album_peak.is_none() {
        tags.album_peak = tag
            .get_string(&ItemKey::ReplayGainAlbumPeak)
            .and_then(parse_peak);
    }
}

/// Read ReplayGain tags from an audio file
///
/// The primary tag is consulted first, then every other tag in the file.
///
/// # Returns
/// ReplayGain tag values, or an empty struct if no tags were found
pub fn read_replaygain_tags<P: AsRef<Path>>(path: P) -> Result<ReplayGainTags> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(LoudnessError::FileNotFound(path.display().to_string()));
    }

    let tagged_file = Probe::open(path)?.read()?;

    let mut tags = ReplayGainTags::default();

    if let Some(tag) = tagged_file.primary_tag() {
        merge_tag(tag, &mut tags);
    }

    if !tags.has_track_tags() || !tags.has_album_tags() {
        for tag in tagged_file.tags() {
            merge_tag(tag, &mut tags);
        }
    }

    debug!(
        "ReplayGain tags for {:?}: track={:?} album={:?}",
        path, tags.track_gain, tags.album_gain
    );

    Ok(tags)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_gain_values() {
        assert_eq!(parse_gain("-5.23 dB"), Some(-5.23));
        assert_eq!(parse_gain("3.5dB"), Some(3.5));
        assert_eq!(parse_gain("-10.0"), Some(-10.0));
        assert_eq!(parse_gain("  2.5 dB  "), Some(2.5));
        assert!(parse_gain("invalid").is_none());
    }

    #[test]
    fn test_parse_gain_rejects_non_finite() {
        assert!(parse_gain("NaN dB").is_none());
        assert!(parse_gain("inf").is_none());
        assert!(parse_peak("-inf").is_none());
    }

    #[test]
    fn test_malformed_values_are_absent() {
        let tags = ReplayGainTags {
            track_gain: Some(f64::NAN),
            track_peak: Some(-1.0),
            album_gain: Some(f64::INFINITY),
            album_peak: Some(0.5),
        };

        assert!(!tags.has_track_tags());
        assert!(!tags.has_album_tags());
        assert!(tags.track_peak_linear().is_none());
        assert_eq!(tags.album_peak_linear(), Some(0.5));
    }

    #[test]
    fn test_peak_db_conversion() {
        let tags = ReplayGainTags {
            track_gain: Some(-5.0),
            track_peak: Some(0.891), // ~ -1 dB
            album_gain: Some(-4.0),
            album_peak: Some(1.0), // 0 dB
        };

        let track_peak_db = tags.track_peak_db().unwrap();
        assert!((track_peak_db - (-1.0)).abs() < 0.1);

        let album_peak_db = tags.album_peak_db().unwrap();
        assert!((album_peak_db - 0.0).abs() < 0.001);
    }

    #[test]
    fn test_read_missing_file() {
        let result = read_replaygain_tags("/definitely/not/here.flac");
        assert!(matches!(result, Err(LoudnessError::FileNotFound(_))));
    }
}
