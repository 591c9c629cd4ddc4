//! Effective ReplayGain resolution
//!
//! Picks the tag-derived base gain for a track according to the configured
//! mode, then adds the pre-amp matching whether a tag value was found.
//!
//! # Modes
//!
//! - Track: track gain, falling back to album gain
//! - Album: album gain, falling back to track gain
//! - Dynamic: Album while playing inside an album context, Track otherwise
//!
//! The result is a pure function of its inputs. Callers must resolve again
//! whenever the track, the mode or the pre-amp changes.

use crate::{ReplayGainTags, MAX_PREAMP_DB, MIN_PREAMP_DB};
use serde::{Deserialize, Serialize};

/// Which tag family the base gain is taken from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GainMode {
    /// Per-track normalization
    #[default]
    Track,

    /// Per-album normalization (preserves relative loudness within an album)
    Album,

    /// Album gain inside an album context, track gain otherwise
    Dynamic,
}

/// Pre-amp pair applied on top of the tag-derived gain
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PreAmp {
    /// dB added when a ReplayGain tag was used
    pub with_tags_db: f64,

    /// dB applied when the track carries no usable ReplayGain tag
    pub without_tags_db: f64,
}

impl PreAmp {
    /// Create a pre-amp pair, clamped to the supported range
    pub fn new(with_tags_db: f64, without_tags_db: f64) -> Self {
        Self {
            with_tags_db: clamp_preamp(with_tags_db),
            without_tags_db: clamp_preamp(without_tags_db),
        }
    }
}

fn clamp_preamp(db: f64) -> f64 {
    if db.is_finite() {
        db.clamp(MIN_PREAMP_DB, MAX_PREAMP_DB)
    } else {
        0.0
    }
}

/// Gain configuration
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GainConfig {
    /// Base gain selection mode
    #[serde(default)]
    pub mode: GainMode,

    /// Pre-amp pair
    #[serde(default)]
    pub pre_amp: PreAmp,

    /// Limit the gain so the tagged peak never exceeds full scale
    #[serde(default)]
    pub prevent_clipping: bool,
}

impl GainConfig {
    /// Create a configuration without clipping prevention
    pub fn new(mode: GainMode, pre_amp: PreAmp) -> Self {
        Self {
            mode,
            pre_amp,
            prevent_clipping: false,
        }
    }

    /// Enable or disable peak-based clipping prevention
    pub fn with_prevent_clipping(mut self, prevent: bool) -> Self {
        self.prevent_clipping = prevent;
        self
    }
}

/// Tag family the effective gain was derived from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GainSource {
    /// Track gain tag
    Track,
    /// Album gain tag
    Album,
    /// No usable tag; only the "without tags" pre-amp applies
    Untagged,
}

/// Resolved output gain for one track
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EffectiveGain {
    /// Gain to apply in dB
    pub gain_db: f64,

    /// Where the base gain came from
    pub source: GainSource,
}

impl EffectiveGain {
    /// Unity gain (no tags, no pre-amp)
    pub const UNITY: Self = Self {
        gain_db: 0.0,
        source: GainSource::Untagged,
    };

    /// Whether a tag-derived gain was used
    pub fn tags_present(&self) -> bool {
        self.source != GainSource::Untagged
    }

    /// Convert gain to linear multiplier
    pub fn linear(&self) -> f64 {
        10.0_f64.powf(self.gain_db / 20.0)
    }
}

/// Resolve the effective gain for a track
///
/// # Arguments
/// * `tags` - ReplayGain tags of the track
/// * `config` - Mode and pre-amp
/// * `album_context` - Whether the track is playing inside an album context
///   (only consulted in [`GainMode::Dynamic`])
pub fn resolve(tags: &ReplayGainTags, config: &GainConfig, album_context: bool) -> EffectiveGain {
    let prefer_album = match config.mode {
        GainMode::Track => false,
        GainMode::Album => true,
        GainMode::Dynamic => album_context,
    };

    let track = tags.track_gain_db().map(|g| (g, GainSource::Track));
    let album = tags.album_gain_db().map(|g| (g, GainSource::Album));

    let base = if prefer_album {
        album.or(track)
    } else {
        track.or(album)
    };

    let Some((base_db, source)) = base else {
        return EffectiveGain {
            gain_db: clamp_preamp(config.pre_amp.without_tags_db),
            source: GainSource::Untagged,
        };
    };

    let mut gain_db = base_db + clamp_preamp(config.pre_amp.with_tags_db);

    if config.prevent_clipping {
        let peak = match source {
            GainSource::Album => tags.album_peak_linear(),
            _ => tags.track_peak_linear(),
        };
        if let Some(peak) = peak {
            // Headroom above the peak before it reaches 0 dBFS
            let max_gain = -20.0 * peak.log10();
            gain_db = gain_db.min(max_gain);
        }
    }

    EffectiveGain { gain_db, source }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(track: Option<f64>, album: Option<f64>) -> ReplayGainTags {
        ReplayGainTags {
            track_gain: track,
            album_gain: album,
            ..ReplayGainTags::default()
        }
    }

    fn config(mode: GainMode) -> GainConfig {
        GainConfig::new(mode, PreAmp::new(2.0, 0.0))
    }

    #[test]
    fn test_track_mode_uses_track_gain() {
        let gain = resolve(&tags(Some(-3.0), Some(-1.0)), &config(GainMode::Track), false);
        assert!((gain.gain_db - (-1.0)).abs() < 1e-9);
        assert_eq!(gain.source, GainSource::Track);
    }

    #[test]
    fn test_album_mode_uses_album_gain() {
        let gain = resolve(&tags(Some(-3.0), Some(-1.0)), &config(GainMode::Album), false);
        assert!((gain.gain_db - 1.0).abs() < 1e-9);
        assert_eq!(gain.source, GainSource::Album);
    }

    #[test]
    fn test_track_mode_falls_back_to_album() {
        let gain = resolve(&tags(None, Some(-1.0)), &config(GainMode::Track), false);
        assert!((gain.gain_db - 1.0).abs() < 1e-9);
        assert_eq!(gain.source, GainSource::Album);
    }

    #[test]
    fn test_album_mode_falls_back_to_track() {
        let gain = resolve(&tags(Some(-4.0), None), &config(GainMode::Album), false);
        assert!((gain.gain_db - (-2.0)).abs() < 1e-9);
        assert_eq!(gain.source, GainSource::Track);
    }

    #[test]
    fn test_untagged_uses_without_preamp() {
        let cfg = GainConfig::new(GainMode::Track, PreAmp::new(2.0, -6.0));
        let gain = resolve(&tags(None, None), &cfg, false);
        assert!((gain.gain_db - (-6.0)).abs() < 1e-9);
        assert!(!gain.tags_present());
    }

    #[test]
    fn test_dynamic_mode_follows_album_context() {
        let t = tags(Some(-3.0), Some(-1.0));
        let cfg = config(GainMode::Dynamic);

        let in_album = resolve(&t, &cfg, true);
        assert_eq!(in_album.source, GainSource::Album);

        let loose = resolve(&t, &cfg, false);
        assert_eq!(loose.source, GainSource::Track);
    }

    #[test]
    fn test_nan_gain_treated_as_absent() {
        let gain = resolve(&tags(Some(f64::NAN), Some(-1.0)), &config(GainMode::Track), false);
        assert_eq!(gain.source, GainSource::Album);
        assert!(gain.gain_db.is_finite());
    }

    #[test]
    fn test_preamp_is_clamped() {
        let pre = PreAmp::new(40.0, f64::NAN);
        assert_eq!(pre.with_tags_db, MAX_PREAMP_DB);
        assert_eq!(pre.without_tags_db, 0.0);
    }

    #[test]
    fn test_prevent_clipping_limits_to_peak() {
        let t = ReplayGainTags {
            track_gain: Some(6.0),
            track_peak: Some(0.5), // ~ -6.02 dBFS
            ..ReplayGainTags::default()
        };
        let cfg =
            GainConfig::new(GainMode::Track, PreAmp::new(2.0, 0.0)).with_prevent_clipping(true);

        let gain = resolve(&t, &cfg, false);
        assert!((gain.gain_db - 6.0206).abs() < 0.001);

        let unlimited = resolve(&t, &config(GainMode::Track), false);
        assert!((unlimited.gain_db - 8.0).abs() < 1e-9);
    }

    #[test]
    fn test_linear_gain_conversion() {
        let gain = EffectiveGain {
            gain_db: -6.0,
            source: GainSource::Track,
        };
        assert!((gain.linear() - 0.5).abs() < 0.01);
        assert!((EffectiveGain::UNITY.linear() - 1.0).abs() < 1e-12);
    }
}
