//! Service configuration

use crate::error::{Result, ServiceError};
use cadence_loudness::{GainConfig, GainMode, PreAmp, MAX_PREAMP_DB, MIN_PREAMP_DB};
use cadence_playback::{PlaybackConfig, RepeatMode};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ServiceConfig {
    #[serde(default)]
    pub playback: PlaybackSettings,

    #[serde(default)]
    pub engine: EngineSettings,

    #[serde(default)]
    pub session: SessionSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlaybackSettings {
    #[serde(default)]
    pub repeat: RepeatMode,

    #[serde(default)]
    pub gain_mode: GainMode,

    /// Pre-amp in dB for tracks with ReplayGain tags
    #[serde(default)]
    pub pre_amp_db: f64,

    /// Pre-amp in dB for tracks without ReplayGain tags
    #[serde(default)]
    pub untagged_pre_amp_db: f64,

    #[serde(default)]
    pub prevent_clipping: bool,

    /// "Previous" restarts the current track after this many ms (0 = never)
    #[serde(default = "default_previous_restart_ms")]
    pub previous_restart_ms: u64,

    #[serde(default)]
    pub shuffle_seed: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineSettings {
    /// Engine loop wake-up interval
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,

    /// Capacity of the load request channel
    #[serde(default = "default_loader_queue_depth")]
    pub loader_queue_depth: usize,

    /// How long `snapshot()` waits for the engine
    #[serde(default = "default_query_timeout_ms")]
    pub query_timeout_ms: u64,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SessionSettings {
    /// Session file; no persistence when unset
    #[serde(default)]
    pub path: Option<PathBuf>,
}

// Default value functions
fn default_previous_restart_ms() -> u64 {
    3_000
}

fn default_tick_ms() -> u64 {
    20
}

fn default_loader_queue_depth() -> usize {
    4
}

fn default_query_timeout_ms() -> u64 {
    1_000
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            repeat: RepeatMode::Off,
            gain_mode: GainMode::Track,
            pre_amp_db: 0.0,
            untagged_pre_amp_db: 0.0,
            prevent_clipping: false,
            previous_restart_ms: default_previous_restart_ms(),
            shuffle_seed: None,
        }
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            tick_ms: default_tick_ms(),
            loader_queue_depth: default_loader_queue_depth(),
            query_timeout_ms: default_query_timeout_ms(),
        }
    }
}

impl PlaybackSettings {
    /// Gain configuration for the resolver
    pub fn gain_config(&self) -> GainConfig {
        GainConfig::new(
            self.gain_mode,
            PreAmp::new(self.pre_amp_db, self.untagged_pre_amp_db),
        )
        .with_prevent_clipping(self.prevent_clipping)
    }

    /// Manager configuration
    pub fn to_playback_config(&self) -> PlaybackConfig {
        PlaybackConfig {
            repeat: self.repeat,
            gain: self.gain_config(),
            previous_restart_threshold: (self.previous_restart_ms > 0)
                .then_some(Duration::from_millis(self.previous_restart_ms)),
            shuffle_seed: self.shuffle_seed,
        }
    }
}

impl EngineSettings {
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }
}

impl ServiceConfig {
    /// Load configuration from an optional TOML file and the environment
    ///
    /// Environment variables are prefixed with `CADENCE_` and use `__` between
    /// sections, e.g. `CADENCE_PLAYBACK__REPEAT=all`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = config::Config::builder();

        if let Some(path) = path {
            if !path.exists() {
                return Err(ServiceError::Config(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
            settings = settings.add_source(config::File::from(path));
        }

        settings = settings.add_source(
            config::Environment::with_prefix("CADENCE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: Self = settings.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("pre_amp_db", self.playback.pre_amp_db),
            ("untagged_pre_amp_db", self.playback.untagged_pre_amp_db),
        ] {
            if !value.is_finite() || !(MIN_PREAMP_DB..=MAX_PREAMP_DB).contains(&value) {
                return Err(ServiceError::Config(format!(
                    "{} must be between {} and {} dB, got {}",
                    name, MIN_PREAMP_DB, MAX_PREAMP_DB, value
                )));
            }
        }

        if self.engine.tick_ms == 0 {
            return Err(ServiceError::Config(
                "engine.tick_ms must be greater than 0".to_string(),
            ));
        }

        if self.engine.loader_queue_depth == 0 {
            return Err(ServiceError::Config(
                "engine.loader_queue_depth must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let config = ServiceConfig::default();
        assert!(config.validate().is_ok());

        let playback = config.playback.to_playback_config();
        assert_eq!(
            playback.previous_restart_threshold,
            Some(Duration::from_secs(3))
        );
        assert_eq!(playback.repeat, RepeatMode::Off);
    }

    #[test]
    fn zero_restart_disables_threshold() {
        let settings = PlaybackSettings {
            previous_restart_ms: 0,
            ..PlaybackSettings::default()
        };
        assert!(settings.to_playback_config().previous_restart_threshold.is_none());
    }

    #[test]
    fn load_from_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[playback]
repeat = "all"
gain_mode = "album"
pre_amp_db = 4.5
prevent_clipping = true

[engine]
loader_queue_depth = 8

[session]
path = "/tmp/cadence-session.json"
"#
        )
        .unwrap();

        let config = ServiceConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.playback.repeat, RepeatMode::All);
        assert_eq!(config.playback.gain_mode, GainMode::Album);
        assert!(config.playback.gain_config().prevent_clipping);
        assert_eq!(config.engine.loader_queue_depth, 8);
        assert_eq!(config.engine.tick_ms, 20);
        assert_eq!(
            config.session.path,
            Some(PathBuf::from("/tmp/cadence-session.json"))
        );
    }

    #[test]
    fn out_of_range_pre_amp_is_rejected() {
        let mut config = ServiceConfig::default();
        config.playback.pre_amp_db = 40.0;
        assert!(matches!(config.validate(), Err(ServiceError::Config(_))));
    }

    #[test]
    fn missing_file_is_an_error() {
        let result = ServiceConfig::load(Some(Path::new("/nonexistent/cadence.toml")));
        assert!(matches!(result, Err(ServiceError::Config(_))));
    }
}
