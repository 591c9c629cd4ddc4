//! Text rendering of engine state and events

use cadence_playback::{
    repeat_mode_icon, Notification, PlaybackEvent, PlaybackSnapshot, PlayerState, RepeatMode,
};

/// Format milliseconds as m:ss
pub fn format_time(ms: u64) -> String {
    let secs = ms / 1000;
    format!("{}:{:02}", secs / 60, secs % 60)
}

fn state_label(state: PlayerState) -> &'static str {
    match state {
        PlayerState::Stopped => "stopped",
        PlayerState::Playing => "playing",
        PlayerState::Paused => "paused",
    }
}

fn repeat_label(mode: RepeatMode) -> &'static str {
    match mode {
        RepeatMode::Off => "off",
        RepeatMode::All => "all",
        RepeatMode::One => "one",
    }
}

/// One-line now-playing summary
pub fn format_status(snapshot: &PlaybackSnapshot) -> String {
    let Some(track) = snapshot.current_track() else {
        return "[stopped] queue empty".to_string();
    };

    let duration_ms = u64::try_from(track.duration.as_millis()).unwrap_or(u64::MAX);
    format!(
        "[{}] {} - {} ({} / {}) #{}/{} repeat:{} ({}) shuffle:{} gain:{:+.2} dB",
        state_label(snapshot.state),
        track.artist,
        track.title,
        format_time(snapshot.position_ms),
        format_time(duration_ms),
        snapshot.position.map_or(0, |p| p + 1),
        snapshot.queue_len(),
        repeat_label(snapshot.repeat),
        repeat_mode_icon(snapshot.repeat),
        if snapshot.shuffled { "on" } else { "off" },
        snapshot.gain.gain_db,
    )
}

/// Queue listing in play order, marking the current entry
pub fn format_queue(snapshot: &PlaybackSnapshot) -> String {
    if snapshot.tracks.is_empty() {
        return "queue empty".to_string();
    }

    snapshot
        .tracks
        .iter()
        .enumerate()
        .map(|(i, track)| {
            let marker = if Some(i) == snapshot.position { ">" } else { " " };
            format!("{} {:>3}. {} - {}", marker, i, track.artist, track.title)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Line printed for an engine event, if it is worth showing
pub fn format_event(notification: &Notification) -> Option<String> {
    let snapshot = &notification.snapshot;
    match &notification.event {
        PlaybackEvent::IndexMoved {
            track_id: Some(_), ..
        } => snapshot
            .current_track()
            .map(|t| format!("now playing: {} - {}", t.artist, t.title)),
        PlaybackEvent::StateChanged(state) => Some(format!("state: {}", state_label(*state))),
        PlaybackEvent::RepeatChanged(mode) => Some(format!("repeat: {}", repeat_label(*mode))),
        PlaybackEvent::ShuffleChanged(on) => {
            Some(format!("shuffle: {}", if *on { "on" } else { "off" }))
        }
        PlaybackEvent::TrackLoadFailed { track_id, message } => {
            Some(format!("cannot play {}: {}", track_id, message))
        }
        _ => None,
    }
}
