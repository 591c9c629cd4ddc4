//! Session persistence integration tests
//!
//! Saves manager state to disk, restores it into a fresh manager and checks
//! the queue, permutation, cursor and settings survive.

use cadence_playback::{
    GainConfig, GainMode, Notification, NullBackend, PlaybackConfig, PlaybackEvent,
    PlaybackStateManager, PlayerState, PreAmp, RepeatMode, SessionState, SessionStore, Track,
    SESSION_VERSION,
};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

fn create_test_track(id: &str) -> Track {
    Track {
        id: id.to_string(),
        path: PathBuf::from(format!("/music/{}.flac", id)),
        title: format!("Track {}", id),
        artist: "Test Artist".to_string(),
        album: None,
        artist_id: None,
        album_id: None,
        duration: Duration::from_secs(300),
        replay_gain: Default::default(),
    }
}

fn library(ids: &[&str]) -> HashMap<String, Track> {
    ids.iter()
        .map(|id| (id.to_string(), create_test_track(id)))
        .collect()
}

fn manager() -> PlaybackStateManager {
    let config = PlaybackConfig {
        shuffle_seed: Some(99),
        ..PlaybackConfig::default()
    };
    PlaybackStateManager::new(config, Box::new(NullBackend::default()))
}

fn order(manager: &PlaybackStateManager) -> Vec<String> {
    manager.queue().iter().map(|t| t.id.clone()).collect()
}

#[test]
fn test_save_and_restore_round_trip() {
    let dir = TempDir::new().unwrap();
    let store = SessionStore::new(dir.path().join("session.json"));
    let lib = library(&["a", "b", "c", "d", "e"]);

    let mut original = manager();
    let tracks: Vec<Track> = ["a", "b", "c", "d", "e"]
        .iter()
        .map(|id| lib[*id].clone())
        .collect();
    original.play(tracks, 2);
    original.set_shuffled(true);
    original.next();
    original.set_repeat_mode(RepeatMode::All);
    original.set_gain_config(GainConfig::new(GainMode::Album, PreAmp::new(3.0, -2.0)));
    original.poll_backend();
    original.seek_to(42_000);

    store.save(&original.session()).unwrap();

    let loaded = store.load().unwrap().unwrap();
    assert_eq!(loaded, original.session());

    let mut restored = manager();
    restored.restore_session(&loaded, &lib);

    assert_eq!(order(&restored), order(&original));
    assert_eq!(restored.queue().position(), original.queue().position());
    assert_eq!(
        restored.queue().shuffle_order(),
        original.queue().shuffle_order()
    );
    assert_eq!(restored.repeat_mode(), RepeatMode::All);
    assert_eq!(restored.gain_config(), original.gain_config());
    assert_eq!(restored.state(), PlayerState::Stopped);

    restored.poll_backend();
    assert_eq!(restored.position_ms(), 42_000);
}

#[test]
fn test_missing_file_is_not_an_error() {
    let dir = TempDir::new().unwrap();
    let store = SessionStore::new(dir.path().join("nothing-here.json"));

    assert!(store.load().unwrap().is_none());
    assert_eq!(store.load_or_default(), SessionState::default());
}

#[test]
fn test_corrupt_file_restores_empty_stopped_session() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("session.json");
    std::fs::write(&path, b"{ \"items\": [\"a\", ").unwrap();
    let store = SessionStore::new(&path);

    assert!(store.load().is_err());
    let state = store.load_or_default();

    let mut manager = manager();
    manager.play(vec![create_test_track("z")], 0);
    manager.restore_session(&state, &library(&["a"]));

    assert!(manager.queue().is_empty());
    assert_eq!(manager.state(), PlayerState::Stopped);
}

#[test]
fn test_inconsistent_session_falls_back_to_empty() {
    let state = SessionState {
        items: vec!["a".to_string(), "b".to_string()],
        shuffled: Some(vec![1, 1]),
        cursor: Some(0),
        ..SessionState::default()
    };

    let mut manager = manager();
    manager.restore_session(&state, &library(&["a", "b"]));
    assert!(manager.queue().is_empty());
}

#[test]
fn test_unknown_ids_are_dropped() {
    let state = SessionState {
        items: vec!["a".to_string(), "gone".to_string(), "c".to_string()],
        cursor: Some(1),
        position_ms: 10_000,
        ..SessionState::default()
    };

    let mut manager = manager();
    manager.restore_session(&state, &library(&["a", "c"]));

    assert_eq!(order(&manager), vec!["a", "c"]);
    assert_eq!(manager.current_track().unwrap().id, "c");

    // Position belonged to the dropped track
    manager.poll_backend();
    assert_eq!(manager.position_ms(), 0);
}

#[test]
fn test_restore_notifies_new_playback() {
    let state = SessionState {
        items: vec!["a".to_string()],
        cursor: Some(0),
        repeat: RepeatMode::One,
        ..SessionState::default()
    };

    let mut manager = manager();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    manager.add_listener(Arc::new(move |n: &Notification| {
        sink.lock().unwrap().push(n.event.clone());
    }));

    manager.restore_session(&state, &library(&["a"]));

    let seen = seen.lock().unwrap();
    assert!(seen.contains(&PlaybackEvent::NewPlayback { generation: 1 }));
    assert!(seen.contains(&PlaybackEvent::RepeatChanged(RepeatMode::One)));
}

#[test]
fn test_saved_file_is_plain_json() {
    let dir = TempDir::new().unwrap();
    let store = SessionStore::new(dir.path().join("nested").join("session.json"));

    let mut manager = manager();
    manager.play(vec![create_test_track("a"), create_test_track("b")], 1);
    store.save(&manager.session()).unwrap();

    let raw = std::fs::read_to_string(store.path()).unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(value["version"], SESSION_VERSION);
    assert_eq!(value["items"], serde_json::json!(["a", "b"]));
    assert_eq!(value["cursor"], 1);
    assert!(!dir.path().join("nested").join("session.json.tmp").exists());
}
