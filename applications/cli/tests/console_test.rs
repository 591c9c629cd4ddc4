//! Console integration tests
//!
//! Feeds console lines through the parser into a running playback service.

use cadence_cli::console::{execute, parse_line, Flow};
use cadence_playback::{GainMode, NullBackend, PlayerState, RepeatMode, Track};
use cadence_service::{PlaybackHandle, PlaybackService, ServiceConfig};
use std::path::PathBuf;
use std::time::Duration;

fn create_track(id: &str) -> Track {
    Track {
        id: id.to_string(),
        path: PathBuf::from(format!("/music/{}.flac", id)),
        title: format!("Song {}", id),
        artist: "Band".to_string(),
        album: None,
        artist_id: None,
        album_id: None,
        duration: Duration::from_secs(200),
        replay_gain: Default::default(),
    }
}

fn run(handle: &PlaybackHandle, line: &str) -> Flow {
    let command = parse_line(line).unwrap().unwrap();
    execute(handle, command).unwrap()
}

fn start() -> PlaybackService {
    PlaybackService::start(ServiceConfig::default(), Box::new(NullBackend::default())).unwrap()
}

#[test]
fn test_transport_commands() {
    let service = start();
    let handle = service.handle();
    handle
        .play(vec![create_track("a"), create_track("b"), create_track("c")], 0)
        .unwrap();

    assert_eq!(run(&handle, "next"), Flow::Continue);
    assert_eq!(run(&handle, "p"), Flow::Continue);

    let snapshot = handle.snapshot().unwrap();
    assert_eq!(snapshot.current_track().unwrap().id, "b");
    assert_eq!(snapshot.state, PlayerState::Paused);

    run(&handle, "seek 30");
    assert_eq!(handle.snapshot().unwrap().position_ms, 30_000);

    run(&handle, "stop");
    assert_eq!(handle.snapshot().unwrap().state, PlayerState::Stopped);
}

#[test]
fn test_mode_commands() {
    let service = start();
    let handle = service.handle();
    handle
        .play(vec![create_track("a"), create_track("b")], 0)
        .unwrap();

    run(&handle, "repeat");
    run(&handle, "repeat");
    assert_eq!(handle.snapshot().unwrap().repeat, RepeatMode::One);

    run(&handle, "shuffle");
    assert!(handle.snapshot().unwrap().shuffled);
    run(&handle, "shuffle");
    assert!(!handle.snapshot().unwrap().shuffled);

    run(&handle, "gain album 3");
    let gain = handle.session().unwrap().gain;
    assert_eq!(gain.mode, GainMode::Album);
    assert_eq!(gain.pre_amp.with_tags_db, 3.0);
}

#[test]
fn test_queue_commands() {
    let service = start();
    let handle = service.handle();
    handle
        .play(vec![create_track("a"), create_track("b"), create_track("c")], 0)
        .unwrap();

    run(&handle, "move 2 0");
    run(&handle, "remove 1");

    match run(&handle, "queue") {
        Flow::Print(listing) => {
            assert!(listing.contains("Song c"));
            assert!(!listing.contains("Song a"));
        }
        other => panic!("expected a listing, got {:?}", other),
    }

    run(&handle, "clear");
    match run(&handle, "status") {
        Flow::Print(status) => assert_eq!(status, "[stopped] queue empty"),
        other => panic!("expected a status line, got {:?}", other),
    }

    assert_eq!(run(&handle, "quit"), Flow::Quit);
}
