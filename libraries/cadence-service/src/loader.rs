//! Background Track Loader
//!
//! Opening a track involves disk I/O and can take 5-100+ms. The engine
//! thread must never wait for it, so loads run on a dedicated thread and
//! results are polled.
//!
//! ## Architecture
//!
//! ```text
//! Engine Thread                  Track Loader Thread
//!        │                              │
//!        │  request_load(ticket, track) │
//!        │─────────────────────────────>│
//!        │                              │ TrackOpener::open()
//!        │                              │ (disk I/O, 5-100ms)
//!        │                              │
//!        │  poll_ready() -> Some(res)   │
//!        │<─────────────────────────────│
//!        │                              │
//! ```
//!
//! Only the newest request matters: queueing a load discards requests that
//! are still waiting, so rapid skips never back up behind stale tracks.

use crate::error::{Result, ServiceError};
use cadence_playback::{LoadTicket, Track};
use crossbeam_channel::{bounded, unbounded, Receiver, Sender, TryRecvError, TrySendError};
use lofty::AudioFile;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// What the loader learned about an opened track
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenedTrack {
    /// Decoded duration (zero if unknown)
    pub duration: Duration,
}

/// Opens tracks for playback
pub trait TrackOpener: Send + 'static {
    /// Open `track`, returning an error message on failure
    fn open(&self, track: &Track) -> std::result::Result<OpenedTrack, String>;
}

/// Opens tracks from disk by reading them with lofty
#[derive(Debug, Clone, Copy, Default)]
pub struct FileOpener;

impl TrackOpener for FileOpener {
    fn open(&self, track: &Track) -> std::result::Result<OpenedTrack, String> {
        if !track.path.exists() {
            return Err(format!("file not found: {}", track.path.display()));
        }

        let tagged_file = lofty::read_from_path(&track.path).map_err(|e| e.to_string())?;
        Ok(OpenedTrack {
            duration: tagged_file.properties().duration(),
        })
    }
}

/// Request to load a track
#[derive(Debug, Clone)]
pub struct LoadRequest {
    /// Ticket the result will carry
    pub ticket: LoadTicket,
    /// Track to open
    pub track: Track,
}

/// Result of loading a track
#[derive(Debug, Clone)]
pub struct LoadResult {
    /// Ticket of the request
    pub ticket: LoadTicket,
    /// ID of the track that was loaded
    pub track_id: String,
    /// Opened track or error message
    pub outcome: std::result::Result<OpenedTrack, String>,
}

/// Background track loader
pub struct TrackLoader {
    /// Channel to send load requests (dropped on shutdown)
    request_tx: Option<Sender<LoadRequest>>,
    /// Sender-side view of the request queue, used to discard stale requests
    stale_rx: Receiver<LoadRequest>,
    /// Channel to receive load results
    result_rx: Receiver<LoadResult>,
    /// Handle to the loader thread
    thread_handle: Option<JoinHandle<()>>,
}

impl TrackLoader {
    /// Create a new track loader with a background thread
    ///
    /// `queue_depth` bounds the request channel. Waiting requests are
    /// superseded by newer ones, so the queue never fills up.
    pub fn new(opener: Box<dyn TrackOpener>, queue_depth: usize) -> Result<Self> {
        let (request_tx, request_rx) = bounded::<LoadRequest>(queue_depth.max(1));
        let (result_tx, result_rx) = unbounded::<LoadResult>();
        let stale_rx = request_rx.clone();

        let thread_handle = thread::Builder::new()
            .name("cadence-track-loader".to_string())
            .spawn(move || Self::loader_thread(opener, request_rx, result_tx))
            .map_err(|source| ServiceError::Spawn {
                name: "track loader".to_string(),
                source,
            })?;

        Ok(Self {
            request_tx: Some(request_tx),
            stale_rx,
            result_rx,
            thread_handle: Some(thread_handle),
        })
    }

    /// Request loading a track (non-blocking)
    ///
    /// Requests still waiting for the loader are dropped first; their results
    /// would be stale anyway. Returns false only if the loader has shut down.
    pub fn request_load(&self, request: LoadRequest) -> bool {
        let Some(request_tx) = &self.request_tx else {
            return false;
        };

        for stale in self.stale_rx.try_iter() {
            tracing::debug!(track_id = %stale.track.id, "Superseded load request dropped");
        }

        match request_tx.try_send(request) {
            Ok(()) => true,
            Err(TrySendError::Full(request)) => {
                // Only the engine thread sends, and it just emptied the queue
                tracing::error!(track_id = %request.track.id, "Load request queue still full");
                false
            }
            Err(TrySendError::Disconnected(_)) => {
                tracing::warn!("Load request channel disconnected");
                false
            }
        }
    }

    /// Poll for a ready load result (non-blocking)
    pub fn poll_ready(&self) -> Option<LoadResult> {
        match self.result_rx.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                tracing::debug!("Load result channel disconnected");
                None
            }
        }
    }

    /// Stop the loader thread after it finishes the queued requests
    pub fn shutdown(&mut self) {
        self.request_tx.take();
        if let Some(handle) = self.thread_handle.take() {
            if handle.join().is_err() {
                tracing::warn!("Track loader thread panicked");
            }
        }
    }

    /// Background thread that handles load requests
    fn loader_thread(
        opener: Box<dyn TrackOpener>,
        request_rx: Receiver<LoadRequest>,
        result_tx: Sender<LoadResult>,
    ) {
        tracing::debug!("Track loader started");

        for request in request_rx.iter() {
            let start = Instant::now();
            let outcome = opener.open(&request.track);

            match &outcome {
                Ok(opened) => tracing::debug!(
                    track_id = %request.track.id,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    duration_ms = opened.duration.as_millis() as u64,
                    "Loaded track"
                ),
                Err(e) => {
                    tracing::warn!(track_id = %request.track.id, error = %e, "Failed to load track");
                }
            }

            let result = LoadResult {
                ticket: request.ticket,
                track_id: request.track.id,
                outcome,
            };
            if result_tx.send(result).is_err() {
                tracing::debug!("Load result channel closed");
                break;
            }
        }

        tracing::debug!("Track loader exiting");
    }
}

impl Drop for TrackLoader {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    struct FixedOpener(std::result::Result<OpenedTrack, String>);

    impl TrackOpener for FixedOpener {
        fn open(&self, _track: &Track) -> std::result::Result<OpenedTrack, String> {
            self.0.clone()
        }
    }

    fn track(path: &str) -> Track {
        Track {
            id: path.to_string(),
            path: PathBuf::from(path),
            title: "Test Track".to_string(),
            artist: "Test Artist".to_string(),
            album: None,
            artist_id: None,
            album_id: None,
            duration: Duration::from_secs(1),
            replay_gain: Default::default(),
        }
    }

    fn ticket(sequence: u64) -> LoadTicket {
        LoadTicket {
            generation: 1,
            sequence,
        }
    }

    fn wait_for(loader: &TrackLoader) -> LoadResult {
        for _ in 0..200 {
            if let Some(result) = loader.poll_ready() {
                return result;
            }
            thread::sleep(Duration::from_millis(5));
        }
        panic!("loader produced no result");
    }

    #[test]
    fn test_track_loader_loads_track() {
        let opened = OpenedTrack {
            duration: Duration::from_millis(1500),
        };
        let loader = TrackLoader::new(Box::new(FixedOpener(Ok(opened))), 4).unwrap();

        assert!(loader.request_load(LoadRequest {
            ticket: ticket(7),
            track: track("/music/a.flac"),
        }));

        let result = wait_for(&loader);
        assert_eq!(result.ticket, ticket(7));
        assert_eq!(result.outcome, Ok(opened));
    }

    #[test]
    fn test_track_loader_handles_missing_file() {
        let loader = TrackLoader::new(Box::new(FileOpener), 4).unwrap();

        assert!(loader.request_load(LoadRequest {
            ticket: ticket(1),
            track: track("/nonexistent/file.wav"),
        }));

        let result = wait_for(&loader);
        assert!(result.outcome.is_err());
        assert_eq!(result.track_id, "/nonexistent/file.wav");
    }

    #[test]
    fn test_track_loader_non_blocking() {
        let loader = TrackLoader::new(Box::new(FileOpener), 4).unwrap();

        let start = Instant::now();
        let result = loader.poll_ready();
        let duration = start.elapsed();

        assert!(result.is_none());
        assert!(
            duration.as_millis() < 5,
            "poll_ready should be non-blocking, took {}ms",
            duration.as_millis()
        );
    }

    /// Blocks until released, then reports every track as loaded
    struct GatedOpener(Receiver<()>);

    impl TrackOpener for GatedOpener {
        fn open(&self, _track: &Track) -> std::result::Result<OpenedTrack, String> {
            let _ = self.0.recv_timeout(Duration::from_secs(2));
            Ok(OpenedTrack {
                duration: Duration::from_secs(1),
            })
        }
    }

    #[test]
    fn test_newer_requests_supersede_waiting_ones() {
        let (release_tx, release_rx) = unbounded();
        let loader = TrackLoader::new(Box::new(GatedOpener(release_rx)), 2).unwrap();

        // The first request occupies the loader thread
        assert!(loader.request_load(LoadRequest {
            ticket: ticket(1),
            track: track("/music/1.flac"),
        }));
        thread::sleep(Duration::from_millis(50));

        // Far more requests than the queue holds; none is rejected
        for sequence in 2..=10 {
            assert!(loader.request_load(LoadRequest {
                ticket: ticket(sequence),
                track: track(&format!("/music/{}.flac", sequence)),
            }));
        }

        release_tx.send(()).unwrap();
        release_tx.send(()).unwrap();

        assert_eq!(wait_for(&loader).ticket, ticket(1));
        assert_eq!(wait_for(&loader).ticket, ticket(10));
        thread::sleep(Duration::from_millis(50));
        assert!(loader.poll_ready().is_none());
    }

    #[test]
    fn test_requests_rejected_after_shutdown() {
        let mut loader = TrackLoader::new(Box::new(FileOpener), 1).unwrap();
        loader.shutdown();

        assert!(!loader.request_load(LoadRequest {
            ticket: ticket(1),
            track: track("/music/a.flac"),
        }));
    }
}
