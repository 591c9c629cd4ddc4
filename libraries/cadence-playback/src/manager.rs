//! Playback state manager - core orchestration
//!
//! Owns the queue and the internal player, applies intents to them one at a
//! time and notifies listeners after every committed mutation. The manager is
//! single-threaded; hosting it on a thread and serializing intents is the
//! job of the service layer.

use crate::{
    error::{PlaybackError, Result},
    events::{ListenerId, ListenerRegistry, Notification, PlaybackEvent, PlaybackListener},
    player::{BackendEvent, InternalPlayer, PlayerBackend},
    queue::Queue,
    session::{rebuild_queue, SessionState, TrackLookup},
    snapshot::PlaybackSnapshot,
    types::{next_repeat_mode, LoadTicket, PlaybackConfig, PlayerState, RepeatMode, Track},
};
use cadence_loudness::{resolve, EffectiveGain, GainConfig};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Playback state manager
///
/// Composes the Stopped/Playing/Paused state machine with the queue cursor.
/// Every public mutation either changes nothing and notifies nobody, or
/// commits completely and then notifies in a fixed order (see
/// [`PlaybackEvent`]).
pub struct PlaybackStateManager {
    queue: Queue,
    player: InternalPlayer,

    // Settings
    gain_config: GainConfig,
    previous_restart_threshold: Option<Duration>,

    // Derived state
    gain: EffectiveGain,

    // Load bookkeeping
    generation: u64,
    sequence: u64,
    consecutive_failures: usize,
    pending_seek_ms: Option<u64>,

    // Shuffle seeds
    rng: StdRng,

    // Notification
    listeners: ListenerRegistry,
    pending_events: Vec<PlaybackEvent>,
}

impl PlaybackStateManager {
    /// Create a manager over a platform backend
    pub fn new(config: PlaybackConfig, backend: Box<dyn PlayerBackend>) -> Self {
        let rng = match config.shuffle_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut queue = Queue::new();
        queue.set_repeat(config.repeat);

        Self {
            queue,
            player: InternalPlayer::new(backend),
            gain_config: config.gain,
            previous_restart_threshold: config.previous_restart_threshold,
            gain: EffectiveGain::UNITY,
            generation: 0,
            sequence: 0,
            consecutive_failures: 0,
            pending_seek_ms: None,
            rng,
            listeners: ListenerRegistry::new(),
            pending_events: Vec::new(),
        }
    }

    // ===== Playback replacement =====

    /// Replace the queue with `items` and start playing at `start_at`
    ///
    /// `start_at` is clamped to the queue. Empty input is a no-op.
    pub fn play(&mut self, items: Vec<Track>, start_at: usize) {
        if items.is_empty() {
            return;
        }

        let before = self.player.state();
        let was_shuffled = self.queue.is_shuffled();

        self.queue.set_items(items, start_at);
        self.begin_playback();
        if was_shuffled {
            self.pending_events.push(PlaybackEvent::ShuffleChanged(false));
        }

        self.load_current();
        self.player.play();
        self.note_state(before);
        self.flush();
    }

    /// Replace the queue with `items` in shuffled order and start playing
    ///
    /// Empty input is a no-op.
    pub fn shuffle(&mut self, items: Vec<Track>) {
        if items.is_empty() {
            return;
        }

        let before = self.player.state();
        let was_shuffled = self.queue.is_shuffled();

        let start_at = self.rng.gen_range(0..items.len());
        self.queue.set_items(items, start_at);
        let seed = self.rng.gen();
        self.queue.enable_shuffle(seed);
        self.begin_playback();
        if !was_shuffled {
            self.pending_events.push(PlaybackEvent::ShuffleChanged(true));
        }

        self.load_current();
        self.player.play();
        self.note_state(before);
        self.flush();
    }

    /// Insert `items` right after the current track
    ///
    /// On an empty queue this behaves like `play(items, 0)`.
    pub fn play_next(&mut self, items: Vec<Track>) {
        if items.is_empty() {
            return;
        }
        if self.queue.is_empty() {
            self.play(items, 0);
            return;
        }

        let count = items.len();
        self.queue.insert_next(items);
        debug!(count, "Queued tracks to play next");
        self.queue_edited();
    }

    /// Append `items` to the end of the queue
    ///
    /// On an empty queue this behaves like `play(items, 0)`.
    pub fn add_to_queue(&mut self, items: Vec<Track>) {
        if items.is_empty() {
            return;
        }
        if self.queue.is_empty() {
            self.play(items, 0);
            return;
        }

        let count = items.len();
        self.queue.add_to_end(items);
        debug!(count, "Appended tracks to queue");
        self.queue_edited();
    }

    // ===== Navigation =====

    /// Skip to the next track
    ///
    /// At the end of the queue with repeat Off the player stops and the
    /// cursor stays on the last track.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) {
        if self.queue.is_empty() {
            return;
        }

        let before = self.player.state();
        self.consecutive_failures = 0;
        if self.queue.next() {
            self.load_current();
        } else {
            debug!("End of queue reached, stopping");
            self.player.stop();
        }
        self.note_state(before);
        self.flush();
    }

    /// Go to the previous track
    ///
    /// Past the restart threshold this restarts the current track instead.
    /// At the start of the queue with repeat Off the player stops.
    pub fn prev(&mut self) {
        if self.queue.is_empty() {
            return;
        }

        if let Some(threshold) = self.previous_restart_threshold {
            if Duration::from_millis(self.player.position_ms()) > threshold {
                debug!("Restarting current track");
                self.player.seek_to(0);
                self.pending_events.push(PlaybackEvent::Seeked { position_ms: 0 });
                self.flush();
                return;
            }
        }

        let before = self.player.state();
        self.consecutive_failures = 0;
        if self.queue.prev() {
            self.load_current();
        } else {
            debug!("Start of queue reached, stopping");
            self.player.stop();
        }
        self.note_state(before);
        self.flush();
    }

    /// Select the entry at `position` (clamped to the queue)
    pub fn skip_to(&mut self, position: usize) {
        if self.queue.skip_to(position) {
            let before = self.player.state();
            self.consecutive_failures = 0;
            self.load_current();
            self.note_state(before);
            self.flush();
        }
    }

    // ===== Transport =====

    /// Toggle between playing and paused
    ///
    /// Stopped with a current track starts playing; no-op without one.
    pub fn toggle_playing(&mut self) {
        match self.player.state() {
            PlayerState::Playing => self.pause(),
            PlayerState::Paused | PlayerState::Stopped => self.resume(),
        }
    }

    /// Pause playback
    pub fn pause(&mut self) {
        let before = self.player.state();
        self.player.pause();
        self.note_state(before);
        self.flush();
    }

    /// Start or resume playback of the current track
    ///
    /// A track whose load failed is loaded again first.
    pub fn resume(&mut self) {
        if self.queue.current_track().is_none() {
            return;
        }

        let before = self.player.state();
        if self.player.needs_reload() {
            self.consecutive_failures = 0;
            self.reload_current();
        }
        self.player.play();
        self.note_state(before);
        self.flush();
    }

    /// Stop playback, keeping the queue and cursor
    pub fn stop(&mut self) {
        let before = self.player.state();
        self.player.stop();
        self.note_state(before);
        self.flush();
    }

    /// Seek within the current track (clamped to its duration)
    pub fn seek_to(&mut self, position_ms: u64) {
        if self.queue.current_track().is_none() {
            return;
        }

        if self.player.is_ready() {
            let actual = self.player.seek_to(position_ms);
            debug!(position_ms = actual, "Seek");
            self.pending_events.push(PlaybackEvent::Seeked { position_ms: actual });
            self.flush();
        } else {
            self.pending_seek_ms = Some(position_ms);
        }
    }

    // ===== Modes =====

    /// Set repeat mode
    pub fn set_repeat_mode(&mut self, mode: RepeatMode) {
        if self.queue.repeat() == mode {
            return;
        }

        self.queue.set_repeat(mode);
        debug!(?mode, "Repeat mode changed");
        self.pending_events.push(PlaybackEvent::RepeatChanged(mode));
        self.flush();
    }

    /// Advance repeat mode Off -> All -> One -> Off
    pub fn cycle_repeat_mode(&mut self) -> RepeatMode {
        let mode = next_repeat_mode(self.queue.repeat());
        self.set_repeat_mode(mode);
        mode
    }

    /// Turn shuffle on or off, keeping the current track
    pub fn set_shuffled(&mut self, shuffled: bool) {
        if self.queue.is_shuffled() == shuffled || self.queue.is_empty() {
            return;
        }

        if shuffled {
            let seed = self.rng.gen();
            self.queue.enable_shuffle(seed);
        } else {
            self.queue.disable_shuffle();
        }
        debug!(shuffled, "Shuffle changed");

        self.pending_events.push(PlaybackEvent::QueueReordered);
        self.pending_events.push(PlaybackEvent::ShuffleChanged(shuffled));
        self.refresh_gain(false);
        self.flush();
    }

    /// Replace the gain configuration and re-resolve the effective gain
    pub fn set_gain_config(&mut self, config: GainConfig) {
        self.gain_config = config;
        self.refresh_gain(true);
        self.flush();
    }

    // ===== Queue editing =====

    /// Remove the entry at `position`
    ///
    /// Removing the current track moves on to the next one. Removing the
    /// last (current) entry with repeat Off stops on the first entry.
    pub fn remove(&mut self, position: usize) -> Result<Track> {
        let before = self.player.state();
        let removal = self
            .queue
            .remove(position)
            .ok_or(PlaybackError::IndexOutOfBounds(position))?;

        self.pending_events.push(PlaybackEvent::QueueChanged);
        self.pending_events.push(PlaybackEvent::QueueReordered);

        if removal.current_removed {
            if removal.wrapped && self.queue.repeat() == RepeatMode::Off {
                self.player.stop();
            }
            self.load_current();
        } else {
            self.refresh_gain(false);
        }

        self.note_state(before);
        self.flush();
        Ok(removal.track)
    }

    /// Move the entry at `from` to `to`; the current track stays current
    pub fn move_item(&mut self, from: usize, to: usize) -> Result<()> {
        if from == to && from < self.queue.len() {
            return Ok(());
        }

        self.queue.move_item(from, to)?;
        self.pending_events.push(PlaybackEvent::QueueReordered);
        self.refresh_gain(false);
        self.flush();
        Ok(())
    }

    /// Remove every track and stop
    pub fn clear_queue(&mut self) {
        if self.queue.is_empty() {
            return;
        }

        let before = self.player.state();
        let was_shuffled = self.queue.is_shuffled();

        self.queue.clear();
        info!("Queue cleared");
        self.pending_events.push(PlaybackEvent::QueueChanged);
        self.pending_events.push(PlaybackEvent::QueueReordered);
        if was_shuffled {
            self.pending_events.push(PlaybackEvent::ShuffleChanged(false));
        }

        self.load_current();
        self.note_state(before);
        self.flush();
    }

    // ===== Completion and backend results =====

    /// Natural end of the current track
    ///
    /// Repeat One replays the track from the start. Otherwise the next track
    /// plays; at the end of the queue the cursor returns to the first entry
    /// and the player stops.
    pub fn on_track_end(&mut self) {
        if self.queue.current_track().is_none() {
            return;
        }

        let before = self.player.state();
        if self.queue.repeat() == RepeatMode::One {
            self.reload_current();
        } else if self.queue.next() {
            self.load_current();
        } else {
            info!("Playback finished");
            self.player.stop();
            if self.queue.skip_to(0) {
                self.load_current();
            }
        }
        self.note_state(before);
        self.flush();
    }

    /// Apply the outcome of a dispatched load
    ///
    /// Results for any ticket but the one in flight are discarded.
    pub fn on_load_finished(
        &mut self,
        ticket: LoadTicket,
        result: std::result::Result<(), String>,
    ) {
        if self.player.ticket() != Some(ticket) {
            debug!(
                generation = ticket.generation,
                sequence = ticket.sequence,
                "Discarding stale load result"
            );
            return;
        }

        match result {
            Ok(()) => {
                self.consecutive_failures = 0;
                self.player.on_loaded(ticket);
                if let Some(position_ms) = self.pending_seek_ms.take() {
                    let actual = self.player.seek_to(position_ms);
                    self.pending_events.push(PlaybackEvent::Seeked { position_ms: actual });
                    self.flush();
                }
            }
            Err(message) => {
                self.player.on_load_failed(ticket);
                self.handle_load_failure(message);
            }
        }
    }

    /// Drain pending backend events
    ///
    /// Returns the number of events processed.
    pub fn poll_backend(&mut self) -> usize {
        let mut processed = 0;
        while let Some(event) = self.player.poll_event() {
            processed += 1;
            match event {
                BackendEvent::Loaded { ticket } => self.on_load_finished(ticket, Ok(())),
                BackendEvent::LoadFailed { ticket, message } => {
                    self.on_load_finished(ticket, Err(message));
                }
                BackendEvent::Finished { ticket } => {
                    if self.player.ticket() == Some(ticket) {
                        self.on_track_end();
                    } else {
                        debug!(sequence = ticket.sequence, "Discarding stale completion");
                    }
                }
            }
        }
        processed
    }

    // ===== Listeners =====

    /// Register a listener
    pub fn add_listener(&mut self, listener: Arc<dyn PlaybackListener>) -> ListenerId {
        self.listeners.add(listener)
    }

    /// Unregister a listener (idempotent)
    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }

    // ===== State queries =====

    /// Current player state
    pub fn state(&self) -> PlayerState {
        self.player.state()
    }

    /// Currently selected track
    pub fn current_track(&self) -> Option<&Track> {
        self.queue.current_track()
    }

    /// The queue
    pub fn queue(&self) -> &Queue {
        &self.queue
    }

    /// Current repeat mode
    pub fn repeat_mode(&self) -> RepeatMode {
        self.queue.repeat()
    }

    /// Whether shuffle is on
    pub fn is_shuffled(&self) -> bool {
        self.queue.is_shuffled()
    }

    /// Position in the current track, in milliseconds
    pub fn position_ms(&self) -> u64 {
        self.player.position_ms()
    }

    /// Effective gain for the current track
    pub fn gain(&self) -> EffectiveGain {
        self.gain
    }

    /// Gain configuration
    pub fn gain_config(&self) -> GainConfig {
        self.gain_config
    }

    /// Playback generation
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Ticket of the load in flight or completed
    pub fn current_ticket(&self) -> Option<LoadTicket> {
        self.player.ticket()
    }

    /// Immutable view of the committed state
    pub fn snapshot(&self) -> Arc<PlaybackSnapshot> {
        Arc::new(PlaybackSnapshot {
            generation: self.generation,
            tracks: self.queue.iter().cloned().collect(),
            position: self.queue.position(),
            state: self.player.state(),
            position_ms: self.player.position_ms(),
            repeat: self.queue.repeat(),
            shuffled: self.queue.is_shuffled(),
            gain: self.gain,
        })
    }

    // ===== Session =====

    /// State to persist for a later restore
    pub fn session(&self) -> SessionState {
        SessionState {
            items: self.queue.items().iter().map(|t| t.id.clone()).collect(),
            shuffled: self.queue.shuffle_order().map(<[usize]>::to_vec),
            cursor: self.queue.position(),
            repeat: self.queue.repeat(),
            gain: self.gain_config,
            position_ms: self.player.position_ms(),
            ..SessionState::default()
        }
    }

    /// Restore a persisted session, stopped on the saved track
    ///
    /// Unknown track ids are dropped. An inconsistent session falls back to
    /// an empty queue.
    pub fn restore_session<L>(&mut self, state: &SessionState, lookup: &L)
    where
        L: TrackLookup + ?Sized,
    {
        let before = self.player.state();
        let was_shuffled = self.queue.is_shuffled();
        let old_repeat = self.queue.repeat();

        let restored = match rebuild_queue(state, lookup) {
            Ok(restored) => {
                self.gain_config = state.gain;
                Some(restored)
            }
            Err(e) => {
                warn!(error = %e, "Discarding inconsistent session");
                None
            }
        };

        self.player.stop();
        self.pending_seek_ms = None;
        match restored {
            Some(restored) => {
                if restored.current_survived && state.position_ms > 0 {
                    self.pending_seek_ms = Some(state.position_ms);
                }
                self.queue = restored.queue;
            }
            None => {
                self.queue.clear();
            }
        }

        info!(tracks = self.queue.len(), "Session restored");
        self.begin_playback();
        if self.queue.is_shuffled() != was_shuffled {
            self.pending_events
                .push(PlaybackEvent::ShuffleChanged(self.queue.is_shuffled()));
        }
        if self.queue.repeat() != old_repeat {
            self.pending_events
                .push(PlaybackEvent::RepeatChanged(self.queue.repeat()));
        }

        self.load_current();
        self.note_state(before);
        self.flush();
    }

    /// Stop the player and detach every listener
    ///
    /// Returns the session to persist.
    pub fn shutdown(&mut self) -> SessionState {
        let session = self.session();
        let before = self.player.state();

        self.player.stop();
        self.note_state(before);
        self.flush();

        self.listeners.clear();
        info!("Playback manager shut down");
        session
    }

    // ===== Internals =====

    /// Bookkeeping shared by every full playback replacement
    fn begin_playback(&mut self) {
        self.generation += 1;
        self.consecutive_failures = 0;
        info!(
            generation = self.generation,
            tracks = self.queue.len(),
            shuffled = self.queue.is_shuffled(),
            "New playback"
        );

        self.pending_events.push(PlaybackEvent::QueueChanged);
        self.pending_events.push(PlaybackEvent::NewPlayback {
            generation: self.generation,
        });
        self.pending_events.push(PlaybackEvent::QueueReordered);
    }

    /// Notifications for an insertion that kept the current track
    fn queue_edited(&mut self) {
        self.pending_events.push(PlaybackEvent::QueueChanged);
        self.pending_events.push(PlaybackEvent::QueueReordered);
        self.refresh_gain(false);
        self.flush();
    }

    /// Load the track under the cursor (or unload when the queue is empty)
    fn load_current(&mut self) {
        let position = self.queue.position();
        let track_id = match self.queue.current_track() {
            Some(track) => {
                self.sequence += 1;
                let ticket = LoadTicket {
                    generation: self.generation,
                    sequence: self.sequence,
                };
                debug!(track_id = %track.id, sequence = ticket.sequence, "Loading track");
                self.player.load_track(track, ticket);
                Some(track.id.clone())
            }
            None => {
                self.player.unload();
                None
            }
        };

        self.pending_events
            .push(PlaybackEvent::IndexMoved { position, track_id });
        self.refresh_gain(true);
    }

    /// Load the current track again from the start
    fn reload_current(&mut self) {
        if let Some(track) = self.queue.current_track() {
            self.sequence += 1;
            let ticket = LoadTicket {
                generation: self.generation,
                sequence: self.sequence,
            };
            debug!(track_id = %track.id, "Replaying track");
            self.player.load_track(track, ticket);
        }
    }

    /// Re-resolve the effective gain for the current track
    ///
    /// `GainChanged` is emitted when forced or when the value changed.
    fn refresh_gain(&mut self, force: bool) {
        let gain = match self.queue.current_track() {
            Some(track) => resolve(
                &track.replay_gain,
                &self.gain_config,
                self.queue.in_album_context(),
            ),
            None => EffectiveGain::UNITY,
        };

        let changed = gain != self.gain;
        self.gain = gain;
        if changed || force {
            self.player.set_gain_db(gain.gain_db);
            self.pending_events.push(PlaybackEvent::GainChanged(gain.gain_db));
        }
    }

    fn handle_load_failure(&mut self, message: String) {
        let track_id = self
            .queue
            .current_track()
            .map(|t| t.id.clone())
            .unwrap_or_default();
        let error = PlaybackError::LoadFailed {
            track_id: track_id.clone(),
            message: message.clone(),
        };
        warn!(error = %error, "Skipping track");

        let before = self.player.state();
        self.pending_events
            .push(PlaybackEvent::TrackLoadFailed { track_id, message });
        self.consecutive_failures += 1;

        if self.consecutive_failures >= self.queue.len() {
            warn!(
                failures = self.consecutive_failures,
                "No track in the queue could be loaded, stopping"
            );
            self.consecutive_failures = 0;
            self.player.stop();
        } else if self.queue.next() {
            self.load_current();
        } else {
            self.player.stop();
        }

        self.note_state(before);
        self.flush();
    }

    /// Queue `StateChanged` if the player state differs from `before`
    fn note_state(&mut self, before: PlayerState) {
        let after = self.player.state();
        if after != before {
            debug!(?before, ?after, "Player state changed");
            self.pending_events.push(PlaybackEvent::StateChanged(after));
        }
    }

    /// Deliver pending events, in commit order, with one shared snapshot
    fn flush(&mut self) {
        if self.pending_events.is_empty() {
            return;
        }

        let mut events = std::mem::take(&mut self.pending_events);
        events.sort_by_key(PlaybackEvent::rank);

        let snapshot = self.snapshot();
        for event in events {
            self.listeners.dispatch(&Notification {
                event,
                snapshot: Arc::clone(&snapshot),
            });
        }
    }
}

impl std::fmt::Debug for PlaybackStateManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackStateManager")
            .field("generation", &self.generation)
            .field("state", &self.player.state())
            .field("queue_len", &self.queue.len())
            .field("position", &self.queue.position())
            .field("listeners", &self.listeners)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::NullBackend;
    use std::path::PathBuf;
    use std::sync::Mutex;

    fn create_test_track(id: &str) -> Track {
        Track {
            id: id.to_string(),
            path: PathBuf::from(format!("/music/{}.mp3", id)),
            title: format!("Track {}", id),
            artist: "Test Artist".to_string(),
            album: None,
            artist_id: None,
            album_id: None,
            duration: Duration::from_secs(180),
            replay_gain: Default::default(),
        }
    }

    fn tracks(ids: &[&str]) -> Vec<Track> {
        ids.iter().map(|id| create_test_track(id)).collect()
    }

    fn manager() -> PlaybackStateManager {
        let config = PlaybackConfig {
            shuffle_seed: Some(42),
            ..PlaybackConfig::default()
        };
        PlaybackStateManager::new(config, Box::<NullBackend>::default())
    }

    fn recorder(manager: &mut PlaybackStateManager) -> Arc<Mutex<Vec<PlaybackEvent>>> {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        manager.add_listener(Arc::new(move |n: &Notification| {
            sink.lock().unwrap().push(n.event.clone());
        }));
        events
    }

    #[test]
    fn play_selects_start_track() {
        let mut manager = manager();
        manager.play(tracks(&["1", "2", "3"]), 1);

        assert_eq!(manager.current_track().unwrap().id, "2");
        assert_eq!(manager.state(), PlayerState::Playing);
        assert_eq!(manager.generation(), 1);
    }

    #[test]
    fn play_empty_is_silent_noop() {
        let mut manager = manager();
        let events = recorder(&mut manager);

        manager.play(Vec::new(), 0);
        manager.shuffle(Vec::new());
        manager.play_next(Vec::new());
        manager.add_to_queue(Vec::new());

        assert!(events.lock().unwrap().is_empty());
        assert_eq!(manager.generation(), 0);
    }

    #[test]
    fn play_notifies_in_commit_order() {
        let mut manager = manager();
        let events = recorder(&mut manager);

        manager.play(tracks(&["1", "2"]), 0);

        let events = events.lock().unwrap();
        let kinds: Vec<u8> = events.iter().map(PlaybackEvent::rank).collect();
        assert_eq!(kinds, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn next_at_end_stops_on_last() {
        let mut manager = manager();
        manager.play(tracks(&["1", "2"]), 1);

        manager.next();
        assert_eq!(manager.state(), PlayerState::Stopped);
        assert_eq!(manager.current_track().unwrap().id, "2");
    }

    #[test]
    fn prev_restarts_past_threshold() {
        let mut manager = manager();
        manager.play(tracks(&["1", "2"]), 1);
        manager.poll_backend();
        manager.seek_to(10_000);

        manager.prev();
        assert_eq!(manager.current_track().unwrap().id, "2");
        assert_eq!(manager.position_ms(), 0);

        manager.prev();
        assert_eq!(manager.current_track().unwrap().id, "1");
    }

    #[test]
    fn toggle_without_track_is_noop() {
        let mut manager = manager();
        manager.toggle_playing();
        assert_eq!(manager.state(), PlayerState::Stopped);
    }

    #[test]
    fn repeat_one_replays_on_completion() {
        let mut manager = manager();
        manager.play(tracks(&["1", "2"]), 0);
        manager.set_repeat_mode(RepeatMode::One);
        manager.poll_backend();
        manager.seek_to(90_000);

        manager.on_track_end();
        assert_eq!(manager.current_track().unwrap().id, "1");
        assert_eq!(manager.position_ms(), 0);
        assert_eq!(manager.state(), PlayerState::Playing);
    }

    #[test]
    fn end_of_queue_rewinds_to_first() {
        let mut manager = manager();
        manager.play(tracks(&["1", "2"]), 1);

        manager.on_track_end();
        assert_eq!(manager.state(), PlayerState::Stopped);
        assert_eq!(manager.queue().position(), Some(0));
    }

    #[test]
    fn stale_load_result_is_ignored() {
        let mut manager = manager();
        manager.play(tracks(&["1"]), 0);
        let stale = manager.current_ticket().unwrap();

        manager.play(tracks(&["2"]), 0);
        let events = recorder(&mut manager);
        manager.on_load_finished(stale, Err("gone".to_string()));

        assert!(events.lock().unwrap().is_empty());
        assert_eq!(manager.current_track().unwrap().id, "2");
    }

    #[test]
    fn load_failures_skip_then_stop() {
        let mut manager = manager();
        manager.play(tracks(&["1", "2", "3"]), 0);
        let events = recorder(&mut manager);

        for _ in 0..3 {
            let ticket = manager.current_ticket().unwrap();
            manager.on_load_finished(ticket, Err("unsupported codec".to_string()));
        }

        assert_eq!(manager.state(), PlayerState::Stopped);
        let failures = events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| matches!(e, PlaybackEvent::TrackLoadFailed { .. }))
            .count();
        assert_eq!(failures, 3);
    }

    #[test]
    fn cycle_repeat_mode_visits_all() {
        let mut manager = manager();
        assert_eq!(manager.cycle_repeat_mode(), RepeatMode::All);
        assert_eq!(manager.cycle_repeat_mode(), RepeatMode::One);
        assert_eq!(manager.cycle_repeat_mode(), RepeatMode::Off);
    }
}
