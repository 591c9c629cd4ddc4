//! Playback service: the engine thread and its handle
//!
//! ## Architecture
//!
//! ```text
//! UI / media keys / CLI              Engine Thread
//!   PlaybackHandle ──Command──>  ┌──────────────────────┐
//!   (cloneable)                  │ PlaybackStateManager │──> listener workers
//!                                │   poll_backend()     │
//!                                └──────────┬───────────┘
//!                                           │ load / poll
//!                                     HeadlessBackend ──> TrackLoader thread
//! ```
//!
//! The engine thread is the only writer. Commands from every thread are
//! applied one at a time in arrival order; between commands the engine polls
//! the backend for load results and track completion.

use crate::backend::HeadlessBackend;
use crate::config::ServiceConfig;
use crate::error::{Result, ServiceError};
use crate::listener::spawn_worker;
use cadence_playback::{
    GainConfig, ListenerId, PlaybackListener, PlaybackSnapshot, PlaybackStateManager,
    PlayerBackend, RepeatMode, SessionState, SessionStore, Track, TrackLookup,
};
use crossbeam_channel::{bounded, unbounded, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Intents and queries carried to the engine thread
pub(crate) enum Command {
    Play { items: Vec<Track>, start_at: usize },
    Shuffle(Vec<Track>),
    PlayNext(Vec<Track>),
    AddToQueue(Vec<Track>),
    Next,
    Prev,
    SkipTo(usize),
    TogglePlaying,
    Pause,
    Resume,
    Stop,
    SeekTo(u64),
    SetRepeatMode(RepeatMode),
    CycleRepeatMode,
    SetShuffled(bool),
    SetGainConfig(GainConfig),
    Remove(usize),
    MoveItem { from: usize, to: usize },
    ClearQueue,
    AddListener {
        listener: Arc<dyn PlaybackListener>,
        reply: Sender<Result<ListenerId>>,
    },
    RemoveListener(ListenerId),
    Snapshot(Sender<Arc<PlaybackSnapshot>>),
    Session(Sender<SessionState>),
    RestoreSession {
        state: SessionState,
        lookup: Box<dyn TrackLookup + Send>,
    },
    Shutdown(Sender<SessionState>),
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Self::Play { .. } => "play",
            Self::Shuffle(_) => "shuffle",
            Self::PlayNext(_) => "play_next",
            Self::AddToQueue(_) => "add_to_queue",
            Self::Next => "next",
            Self::Prev => "prev",
            Self::SkipTo(_) => "skip_to",
            Self::TogglePlaying => "toggle_playing",
            Self::Pause => "pause",
            Self::Resume => "resume",
            Self::Stop => "stop",
            Self::SeekTo(_) => "seek_to",
            Self::SetRepeatMode(_) => "set_repeat_mode",
            Self::CycleRepeatMode => "cycle_repeat_mode",
            Self::SetShuffled(_) => "set_shuffled",
            Self::SetGainConfig(_) => "set_gain_config",
            Self::Remove(_) => "remove",
            Self::MoveItem { .. } => "move_item",
            Self::ClearQueue => "clear_queue",
            Self::AddListener { .. } => "add_listener",
            Self::RemoveListener(_) => "remove_listener",
            Self::Snapshot(_) => "snapshot",
            Self::Session(_) => "session",
            Self::RestoreSession { .. } => "restore_session",
            Self::Shutdown(_) => "shutdown",
        }
    }
}

/// State owned by the engine thread
struct Engine {
    manager: PlaybackStateManager,
    workers: Vec<JoinHandle<()>>,
    listeners_spawned: u64,
}

impl Engine {
    fn run(mut self, commands: Receiver<Command>, tick: Duration) {
        info!("Playback engine started");

        loop {
            match commands.recv_timeout(tick) {
                Ok(Command::Shutdown(reply)) => {
                    let session = self.finish();
                    if reply.send(session).is_err() {
                        debug!("Shutdown requester went away");
                    }
                    return;
                }
                Ok(command) => self.apply(command),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    debug!("All playback handles dropped");
                    self.finish();
                    return;
                }
            }

            self.manager.poll_backend();
        }
    }

    fn apply(&mut self, command: Command) {
        debug!(command = command.name(), "Applying command");

        match command {
            Command::Play { items, start_at } => self.manager.play(items, start_at),
            Command::Shuffle(items) => self.manager.shuffle(items),
            Command::PlayNext(items) => self.manager.play_next(items),
            Command::AddToQueue(items) => self.manager.add_to_queue(items),
            Command::Next => self.manager.next(),
            Command::Prev => self.manager.prev(),
            Command::SkipTo(position) => self.manager.skip_to(position),
            Command::TogglePlaying => self.manager.toggle_playing(),
            Command::Pause => self.manager.pause(),
            Command::Resume => self.manager.resume(),
            Command::Stop => self.manager.stop(),
            Command::SeekTo(position_ms) => self.manager.seek_to(position_ms),
            Command::SetRepeatMode(mode) => self.manager.set_repeat_mode(mode),
            Command::CycleRepeatMode => {
                self.manager.cycle_repeat_mode();
            }
            Command::SetShuffled(shuffled) => self.manager.set_shuffled(shuffled),
            Command::SetGainConfig(config) => self.manager.set_gain_config(config),
            Command::Remove(position) => {
                if let Err(e) = self.manager.remove(position) {
                    warn!(position, error = %e, "Ignoring remove");
                }
            }
            Command::MoveItem { from, to } => {
                if let Err(e) = self.manager.move_item(from, to) {
                    warn!(from, to, error = %e, "Ignoring move");
                }
            }
            Command::ClearQueue => self.manager.clear_queue(),
            Command::AddListener { listener, reply } => {
                let result = self.add_listener(listener);
                if reply.send(result).is_err() {
                    debug!("Listener requester went away");
                }
            }
            Command::RemoveListener(id) => {
                self.manager.remove_listener(id);
            }
            Command::Snapshot(reply) => {
                if reply.send(self.manager.snapshot()).is_err() {
                    debug!("Snapshot requester went away");
                }
            }
            Command::Session(reply) => {
                if reply.send(self.manager.session()).is_err() {
                    debug!("Session requester went away");
                }
            }
            Command::RestoreSession { state, lookup } => {
                self.manager.restore_session(&state, lookup.as_ref());
            }
            Command::Shutdown(_) => {}
        }
    }

    fn add_listener(&mut self, listener: Arc<dyn PlaybackListener>) -> Result<ListenerId> {
        self.listeners_spawned += 1;
        let name = format!("cadence-listener-{}", self.listeners_spawned);
        let (channel, worker) = spawn_worker(name, listener)?;

        self.workers.push(worker);
        Ok(self.manager.add_listener(Arc::new(channel)))
    }

    /// Stop playback and wait for every listener to drain
    fn finish(&mut self) -> SessionState {
        let session = self.manager.shutdown();

        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                warn!("Listener worker panicked");
            }
        }

        info!("Playback engine stopped");
        session
    }
}

/// Cloneable handle for sending intents to the engine
///
/// Intents return as soon as the command is queued. Queries wait for the
/// engine up to the configured timeout.
#[derive(Clone)]
pub struct PlaybackHandle {
    commands: Sender<Command>,
    query_timeout: Duration,
}

impl PlaybackHandle {
    fn send(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| ServiceError::Disconnected)
    }

    fn query<T>(&self, command: impl FnOnce(Sender<T>) -> Command) -> Result<T> {
        let (reply_tx, reply_rx) = bounded(1);
        self.send(command(reply_tx))?;

        reply_rx
            .recv_timeout(self.query_timeout)
            .map_err(|e| match e {
                RecvTimeoutError::Timeout => ServiceError::Timeout,
                RecvTimeoutError::Disconnected => ServiceError::Disconnected,
            })
    }

    /// Replace the queue and start playing at `start_at`
    pub fn play(&self, items: Vec<Track>, start_at: usize) -> Result<()> {
        self.send(Command::Play { items, start_at })
    }

    /// Replace the queue and play it shuffled
    pub fn shuffle(&self, items: Vec<Track>) -> Result<()> {
        self.send(Command::Shuffle(items))
    }

    /// Insert tracks right after the current one
    pub fn play_next(&self, items: Vec<Track>) -> Result<()> {
        self.send(Command::PlayNext(items))
    }

    /// Append tracks to the end of the queue
    pub fn add_to_queue(&self, items: Vec<Track>) -> Result<()> {
        self.send(Command::AddToQueue(items))
    }

    pub fn next(&self) -> Result<()> {
        self.send(Command::Next)
    }

    pub fn prev(&self) -> Result<()> {
        self.send(Command::Prev)
    }

    pub fn skip_to(&self, position: usize) -> Result<()> {
        self.send(Command::SkipTo(position))
    }

    pub fn toggle_playing(&self) -> Result<()> {
        self.send(Command::TogglePlaying)
    }

    pub fn pause(&self) -> Result<()> {
        self.send(Command::Pause)
    }

    pub fn resume(&self) -> Result<()> {
        self.send(Command::Resume)
    }

    pub fn stop(&self) -> Result<()> {
        self.send(Command::Stop)
    }

    pub fn seek_to(&self, position_ms: u64) -> Result<()> {
        self.send(Command::SeekTo(position_ms))
    }

    pub fn set_repeat_mode(&self, mode: RepeatMode) -> Result<()> {
        self.send(Command::SetRepeatMode(mode))
    }

    pub fn cycle_repeat_mode(&self) -> Result<()> {
        self.send(Command::CycleRepeatMode)
    }

    pub fn set_shuffled(&self, shuffled: bool) -> Result<()> {
        self.send(Command::SetShuffled(shuffled))
    }

    pub fn set_gain_config(&self, config: GainConfig) -> Result<()> {
        self.send(Command::SetGainConfig(config))
    }

    /// Remove the entry at `position` of the active order
    ///
    /// An invalid position is logged by the engine and ignored.
    pub fn remove(&self, position: usize) -> Result<()> {
        self.send(Command::Remove(position))
    }

    pub fn move_item(&self, from: usize, to: usize) -> Result<()> {
        self.send(Command::MoveItem { from, to })
    }

    pub fn clear_queue(&self) -> Result<()> {
        self.send(Command::ClearQueue)
    }

    /// Register a listener on its own worker thread
    pub fn add_listener(&self, listener: Arc<dyn PlaybackListener>) -> Result<ListenerId> {
        self.query(|reply| Command::AddListener { listener, reply })?
    }

    /// Unregister a listener (unknown ids are ignored)
    pub fn remove_listener(&self, id: ListenerId) -> Result<()> {
        self.send(Command::RemoveListener(id))
    }

    /// Current committed state
    pub fn snapshot(&self) -> Result<Arc<PlaybackSnapshot>> {
        self.query(Command::Snapshot)
    }

    /// State to persist for a later restore
    pub fn session(&self) -> Result<SessionState> {
        self.query(Command::Session)
    }

    /// Restore a session, resolving track ids through `lookup`
    pub fn restore_session<L>(&self, state: SessionState, lookup: L) -> Result<()>
    where
        L: TrackLookup + Send + 'static,
    {
        self.send(Command::RestoreSession {
            state,
            lookup: Box::new(lookup),
        })
    }
}

impl std::fmt::Debug for PlaybackHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackHandle")
            .field("query_timeout", &self.query_timeout)
            .finish_non_exhaustive()
    }
}

/// Running playback engine
///
/// Owns the engine thread. Dropping the service shuts it down; call
/// [`PlaybackService::shutdown`] to get the final session and persistence
/// errors.
pub struct PlaybackService {
    handle: PlaybackHandle,
    engine: Option<JoinHandle<()>>,
    store: Option<SessionStore>,
}

impl PlaybackService {
    /// Start the engine thread over `backend`
    pub fn start(config: ServiceConfig, backend: Box<dyn PlayerBackend>) -> Result<Self> {
        config.validate()?;

        let (commands_tx, commands_rx) = unbounded::<Command>();
        let playback_config = config.playback.to_playback_config();
        let tick = config.engine.tick();

        let engine = thread::Builder::new()
            .name("cadence-engine".to_string())
            .spawn(move || {
                let engine = Engine {
                    manager: PlaybackStateManager::new(playback_config, backend),
                    workers: Vec::new(),
                    listeners_spawned: 0,
                };
                engine.run(commands_rx, tick);
            })
            .map_err(|source| ServiceError::Spawn {
                name: "engine".to_string(),
                source,
            })?;

        Ok(Self {
            handle: PlaybackHandle {
                commands: commands_tx,
                query_timeout: config.engine.query_timeout(),
            },
            engine: Some(engine),
            store: config.session.path.map(SessionStore::new),
        })
    }

    /// Start the engine with a [`HeadlessBackend`] reading files from disk
    pub fn start_headless(config: ServiceConfig) -> Result<Self> {
        let backend = HeadlessBackend::with_file_opener(config.engine.loader_queue_depth)?;
        Self::start(config, Box::new(backend))
    }

    /// Handle for sending intents
    pub fn handle(&self) -> PlaybackHandle {
        self.handle.clone()
    }

    /// Restore the session saved at the configured path
    ///
    /// Returns false when persistence is disabled or nothing was saved.
    /// An unreadable session file is logged and treated as empty.
    pub fn restore_saved_session<L>(&self, lookup: L) -> Result<bool>
    where
        L: TrackLookup + Send + 'static,
    {
        let Some(store) = &self.store else {
            return Ok(false);
        };

        let state = store.load_or_default();
        if state.items.is_empty() {
            return Ok(false);
        }

        self.handle.restore_session(state, lookup)?;
        Ok(true)
    }

    /// Stop the engine, wait for listeners and persist the session
    pub fn shutdown(mut self) -> Result<SessionState> {
        self.stop()
    }

    fn stop(&mut self) -> Result<SessionState> {
        let Some(engine) = self.engine.take() else {
            return Err(ServiceError::Disconnected);
        };

        let (reply_tx, reply_rx) = bounded(1);
        self.handle.send(Command::Shutdown(reply_tx))?;
        let session = reply_rx.recv().map_err(|_| ServiceError::Disconnected)?;

        if engine.join().is_err() {
            warn!("Engine thread panicked");
        }

        if let Some(store) = &self.store {
            store.save(&session)?;
            info!(path = %store.path().display(), "Session saved");
        }

        Ok(session)
    }
}

impl Drop for PlaybackService {
    fn drop(&mut self) {
        if self.engine.is_some() {
            if let Err(e) = self.stop() {
                warn!(error = %e, "Playback service did not shut down cleanly");
            }
        }
    }
}
