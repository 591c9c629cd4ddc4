//! Listener delivery on worker threads

use crate::error::{Result, ServiceError};
use cadence_playback::{Notification, PlaybackListener};
use crossbeam_channel::{unbounded, Sender};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Forwards notifications to a listener running on its own thread
///
/// The engine thread only pays for a channel send; a slow listener delays
/// nobody but itself. Delivery order per listener is preserved.
pub(crate) struct ChannelListener {
    tx: Sender<Notification>,
}

impl PlaybackListener for ChannelListener {
    fn notify(&self, notification: &Notification) {
        if self.tx.send(notification.clone()).is_err() {
            tracing::debug!(event = ?notification.event, "Listener worker gone, dropping event");
        }
    }
}

/// Spawn the worker thread for `listener`
///
/// The worker exits once the returned [`ChannelListener`] is dropped and the
/// backlog is delivered.
pub(crate) fn spawn_worker(
    name: String,
    listener: Arc<dyn PlaybackListener>,
) -> Result<(ChannelListener, JoinHandle<()>)> {
    let (tx, rx) = unbounded::<Notification>();

    let handle = thread::Builder::new()
        .name(name.clone())
        .spawn(move || {
            for notification in rx.iter() {
                let result = catch_unwind(AssertUnwindSafe(|| listener.notify(&notification)));
                if result.is_err() {
                    tracing::warn!(event = ?notification.event, "Playback listener panicked");
                }
            }
        })
        .map_err(|source| ServiceError::Spawn { name, source })?;

    Ok((ChannelListener { tx }, handle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_playback::{PlaybackEvent, PlaybackSnapshot};
    use std::sync::Mutex;

    fn notification(event: PlaybackEvent) -> Notification {
        Notification {
            event,
            snapshot: Arc::new(PlaybackSnapshot::default()),
        }
    }

    #[test]
    fn events_arrive_in_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let listener = Arc::new(move |n: &Notification| sink.lock().unwrap().push(n.event.clone()));

        let (channel, handle) = spawn_worker("test-listener".to_string(), listener).unwrap();
        channel.notify(&notification(PlaybackEvent::QueueChanged));
        channel.notify(&notification(PlaybackEvent::ShuffleChanged(true)));
        drop(channel);
        handle.join().unwrap();

        assert_eq!(
            *seen.lock().unwrap(),
            vec![PlaybackEvent::QueueChanged, PlaybackEvent::ShuffleChanged(true)]
        );
    }

    #[test]
    fn panicking_listener_keeps_receiving() {
        let count = Arc::new(Mutex::new(0));
        let sink = Arc::clone(&count);
        let listener = Arc::new(move |n: &Notification| {
            *sink.lock().unwrap() += 1;
            if n.event == PlaybackEvent::QueueChanged {
                panic!("listener bug");
            }
        });

        let (channel, handle) = spawn_worker("test-listener".to_string(), listener).unwrap();
        channel.notify(&notification(PlaybackEvent::QueueChanged));
        channel.notify(&notification(PlaybackEvent::QueueReordered));
        drop(channel);
        handle.join().unwrap();

        assert_eq!(*count.lock().unwrap(), 2);
    }
}
