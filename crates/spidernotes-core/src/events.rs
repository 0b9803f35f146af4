//! Change notifications for the local note store.
//!
//! Every store write carries a [`WriteMode`]. User-visible edits publish one
//! event per note; bulk and internal writes are [`WriteMode::Silent`] and the
//! caller publishes a single [`NoteEvent::Reset`] once the batch is done.

use tokio::sync::broadcast;

use crate::models::NoteId;

const CHANNEL_CAPACITY: usize = 256;

/// Whether a store write publishes a per-note event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    Notify,
    Silent,
}

/// Notification published after the local store changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoteEvent {
    Added(NoteId),
    Changed(NoteId),
    Removed(NoteId),
    /// Many notes may have changed; listeners should recount from scratch.
    Reset,
}

/// Broadcast channel for [`NoteEvent`]s.
///
/// Publishing never blocks and is a no-op when nobody subscribed.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<NoteEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<NoteEvent> {
        self.sender.subscribe()
    }

    /// Publish `event` unless `mode` is silent.
    pub fn publish(&self, mode: WriteMode, event: NoteEvent) {
        if mode == WriteMode::Notify {
            let _ = self.sender.send(event);
        }
    }

    /// Publish a batch-level reset.
    pub fn publish_reset(&self) {
        let _ = self.sender.send(NoteEvent::Reset);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silent_writes_publish_nothing() {
        let bus = EventBus::new();
        let mut receiver = bus.subscribe();

        bus.publish(WriteMode::Silent, NoteEvent::Added("a".into()));
        bus.publish(WriteMode::Notify, NoteEvent::Changed("b".into()));
        bus.publish_reset();

        assert_eq!(receiver.try_recv().unwrap(), NoteEvent::Changed("b".into()));
        assert_eq!(receiver.try_recv().unwrap(), NoteEvent::Reset);
        assert!(receiver.try_recv().is_err());
    }

    #[test]
    fn publish_without_subscribers_is_ok() {
        let bus = EventBus::new();
        bus.publish(WriteMode::Notify, NoteEvent::Removed("a".into()));
        bus.publish_reset();
    }
}
