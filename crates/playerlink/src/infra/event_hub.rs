use tokio::sync::broadcast;

use crate::events::PlayerEvent;

pub(crate) struct EventHub {
    tx: broadcast::Sender<PlayerEvent>,
}

impl EventHub {
    pub(crate) fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub(crate) fn emit(&self, event: PlayerEvent) {
        let _ = self.tx.send(event);
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
        self.tx.subscribe()
    }
}
