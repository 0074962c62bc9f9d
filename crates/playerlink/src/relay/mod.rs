//! Delivery of worker events to listeners.
//!
//! Every item passes one intake point and is delivered on a single context,
//! either a dedicated thread or the thread calling [`Relay::intake`], in
//! intake order. Derived state is updated before listeners run.

mod actor;
mod derived;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread::{JoinHandle, ThreadId};

use parking_lot::{Mutex, ReentrantMutex};
use playerlink_core::Event;
use playerlink_core::event::{MEDIA_INFO_STARTED_AS_NEXT, MEDIA_INFO_VIDEO_RENDERING_START};
use playerlink_runtime::{ContextBuilder, Mailbox};
use tracing::{debug, info};

use crate::config::{DeliveryMode, RelayConfig};
use crate::events::{FaultCause, PlayerEvent};
use crate::infra::event_hub::EventHub;
use crate::listeners::Listeners;
use crate::relay::actor::{DeliverItemMessage, DeliveryActor, StopDeliveryMessage};

pub use derived::DerivedState;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum RelayItem {
    Event(Event),
    Connection(bool),
}

/// Which facade the relay serves. Retrievers only report frame progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Role {
    Player,
    Retriever,
}

/// Calls back into the owning connection.
pub(crate) trait RelayHooks: Send + Sync {
    /// Media duration used to turn buffered positions into percentages.
    fn duration(&self) -> i64;

    /// The engine started the next item of a gapless sequence.
    fn start_next(&self);
}

#[derive(Default)]
struct Tracked {
    state: DerivedState,
    last_buffering: Option<i32>,
}

pub(crate) struct RelayCore {
    role: Role,
    listeners: Arc<Listeners>,
    hub: Arc<EventHub>,
    coalesce_buffering: bool,
    tracked: Mutex<Tracked>,
    hooks: OnceLock<Box<dyn RelayHooks>>,
    closed: AtomicBool,
}

impl RelayCore {
    pub(crate) fn new(
        role: Role,
        listeners: Arc<Listeners>,
        hub: Arc<EventHub>,
        coalesce_buffering: bool,
    ) -> Self {
        Self {
            role,
            listeners,
            hub,
            coalesce_buffering,
            tracked: Mutex::new(Tracked::default()),
            hooks: OnceLock::new(),
            closed: AtomicBool::new(false),
        }
    }

    pub(crate) fn install_hooks(&self, hooks: Box<dyn RelayHooks>) {
        if self.hooks.set(hooks).is_err() {
            debug!("relay hooks already installed");
        }
    }

    pub(crate) fn derived(&self) -> DerivedState {
        self.tracked.lock().state.clone()
    }

    pub(crate) fn set_data_source(&self, data_source: Option<String>) {
        self.tracked.lock().state.data_source = data_source;
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn duration(&self) -> i64 {
        self.hooks.get().map_or(0, |hooks| hooks.duration())
    }

    pub(crate) fn deliver(&self, item: RelayItem) {
        match item {
            RelayItem::Connection(connected) => {
                if self.is_closed() {
                    return;
                }
                if let Some(listener) = self.listeners.connection.load_full() {
                    listener.on_connection_changed(connected);
                }
                self.hub.emit(PlayerEvent::Connection { connected });
            },
            RelayItem::Event(event) => self.deliver_event(event),
        }
    }

    fn deliver_event(&self, event: Event) {
        let Some(event) = self.track(event) else {
            return;
        };
        if self.is_closed() {
            return;
        }
        let unhandled_error = match self.role {
            Role::Player => self.notify_player(&event),
            Role::Retriever => {
                self.notify_retriever(&event);
                false
            },
        };
        self.hub.emit(PlayerEvent::Media(event));
        if unhandled_error {
            self.hub.emit(PlayerEvent::Media(Event::PlaybackComplete));
        }
    }

    /// Updates derived state. Returns `None` for updates that are not
    /// delivered to listeners.
    fn track(&self, event: Event) -> Option<Event> {
        let percent = match &event {
            Event::BufferingUpdate { position } if self.role == Role::Player => {
                Some(derived::buffering_percent(*position, self.duration()))
            },
            _ => None,
        };

        let mut tracked = self.tracked.lock();
        let state = &mut tracked.state;
        match &event {
            Event::Prepared => state.prepared = true,
            Event::Error { .. } => state.prepared = false,
            Event::VideoSizeChanged { width, height } => {
                state.video_width = *width;
                state.video_height = *height;
            },
            Event::VideoSarChanged { num, den } => {
                state.video_sar_num = *num;
                state.video_sar_den = *den;
            },
            _ => {},
        }
        if let Some(percent) = percent {
            tracked.state.buffering_percent = percent;
            if self.coalesce_buffering && tracked.last_buffering == Some(percent) {
                return None;
            }
            tracked.last_buffering = Some(percent);
        }
        Some(event)
    }

    /// Returns `true` for an error no listener handled.
    fn notify_player(&self, event: &Event) -> bool {
        if let Event::Info { what, .. } = event {
            if *what == MEDIA_INFO_STARTED_AS_NEXT {
                if let Some(hooks) = self.hooks.get() {
                    hooks.start_next();
                }
            } else if *what == MEDIA_INFO_VIDEO_RENDERING_START {
                info!("first video frame rendered");
            }
        }

        let listener = self.listeners.player.load_full();
        let Some(listener) = listener else {
            return matches!(event, Event::Error { .. });
        };
        match event {
            Event::Nop | Event::FrameGenerated { .. } => {},
            Event::Prepared => listener.on_prepared(),
            Event::PlaybackComplete => listener.on_completion(),
            Event::BufferingUpdate { .. } => {
                let percent = self.tracked.lock().state.buffering_percent;
                listener.on_buffering_update(percent);
            },
            Event::SeekComplete => listener.on_seek_complete(),
            Event::VideoSizeChanged { .. } | Event::VideoSarChanged { .. } => {
                let state = self.derived();
                listener.on_video_size_changed(
                    state.video_width,
                    state.video_height,
                    state.video_sar_num,
                    state.video_sar_den,
                );
            },
            Event::TimedText { text } => listener.on_timed_text(text.as_deref()),
            Event::Error { what, extra } => {
                if !listener.on_error(*what, *extra) {
                    listener.on_completion();
                    return true;
                }
            },
            Event::Info { what, extra } => {
                listener.on_info(*what, *extra);
            },
        }
        false
    }

    fn notify_retriever(&self, event: &Event) {
        let Some(listener) = self.listeners.frame.load_full() else {
            return;
        };
        match event {
            Event::FrameGenerated {
                timestamp,
                result_code,
                file_name,
            } => listener.on_frame_generated(*timestamp, *result_code, file_name.as_deref()),
            Event::Error { what, extra } => {
                debug!(what, extra, "retriever error");
                listener.on_frame_generated(0, -1, None);
            },
            other => debug!(kind = other.kind().as_str(), "ignored by retriever"),
        }
    }
}

enum Delivery {
    Dedicated {
        actor: Mailbox<DeliveryActor>,
        thread: ThreadId,
        join: Mutex<Option<JoinHandle<()>>>,
    },
    Inline(ReentrantMutex<()>),
}

pub(crate) struct Relay {
    core: Arc<RelayCore>,
    delivery: Delivery,
}

impl Relay {
    pub(crate) fn start(core: Arc<RelayCore>, config: &RelayConfig) -> std::io::Result<Self> {
        let delivery = match config.delivery {
            DeliveryMode::Dedicated => {
                let actor = DeliveryActor {
                    core: Arc::clone(&core),
                };
                let hub = Arc::clone(&core.hub);
                let (actor, join) = ContextBuilder::new(config.thread_name.clone())
                    .on_panic(move |message| {
                        hub.emit(PlayerEvent::Fault {
                            operation: "deliver_event",
                            cause: FaultCause::ContextPanicked {
                                message: message.to_string(),
                            },
                        });
                    })
                    .spawn(actor)?;
                Delivery::Dedicated {
                    actor,
                    thread: join.thread().id(),
                    join: Mutex::new(Some(join)),
                }
            },
            DeliveryMode::Inline => Delivery::Inline(ReentrantMutex::new(())),
        };
        Ok(Self { core, delivery })
    }

    pub(crate) fn core(&self) -> &Arc<RelayCore> {
        &self.core
    }

    pub(crate) fn intake(&self, item: RelayItem) {
        match &self.delivery {
            Delivery::Dedicated { actor, .. } => {
                if actor.cast(DeliverItemMessage { item }).is_err() {
                    debug!("relay stopped, item dropped");
                }
            },
            Delivery::Inline(lock) => {
                let _serial = lock.lock();
                self.core.deliver(item);
            },
        }
    }

    /// Stops listener delivery. Derived state keeps updating.
    pub(crate) fn close(&self) {
        self.core.closed.store(true, Ordering::Release);
    }

    /// Stops the delivery thread, joining it unless called from it.
    pub(crate) fn shutdown(&self) {
        self.close();
        if let Delivery::Dedicated {
            actor,
            thread,
            join,
        } = &self.delivery
        {
            let _ = actor.cast(StopDeliveryMessage);
            if std::thread::current().id() == *thread {
                return;
            }
            if let Some(join) = join.lock().take() {
                let _ = join.join();
            }
        }
    }
}

#[cfg(test)]
#[path = "../tests/relay.rs"]
mod tests;
