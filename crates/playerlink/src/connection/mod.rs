//! Connection state machine and the single `submit` primitive.
//!
//! The state and the pending queue share one lock. `submit` re-checks the
//! state under that lock, and `on_connected` drains the queue and flips to
//! connected under it, so a command is either queued and flushed or cast
//! directly, never both.

mod endpoint;

use std::collections::VecDeque;
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle, ThreadId};

use parking_lot::Mutex;
use playerlink_core::{Command, ConnectionState, Event, Query, QueryReply};
use playerlink_runtime::{ContextBuilder, Mailbox};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::config::BrokerConfig;
use crate::connection::endpoint::{ClientEndpoint, ConnectionHooks, LinkCallbacks};
use crate::dispatch::faults::{FaultState, WatchdogFaults};
use crate::dispatch::handlers::attach_worker::AttachWorkerMessage;
use crate::dispatch::handlers::barrier::BarrierMessage;
use crate::dispatch::handlers::deliver_command::DeliverCommandMessage;
use crate::dispatch::handlers::detach_worker::DetachWorkerMessage;
use crate::dispatch::handlers::query::QueryMessage;
use crate::dispatch::handlers::shutdown::ShutdownMessage;
use crate::dispatch::{DispatchActor, DispatchGate};
use crate::error::PlayerError;
use crate::events::{FaultCause, PlayerEvent};
use crate::infra::event_hub::EventHub;
use crate::listeners::Listeners;
use crate::relay::{DerivedState, Relay, RelayCore, RelayItem, Role};
use crate::transport::Transport;
use crate::watchdog::{Terminator, Watchdog};
use crate::worker::{RemoteWorker, WorkerClient};

struct Link {
    state: ConnectionState,
    pending: VecDeque<Command>,
}

/// Logical link between one facade and its worker.
pub(crate) struct Connection {
    self_ref: Weak<Connection>,
    link: Mutex<Link>,
    dispatcher: Mailbox<DispatchActor>,
    dispatcher_thread: ThreadId,
    dispatcher_join: Mutex<Option<JoinHandle<()>>>,
    relay: Relay,
    transport: Arc<dyn Transport>,
    gate: Arc<DispatchGate>,
    faults: Arc<FaultState>,
    watchdog: Arc<Watchdog>,
    listeners: Arc<Listeners>,
    hub: Arc<EventHub>,
    config: BrokerConfig,
}

impl Connection {
    /// Builds the connection and requests the first bind.
    pub(crate) fn open(
        transport: Arc<dyn Transport>,
        config: BrokerConfig,
        role: Role,
        terminator: Arc<dyn Terminator>,
    ) -> Result<Arc<Self>, PlayerError> {
        let hub = Arc::new(EventHub::new(config.relay.event_capacity));
        let listeners = Arc::new(Listeners::default());
        let faults = Arc::new(FaultState::new(Arc::clone(&hub)));
        let gate = Arc::new(DispatchGate::default());

        let watchdog = Watchdog::with_terminator(config.watchdog.clone(), terminator)
            .map(Arc::new)
            .map_err(|source| PlayerError::SpawnContext {
                context: "watchdog",
                source,
            })?;
        watchdog.set_fault_listener(Some(Box::new(WatchdogFaults {
            faults: Arc::clone(&faults),
        })));

        let actor = DispatchActor::new(
            Arc::clone(&watchdog),
            Arc::clone(&gate),
            Arc::clone(&faults),
            Arc::clone(&listeners),
        );
        let panic_faults = Arc::clone(&faults);
        let (dispatcher, dispatcher_join) = ContextBuilder::new(config.dispatch.thread_name.clone())
            .on_panic(move |message| {
                panic_faults.report(
                    "dispatch",
                    FaultCause::ContextPanicked {
                        message: message.to_string(),
                    },
                );
            })
            .spawn(actor)
            .map_err(|source| PlayerError::SpawnContext {
                context: "dispatch",
                source,
            })?;

        let core = Arc::new(RelayCore::new(
            role,
            Arc::clone(&listeners),
            Arc::clone(&hub),
            config.relay.coalesce_buffering,
        ));
        let relay = Relay::start(core, &config.relay).map_err(|source| {
            PlayerError::SpawnContext {
                context: "relay",
                source,
            }
        })?;

        let connection = Arc::new_cyclic(|self_ref| Self {
            self_ref: self_ref.clone(),
            link: Mutex::new(Link {
                state: ConnectionState::Init,
                pending: VecDeque::new(),
            }),
            dispatcher,
            dispatcher_thread: dispatcher_join.thread().id(),
            dispatcher_join: Mutex::new(Some(dispatcher_join)),
            relay,
            transport,
            gate,
            faults,
            watchdog,
            listeners,
            hub,
            config,
        });
        connection
            .relay
            .core()
            .install_hooks(Box::new(ConnectionHooks::new(Arc::downgrade(&connection))));

        if let Err(error) = connection.connect() {
            connection.release();
            return Err(error);
        }
        Ok(connection)
    }

    pub(crate) fn state(&self) -> ConnectionState {
        self.link.lock().state
    }

    pub(crate) fn pending_len(&self) -> usize {
        self.link.lock().pending.len()
    }

    pub(crate) fn listeners(&self) -> &Listeners {
        &self.listeners
    }

    pub(crate) fn derived(&self) -> DerivedState {
        self.relay.core().derived()
    }

    pub(crate) fn set_data_source_label(&self, label: Option<String>) {
        self.relay.core().set_data_source(label);
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
        self.hub.subscribe()
    }

    fn on_dispatcher_thread(&self) -> bool {
        thread::current().id() == self.dispatcher_thread
    }

    /// Hands `command` to the worker, now or once connected. Never blocks on
    /// the worker.
    pub(crate) fn submit(&self, command: Command) {
        let mut link = self.link.lock();
        match link.state {
            ConnectionState::Released => {
                debug!(kind = command.kind().as_str(), "command dropped after release");
            },
            ConnectionState::Connected => self.cast_command(command, self.gate.epoch()),
            ConnectionState::Init | ConnectionState::Connecting | ConnectionState::Disconnected => {
                link.pending.push_back(command);
            },
        }
    }

    fn cast_command(&self, command: Command, epoch: u64) {
        let operation = command.kind().as_str();
        if self
            .dispatcher
            .cast(DeliverCommandMessage { command, epoch })
            .is_err()
        {
            warn!(operation, "dispatcher mailbox closed");
            self.faults.report(operation, FaultCause::NoWorker);
        }
    }

    /// Requests a bind from `INIT` or `DISCONNECTED`. A no-op while connecting
    /// or connected.
    pub(crate) fn connect(&self) -> Result<(), PlayerError> {
        {
            let mut link = self.link.lock();
            match link.state {
                ConnectionState::Released => return Err(PlayerError::Released),
                state if !state.can_connect() => {
                    debug!(state = state.as_str(), "connect ignored");
                    return Ok(());
                },
                _ => link.state = ConnectionState::Connecting,
            }
        }
        let callbacks = Arc::new(LinkCallbacks::new(self.self_ref.clone()));
        if let Err(error) = self.transport.bind(callbacks) {
            let mut link = self.link.lock();
            if link.state == ConnectionState::Connecting {
                link.state = ConnectionState::Disconnected;
            }
            warn!(%error, "bind failed");
            return Err(error.into());
        }
        debug!("bind requested");
        Ok(())
    }

    pub(crate) fn on_connected(&self, worker: Arc<dyn RemoteWorker>) {
        {
            let mut link = self.link.lock();
            match link.state {
                ConnectionState::Released => {
                    debug!("connected callback after release ignored");
                    return;
                },
                ConnectionState::Connected => {
                    warn!("duplicate connected callback ignored");
                    return;
                },
                ConnectionState::Init
                | ConnectionState::Connecting
                | ConnectionState::Disconnected => {},
            }
            let client: Arc<dyn WorkerClient> =
                Arc::new(ClientEndpoint::new(self.self_ref.clone()));
            if self
                .dispatcher
                .cast(AttachWorkerMessage { worker, client })
                .is_err()
            {
                warn!("dispatcher mailbox closed, connect ignored");
                return;
            }
            let epoch = self.gate.epoch();
            self.cast_command(Command::Create, epoch);
            let flushed = link.pending.len();
            while let Some(command) = link.pending.pop_front() {
                self.cast_command(command, epoch);
            }
            link.state = ConnectionState::Connected;
            info!(flushed, "worker connected");
        }
        self.relay.intake(RelayItem::Connection(true));
    }

    pub(crate) fn on_disconnected(&self) {
        let was_connected = {
            let mut link = self.link.lock();
            let previous = link.state;
            match previous {
                ConnectionState::Released => return,
                ConnectionState::Init | ConnectionState::Disconnected => {
                    debug!(state = previous.as_str(), "disconnected callback ignored");
                    return;
                },
                ConnectionState::Connecting | ConnectionState::Connected => {},
            }
            link.state = ConnectionState::Disconnected;
            let _ = self.dispatcher.cast(DetachWorkerMessage);
            warn!(previous = previous.as_str(), "worker disconnected");
            previous == ConnectionState::Connected
        };
        if was_connected {
            self.relay.intake(RelayItem::Event(Event::worker_disconnected()));
        }
        self.relay.intake(RelayItem::Connection(false));
    }

    /// Terminal transition. Safe to call repeatedly and from any context,
    /// including listener callbacks.
    pub(crate) fn release(&self) {
        {
            let mut link = self.link.lock();
            if link.state.is_released() {
                return;
            }
            let previous = std::mem::replace(&mut link.state, ConnectionState::Released);
            self.gate.release();
            let dropped = link.pending.len();
            link.pending.clear();
            let cancelled = self.watchdog.cancel_all();
            info!(
                previous = previous.as_str(),
                dropped, cancelled, "connection released"
            );
        }
        self.listeners.reset();
        self.relay.close();

        // On the dispatcher thread the worker may still be inside the call
        // that raised this callback, so the unbind waits for the shutdown
        // handler to run after that call returns.
        let on_dispatcher = self.on_dispatcher_thread();
        let (ack_tx, ack_rx) = crossbeam_channel::bounded(1);
        let shutdown = ShutdownMessage {
            ack: ack_tx,
            unbind: on_dispatcher.then(|| Arc::clone(&self.transport)),
        };
        match self.dispatcher.cast(shutdown) {
            Ok(()) if on_dispatcher => debug!("unbind deferred to dispatcher shutdown"),
            Ok(()) => {
                match ack_rx.recv_timeout(self.config.dispatch.release_timeout) {
                    Ok(()) => {
                        if let Some(join) = self.dispatcher_join.lock().take() {
                            let _ = join.join();
                        }
                    },
                    Err(_) => warn!("dispatcher did not stop before the release timeout"),
                }
                self.transport.unbind();
            },
            Err(_) => self.transport.unbind(),
        }
        self.relay.shutdown();
    }

    /// Direct synchronous getter. Returns the query's default while not
    /// connected, from the dispatcher thread, or on any failure.
    pub(crate) fn query(&self, query: Query) -> QueryReply {
        let default = query.default_reply();
        if self.state() != ConnectionState::Connected {
            return default;
        }
        if self.on_dispatcher_thread() {
            debug!(
                query = query.as_str(),
                "query from the dispatcher thread answered with default"
            );
            return default;
        }
        let operation = query.as_str();
        let accepts = query.clone();
        match self
            .dispatcher
            .call(QueryMessage { query }, self.config.dispatch.query_timeout)
        {
            Ok(Ok(reply)) if accepts.accepts(&reply) => reply,
            Ok(Ok(reply)) => {
                warn!(operation, ?reply, "unexpected reply shape");
                default
            },
            Ok(Err(error)) => {
                debug!(operation, %error, "query failed");
                default
            },
            Err(error) => {
                warn!(operation, ?error, "query did not complete");
                default
            },
        }
    }

    /// Drops queued commands, then pauses and resets the worker, waiting for
    /// both to run.
    pub(crate) fn sync_reset(&self) {
        let connected = {
            let mut link = self.link.lock();
            if link.state.is_released() {
                return;
            }
            link.pending.clear();
            let epoch = self.gate.advance_epoch();
            let connected = link.state == ConnectionState::Connected;
            if connected {
                self.cast_command(Command::Pause, epoch);
                self.cast_command(Command::Reset, epoch);
            }
            connected
        };
        if connected && !self.on_dispatcher_thread() {
            let wait = self.watchdog.deadline().saturating_mul(2);
            if let Err(error) = self.dispatcher.call(BarrierMessage, wait) {
                warn!(?error, "reset did not complete");
            }
        }
    }
}

#[cfg(test)]
#[path = "../tests/connection.rs"]
mod tests;
