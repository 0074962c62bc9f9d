use std::sync::{Arc, Weak};

use playerlink_core::event::MEDIA_ERROR_IO;
use playerlink_core::{Command, Event, InvokeArgs, InvokeKind, Query};
use tracing::{debug, warn};

use crate::connection::Connection;
use crate::dispatch::handlers::native_invoke::{NativeInvokeMessage, run_native_invoke};
use crate::error::InvokeError;
use crate::relay::{RelayHooks, RelayItem};
use crate::transport::TransportCallbacks;
use crate::worker::{RemoteWorker, WorkerClient};

/// The facade side registered with a worker. Holds the connection weakly so
/// a worker outliving the facade cannot keep it alive.
pub(crate) struct ClientEndpoint {
    connection: Weak<Connection>,
}

impl ClientEndpoint {
    pub(crate) fn new(connection: Weak<Connection>) -> Self {
        Self { connection }
    }
}

impl WorkerClient for ClientEndpoint {
    fn on_event(&self, event: Event) {
        match self.connection.upgrade() {
            Some(connection) => connection.relay.intake(RelayItem::Event(event)),
            None => debug!(kind = event.kind().as_str(), "event for a dropped facade"),
        }
    }

    fn on_native_invoke(
        &self,
        kind: InvokeKind,
        args: &mut InvokeArgs,
    ) -> Result<bool, InvokeError> {
        let Some(connection) = self.connection.upgrade() else {
            return Ok(false);
        };
        native_invoke(&connection, kind, args)
    }

    fn on_codec_select(&self, mime: &str, profile: i32, level: i32) -> Option<String> {
        let connection = self.connection.upgrade()?;
        let selector = connection.listeners.codec.load_full()?;
        selector.select_codec(mime, profile, level)
    }

    fn on_report_fault(&self, operation: &'static str) {
        if let Some(connection) = self.connection.upgrade() {
            connection.faults.mark_hang(operation);
        }
    }
}

fn native_invoke(
    connection: &Connection,
    kind: InvokeKind,
    args: &mut InvokeArgs,
) -> Result<bool, InvokeError> {
    if connection.listeners.native_invoke.load().is_some() {
        if kind.is_http_lifecycle() {
            return http_round_trip(connection, kind, args);
        }
        if run_native_invoke(&connection.listeners, kind, args) {
            return Ok(true);
        }
    }
    match kind {
        InvokeKind::WillConcatResolveSegment => resolve_segment(connection, args),
        _ => Ok(false),
    }
}

/// Runs the hook on the dispatcher and waits for the answer, bounded by the
/// watchdog deadline.
fn http_round_trip(
    connection: &Connection,
    kind: InvokeKind,
    args: &mut InvokeArgs,
) -> Result<bool, InvokeError> {
    if connection.on_dispatcher_thread() {
        return Ok(run_native_invoke(&connection.listeners, kind, args));
    }
    let message = NativeInvokeMessage {
        kind,
        args: args.clone(),
    };
    let (handled, rewritten) = connection
        .dispatcher
        .call(message, connection.watchdog.deadline())
        .map_err(|error| InvokeError::from_call_error(kind.as_str(), error))?;
    *args = rewritten;
    Ok(handled)
}

fn resolve_segment(connection: &Connection, args: &mut InvokeArgs) -> Result<bool, InvokeError> {
    let Some(listener) = connection.listeners.control.load_full() else {
        return Ok(false);
    };
    let index = args.segment_index().unwrap_or(-1);
    if index < 0 {
        return Err(InvokeError::InvalidSegmentIndex { index });
    }
    let Some(url) = listener.resolve_segment_url(index) else {
        warn!(index, "segment url not resolved");
        connection.relay.intake(RelayItem::Event(Event::Error {
            what: MEDIA_ERROR_IO,
            extra: 0,
        }));
        return Err(InvokeError::MissingUrl { index });
    };
    args.set_url(url);
    Ok(true)
}

/// Transport callbacks bound to one connection.
pub(crate) struct LinkCallbacks {
    connection: Weak<Connection>,
}

impl LinkCallbacks {
    pub(crate) fn new(connection: Weak<Connection>) -> Self {
        Self { connection }
    }
}

impl TransportCallbacks for LinkCallbacks {
    fn on_connected(&self, worker: Arc<dyn RemoteWorker>) {
        if let Some(connection) = self.connection.upgrade() {
            connection.on_connected(worker);
        }
    }

    fn on_disconnected(&self) {
        if let Some(connection) = self.connection.upgrade() {
            connection.on_disconnected();
        }
    }
}

pub(crate) struct ConnectionHooks {
    connection: Weak<Connection>,
}

impl ConnectionHooks {
    pub(crate) fn new(connection: Weak<Connection>) -> Self {
        Self { connection }
    }
}

impl RelayHooks for ConnectionHooks {
    fn duration(&self) -> i64 {
        self.connection
            .upgrade()
            .map_or(0, |connection| connection.query(Query::Duration).as_long())
    }

    fn start_next(&self) {
        if let Some(connection) = self.connection.upgrade() {
            connection.submit(Command::Start);
        }
    }
}
