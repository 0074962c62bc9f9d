use std::sync::Arc;

use parking_lot::RwLock;
use playerlink_core::{Command, Event, InvokeArgs, InvokeKind, Query, QueryReply};
use tracing::{debug, warn};

use crate::error::InvokeError;
use crate::worker::WorkerClient;

pub(crate) type ClientSlot = RwLock<Option<Arc<dyn WorkerClient>>>;

/// Opaque control surface of the native playback engine. Every call may block.
pub trait NativeEngine: Send {
    fn apply(&mut self, command: &Command) -> Result<(), String>;
    fn query(&mut self, query: &Query) -> Result<QueryReply, String>;
}

pub trait NativeEngineFactory: Send + Sync {
    /// Loads libraries and performs global native setup. Called at most once
    /// successfully per process.
    fn init_process(&self) -> Result<(), String>;

    fn create(&self, callbacks: EngineCallbacks) -> Result<Box<dyn NativeEngine>, String>;
}

/// Event surface handed to a native engine on creation.
///
/// Calls are forwarded to whichever client is registered at the time; with no
/// client they are dropped.
#[derive(Clone)]
pub struct EngineCallbacks {
    client: Arc<ClientSlot>,
}

impl EngineCallbacks {
    pub(crate) fn new(client: Arc<ClientSlot>) -> Self {
        Self { client }
    }

    fn client(&self) -> Option<Arc<dyn WorkerClient>> {
        self.client.read().clone()
    }

    /// Posts a raw `(what, arg1, arg2, obj)` notification.
    pub fn post_event(&self, what: i32, arg1: i32, arg2: i32, obj: Option<String>) {
        let Some(event) = Event::from_raw(what, arg1, arg2, obj) else {
            warn!(what, arg1, arg2, "dropping unknown engine event");
            return;
        };
        match self.client() {
            Some(client) => client.on_event(event),
            None => debug!(kind = event.kind().as_str(), "no client registered for event"),
        }
    }

    /// Raises a native I/O hook and waits for the client's answer.
    pub fn native_invoke(&self, code: i32, args: &mut InvokeArgs) -> Result<bool, InvokeError> {
        let Some(kind) = InvokeKind::from_code(code) else {
            warn!(code, "unknown native invoke code");
            return Ok(false);
        };
        match self.client() {
            Some(client) => client.on_native_invoke(kind, args),
            None => Ok(false),
        }
    }

    pub fn select_codec(&self, mime: &str, profile: i32, level: i32) -> Option<String> {
        self.client()?.on_codec_select(mime, profile, level)
    }
}
