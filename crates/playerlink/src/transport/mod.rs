//! Binding to a worker.
//!
//! A transport announces the worker handle through [`TransportCallbacks`]
//! once binding completes, and reports its loss the same way. Callbacks may
//! arrive on any thread, including while the facade is still inside `bind`.

mod local;

use std::sync::Arc;

use crate::error::TransportError;
use crate::worker::RemoteWorker;

pub use local::LocalTransport;

pub trait TransportCallbacks: Send + Sync {
    fn on_connected(&self, worker: Arc<dyn RemoteWorker>);
    fn on_disconnected(&self);
}

pub trait Transport: Send + Sync {
    /// Starts binding. Success means binding was initiated, not that a worker
    /// is connected yet.
    fn bind(&self, callbacks: Arc<dyn TransportCallbacks>) -> Result<(), TransportError>;

    /// Drops the binding. No callback is delivered afterwards.
    fn unbind(&self);
}
