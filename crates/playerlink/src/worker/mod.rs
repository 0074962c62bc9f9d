//! The worker surface: what the broker calls and what calls the broker back.

mod engine;
mod host;

use std::sync::Arc;

use playerlink_core::{Command, Event, InvokeArgs, InvokeKind, Query, QueryReply};

use crate::error::{InvokeError, WorkerError};

pub use engine::{EngineCallbacks, NativeEngine, NativeEngineFactory};
pub use host::WorkerHost;

/// Handle to the worker that owns the native engine.
///
/// Only the dispatcher's serialized context calls into a `RemoteWorker`.
pub trait RemoteWorker: Send + Sync {
    fn register_client(&self, client: Arc<dyn WorkerClient>);
    fn unregister_client(&self);
    fn execute(&self, command: &Command) -> Result<(), WorkerError>;
    fn query(&self, query: &Query) -> Result<QueryReply, WorkerError>;
}

/// Callbacks from the worker into the facade that registered with it.
pub trait WorkerClient: Send + Sync {
    fn on_event(&self, event: Event);

    /// Native I/O hook. Returning `Ok(true)` tells the engine the hook was handled.
    fn on_native_invoke(
        &self,
        kind: InvokeKind,
        args: &mut InvokeArgs,
    ) -> Result<bool, InvokeError>;

    fn on_codec_select(&self, mime: &str, profile: i32, level: i32) -> Option<String>;

    /// The worker's own watchdog escalated a hung engine call.
    fn on_report_fault(&self, operation: &'static str);
}
