//! Typed error enums for the broker layers.
//!
//! [`PlayerError`] is the only error returned synchronously to facade callers.
//! Command-path failures never reach the caller; they surface as
//! [`crate::PlayerEvent::Fault`] instead.

use playerlink_runtime::CallError;
use thiserror::Error;

/// Failures of calls made on a [`crate::worker::RemoteWorker`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkerError {
    /// No worker handle is attached.
    #[error("worker is not connected")]
    Disconnected,
    /// The worker engine was already released.
    #[error("worker engine is released")]
    Released,
    /// The native engine rejected the call.
    #[error("engine call '{operation}' failed: {message}")]
    Engine {
        /// Operation identity of the failed call.
        operation: &'static str,
        /// Engine-provided failure description.
        message: String,
    },
    /// The call exceeded the watchdog deadline.
    #[error("engine call '{operation}' exceeded {deadline_ms}ms")]
    TimedOut {
        /// Operation identity of the hung call.
        operation: &'static str,
        /// Deadline that elapsed.
        deadline_ms: u128,
    },
}

impl WorkerError {
    pub(crate) fn from_guard(error: GuardError<WorkerError>) -> Self {
        match error {
            GuardError::Failed(error) => error,
            GuardError::TimedOut {
                operation,
                deadline_ms,
            } => Self::TimedOut {
                operation,
                deadline_ms,
            },
        }
    }
}

/// Outcome of a watchdog-guarded operation that did not succeed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GuardError<E> {
    /// The operation returned an error before the deadline.
    #[error("guarded operation failed: {0}")]
    Failed(E),
    /// The deadline fired before the operation returned.
    #[error("guarded operation '{operation}' timed out after {deadline_ms}ms")]
    TimedOut {
        /// Operation identity used when arming the ticket.
        operation: &'static str,
        /// Deadline used for the ticket.
        deadline_ms: u128,
    },
}

#[derive(Debug, Error)]
pub enum TransportError {
    /// The transport could not start binding.
    #[error("transport bind failed: {reason}")]
    BindFailed {
        /// Human-readable failure cause.
        reason: String,
    },
    /// A bind is already active on this transport.
    #[error("transport is already bound")]
    AlreadyBound,
}

#[derive(Debug, Error)]
pub enum PlayerError {
    /// A call-site argument violates the API contract.
    #[error("invalid argument '{name}': {reason}")]
    InvalidArgument {
        /// Parameter name.
        name: &'static str,
        /// Violated constraint.
        reason: &'static str,
    },
    /// The facade was released.
    #[error("player is released")]
    Released,
    /// The transport refused to bind.
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// A serialized execution context could not be spawned.
    #[error("failed to spawn {context} context: {source}")]
    SpawnContext {
        /// Context name.
        context: &'static str,
        /// I/O error returned by thread spawn.
        #[source]
        source: std::io::Error,
    },
}

/// Failures of a native invoke round trip.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvokeError {
    /// The engine asked for a segment with a negative index.
    #[error("invalid segment index {index}")]
    InvalidSegmentIndex {
        /// Index reported by the engine.
        index: i64,
    },
    /// The control listener did not supply a URL for the segment.
    #[error("no url resolved for segment {index}")]
    MissingUrl {
        /// Segment index that could not be resolved.
        index: i64,
    },
    /// The round trip could not be completed.
    #[error("native invoke '{operation}' unavailable: {reason}")]
    Unavailable {
        /// Invoke kind identity.
        operation: &'static str,
        /// Why the round trip did not complete.
        reason: &'static str,
    },
}

impl InvokeError {
    pub(crate) fn from_call_error(operation: &'static str, err: CallError) -> Self {
        let reason = match err {
            CallError::Closed | CallError::Stopped => "dispatcher exited",
            CallError::Timeout => "dispatcher did not answer before the deadline",
        };
        Self::Unavailable { operation, reason }
    }
}
