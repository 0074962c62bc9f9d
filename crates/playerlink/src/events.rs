use playerlink_core::Event;

/// Why a command or call could not be completed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FaultCause {
    /// No worker handle was attached when the dispatcher reached the command.
    NoWorker,
    /// The worker rejected the call.
    CallFailed { message: String },
    /// The call did not return before the watchdog deadline.
    TimedOut { deadline_ms: u128 },
    /// The call failed after the worker reported a hung engine call.
    WorkerHang { message: String },
    /// A handler panicked on a serialized context, which then stopped.
    ContextPanicked { message: String },
}

/// Item of the broadcast feed returned by `subscribe_events`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerEvent {
    /// A worker event, in delivery order.
    Media(Event),
    /// The connection-state notification, in delivery order.
    Connection { connected: bool },
    Fault {
        operation: &'static str,
        cause: FaultCause,
    },
}
