use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::warn;

use crate::events::{FaultCause, PlayerEvent};
use crate::infra::event_hub::EventHub;
use crate::watchdog::{FaultListener, FaultReport};

/// Fault reporting for one connection.
///
/// Remembers whether the worker reported a hung engine call, and tags the
/// next call failure as a worker hang. The mark is consumed by that report.
pub(crate) struct FaultState {
    worker_hang: AtomicBool,
    hub: Arc<EventHub>,
}

impl FaultState {
    pub(crate) fn new(hub: Arc<EventHub>) -> Self {
        Self {
            worker_hang: AtomicBool::new(false),
            hub,
        }
    }

    pub(crate) fn mark_hang(&self, operation: &'static str) {
        warn!(operation, "worker reported a hung engine call");
        self.worker_hang.store(true, Ordering::Release);
    }

    pub(crate) fn report(&self, operation: &'static str, cause: FaultCause) {
        let cause = match cause {
            FaultCause::CallFailed { message } if self.worker_hang.swap(false, Ordering::AcqRel) => {
                FaultCause::WorkerHang { message }
            },
            other => other,
        };
        warn!(operation, ?cause, "fault reported");
        self.hub.emit(PlayerEvent::Fault { operation, cause });
    }
}

/// Publishes escalations of the connection's own watchdog.
pub(crate) struct WatchdogFaults {
    pub(crate) faults: Arc<FaultState>,
}

impl FaultListener for WatchdogFaults {
    fn on_fault(&self, report: &FaultReport) {
        self.faults.report(
            report.operation,
            FaultCause::TimedOut {
                deadline_ms: report.deadline.as_millis(),
            },
        );
    }
}
