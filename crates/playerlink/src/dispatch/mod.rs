//! The serialized dispatch context.
//!
//! One [`DispatchActor`] per connection owns the worker handle. Commands,
//! queries and native invoke round trips all run on its thread, so no two
//! worker calls of one connection ever overlap.

pub(crate) mod faults;
pub(crate) mod handlers;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use crate::dispatch::faults::FaultState;
use crate::listeners::Listeners;
use crate::watchdog::Watchdog;
use crate::worker::RemoteWorker;

/// State shared between the connection and its dispatcher.
///
/// `epoch` advances on a synchronous reset; commands stamped with an older
/// epoch are dropped when the dispatcher reaches them.
#[derive(Default)]
pub(crate) struct DispatchGate {
    released: AtomicBool,
    epoch: AtomicU64,
}

impl DispatchGate {
    pub(crate) fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }

    pub(crate) fn release(&self) {
        self.released.store(true, Ordering::Release);
    }

    pub(crate) fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::Acquire)
    }

    pub(crate) fn advance_epoch(&self) -> u64 {
        self.epoch.fetch_add(1, Ordering::AcqRel) + 1
    }
}

pub(crate) struct DispatchActor {
    worker: Option<Arc<dyn RemoteWorker>>,
    watchdog: Arc<Watchdog>,
    gate: Arc<DispatchGate>,
    faults: Arc<FaultState>,
    listeners: Arc<Listeners>,
}

impl DispatchActor {
    pub(crate) fn new(
        watchdog: Arc<Watchdog>,
        gate: Arc<DispatchGate>,
        faults: Arc<FaultState>,
        listeners: Arc<Listeners>,
    ) -> Self {
        Self {
            worker: None,
            watchdog,
            gate,
            faults,
            listeners,
        }
    }
}

#[cfg(test)]
#[path = "../tests/dispatch.rs"]
mod tests;
