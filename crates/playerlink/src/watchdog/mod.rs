//! Deadline protection for blocking calls.
//!
//! [`Watchdog::guard`] arms a ticket, runs the operation on the calling thread
//! and disarms the ticket when the operation returns. A dedicated timer thread
//! escalates every ticket whose deadline passes while still armed. Escalation
//! state lives on the ticket, so concurrent hangs are each reported once.

mod terminator;

use std::collections::HashMap;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use arc_swap::ArcSwapOption;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use tracing::{debug, error, warn};

use crate::config::WatchdogConfig;
use crate::error::GuardError;

pub use terminator::{ProcessExit, Terminator};

/// Escalation of a ticket whose deadline passed before disarm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaultReport {
    pub ticket: u64,
    pub operation: &'static str,
    pub deadline: Duration,
}

/// Receives watchdog escalations. Runs on the watchdog timer thread.
pub trait FaultListener: Send + Sync {
    fn on_fault(&self, report: &FaultReport);
}

enum TimerControl {
    Armed,
    Shutdown,
}

enum Disarm {
    Armed,
    Fired,
    Cancelled,
}

struct Ticket {
    operation: &'static str,
    deadline: Duration,
    expires_at: Instant,
    fired: bool,
}

#[derive(Default)]
struct TicketTable {
    next_id: u64,
    tickets: HashMap<u64, Ticket>,
}

struct Shared {
    config: WatchdogConfig,
    table: Mutex<TicketTable>,
    listener: ArcSwapOption<Box<dyn FaultListener>>,
    terminator: Arc<dyn Terminator>,
}

impl Shared {
    fn next_wait(&self, now: Instant) -> Option<Duration> {
        let table = self.table.lock();
        table
            .tickets
            .values()
            .filter(|ticket| !ticket.fired)
            .map(|ticket| ticket.expires_at.saturating_duration_since(now))
            .min()
    }

    fn collect_expired(&self, now: Instant) -> Vec<FaultReport> {
        let mut table = self.table.lock();
        let mut expired = Vec::new();
        for (id, ticket) in table.tickets.iter_mut() {
            if ticket.fired || ticket.expires_at > now {
                continue;
            }
            ticket.fired = true;
            expired.push(FaultReport {
                ticket: *id,
                operation: ticket.operation,
                deadline: ticket.deadline,
            });
        }
        expired.sort_by_key(|report| report.ticket);
        expired
    }

    fn escalate(&self, report: &FaultReport) {
        error!(
            operation = report.operation,
            ticket = report.ticket,
            deadline_ms = u64::try_from(report.deadline.as_millis()).unwrap_or(u64::MAX),
            "guarded call exceeded its deadline"
        );
        if let Some(listener) = self.listener.load_full() {
            listener.on_fault(report);
        }
        if self.config.strict {
            self.terminator.terminate(self.config.exit_code);
        }
    }
}

pub struct Watchdog {
    shared: Arc<Shared>,
    timer_tx: Sender<TimerControl>,
    join: Option<JoinHandle<()>>,
}

impl Watchdog {
    pub fn start(config: WatchdogConfig) -> std::io::Result<Self> {
        Self::with_terminator(config, Arc::new(ProcessExit))
    }

    pub fn with_terminator(
        config: WatchdogConfig,
        terminator: Arc<dyn Terminator>,
    ) -> std::io::Result<Self> {
        let thread_name = config.thread_name.clone();
        let shared = Arc::new(Shared {
            config,
            table: Mutex::new(TicketTable::default()),
            listener: ArcSwapOption::new(None),
            terminator,
        });
        let (timer_tx, timer_rx) = crossbeam_channel::unbounded();
        let timer_shared = Arc::clone(&shared);
        let join = thread::Builder::new()
            .name(thread_name)
            .spawn(move || run_timer(timer_shared, timer_rx))?;
        Ok(Self {
            shared,
            timer_tx,
            join: Some(join),
        })
    }

    pub fn deadline(&self) -> Duration {
        self.shared.config.deadline
    }

    pub fn set_fault_listener(&self, listener: Option<Box<dyn FaultListener>>) {
        self.shared.listener.store(listener.map(Arc::new));
    }

    /// Runs `op` under the configured deadline.
    pub fn guard<T, E>(
        &self,
        operation: &'static str,
        op: impl FnOnce() -> Result<T, E>,
    ) -> Result<T, GuardError<E>> {
        self.guard_with_deadline(operation, self.shared.config.deadline, op)
    }

    /// Runs `op` under an explicit deadline.
    ///
    /// An error returned by `op` before the deadline is propagated as
    /// [`GuardError::Failed`] without escalation. Once the ticket fired, the
    /// call is failed with [`GuardError::TimedOut`] even if `op` returns later.
    pub fn guard_with_deadline<T, E>(
        &self,
        operation: &'static str,
        deadline: Duration,
        op: impl FnOnce() -> Result<T, E>,
    ) -> Result<T, GuardError<E>> {
        let ticket = self.arm(operation, deadline);
        let armed = ArmedTicket {
            watchdog: self,
            id: Some(ticket),
        };
        let result = op();
        match armed.disarm() {
            Disarm::Fired => {
                warn!(operation, ticket, "guarded call returned after escalation");
                Err(GuardError::TimedOut {
                    operation,
                    deadline_ms: deadline.as_millis(),
                })
            },
            Disarm::Armed | Disarm::Cancelled => result.map_err(GuardError::Failed),
        }
    }

    /// Drops every outstanding ticket without escalating it.
    pub fn cancel_all(&self) -> usize {
        let mut table = self.shared.table.lock();
        let cancelled = table.tickets.len();
        table.tickets.clear();
        if cancelled > 0 {
            debug!(cancelled, "watchdog tickets cancelled");
        }
        cancelled
    }

    /// Tickets currently armed or fired and not yet disarmed.
    pub fn in_flight(&self) -> usize {
        self.shared.table.lock().tickets.len()
    }

    fn arm(&self, operation: &'static str, deadline: Duration) -> u64 {
        let id = {
            let mut table = self.shared.table.lock();
            table.next_id += 1;
            let id = table.next_id;
            table.tickets.insert(
                id,
                Ticket {
                    operation,
                    deadline,
                    expires_at: Instant::now() + deadline,
                    fired: false,
                },
            );
            id
        };
        let _ = self.timer_tx.send(TimerControl::Armed);
        id
    }

    fn disarm(&self, id: u64) -> Disarm {
        let mut table = self.shared.table.lock();
        match table.tickets.remove(&id) {
            Some(ticket) if ticket.fired => Disarm::Fired,
            Some(_) => Disarm::Armed,
            None => Disarm::Cancelled,
        }
    }
}

/// Disarms its ticket if the guarded call unwinds.
struct ArmedTicket<'a> {
    watchdog: &'a Watchdog,
    id: Option<u64>,
}

impl ArmedTicket<'_> {
    fn disarm(mut self) -> Disarm {
        match self.id.take() {
            Some(id) => self.watchdog.disarm(id),
            None => Disarm::Cancelled,
        }
    }
}

impl Drop for ArmedTicket<'_> {
    fn drop(&mut self) {
        if let Some(id) = self.id.take() {
            self.watchdog.disarm(id);
        }
    }
}

impl Drop for Watchdog {
    fn drop(&mut self) {
        let _ = self.timer_tx.send(TimerControl::Shutdown);
        if let Some(join) = self.join.take()
            && join.thread().id() != thread::current().id()
        {
            let _ = join.join();
        }
    }
}

fn run_timer(shared: Arc<Shared>, rx: Receiver<TimerControl>) {
    loop {
        let received = match shared.next_wait(Instant::now()) {
            Some(wait) => rx.recv_timeout(wait),
            None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };
        match received {
            Ok(TimerControl::Armed) | Err(RecvTimeoutError::Timeout) => {},
            Ok(TimerControl::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
        }
        for report in shared.collect_expired(Instant::now()) {
            shared.escalate(&report);
        }
    }
}

#[cfg(test)]
#[path = "../tests/watchdog.rs"]
mod tests;
