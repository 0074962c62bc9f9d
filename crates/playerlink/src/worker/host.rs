use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, ThreadId};

use parking_lot::{Mutex, RwLock};
use playerlink_core::{Command, CommandKind, Query, QueryReply};
use tracing::{debug, info, warn};

use crate::config::HostConfig;
use crate::error::WorkerError;
use crate::infra::native_init::NATIVE_INIT;
use crate::watchdog::{FaultListener, FaultReport, ProcessExit, Terminator, Watchdog};
use crate::worker::engine::{ClientSlot, EngineCallbacks, NativeEngine, NativeEngineFactory};
use crate::worker::{RemoteWorker, WorkerClient};

/// Forwards host watchdog escalations to the registered client.
struct ClientFaults {
    client: Arc<ClientSlot>,
}

impl FaultListener for ClientFaults {
    fn on_fault(&self, report: &FaultReport) {
        let client = self.client.read().clone();
        if let Some(client) = client {
            client.on_report_fault(report.operation);
        }
    }
}

/// Service side of the link: owns the native engine and guards every call
/// into it with its own watchdog.
pub struct WorkerHost {
    factory: Arc<dyn NativeEngineFactory>,
    engine: Mutex<Option<Box<dyn NativeEngine>>>,
    /// Thread currently inside an engine call, if any.
    engine_thread: Mutex<Option<ThreadId>>,
    /// Release requested from inside an engine call; the flag is `pause_first`.
    deferred_release: Mutex<Option<bool>>,
    client: Arc<ClientSlot>,
    watchdog: Watchdog,
    release_lock: Mutex<()>,
    released: AtomicBool,
}

impl WorkerHost {
    pub fn new(factory: Arc<dyn NativeEngineFactory>, config: HostConfig) -> std::io::Result<Self> {
        Self::with_terminator(factory, config, Arc::new(ProcessExit))
    }

    pub fn with_terminator(
        factory: Arc<dyn NativeEngineFactory>,
        config: HostConfig,
        terminator: Arc<dyn Terminator>,
    ) -> std::io::Result<Self> {
        let client: Arc<ClientSlot> = Arc::new(RwLock::new(None));
        let watchdog = Watchdog::with_terminator(config.watchdog, terminator)?;
        watchdog.set_fault_listener(Some(Box::new(ClientFaults {
            client: Arc::clone(&client),
        })));
        Ok(Self {
            factory,
            engine: Mutex::new(None),
            engine_thread: Mutex::new(None),
            deferred_release: Mutex::new(None),
            client,
            watchdog,
            release_lock: Mutex::new(()),
            released: AtomicBool::new(false),
        })
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }

    pub fn has_client(&self) -> bool {
        self.client.read().is_some()
    }

    fn create_engine(&self) -> Result<(), WorkerError> {
        if self.is_released() {
            return Err(WorkerError::Released);
        }
        NATIVE_INIT
            .ensure(|| self.factory.init_process())
            .map_err(|message| WorkerError::Engine {
                operation: "init_process",
                message,
            })?;
        let callbacks = EngineCallbacks::new(Arc::clone(&self.client));
        let operation = CommandKind::Create.as_str();
        let engine = self
            .watchdog
            .guard(operation, || {
                self.factory
                    .create(callbacks)
                    .map_err(|message| WorkerError::Engine { operation, message })
            })
            .map_err(WorkerError::from_guard)?;
        let previous = self.engine.lock().replace(engine);
        if previous.is_some() {
            warn!("engine re-created, dropping previous instance");
        }
        debug!("engine created");
        Ok(())
    }

    fn apply(&self, command: &Command) -> Result<(), WorkerError> {
        if self.is_released() {
            return Err(WorkerError::Released);
        }
        let operation = command.kind().as_str();
        self.watchdog
            .guard(operation, || {
                self.with_engine(operation, |engine| engine.apply(command))
            })
            .map_err(WorkerError::from_guard)
    }

    /// Runs `call` against the engine. Engine callbacks may release the host
    /// from inside `call`; that release runs once `call` has returned.
    fn with_engine<T>(
        &self,
        operation: &'static str,
        call: impl FnOnce(&mut dyn NativeEngine) -> Result<T, String>,
    ) -> Result<T, WorkerError> {
        let mut slot = self.engine.lock();
        *self.engine_thread.lock() = Some(thread::current().id());
        let result = match slot.as_mut() {
            Some(engine) => {
                call(engine.as_mut()).map_err(|message| WorkerError::Engine { operation, message })
            },
            None => Err(WorkerError::Engine {
                operation,
                message: "engine not created".to_string(),
            }),
        };
        self.engine_thread.lock().take();
        let deferred = self.deferred_release.lock().take();
        if let Some(pause_first) = deferred
            && let Some(engine) = slot.take()
        {
            drop(slot);
            debug!(operation, "running release deferred by an engine callback");
            if let Err(error) = self.release_instance(engine, pause_first) {
                warn!(%error, "deferred engine release failed");
            }
        }
        result
    }

    /// Releases the engine once. Later and concurrent callers return immediately.
    pub fn release_engine(&self) -> Result<(), WorkerError> {
        self.release_with(false)
    }

    /// Handles the death of the registered client: pause, then release.
    pub fn client_died(&self) {
        if !self.has_client() {
            return;
        }
        info!("client went away, releasing engine");
        if let Err(error) = self.release_with(true) {
            warn!(%error, "engine release after client death failed");
        }
        self.unregister_client();
    }

    fn release_with(&self, pause_first: bool) -> Result<(), WorkerError> {
        let Some(_release) = self.release_lock.try_lock() else {
            return Ok(());
        };
        if self.released.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        if *self.engine_thread.lock() == Some(thread::current().id()) {
            // The engine lock is held further up this thread's stack.
            *self.deferred_release.lock() = Some(pause_first);
            return Ok(());
        }
        let Some(engine) = self.engine.lock().take() else {
            return Ok(());
        };
        self.release_instance(engine, pause_first)
    }

    fn release_instance(
        &self,
        mut engine: Box<dyn NativeEngine>,
        pause_first: bool,
    ) -> Result<(), WorkerError> {
        let operation = CommandKind::Release.as_str();
        self.watchdog
            .guard(operation, || {
                if pause_first && let Err(message) = engine.apply(&Command::Pause) {
                    debug!(%message, "pause before release failed");
                }
                engine
                    .apply(&Command::Release)
                    .map_err(|message| WorkerError::Engine { operation, message })
            })
            .map_err(WorkerError::from_guard)
    }
}

impl RemoteWorker for WorkerHost {
    fn register_client(&self, client: Arc<dyn WorkerClient>) {
        *self.client.write() = Some(client);
    }

    fn unregister_client(&self) {
        self.client.write().take();
    }

    fn execute(&self, command: &Command) -> Result<(), WorkerError> {
        match command {
            Command::Create => self.create_engine(),
            Command::Release => self.release_engine(),
            _ => self.apply(command),
        }
    }

    fn query(&self, query: &Query) -> Result<QueryReply, WorkerError> {
        if self.is_released() {
            return Err(WorkerError::Released);
        }
        let operation = query.as_str();
        self.watchdog
            .guard(operation, || {
                self.with_engine(operation, |engine| engine.query(query))
            })
            .map_err(WorkerError::from_guard)
    }
}

#[cfg(test)]
#[path = "../tests/worker_host.rs"]
mod tests;
