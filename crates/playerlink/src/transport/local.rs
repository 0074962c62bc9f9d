use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::config::HostConfig;
use crate::error::TransportError;
use crate::transport::{Transport, TransportCallbacks};
use crate::watchdog::{ProcessExit, Terminator};
use crate::worker::{NativeEngineFactory, RemoteWorker, WorkerHost};

#[derive(Default)]
struct Link {
    callbacks: Option<Arc<dyn TransportCallbacks>>,
    host: Option<Arc<WorkerHost>>,
}

/// In-process transport: every bind creates a fresh [`WorkerHost`] and
/// announces it from a short-lived binder thread.
pub struct LocalTransport {
    factory: Arc<dyn NativeEngineFactory>,
    config: HostConfig,
    terminator: Arc<dyn Terminator>,
    link: Mutex<Link>,
}

impl LocalTransport {
    pub fn new(factory: Arc<dyn NativeEngineFactory>, config: HostConfig) -> Self {
        Self::with_terminator(factory, config, Arc::new(ProcessExit))
    }

    pub fn with_terminator(
        factory: Arc<dyn NativeEngineFactory>,
        config: HostConfig,
        terminator: Arc<dyn Terminator>,
    ) -> Self {
        Self {
            factory,
            config,
            terminator,
            link: Mutex::new(Link::default()),
        }
    }

    /// Host of the active binding.
    pub fn host(&self) -> Option<Arc<WorkerHost>> {
        self.link.lock().host.clone()
    }

    /// Simulates the worker going away: the engine is released and the bound
    /// client is told it lost the connection.
    pub fn disconnect(&self) {
        let Link { callbacks, host } = std::mem::take(&mut *self.link.lock());
        if let Some(host) = host
            && let Err(error) = host.release_engine()
        {
            warn!(%error, "engine release on disconnect failed");
        }
        if let Some(callbacks) = callbacks {
            callbacks.on_disconnected();
        }
    }
}

impl Transport for LocalTransport {
    fn bind(&self, callbacks: Arc<dyn TransportCallbacks>) -> Result<(), TransportError> {
        let mut link = self.link.lock();
        if link.callbacks.is_some() {
            return Err(TransportError::AlreadyBound);
        }
        let host = WorkerHost::with_terminator(
            Arc::clone(&self.factory),
            self.config.clone(),
            Arc::clone(&self.terminator),
        )
        .map(Arc::new)
        .map_err(|error| TransportError::BindFailed {
            reason: error.to_string(),
        })?;

        let worker: Arc<dyn RemoteWorker> = host.clone();
        let announce = Arc::clone(&callbacks);
        thread::Builder::new()
            .name("playerlink-bind".to_string())
            .spawn(move || announce.on_connected(worker))
            .map_err(|error| TransportError::BindFailed {
                reason: error.to_string(),
            })?;

        link.callbacks = Some(callbacks);
        link.host = Some(host);
        debug!("local worker bound");
        Ok(())
    }

    fn unbind(&self) {
        let Link { host, .. } = std::mem::take(&mut *self.link.lock());
        if let Some(host) = host {
            host.client_died();
            debug!("local worker unbound");
        }
    }
}
