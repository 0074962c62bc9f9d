//! Thumbnail extraction facade over the same broker as [`crate::MediaPlayer`].

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use base64::Engine;
use base64::engine::general_purpose;
use playerlink_core::command::FrameExtraction;
use playerlink_core::{Command, ConnectionState, DataSource, OptionCategory, OptionValue};
use tokio::sync::broadcast;

use crate::config::BrokerConfig;
use crate::connection::Connection;
use crate::error::PlayerError;
use crate::events::PlayerEvent;
use crate::listeners::{ConnectionListener, FrameListener};
use crate::relay::Role;
use crate::transport::Transport;
use crate::watchdog::{ProcessExit, Terminator};

pub struct MetadataRetriever {
    connection: Arc<Connection>,
    start_ms: AtomicI64,
}

fn invalid(name: &'static str, reason: &'static str) -> PlayerError {
    PlayerError::InvalidArgument { name, reason }
}

impl MetadataRetriever {
    pub fn new(transport: Arc<dyn Transport>, config: BrokerConfig) -> Result<Self, PlayerError> {
        Self::with_terminator(transport, config, Arc::new(ProcessExit))
    }

    pub fn with_terminator(
        transport: Arc<dyn Transport>,
        config: BrokerConfig,
        terminator: Arc<dyn Terminator>,
    ) -> Result<Self, PlayerError> {
        let connection = Connection::open(transport, config, Role::Retriever, terminator)?;
        Ok(Self {
            connection,
            start_ms: AtomicI64::new(0),
        })
    }

    pub fn state(&self) -> ConnectionState {
        self.connection.state()
    }

    pub fn pending_commands(&self) -> usize {
        self.connection.pending_len()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<PlayerEvent> {
        self.connection.subscribe()
    }

    pub fn set_frame_listener(&self, listener: Option<Box<dyn FrameListener>>) {
        self.connection.listeners().frame.store(listener.map(Arc::new));
    }

    pub fn set_connection_listener(&self, listener: Option<Box<dyn ConnectionListener>>) {
        self.connection
            .listeners()
            .connection
            .store(listener.map(Arc::new));
    }

    fn set_source(&self, source: DataSource) {
        self.connection.set_data_source_label(Some(source.describe()));
        self.connection.submit(Command::SetDataSource { source });
    }

    pub fn set_data_source(&self, path: &str) -> Result<(), PlayerError> {
        if path.is_empty() {
            return Err(invalid("path", "must not be empty"));
        }
        self.set_source(DataSource::Path(path.to_string()));
        Ok(())
    }

    pub fn set_data_source_fd(&self, fd: i32) -> Result<(), PlayerError> {
        if fd < 0 {
            return Err(invalid("fd", "must be a valid descriptor"));
        }
        self.set_source(DataSource::Fd(fd));
        Ok(())
    }

    pub fn set_data_source_base64(&self, payload: &[u8]) -> Result<(), PlayerError> {
        if payload.is_empty() {
            return Err(invalid("payload", "must not be empty"));
        }
        let encoded = general_purpose::STANDARD.encode(payload);
        self.set_source(DataSource::Inline(format!(
            "data:content/type;base64,{encoded}"
        )));
        Ok(())
    }

    pub fn set_option_str(&self, category: OptionCategory, name: &str, value: &str) {
        self.connection.submit(Command::option(
            category,
            name,
            OptionValue::Str(value.to_string()),
        ));
    }

    pub fn set_option_int(&self, category: OptionCategory, name: &str, value: i64) {
        self.connection
            .submit(Command::option(category, name, OptionValue::Int(value)));
    }

    /// Validates and queues a frame extraction request.
    pub fn init(&self, request: FrameExtraction) -> Result<(), PlayerError> {
        if request.cache_dir.is_empty() {
            return Err(invalid("cache_dir", "must not be empty"));
        }
        if request.start_ms < 0 || request.end_ms < 0 {
            return Err(invalid("range", "bounds must not be negative"));
        }
        if request.end_ms < request.start_ms {
            return Err(invalid("range", "end must not precede start"));
        }
        if request.count <= 0 {
            return Err(invalid("count", "must be positive"));
        }
        self.start_ms.store(request.start_ms, Ordering::Relaxed);
        self.connection.submit(Command::ExtractFrames { request });
        Ok(())
    }

    /// Seeks to the requested start and begins extraction.
    pub fn start(&self) {
        let start_ms = self.start_ms.load(Ordering::Relaxed);
        self.set_option_int(OptionCategory::Player, "seek-at-start", start_ms);
        self.connection.submit(Command::PrepareAsync);
    }

    pub fn seek_to(&self, position_ms: i64) {
        self.connection.submit(Command::SeekTo { position_ms });
    }

    /// Drops queued work, then pauses and resets the worker and waits for it.
    pub fn sync_reset(&self) {
        self.connection.sync_reset();
    }

    pub fn release(&self) {
        self.connection.release();
    }
}

impl Drop for MetadataRetriever {
    fn drop(&mut self) {
        self.connection.release();
    }
}

#[cfg(test)]
#[path = "../tests/retriever.rs"]
mod tests;
