#![deny(clippy::wildcard_imports)]

//! Command/event broker between media facades and a worker that owns the
//! native playback engine.

pub mod config;
mod connection;
mod dispatch;
pub mod error;
pub mod events;
pub mod infra;
pub mod listeners;
mod player;
mod relay;
mod retriever;
pub mod transport;
pub mod watchdog;
pub mod worker;

pub use config::{
    BrokerConfig, DeliveryMode, DispatchConfig, HostConfig, RelayConfig, WatchdogConfig,
};
pub use error::{GuardError, InvokeError, PlayerError, TransportError, WorkerError};
pub use events::{FaultCause, PlayerEvent};
pub use infra::logging::init_tracing;
pub use listeners::{
    CodecSelector, ConnectionListener, ControlMessageListener, DefaultCodecSelector,
    FrameListener, NativeInvokeListener, PlayerListener,
};
pub use player::{MediaInfo, MediaPlayer, TrackType};
pub use relay::DerivedState;
pub use retriever::MetadataRetriever;
pub use transport::{LocalTransport, Transport, TransportCallbacks};
pub use watchdog::{FaultListener, FaultReport, ProcessExit, Terminator, Watchdog};
pub use worker::{
    EngineCallbacks, NativeEngine, NativeEngineFactory, RemoteWorker, WorkerClient, WorkerHost,
};

#[cfg(test)]
#[path = "tests/support/mod.rs"]
mod test_support;
