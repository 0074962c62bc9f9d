use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::duration_ms;
use crate::config::watchdog::WatchdogConfig;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Upper bound for direct synchronous getters.
    #[serde(with = "duration_ms")]
    pub query_timeout: Duration,
    /// How long `release` waits for the dispatcher to finish tearing down.
    #[serde(with = "duration_ms")]
    pub release_timeout: Duration,
    pub thread_name: String,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            query_timeout: Duration::from_millis(1000),
            release_timeout: Duration::from_millis(3000),
            thread_name: "playerlink-dispatch".to_string(),
        }
    }
}

/// Where listener callbacks run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMode {
    /// A dedicated delivery thread owned by the facade.
    #[default]
    Dedicated,
    /// The thread that hands the event to the relay: the bind thread, an
    /// engine thread or the dispatcher. Intake order is kept, but callbacks
    /// have no fixed thread. Intended for tests and embeddings that already
    /// serialize their own callbacks.
    Inline,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub delivery: DeliveryMode,
    /// Skip buffering updates that repeat the previous percentage.
    pub coalesce_buffering: bool,
    /// Capacity of the broadcast feed returned by `subscribe_events`.
    pub event_capacity: usize,
    pub thread_name: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            delivery: DeliveryMode::Dedicated,
            coalesce_buffering: false,
            event_capacity: 256,
            thread_name: "playerlink-relay".to_string(),
        }
    }
}

/// Settings for one facade and its connection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    pub watchdog: WatchdogConfig,
    pub dispatch: DispatchConfig,
    pub relay: RelayConfig,
}

/// Settings for the worker side.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    pub watchdog: WatchdogConfig,
}
