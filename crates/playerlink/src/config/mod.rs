//! Broker and worker-host configuration.
//!
//! Every struct implements [`Default`] and deserializes with all fields
//! optional, so embedders can load partial JSON or TOML documents.

/// Per-facade broker settings.
pub mod broker;
/// Call-protection watchdog settings.
pub mod watchdog;

pub use broker::{BrokerConfig, DeliveryMode, DispatchConfig, HostConfig, RelayConfig};
pub use watchdog::WatchdogConfig;

/// Serializes a [`std::time::Duration`] as whole milliseconds.
pub(crate) mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub(crate) fn serialize<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let millis = u64::try_from(value.as_millis()).unwrap_or(u64::MAX);
        serializer.serialize_u64(millis)
    }

    pub(crate) fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
