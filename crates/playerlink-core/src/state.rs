use serde::{Deserialize, Serialize};

/// Lifecycle of the link between a facade and its worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// No worker bound yet.
    Init,
    /// Bind requested, waiting for the transport.
    Connecting,
    /// Worker handle live, commands dispatch immediately.
    Connected,
    /// Worker handle lost.
    Disconnected,
    /// Terminal.
    Released,
}

impl ConnectionState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
            Self::Released => "released",
        }
    }

    pub const fn is_released(self) -> bool {
        matches!(self, Self::Released)
    }

    /// States from which a bind may be (re)requested.
    pub const fn can_connect(self) -> bool {
        matches!(self, Self::Init | Self::Disconnected)
    }
}
