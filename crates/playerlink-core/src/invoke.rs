use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub const ARG_URL: &str = "url";
pub const ARG_SEGMENT_INDEX: &str = "segment_index";
pub const ARG_RETRY_COUNTER: &str = "retry_counter";
pub const ARG_ERROR: &str = "error";
pub const ARG_FAMILY: &str = "family";
pub const ARG_IP: &str = "ip";
pub const ARG_PORT: &str = "port";
pub const ARG_FD: &str = "fd";
pub const ARG_OFFSET: &str = "offset";
pub const ARG_HTTP_CODE: &str = "http_code";

/// Hooks raised by the native I/O layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvokeKind {
    WillHttpOpen,
    DidHttpOpen,
    WillHttpSeek,
    DidHttpSeek,
    WillTcpOpen,
    DidTcpOpen,
    CtrlWillHttpOpen,
    WillLiveOpen,
    WillConcatResolveSegment,
}

impl InvokeKind {
    pub const fn code(self) -> i32 {
        match self {
            Self::WillHttpOpen => 0x1,
            Self::DidHttpOpen => 0x2,
            Self::WillHttpSeek => 0x3,
            Self::DidHttpSeek => 0x4,
            Self::WillTcpOpen => 0x20001,
            Self::DidTcpOpen => 0x20002,
            Self::CtrlWillHttpOpen => 0x20003,
            Self::WillLiveOpen => 0x20005,
            Self::WillConcatResolveSegment => 0x20007,
        }
    }

    pub const fn from_code(code: i32) -> Option<Self> {
        match code {
            0x1 => Some(Self::WillHttpOpen),
            0x2 => Some(Self::DidHttpOpen),
            0x3 => Some(Self::WillHttpSeek),
            0x4 => Some(Self::DidHttpSeek),
            0x20001 => Some(Self::WillTcpOpen),
            0x20002 => Some(Self::DidTcpOpen),
            0x20003 => Some(Self::CtrlWillHttpOpen),
            0x20005 => Some(Self::WillLiveOpen),
            0x20007 => Some(Self::WillConcatResolveSegment),
            _ => None,
        }
    }

    /// HTTP open/seek lifecycle hooks. These expect a reply before the native
    /// call proceeds.
    pub const fn is_http_lifecycle(self) -> bool {
        matches!(
            self,
            Self::WillHttpOpen | Self::DidHttpOpen | Self::WillHttpSeek | Self::DidHttpSeek
        )
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::WillHttpOpen => "will_http_open",
            Self::DidHttpOpen => "did_http_open",
            Self::WillHttpSeek => "will_http_seek",
            Self::DidHttpSeek => "did_http_seek",
            Self::WillTcpOpen => "will_tcp_open",
            Self::DidTcpOpen => "did_tcp_open",
            Self::CtrlWillHttpOpen => "ctrl_will_http_open",
            Self::WillLiveOpen => "will_live_open",
            Self::WillConcatResolveSegment => "will_concat_resolve_segment",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InvokeValue {
    Int(i64),
    Str(String),
}

/// String-keyed argument bag passed alongside an [`InvokeKind`].
///
/// Listeners may rewrite entries; the rewritten bag is handed back to the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InvokeArgs(BTreeMap<String, InvokeValue>);

impl InvokeArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_str(mut self, key: &str, value: impl Into<String>) -> Self {
        self.put_str(key, value);
        self
    }

    pub fn with_int(mut self, key: &str, value: i64) -> Self {
        self.put_int(key, value);
        self
    }

    pub fn put_str(&mut self, key: &str, value: impl Into<String>) {
        self.0
            .insert(key.to_string(), InvokeValue::Str(value.into()));
    }

    pub fn put_int(&mut self, key: &str, value: i64) {
        self.0.insert(key.to_string(), InvokeValue::Int(value));
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        match self.0.get(key) {
            Some(InvokeValue::Str(value)) => Some(value.as_str()),
            _ => None,
        }
    }

    /// Integer entry, accepting decimal strings as well.
    pub fn get_int(&self, key: &str) -> Option<i64> {
        match self.0.get(key)? {
            InvokeValue::Int(value) => Some(*value),
            InvokeValue::Str(value) => value.trim().parse().ok(),
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<InvokeValue> {
        self.0.remove(key)
    }

    pub fn url(&self) -> Option<&str> {
        self.get_str(ARG_URL)
    }

    pub fn set_url(&mut self, url: impl Into<String>) {
        self.put_str(ARG_URL, url);
    }

    pub fn segment_index(&self) -> Option<i64> {
        self.get_int(ARG_SEGMENT_INDEX)
    }

    pub fn retry_counter(&self) -> Option<i64> {
        self.get_int(ARG_RETRY_COUNTER)
    }

    pub fn http_code(&self) -> Option<i64> {
        self.get_int(ARG_HTTP_CODE)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
