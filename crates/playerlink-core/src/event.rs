use serde::{Deserialize, Serialize};

/// Error `what` synthesized by the broker when the worker goes away unexpectedly.
pub const ERROR_WORKER_DISCONNECTED: i32 = -10001;
/// Error `what` reported when an I/O attempt could not be completed.
pub const MEDIA_ERROR_IO: i32 = -1004;
pub const MEDIA_ERROR_UNKNOWN: i32 = 1;

pub const MEDIA_INFO_STARTED_AS_NEXT: i32 = 2;
pub const MEDIA_INFO_VIDEO_RENDERING_START: i32 = 3;
pub const MEDIA_INFO_BUFFERING_START: i32 = 701;
pub const MEDIA_INFO_BUFFERING_END: i32 = 702;
pub const MEDIA_INFO_AUDIO_RENDERING_START: i32 = 10002;

/// Asynchronous notification originating from the worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    Nop,
    Prepared,
    PlaybackComplete,
    /// Buffered position, converted to a percentage by the relay.
    BufferingUpdate {
        position: i64,
    },
    SeekComplete,
    VideoSizeChanged {
        width: i32,
        height: i32,
    },
    FrameGenerated {
        timestamp: i32,
        result_code: i32,
        file_name: Option<String>,
    },
    TimedText {
        text: Option<String>,
    },
    Error {
        what: i32,
        extra: i32,
    },
    Info {
        what: i32,
        extra: i32,
    },
    VideoSarChanged {
        num: i32,
        den: i32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Nop,
    Prepared,
    PlaybackComplete,
    BufferingUpdate,
    SeekComplete,
    VideoSizeChanged,
    FrameGenerated,
    TimedText,
    Error,
    Info,
    VideoSarChanged,
}

impl EventKind {
    pub const fn code(self) -> i32 {
        match self {
            Self::Nop => 0,
            Self::Prepared => 1,
            Self::PlaybackComplete => 2,
            Self::BufferingUpdate => 3,
            Self::SeekComplete => 4,
            Self::VideoSizeChanged => 5,
            Self::FrameGenerated => 6,
            Self::TimedText => 99,
            Self::Error => 100,
            Self::Info => 200,
            Self::VideoSarChanged => 10001,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Nop => "nop",
            Self::Prepared => "prepared",
            Self::PlaybackComplete => "playback_complete",
            Self::BufferingUpdate => "buffering_update",
            Self::SeekComplete => "seek_complete",
            Self::VideoSizeChanged => "video_size_changed",
            Self::FrameGenerated => "frame_generated",
            Self::TimedText => "timed_text",
            Self::Error => "error",
            Self::Info => "info",
            Self::VideoSarChanged => "video_sar_changed",
        }
    }
}

impl Event {
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::Nop => EventKind::Nop,
            Self::Prepared => EventKind::Prepared,
            Self::PlaybackComplete => EventKind::PlaybackComplete,
            Self::BufferingUpdate { .. } => EventKind::BufferingUpdate,
            Self::SeekComplete => EventKind::SeekComplete,
            Self::VideoSizeChanged { .. } => EventKind::VideoSizeChanged,
            Self::FrameGenerated { .. } => EventKind::FrameGenerated,
            Self::TimedText { .. } => EventKind::TimedText,
            Self::Error { .. } => EventKind::Error,
            Self::Info { .. } => EventKind::Info,
            Self::VideoSarChanged { .. } => EventKind::VideoSarChanged,
        }
    }

    /// Decodes the `(what, arg1, arg2, obj)` tuple produced by the native event surface.
    ///
    /// Returns `None` for codes the broker does not know.
    pub fn from_raw(what: i32, arg1: i32, arg2: i32, obj: Option<String>) -> Option<Self> {
        let event = match what {
            0 => Self::Nop,
            1 => Self::Prepared,
            2 => Self::PlaybackComplete,
            3 => Self::BufferingUpdate {
                position: i64::from(arg1),
            },
            4 => Self::SeekComplete,
            5 => Self::VideoSizeChanged {
                width: arg1,
                height: arg2,
            },
            6 => Self::FrameGenerated {
                timestamp: arg1,
                result_code: arg2,
                file_name: obj,
            },
            99 => Self::TimedText { text: obj },
            100 => Self::Error {
                what: arg1,
                extra: arg2,
            },
            200 => Self::Info {
                what: arg1,
                extra: arg2,
            },
            10001 => Self::VideoSarChanged {
                num: arg1,
                den: arg2,
            },
            _ => return None,
        };
        Some(event)
    }

    /// Event emitted by the broker itself when the worker link drops.
    pub const fn worker_disconnected() -> Self {
        Self::Error {
            what: ERROR_WORKER_DISCONNECTED,
            extra: 0,
        }
    }
}
