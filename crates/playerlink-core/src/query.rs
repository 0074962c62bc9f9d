use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::command::{FloatProperty, LongProperty};

/// Direct synchronous getters answered by the worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Query {
    IsPlaying,
    CurrentPosition,
    Duration,
    LoopCount,
    PropertyFloat { property: FloatProperty, default: f32 },
    PropertyLong { property: LongProperty, default: i64 },
    AudioSessionId,
    VideoCodecInfo,
    AudioCodecInfo,
    MediaMeta,
    ColorFormatName { format: i32 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum QueryReply {
    Bool(bool),
    Long(i64),
    Int(i32),
    Float(f32),
    Text(Option<String>),
    Meta(Option<BTreeMap<String, String>>),
}

impl Query {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::IsPlaying => "is_playing",
            Self::CurrentPosition => "current_position",
            Self::Duration => "duration",
            Self::LoopCount => "loop_count",
            Self::PropertyFloat { .. } => "property_float",
            Self::PropertyLong { .. } => "property_long",
            Self::AudioSessionId => "audio_session_id",
            Self::VideoCodecInfo => "video_codec_info",
            Self::AudioCodecInfo => "audio_codec_info",
            Self::MediaMeta => "media_meta",
            Self::ColorFormatName { .. } => "color_format_name",
        }
    }

    /// Reply used whenever the worker cannot be asked.
    pub fn default_reply(&self) -> QueryReply {
        match self {
            Self::IsPlaying => QueryReply::Bool(false),
            Self::CurrentPosition | Self::Duration => QueryReply::Long(0),
            Self::LoopCount | Self::AudioSessionId => QueryReply::Int(0),
            Self::PropertyFloat { default, .. } => QueryReply::Float(*default),
            Self::PropertyLong { default, .. } => QueryReply::Long(*default),
            Self::VideoCodecInfo | Self::AudioCodecInfo | Self::ColorFormatName { .. } => {
                QueryReply::Text(None)
            },
            Self::MediaMeta => QueryReply::Meta(None),
        }
    }

    /// Whether `reply` has the shape this query expects.
    pub fn accepts(&self, reply: &QueryReply) -> bool {
        matches!(
            (self, reply),
            (Self::IsPlaying, QueryReply::Bool(_))
                | (
                    Self::CurrentPosition | Self::Duration | Self::PropertyLong { .. },
                    QueryReply::Long(_)
                )
                | (Self::LoopCount | Self::AudioSessionId, QueryReply::Int(_))
                | (Self::PropertyFloat { .. }, QueryReply::Float(_))
                | (
                    Self::VideoCodecInfo | Self::AudioCodecInfo | Self::ColorFormatName { .. },
                    QueryReply::Text(_)
                )
                | (Self::MediaMeta, QueryReply::Meta(_))
        )
    }
}

impl QueryReply {
    pub fn as_bool(&self) -> bool {
        matches!(self, Self::Bool(true))
    }

    pub fn as_long(&self) -> i64 {
        match self {
            Self::Long(value) => *value,
            Self::Int(value) => i64::from(*value),
            _ => 0,
        }
    }

    pub fn as_int(&self) -> i32 {
        match self {
            Self::Int(value) => *value,
            _ => 0,
        }
    }

    pub fn as_float(&self) -> f32 {
        match self {
            Self::Float(value) => *value,
            _ => 0.0,
        }
    }

    pub fn into_text(self) -> Option<String> {
        match self {
            Self::Text(value) => value,
            _ => None,
        }
    }

    pub fn into_meta(self) -> Option<BTreeMap<String, String>> {
        match self {
            Self::Meta(value) => value,
            _ => None,
        }
    }
}
