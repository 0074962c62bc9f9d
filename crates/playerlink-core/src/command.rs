use serde::{Deserialize, Serialize};

/// Option namespaces understood by the native engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionCategory {
    Format,
    Codec,
    Sws,
    Player,
}

impl OptionCategory {
    pub const fn code(self) -> i32 {
        match self {
            Self::Format => 1,
            Self::Codec => 2,
            Self::Sws => 3,
            Self::Player => 4,
        }
    }

    pub const fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(Self::Format),
            2 => Some(Self::Codec),
            3 => Some(Self::Sws),
            4 => Some(Self::Player),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptionValue {
    Str(String),
    Int(i64),
}

/// Float-valued engine properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FloatProperty {
    VideoDecodeFramesPerSecond,
    VideoOutputFramesPerSecond,
    PlaybackRate,
}

impl FloatProperty {
    pub const fn code(self) -> i32 {
        match self {
            Self::VideoDecodeFramesPerSecond => 10001,
            Self::VideoOutputFramesPerSecond => 10002,
            Self::PlaybackRate => 10003,
        }
    }
}

/// Integer-valued engine properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LongProperty {
    SelectedVideoStream,
    SelectedAudioStream,
    SelectedTimedTextStream,
    VideoDecoder,
    AudioDecoder,
    VideoCachedDuration,
    AudioCachedDuration,
    VideoCachedBytes,
    AudioCachedBytes,
    VideoCachedPackets,
    AudioCachedPackets,
    BitRate,
    TcpSpeed,
    AsyncStatisticBufBackwards,
    AsyncStatisticBufForwards,
    AsyncStatisticBufCapacity,
    TrafficStatisticByteCount,
    CachePhysicalPosition,
    CacheFileForwards,
    CacheFilePosition,
    CacheCountBytes,
    LatestSeekLoadDuration,
}

impl LongProperty {
    pub const fn code(self) -> i32 {
        match self {
            Self::SelectedVideoStream => 20001,
            Self::SelectedAudioStream => 20002,
            Self::VideoDecoder => 20003,
            Self::AudioDecoder => 20004,
            Self::VideoCachedDuration => 20005,
            Self::AudioCachedDuration => 20006,
            Self::VideoCachedBytes => 20007,
            Self::AudioCachedBytes => 20008,
            Self::VideoCachedPackets => 20009,
            Self::AudioCachedPackets => 20010,
            Self::SelectedTimedTextStream => 20011,
            Self::BitRate => 20100,
            Self::TcpSpeed => 20200,
            Self::AsyncStatisticBufBackwards => 20201,
            Self::AsyncStatisticBufForwards => 20202,
            Self::AsyncStatisticBufCapacity => 20203,
            Self::TrafficStatisticByteCount => 20204,
            Self::CachePhysicalPosition => 20205,
            Self::CacheFileForwards => 20206,
            Self::CacheFilePosition => 20207,
            Self::CacheCountBytes => 20208,
            Self::LatestSeekLoadDuration => 20300,
        }
    }
}

/// Values reported by [`LongProperty::VideoDecoder`] and [`LongProperty::AudioDecoder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DecoderKind {
    Unknown,
    AvCodec,
    MediaCodec,
    VideoToolbox,
}

impl DecoderKind {
    pub const fn from_code(code: i64) -> Self {
        match code {
            1 => Self::AvCodec,
            2 => Self::MediaCodec,
            3 => Self::VideoToolbox,
            _ => Self::Unknown,
        }
    }
}

/// Opaque handle of a render target owned by the embedding application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SurfaceId(pub u64);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataSource {
    Path(String),
    PathWithHeaders {
        path: String,
        headers: Vec<(String, String)>,
    },
    Fd(i32),
    /// Payload already encoded as a `data:` URL.
    Inline(String),
}

impl DataSource {
    /// Text recorded as the current data source on the client side.
    pub fn describe(&self) -> String {
        match self {
            Self::Path(path) | Self::PathWithHeaders { path, .. } => path.clone(),
            Self::Fd(fd) => format!("fd:{fd}"),
            Self::Inline(url) => url.chars().take(32).collect(),
        }
    }
}

/// Thumbnail extraction request issued by the metadata retriever.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameExtraction {
    pub cache_dir: String,
    pub start_ms: i64,
    pub end_ms: i64,
    pub count: i32,
    pub definition: i32,
}

/// One entry of the engine's on-disk segment cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheNode {
    pub index: i32,
    pub file_logical_pos: i64,
    pub physical_pos: i64,
    pub cache_size: i64,
    pub file_size: i64,
}

/// Mutating instruction destined for the worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Command {
    Create,
    PrepareAsync,
    Start,
    Pause,
    Stop,
    Reset,
    Release,
    SetSurface {
        surface: Option<SurfaceId>,
    },
    SetDataSource {
        source: DataSource,
    },
    SetOption {
        category: OptionCategory,
        name: String,
        value: OptionValue,
    },
    SeekTo {
        position_ms: i64,
    },
    SelectStream {
        stream: i32,
        select: bool,
    },
    SetLoopCount {
        count: i32,
    },
    SetPropertyFloat {
        property: FloatProperty,
        value: f32,
    },
    SetPropertyLong {
        property: LongProperty,
        value: i64,
    },
    SetVolume {
        left: f32,
        right: f32,
    },
    ProfileBegin {
        library: String,
    },
    ProfileEnd,
    SetLogLevel {
        level: i32,
    },
    EnableIoHooks,
    InjectCacheNode {
        node: CacheNode,
    },
    ExtractFrames {
        request: FrameExtraction,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    Create,
    PrepareAsync,
    Start,
    Pause,
    Stop,
    Reset,
    Release,
    SetSurface,
    SetDataSource,
    SetOption,
    SeekTo,
    SelectStream,
    SetLoopCount,
    SetPropertyFloat,
    SetPropertyLong,
    SetVolume,
    ProfileBegin,
    ProfileEnd,
    SetLogLevel,
    EnableIoHooks,
    InjectCacheNode,
    ExtractFrames,
}

impl CommandKind {
    /// Stable identifier used in logs and fault reports.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::PrepareAsync => "prepare_async",
            Self::Start => "start",
            Self::Pause => "pause",
            Self::Stop => "stop",
            Self::Reset => "reset",
            Self::Release => "release",
            Self::SetSurface => "set_surface",
            Self::SetDataSource => "set_data_source",
            Self::SetOption => "set_option",
            Self::SeekTo => "seek_to",
            Self::SelectStream => "select_stream",
            Self::SetLoopCount => "set_loop_count",
            Self::SetPropertyFloat => "set_property_float",
            Self::SetPropertyLong => "set_property_long",
            Self::SetVolume => "set_volume",
            Self::ProfileBegin => "profile_begin",
            Self::ProfileEnd => "profile_end",
            Self::SetLogLevel => "set_log_level",
            Self::EnableIoHooks => "enable_io_hooks",
            Self::InjectCacheNode => "inject_cache_node",
            Self::ExtractFrames => "extract_frames",
        }
    }
}

impl Command {
    pub const fn kind(&self) -> CommandKind {
        match self {
            Self::Create => CommandKind::Create,
            Self::PrepareAsync => CommandKind::PrepareAsync,
            Self::Start => CommandKind::Start,
            Self::Pause => CommandKind::Pause,
            Self::Stop => CommandKind::Stop,
            Self::Reset => CommandKind::Reset,
            Self::Release => CommandKind::Release,
            Self::SetSurface { .. } => CommandKind::SetSurface,
            Self::SetDataSource { .. } => CommandKind::SetDataSource,
            Self::SetOption { .. } => CommandKind::SetOption,
            Self::SeekTo { .. } => CommandKind::SeekTo,
            Self::SelectStream { .. } => CommandKind::SelectStream,
            Self::SetLoopCount { .. } => CommandKind::SetLoopCount,
            Self::SetPropertyFloat { .. } => CommandKind::SetPropertyFloat,
            Self::SetPropertyLong { .. } => CommandKind::SetPropertyLong,
            Self::SetVolume { .. } => CommandKind::SetVolume,
            Self::ProfileBegin { .. } => CommandKind::ProfileBegin,
            Self::ProfileEnd => CommandKind::ProfileEnd,
            Self::SetLogLevel { .. } => CommandKind::SetLogLevel,
            Self::EnableIoHooks => CommandKind::EnableIoHooks,
            Self::InjectCacheNode { .. } => CommandKind::InjectCacheNode,
            Self::ExtractFrames { .. } => CommandKind::ExtractFrames,
        }
    }

    pub fn option(category: OptionCategory, name: impl Into<String>, value: OptionValue) -> Self {
        Self::SetOption {
            category,
            name: name.into(),
            value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Command, CommandKind, DataSource, OptionCategory, OptionValue};

    #[test]
    fn option_category_codes_round_trip() {
        for category in [
            OptionCategory::Format,
            OptionCategory::Codec,
            OptionCategory::Sws,
            OptionCategory::Player,
        ] {
            assert_eq!(OptionCategory::from_code(category.code()), Some(category));
        }
        assert_eq!(OptionCategory::from_code(0), None);
    }

    #[test]
    fn command_kind_names_operation() {
        let command = Command::option(OptionCategory::Player, "loop", OptionValue::Int(0));
        assert_eq!(command.kind(), CommandKind::SetOption);
        assert_eq!(command.kind().as_str(), "set_option");
        assert_eq!(Command::SeekTo { position_ms: 5 }.kind().as_str(), "seek_to");
    }

    #[test]
    fn data_source_description_hides_inline_payload() {
        assert_eq!(DataSource::Fd(7).describe(), "fd:7");
        let inline = DataSource::Inline(format!("data:content/type;base64,{}", "A".repeat(64)));
        assert_eq!(inline.describe().len(), 32);
    }

    #[test]
    fn commands_serialize_with_variant_tags() {
        let json = serde_json::to_string(&Command::SetLoopCount { count: 1 }).expect("serialize");
        assert_eq!(json, r#"{"SetLoopCount":{"count":1}}"#);
    }
}
