//! Full playback facade.

mod media_info;

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose;
use playerlink_core::command::{CacheNode, DecoderKind, FloatProperty, LongProperty, SurfaceId};
use playerlink_core::{
    Command, ConnectionState, DataSource, OptionCategory, OptionValue, Query, QueryReply,
};
use tokio::sync::broadcast;

use crate::config::BrokerConfig;
use crate::connection::Connection;
use crate::error::PlayerError;
use crate::events::PlayerEvent;
use crate::listeners::{
    CodecSelector, ConnectionListener, ControlMessageListener, NativeInvokeListener,
    PlayerListener,
};
use crate::relay::{DerivedState, Role};
use crate::transport::Transport;
use crate::watchdog::{ProcessExit, Terminator};

pub use media_info::MediaInfo;

const PROTOCOL_WHITELIST: &str = "async,cache,crypto,file,http,https,ijkhttphook,ijkinject,\
ijklivehook,ijklongurl,ijksegment,ijktcphook,pipe,rtp,tcp,tls,udp,ijkurlhook,data";
const INLINE_PREFIX: &str = "data:content/type;base64,";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackType {
    Video,
    Audio,
    TimedText,
}

impl TrackType {
    const fn property(self) -> LongProperty {
        match self {
            Self::Video => LongProperty::SelectedVideoStream,
            Self::Audio => LongProperty::SelectedAudioStream,
            Self::TimedText => LongProperty::SelectedTimedTextStream,
        }
    }
}

/// Client handle of one remote playback engine.
///
/// Mutating calls never block: they are queued until the worker connects and
/// then run in call order. Getters answer documented defaults while the
/// worker is not connected.
pub struct MediaPlayer {
    connection: Arc<Connection>,
}

impl MediaPlayer {
    pub fn new(transport: Arc<dyn Transport>, config: BrokerConfig) -> Result<Self, PlayerError> {
        Self::with_terminator(transport, config, Arc::new(ProcessExit))
    }

    pub fn with_terminator(
        transport: Arc<dyn Transport>,
        config: BrokerConfig,
        terminator: Arc<dyn Terminator>,
    ) -> Result<Self, PlayerError> {
        let connection = Connection::open(transport, config, Role::Player, terminator)?;
        Ok(Self { connection })
    }

    pub fn state(&self) -> ConnectionState {
        self.connection.state()
    }

    /// Commands waiting for the worker to connect.
    pub fn pending_commands(&self) -> usize {
        self.connection.pending_len()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<PlayerEvent> {
        self.connection.subscribe()
    }

    /// Requests a new bind after the worker went away.
    pub fn reconnect(&self) -> Result<(), PlayerError> {
        self.connection.connect()
    }

    /// Terminal. Later calls are no-ops and getters return defaults.
    pub fn release(&self) {
        self.connection.release();
    }

    pub fn set_player_listener(&self, listener: Option<Box<dyn PlayerListener>>) {
        self.connection.listeners().player.store(listener.map(Arc::new));
    }

    pub fn set_connection_listener(&self, listener: Option<Box<dyn ConnectionListener>>) {
        self.connection
            .listeners()
            .connection
            .store(listener.map(Arc::new));
    }

    pub fn set_native_invoke_listener(&self, listener: Option<Box<dyn NativeInvokeListener>>) {
        self.connection
            .listeners()
            .native_invoke
            .store(listener.map(Arc::new));
    }

    pub fn set_codec_selector(&self, selector: Option<Box<dyn CodecSelector>>) {
        self.connection.listeners().codec.store(selector.map(Arc::new));
    }

    pub fn set_control_message_listener(
        &self,
        listener: Option<Box<dyn ControlMessageListener>>,
    ) {
        self.connection.listeners().control.store(listener.map(Arc::new));
    }

    pub fn reset_listeners(&self) {
        self.connection.listeners().reset();
    }

    fn submit(&self, command: Command) {
        self.connection.submit(command);
    }

    fn set_source(&self, source: DataSource) {
        self.connection.set_data_source_label(Some(source.describe()));
        self.submit(Command::SetDataSource { source });
    }

    pub fn set_data_source(&self, path: &str) -> Result<(), PlayerError> {
        if path.is_empty() {
            return Err(PlayerError::InvalidArgument {
                name: "path",
                reason: "must not be empty",
            });
        }
        self.set_source(DataSource::Path(path.to_string()));
        Ok(())
    }

    /// Sets a network source with request headers, sent as `Key: value` lines.
    pub fn set_data_source_with_headers(
        &self,
        path: &str,
        headers: &[(&str, &str)],
    ) -> Result<(), PlayerError> {
        if path.is_empty() {
            return Err(PlayerError::InvalidArgument {
                name: "path",
                reason: "must not be empty",
            });
        }
        if !headers.is_empty() {
            let joined: String = headers
                .iter()
                .map(|(key, value)| format!("{key}: {value}\r\n"))
                .collect();
            self.set_option_str(OptionCategory::Format, "headers", &joined);
            self.set_option_str(OptionCategory::Format, "protocol_whitelist", PROTOCOL_WHITELIST);
        }
        self.set_source(DataSource::PathWithHeaders {
            path: path.to_string(),
            headers: headers
                .iter()
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .collect(),
        });
        Ok(())
    }

    pub fn set_data_source_fd(&self, fd: i32) -> Result<(), PlayerError> {
        if fd < 0 {
            return Err(PlayerError::InvalidArgument {
                name: "fd",
                reason: "must be a valid descriptor",
            });
        }
        self.set_source(DataSource::Fd(fd));
        Ok(())
    }

    /// Plays an in-memory payload, handed to the engine as a base64 `data:` URL.
    pub fn set_data_source_base64(&self, payload: &[u8]) -> Result<(), PlayerError> {
        if payload.is_empty() {
            return Err(PlayerError::InvalidArgument {
                name: "payload",
                reason: "must not be empty",
            });
        }
        let url = format!("{INLINE_PREFIX}{}", general_purpose::STANDARD.encode(payload));
        self.set_source(DataSource::Inline(url));
        Ok(())
    }

    pub fn set_surface(&self, surface: Option<SurfaceId>) {
        self.submit(Command::SetSurface { surface });
    }

    pub fn prepare_async(&self) {
        self.submit(Command::PrepareAsync);
    }

    pub fn start(&self) {
        self.submit(Command::Start);
    }

    pub fn pause(&self) {
        self.submit(Command::Pause);
    }

    pub fn stop(&self) {
        self.submit(Command::Stop);
    }

    pub fn reset(&self) {
        self.submit(Command::Reset);
    }

    pub fn seek_to(&self, position_ms: i64) {
        self.submit(Command::SeekTo { position_ms });
    }

    pub fn set_volume(&self, left: f32, right: f32) {
        self.submit(Command::SetVolume { left, right });
    }

    pub fn set_looping(&self, looping: bool) {
        let count = if looping { 0 } else { 1 };
        self.set_option_int(OptionCategory::Player, "loop", i64::from(count));
        self.submit(Command::SetLoopCount { count });
    }

    /// `false` while not connected.
    pub fn is_looping(&self) -> bool {
        if self.state() != ConnectionState::Connected {
            return false;
        }
        self.connection.query(Query::LoopCount).as_int() != 1
    }

    pub fn set_speed(&self, speed: f32) {
        self.set_property_float(FloatProperty::PlaybackRate, speed);
    }

    pub fn speed(&self) -> f32 {
        self.property_float(FloatProperty::PlaybackRate, 0.0)
    }

    pub fn select_track(&self, stream: i32) {
        self.submit(Command::SelectStream {
            stream,
            select: true,
        });
    }

    pub fn deselect_track(&self, stream: i32) {
        self.submit(Command::SelectStream {
            stream,
            select: false,
        });
    }

    /// Selected stream index for `track`, `-1` when unknown.
    pub fn selected_track(&self, track: TrackType) -> i32 {
        let selected = self.property_long(track.property(), -1);
        i32::try_from(selected).unwrap_or(-1)
    }

    pub fn set_option_str(&self, category: OptionCategory, name: &str, value: &str) {
        self.submit(Command::option(
            category,
            name,
            OptionValue::Str(value.to_string()),
        ));
    }

    pub fn set_option_int(&self, category: OptionCategory, name: &str, value: i64) {
        self.submit(Command::option(category, name, OptionValue::Int(value)));
    }

    pub fn set_property_float(&self, property: FloatProperty, value: f32) {
        self.submit(Command::SetPropertyFloat { property, value });
    }

    pub fn set_property_long(&self, property: LongProperty, value: i64) {
        self.submit(Command::SetPropertyLong { property, value });
    }

    pub fn property_float(&self, property: FloatProperty, default: f32) -> f32 {
        self.connection
            .query(Query::PropertyFloat { property, default })
            .as_float()
    }

    pub fn property_long(&self, property: LongProperty, default: i64) -> i64 {
        self.connection
            .query(Query::PropertyLong { property, default })
            .as_long()
    }

    pub fn video_decoder(&self) -> DecoderKind {
        DecoderKind::from_code(self.property_long(LongProperty::VideoDecoder, 0))
    }

    pub fn audio_decoder(&self) -> DecoderKind {
        DecoderKind::from_code(self.property_long(LongProperty::AudioDecoder, 0))
    }

    pub fn video_cached_duration(&self) -> i64 {
        self.property_long(LongProperty::VideoCachedDuration, 0)
    }

    pub fn audio_cached_duration(&self) -> i64 {
        self.property_long(LongProperty::AudioCachedDuration, 0)
    }

    pub fn bit_rate(&self) -> i64 {
        self.property_long(LongProperty::BitRate, 0)
    }

    pub fn tcp_speed(&self) -> i64 {
        self.property_long(LongProperty::TcpSpeed, 0)
    }

    pub fn is_playing(&self) -> bool {
        self.connection.query(Query::IsPlaying).as_bool()
    }

    pub fn current_position(&self) -> i64 {
        self.connection.query(Query::CurrentPosition).as_long()
    }

    pub fn duration(&self) -> i64 {
        self.connection.query(Query::Duration).as_long()
    }

    pub fn audio_session_id(&self) -> i32 {
        self.connection.query(Query::AudioSessionId).as_int()
    }

    pub fn color_format_name(&self, format: i32) -> Option<String> {
        self.connection
            .query(Query::ColorFormatName { format })
            .into_text()
    }

    pub fn media_info(&self) -> MediaInfo {
        let video = self.connection.query(Query::VideoCodecInfo).into_text();
        let audio = self.connection.query(Query::AudioCodecInfo).into_text();
        let (video_decoder, video_decoder_impl) = media_info::split_codec_info(video.as_deref());
        let (audio_decoder, audio_decoder_impl) = media_info::split_codec_info(audio.as_deref());
        let meta = match self.connection.query(Query::MediaMeta) {
            QueryReply::Meta(meta) => meta,
            _ => None,
        };
        MediaInfo {
            player_name: "playerlink",
            video_decoder,
            video_decoder_impl,
            audio_decoder,
            audio_decoder_impl,
            meta,
        }
    }

    /// Client-side state derived from delivered events.
    pub fn derived_state(&self) -> DerivedState {
        self.connection.derived()
    }

    pub fn is_prepared(&self) -> bool {
        self.derived_state().prepared
    }

    pub fn video_width(&self) -> i32 {
        self.derived_state().video_width
    }

    pub fn video_height(&self) -> i32 {
        self.derived_state().video_height
    }

    pub fn video_sar_num(&self) -> i32 {
        self.derived_state().video_sar_num
    }

    pub fn video_sar_den(&self) -> i32 {
        self.derived_state().video_sar_den
    }

    pub fn buffering_percent(&self) -> i32 {
        self.derived_state().buffering_percent
    }

    pub fn data_source(&self) -> Option<String> {
        self.derived_state().data_source
    }

    pub fn profile_begin(&self, library: &str) {
        self.submit(Command::ProfileBegin {
            library: library.to_string(),
        });
    }

    pub fn profile_end(&self) {
        self.submit(Command::ProfileEnd);
    }

    pub fn set_log_level(&self, level: i32) {
        self.submit(Command::SetLogLevel { level });
    }

    pub fn enable_io_hooks(&self) {
        self.submit(Command::EnableIoHooks);
    }

    pub fn inject_cache_node(&self, node: CacheNode) {
        self.submit(Command::InjectCacheNode { node });
    }
}

impl Drop for MediaPlayer {
    fn drop(&mut self) {
        self.connection.release();
    }
}

#[cfg(test)]
#[path = "../tests/player.rs"]
mod tests;
