//! Listener registrations held by a facade.
//!
//! Each kind has zero or one registration. All of them are dropped on
//! `reset_listeners` and on release.

use arc_swap::ArcSwapOption;
use playerlink_core::{InvokeArgs, InvokeKind};

/// Playback notifications. Every method defaults to a no-op.
pub trait PlayerListener: Send + Sync {
    fn on_prepared(&self) {}

    fn on_completion(&self) {}

    /// Buffered share of the media, `0..=100`.
    fn on_buffering_update(&self, _percent: i32) {}

    fn on_seek_complete(&self) {}

    fn on_video_size_changed(&self, _width: i32, _height: i32, _sar_num: i32, _sar_den: i32) {}

    /// Return `true` when handled. Unhandled errors are followed by `on_completion`.
    fn on_error(&self, _what: i32, _extra: i32) -> bool {
        false
    }

    fn on_info(&self, _what: i32, _extra: i32) -> bool {
        false
    }

    fn on_timed_text(&self, _text: Option<&str>) {}
}

pub trait ConnectionListener: Send + Sync {
    fn on_connection_changed(&self, connected: bool);
}

impl<F> ConnectionListener for F
where
    F: Fn(bool) + Send + Sync,
{
    fn on_connection_changed(&self, connected: bool) {
        self(connected)
    }
}

/// Native I/O hooks. HTTP open/seek hooks run on the dispatcher thread while
/// the engine waits for the answer; rewritten args are handed back to it.
pub trait NativeInvokeListener: Send + Sync {
    fn on_native_invoke(&self, kind: InvokeKind, args: &mut InvokeArgs) -> bool;
}

impl<F> NativeInvokeListener for F
where
    F: Fn(InvokeKind, &mut InvokeArgs) -> bool + Send + Sync,
{
    fn on_native_invoke(&self, kind: InvokeKind, args: &mut InvokeArgs) -> bool {
        self(kind, args)
    }
}

pub trait CodecSelector: Send + Sync {
    fn select_codec(&self, mime: &str, profile: i32, level: i32) -> Option<String>;
}

/// Declines every request, leaving the choice to the engine.
pub struct DefaultCodecSelector;

impl CodecSelector for DefaultCodecSelector {
    fn select_codec(&self, _mime: &str, _profile: i32, _level: i32) -> Option<String> {
        None
    }
}

pub trait ControlMessageListener: Send + Sync {
    /// URL for a concatenated-playlist segment, or `None` when it cannot be resolved.
    fn resolve_segment_url(&self, segment_index: i64) -> Option<String>;
}

impl<F> ControlMessageListener for F
where
    F: Fn(i64) -> Option<String> + Send + Sync,
{
    fn resolve_segment_url(&self, segment_index: i64) -> Option<String> {
        self(segment_index)
    }
}

/// Thumbnail extraction progress.
///
/// `result_code` is positive when extraction finished, zero while in progress
/// and negative on failure.
pub trait FrameListener: Send + Sync {
    fn on_frame_generated(&self, timestamp: i32, result_code: i32, file_name: Option<&str>);
}

impl<F> FrameListener for F
where
    F: Fn(i32, i32, Option<&str>) + Send + Sync,
{
    fn on_frame_generated(&self, timestamp: i32, result_code: i32, file_name: Option<&str>) {
        self(timestamp, result_code, file_name)
    }
}

#[derive(Default)]
pub(crate) struct Listeners {
    pub(crate) player: ArcSwapOption<Box<dyn PlayerListener>>,
    pub(crate) connection: ArcSwapOption<Box<dyn ConnectionListener>>,
    pub(crate) native_invoke: ArcSwapOption<Box<dyn NativeInvokeListener>>,
    pub(crate) codec: ArcSwapOption<Box<dyn CodecSelector>>,
    pub(crate) control: ArcSwapOption<Box<dyn ControlMessageListener>>,
    pub(crate) frame: ArcSwapOption<Box<dyn FrameListener>>,
}

impl Listeners {
    pub(crate) fn reset(&self) {
        self.player.store(None);
        self.connection.store(None);
        self.native_invoke.store(None);
        self.codec.store(None);
        self.control.store(None);
        self.frame.store(None);
    }
}
