use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use playerlink_core::command::{DecoderKind, LongProperty};
use playerlink_core::event::ERROR_WORKER_DISCONNECTED;
use playerlink_core::{
    Command, CommandKind, ConnectionState, DataSource, Event, InvokeArgs, InvokeKind,
    OptionCategory, OptionValue, Query, QueryReply,
};

use super::{MediaInfo, MediaPlayer, PROTOCOL_WHITELIST, TrackType};
use crate::config::HostConfig;
use crate::error::PlayerError;
use crate::listeners::{NativeInvokeListener, PlayerListener};
use crate::test_support::{
    ChannelListener, Heard, ManualTransport, RecordingFactory, RecordingTerminator,
    RecordingWorker, WAIT, drain, eventually, test_config,
};
use crate::transport::LocalTransport;

fn player() -> (Arc<ManualTransport>, MediaPlayer) {
    let transport = ManualTransport::new();
    let (terminator, _exits) = RecordingTerminator::new();
    let player = MediaPlayer::with_terminator(
        transport.clone(),
        test_config(Duration::from_millis(500)),
        terminator,
    )
    .expect("player");
    (transport, player)
}

fn connect(transport: &ManualTransport, player: &MediaPlayer) -> Arc<RecordingWorker> {
    let worker = RecordingWorker::new();
    transport.connect(worker.clone());
    assert_eq!(player.state(), ConnectionState::Connected);
    assert!(eventually(|| worker.count(CommandKind::Create) == 1));
    worker
}

fn option(category: OptionCategory, name: &str, value: OptionValue) -> Command {
    Command::option(category, name, value)
}

#[test]
fn invalid_sources_are_rejected_up_front() {
    let (_transport, player) = player();
    assert!(matches!(
        player.set_data_source(""),
        Err(PlayerError::InvalidArgument { name: "path", .. })
    ));
    assert!(matches!(
        player.set_data_source_with_headers("", &[("Referer", "x")]),
        Err(PlayerError::InvalidArgument { name: "path", .. })
    ));
    assert!(matches!(
        player.set_data_source_fd(-1),
        Err(PlayerError::InvalidArgument { name: "fd", .. })
    ));
    assert!(matches!(
        player.set_data_source_base64(&[]),
        Err(PlayerError::InvalidArgument { name: "payload", .. })
    ));
    assert_eq!(player.pending_commands(), 0);
    assert_eq!(player.data_source(), None);
}

#[test]
fn calls_before_connect_are_queued_in_order() {
    let (transport, player) = player();
    player.set_data_source("file:///media/clip.mp4").expect("source");
    player.prepare_async();
    player.start();
    assert_eq!(player.pending_commands(), 3);
    assert_eq!(player.data_source().as_deref(), Some("file:///media/clip.mp4"));

    let worker = connect(&transport, &player);
    assert!(eventually(|| worker.executed().len() == 4));
    assert_eq!(
        worker.kinds(),
        vec![
            CommandKind::Create,
            CommandKind::SetDataSource,
            CommandKind::PrepareAsync,
            CommandKind::Start
        ]
    );
}

#[test]
fn headers_are_sent_as_format_options() {
    let (transport, player) = player();
    player
        .set_data_source_with_headers(
            "https://media.example/live.m3u8",
            &[("Referer", "https://media.example"), ("User-Agent", "playerlink/1")],
        )
        .expect("source");
    let worker = connect(&transport, &player);
    assert!(eventually(|| worker.executed().len() == 4));

    let executed = worker.executed();
    assert_eq!(
        executed[1],
        option(
            OptionCategory::Format,
            "headers",
            OptionValue::Str(
                "Referer: https://media.example\r\nUser-Agent: playerlink/1\r\n".to_string()
            )
        )
    );
    assert_eq!(
        executed[2],
        option(
            OptionCategory::Format,
            "protocol_whitelist",
            OptionValue::Str(PROTOCOL_WHITELIST.to_string())
        )
    );
    assert!(matches!(
        &executed[3],
        Command::SetDataSource {
            source: DataSource::PathWithHeaders { path, headers }
        } if path == "https://media.example/live.m3u8" && headers.len() == 2
    ));
}

#[test]
fn inline_payload_becomes_a_data_url() {
    let (transport, player) = player();
    player.set_data_source_base64(b"hello").expect("source");
    assert_eq!(
        player.data_source().as_deref(),
        Some("data:content/type;base64,aGVsbG8")
    );
    let worker = connect(&transport, &player);
    assert!(eventually(|| worker.executed().len() == 2));
    assert_eq!(
        worker.executed()[1],
        Command::SetDataSource {
            source: DataSource::Inline("data:content/type;base64,aGVsbG8=".to_string())
        }
    );
}

#[test]
fn looping_sets_option_and_loop_count() {
    let (transport, player) = player();
    assert!(!player.is_looping());
    player.set_looping(true);
    player.set_looping(false);

    let worker = connect(&transport, &player);
    assert!(eventually(|| worker.executed().len() == 5));
    assert_eq!(
        worker.executed()[1..].to_vec(),
        vec![
            option(OptionCategory::Player, "loop", OptionValue::Int(0)),
            Command::SetLoopCount { count: 0 },
            option(OptionCategory::Player, "loop", OptionValue::Int(1)),
            Command::SetLoopCount { count: 1 },
        ]
    );

    worker.script.reply(&Query::LoopCount, QueryReply::Int(0));
    assert!(player.is_looping());
    worker.script.reply(&Query::LoopCount, QueryReply::Int(1));
    assert!(!player.is_looping());
}

#[test]
fn getters_answer_defaults_until_connected() {
    let (_transport, player) = player();
    assert!(!player.is_playing());
    assert_eq!(player.current_position(), 0);
    assert_eq!(player.duration(), 0);
    assert_eq!(player.audio_session_id(), 0);
    assert_eq!(player.selected_track(TrackType::Video), -1);
    assert_eq!(player.speed(), 0.0);
    assert_eq!(player.video_decoder(), DecoderKind::Unknown);
    assert_eq!(player.color_format_name(19), None);
    assert_eq!(
        player.media_info(),
        MediaInfo {
            player_name: "playerlink",
            ..MediaInfo::default()
        }
    );
}

#[test]
fn getters_read_worker_answers() {
    let (transport, player) = player();
    let worker = connect(&transport, &player);
    worker.script.reply(&Query::Duration, QueryReply::Long(90_000));
    worker.script.reply(
        &Query::VideoCodecInfo,
        QueryReply::Text(Some("h264,MediaCodec".to_string())),
    );
    worker
        .script
        .reply(&Query::AudioCodecInfo, QueryReply::Text(Some("aac".to_string())));
    let meta = BTreeMap::from([("format".to_string(), "mp4".to_string())]);
    worker
        .script
        .reply(&Query::MediaMeta, QueryReply::Meta(Some(meta.clone())));
    worker.script.reply(
        &Query::PropertyLong {
            property: LongProperty::SelectedAudioStream,
            default: -1,
        },
        QueryReply::Long(2),
    );

    assert_eq!(player.duration(), 90_000);
    assert_eq!(player.selected_track(TrackType::Audio), 2);
    assert_eq!(
        player.media_info(),
        MediaInfo {
            player_name: "playerlink",
            video_decoder: Some("h264".to_string()),
            video_decoder_impl: Some("MediaCodec".to_string()),
            audio_decoder: Some("aac".to_string()),
            audio_decoder_impl: Some(String::new()),
            meta: Some(meta),
        }
    );
}

#[test]
fn track_selection_commands() {
    let (transport, player) = player();
    player.select_track(3);
    player.deselect_track(3);
    player.set_speed(1.5);
    let worker = connect(&transport, &player);
    assert!(eventually(|| worker.executed().len() == 4));
    assert_eq!(
        worker.kinds()[1..].to_vec(),
        vec![
            CommandKind::SelectStream,
            CommandKind::SelectStream,
            CommandKind::SetPropertyFloat
        ]
    );
}

#[test]
fn derived_state_follows_worker_events() {
    let (transport, player) = player();
    let worker = connect(&transport, &player);
    worker.post(Event::VideoSizeChanged {
        width: 1920,
        height: 1080,
    });
    worker.post(Event::VideoSarChanged { num: 1, den: 1 });
    worker.post(Event::Prepared);

    assert!(eventually(|| player.is_prepared()));
    assert_eq!((player.video_width(), player.video_height()), (1920, 1080));
    assert_eq!((player.video_sar_num(), player.video_sar_den()), (1, 1));
}

#[test]
fn released_player_ignores_calls() {
    let (transport, player) = player();
    let worker = connect(&transport, &player);
    player.release();

    player.start();
    player.seek_to(10);
    assert_eq!(player.pending_commands(), 0);
    assert_eq!(player.state(), ConnectionState::Released);
    assert_eq!(player.duration(), 0);
    assert!(matches!(player.reconnect(), Err(PlayerError::Released)));
    assert_eq!(
        worker.kinds(),
        vec![CommandKind::Create, CommandKind::Release]
    );
}

#[test]
fn dropping_the_player_releases_it() {
    let (transport, player) = player();
    let worker = connect(&transport, &player);
    drop(player);
    assert_eq!(transport.unbinds(), 1);
    assert_eq!(worker.count(CommandKind::Release), 1);
}

fn local_player() -> (Arc<RecordingFactory>, Arc<LocalTransport>, MediaPlayer) {
    let factory = RecordingFactory::new();
    let (terminator, _exits) = RecordingTerminator::new();
    let transport = Arc::new(LocalTransport::with_terminator(
        factory.clone(),
        HostConfig::default(),
        terminator.clone(),
    ));
    let player = MediaPlayer::with_terminator(
        transport.clone(),
        test_config(Duration::from_millis(500)),
        terminator,
    )
    .expect("player");
    (factory, transport, player)
}

#[test]
fn local_worker_runs_the_engine() {
    let (factory, _transport, player) = local_player();
    let (listener, heard) = ChannelListener::new(true);
    player.set_player_listener(Some(listener as Box<dyn PlayerListener>));
    player.set_data_source("file:///media/clip.mp4").expect("source");
    player.prepare_async();
    player.start();

    assert!(eventually(|| factory.applied().len() == 3));
    assert_eq!(
        factory.applied_kinds(),
        vec![
            CommandKind::SetDataSource,
            CommandKind::PrepareAsync,
            CommandKind::Start
        ]
    );
    assert_eq!(player.state(), ConnectionState::Connected);
    assert_eq!(factory.creates(), 1);

    let callbacks = factory.callbacks().expect("engine callbacks");
    callbacks.post_event(1, 0, 0, None);
    assert_eq!(heard.recv_timeout(WAIT), Ok(Heard::Prepared));
    assert!(player.is_prepared());
}

#[test]
fn buffering_percent_uses_worker_duration() {
    let (factory, _transport, player) = local_player();
    let (listener, heard) = ChannelListener::new(true);
    player.set_player_listener(Some(listener as Box<dyn PlayerListener>));
    factory.script.reply(&Query::Duration, QueryReply::Long(1000));

    assert!(eventually(|| factory.callbacks().is_some()));
    let callbacks = factory.callbacks().expect("engine callbacks");
    callbacks.post_event(3, 500, 0, None);
    callbacks.post_event(3, 1500, 0, None);

    assert_eq!(drain(&heard), vec![Heard::Buffering(50), Heard::Buffering(100)]);
    assert_eq!(player.buffering_percent(), 100);
}

#[test]
fn started_as_next_restarts_playback() {
    let (factory, _transport, player) = local_player();
    assert!(eventually(|| factory.callbacks().is_some()));
    factory
        .callbacks()
        .expect("engine callbacks")
        .post_event(200, 2, 0, None);
    assert!(eventually(|| factory.applied_kinds() == vec![CommandKind::Start]));
    drop(player);
}

#[test]
fn worker_loss_is_reported_and_recoverable() {
    let (factory, transport, player) = local_player();
    let (listener, heard) = ChannelListener::new(true);
    player.set_player_listener(Some(listener as Box<dyn PlayerListener>));
    assert!(eventually(|| player.state() == ConnectionState::Connected));

    transport.disconnect();
    assert_eq!(
        heard.recv_timeout(WAIT),
        Ok(Heard::Error(ERROR_WORKER_DISCONNECTED, 0))
    );
    assert_eq!(player.state(), ConnectionState::Disconnected);
    assert_eq!(player.current_position(), 0);

    player.pause();
    player.reconnect().expect("reconnect");
    assert!(eventually(|| player.state() == ConnectionState::Connected));
    assert!(eventually(|| factory.applied_kinds().ends_with(&[CommandKind::Pause])));
    assert_eq!(factory.creates(), 2);
}

#[test]
fn release_tears_down_the_local_worker() {
    let (factory, transport, player) = local_player();
    assert!(eventually(|| factory.creates() == 1));
    let host = transport.host().expect("bound host");
    player.release();
    assert!(host.is_released());
    assert!(transport.host().is_none());
    assert_eq!(factory.applied_kinds(), vec![CommandKind::Release]);
}

#[test]
fn release_from_a_hook_raised_inside_an_engine_call() {
    let (factory, transport, player) = local_player();
    assert!(eventually(|| factory.creates() == 1));
    let host = transport.host().expect("bound host");
    factory
        .script
        .invoke_during(CommandKind::PrepareAsync, InvokeKind::DidHttpOpen);
    let target = Arc::downgrade(&player.connection);
    let listener: Box<dyn NativeInvokeListener> =
        Box::new(move |_kind: InvokeKind, _args: &mut InvokeArgs| {
            if let Some(connection) = target.upgrade() {
                connection.release();
            }
            true
        });
    player.set_native_invoke_listener(Some(listener));

    player.prepare_async();

    assert!(eventually(|| transport.host().is_none()));
    assert!(host.is_released());
    assert_eq!(player.state(), ConnectionState::Released);
    assert_eq!(
        factory.applied_kinds(),
        vec![CommandKind::PrepareAsync, CommandKind::Release]
    );
}
