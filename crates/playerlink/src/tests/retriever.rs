use std::sync::Arc;
use std::time::Duration;

use playerlink_core::command::FrameExtraction;
use playerlink_core::{
    Command, CommandKind, ConnectionState, DataSource, Event, OptionCategory, OptionValue,
};

use super::MetadataRetriever;
use crate::error::PlayerError;
use crate::listeners::FrameListener;
use crate::test_support::{
    FrameChannel, ManualTransport, RecordingTerminator, RecordingWorker, drain, eventually,
    test_config,
};

fn retriever() -> (Arc<ManualTransport>, MetadataRetriever) {
    let transport = ManualTransport::new();
    let (terminator, _exits) = RecordingTerminator::new();
    let retriever = MetadataRetriever::with_terminator(
        transport.clone(),
        test_config(Duration::from_millis(500)),
        terminator,
    )
    .expect("retriever");
    (transport, retriever)
}

fn request(start_ms: i64, end_ms: i64, count: i32) -> FrameExtraction {
    FrameExtraction {
        cache_dir: "/tmp/thumbs".to_string(),
        start_ms,
        end_ms,
        count,
        definition: 160,
    }
}

#[test]
fn init_rejects_bad_requests() {
    let (_transport, retriever) = retriever();
    let empty_dir = FrameExtraction {
        cache_dir: String::new(),
        ..request(0, 1000, 4)
    };
    let cases = [
        (empty_dir, "cache_dir"),
        (request(-1, 1000, 4), "range"),
        (request(2000, 1000, 4), "range"),
        (request(0, 1000, 0), "count"),
    ];
    for (request, expected) in cases {
        match retriever.init(request) {
            Err(PlayerError::InvalidArgument { name, .. }) => assert_eq!(name, expected),
            other => panic!("expected invalid {expected}, got {other:?}"),
        }
    }
    assert_eq!(retriever.pending_commands(), 0);
}

#[test]
fn start_seeks_to_the_requested_start_then_prepares() {
    let (transport, retriever) = retriever();
    retriever.set_data_source("file:///media/clip.mp4").expect("source");
    retriever.init(request(1500, 9000, 8)).expect("init");
    retriever.start();

    let worker = RecordingWorker::new();
    transport.connect(worker.clone());
    assert!(eventually(|| worker.executed().len() == 5));
    assert_eq!(
        worker.executed()[1..].to_vec(),
        vec![
            Command::SetDataSource {
                source: DataSource::Path("file:///media/clip.mp4".to_string())
            },
            Command::ExtractFrames {
                request: request(1500, 9000, 8)
            },
            Command::option(OptionCategory::Player, "seek-at-start", OptionValue::Int(1500)),
            Command::PrepareAsync,
        ]
    );
}

#[test]
fn frames_reach_the_frame_listener() {
    let (transport, retriever) = retriever();
    let (listener, frames) = FrameChannel::new();
    retriever.set_frame_listener(Some(listener as Box<dyn FrameListener>));
    let worker = RecordingWorker::new();
    transport.connect(worker.clone());
    assert!(eventually(|| worker.registrations() == 1));

    worker.post(Event::FrameGenerated {
        timestamp: 0,
        result_code: 0,
        file_name: Some("/tmp/thumbs/0.jpg".to_string()),
    });
    worker.post(Event::FrameGenerated {
        timestamp: 1000,
        result_code: 1,
        file_name: Some("/tmp/thumbs/1.jpg".to_string()),
    });
    worker.post(Event::Error { what: 1, extra: 0 });

    assert_eq!(
        drain(&frames),
        vec![
            (0, 0, Some("/tmp/thumbs/0.jpg".to_string())),
            (1000, 1, Some("/tmp/thumbs/1.jpg".to_string())),
            (0, -1, None),
        ]
    );
}

#[test]
fn sync_reset_pauses_and_resets_before_returning() {
    let (transport, retriever) = retriever();
    let worker = RecordingWorker::new();
    transport.connect(worker.clone());
    retriever.seek_to(500);
    retriever.sync_reset();
    assert_eq!(worker.count(CommandKind::Pause), 1);
    assert_eq!(worker.count(CommandKind::Reset), 1);
    assert_eq!(worker.kinds().first().copied(), Some(CommandKind::Create));
    assert_eq!(worker.kinds().last().copied(), Some(CommandKind::Reset));
}

#[test]
fn released_retriever_stays_released() {
    let (transport, retriever) = retriever();
    retriever.release();
    retriever.init(request(0, 1000, 2)).expect("validated even after release");
    retriever.start();
    assert_eq!(retriever.pending_commands(), 0);
    assert_eq!(retriever.state(), ConnectionState::Released);
    drop(retriever);
    assert_eq!(transport.unbinds(), 1);
}
