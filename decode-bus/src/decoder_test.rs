#![cfg(unix)]

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::DecoderConfig;
use crate::decoder::{DecoderState, VideoDecoder};
use crate::error::DecodeError;
use crate::frame::{FrameGeometry, FrameLimits};
use crate::process::DecodeProcess;
use crate::queue::{WorkItem, WorkQueue, WorkSink};

fn geometry() -> FrameGeometry {
    FrameGeometry::new(3, 2).unwrap()
}

/// `count` frames where every byte of frame `i` encodes its index and offset.
fn frame_bytes(count: usize) -> Vec<u8> {
    let len = geometry().frame_len();
    (0..count * len)
        .map(|i| ((i / len) * 16 + i % len) as u8)
        .collect()
}

/// Writes `data` to a temp file and returns its path.
fn temp_stream(name: &str, data: &[u8]) -> PathBuf {
    let mut path = std::env::temp_dir();
    path.push(format!(
        "decode_bus_test_{}_{}.rgb",
        std::process::id(),
        name
    ));
    std::fs::write(&path, data).unwrap();
    path
}

fn cat(path: &Path) -> DecodeProcess {
    let mut command = Command::new("cat");
    command.arg(path);
    DecodeProcess::spawn(command).unwrap()
}

fn drain<S>(queue: &WorkQueue<S>) -> Vec<WorkItem<S>> {
    std::iter::from_fn(|| queue.blocking_recv()).collect()
}

#[test]
fn test_emits_one_item_per_pair() {
    let len = geometry().frame_len();
    for count in [0usize, 1, 2, 5] {
        let data = frame_bytes(count);
        let path = temp_stream(&format!("pairs_{}", count), &data);
        let (sender, queue) = WorkQueue::<&'static str>::with_capacity(16);
        let decoder = VideoDecoder::from_process(
            cat(&path),
            geometry(),
            FrameLimits::unlimited(),
            sender,
            "denoise",
        );
        assert_eq!(decoder.state(), DecoderState::Created);

        let outcome = decoder.run();
        let items = drain(&queue);
        std::fs::remove_file(&path).ok();

        assert_eq!(outcome.state, DecoderState::Depleted);
        assert!(outcome.last_error().is_none(), "count {}", count);
        assert_eq!(outcome.frames_read, count as u64);
        assert_eq!(outcome.items_enqueued, count.saturating_sub(1) as u64);
        assert!(outcome.exit_status.is_some_and(|status| status.success()));

        assert_eq!(items.len(), count.saturating_sub(1));
        for (position, item) in items.into_iter().enumerate() {
            let k = position + 1;
            let (index, (previous, current), settings) = item.into_parts();
            assert_eq!(index, k as u64);
            assert_eq!(previous.as_raw(), &data[(k - 1) * len..k * len]);
            assert_eq!(current.as_raw(), &data[k * len..(k + 1) * len]);
            assert_eq!(settings, "denoise");
        }
    }
}

#[test]
fn test_trailing_bytes_fail_without_partial_frame() {
    let len = geometry().frame_len();
    let mut data = frame_bytes(3);
    data.extend_from_slice(&[0xAA; 5]);
    let path = temp_stream("trailing", &data);
    let (sender, queue) = WorkQueue::<()>::with_capacity(16);

    let outcome =
        VideoDecoder::from_process(cat(&path), geometry(), FrameLimits::unlimited(), sender, ())
            .run();
    let items = drain(&queue);
    std::fs::remove_file(&path).ok();

    assert_eq!(outcome.state, DecoderState::Failed);
    match outcome.last_error() {
        Some(DecodeError::InsufficientFrameData { expected, received }) => {
            assert_eq!(*expected, len);
            assert_eq!(*received, 5);
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(outcome.frames_read, 3);
    assert!(outcome.exit_status.is_some());
    assert_eq!(items.len(), 2);
    assert!(items.iter().all(|item| item.frames.current.as_raw().len() == len));
}

#[test]
fn test_stop_before_exhaustion() {
    let mut command = Command::new("cat");
    command.arg("/dev/zero");
    let capacity = 4;
    let (sender, queue) = WorkQueue::<u32>::with_capacity(capacity);
    let decoder = VideoDecoder::from_process(
        DecodeProcess::spawn(command).unwrap(),
        geometry(),
        FrameLimits::unlimited(),
        sender,
        7,
    )
    .spawn()
    .unwrap();

    for expected in 1..=3u64 {
        let item = queue.blocking_recv().expect("item before stop");
        assert_eq!(item.index, expected);
    }
    decoder.stop();

    // the loop may finish the cycle in flight; anything queued is drained here
    let rest = drain(&queue);
    assert!(rest.len() <= capacity + 1, "{} items after stop", rest.len());
    assert_eq!(decoder.state(), DecoderState::Exited);

    let outcome = decoder.join();
    assert_eq!(outcome.state, DecoderState::Stopped);
    assert!(outcome.last_error().is_none());
    assert!(outcome.exit_status.is_some());
    assert_eq!(outcome.items_enqueued, 3 + rest.len() as u64);
}

#[test]
fn test_missing_binary_fails_synchronously() {
    let (sender, queue) = WorkQueue::<()>::with_capacity(4);
    let config = DecoderConfig::new("in.mp4", 3, 2, 24.0)
        .with_ffmpeg_path("/nonexistent/bin/ffmpeg-missing");

    let result = VideoDecoder::start(&config, sender, ());
    assert!(matches!(
        result,
        Err(DecodeError::ProcessLaunch { ref program, .. }) if program.ends_with("ffmpeg-missing")
    ));
    // the sender went down with the failed start
    assert!(queue.blocking_recv().is_none());
}

#[test]
fn test_invalid_config_fails_before_launch() {
    let (sender, _queue) = WorkQueue::<()>::with_capacity(4);
    let config = DecoderConfig::new("in.mp4", 3, 2, -1.0);
    assert!(matches!(
        VideoDecoder::start(&config, sender, ()),
        Err(DecodeError::InvalidConfig(_))
    ));
}

#[test]
fn test_oversized_frames_are_rejected() {
    let path = temp_stream("oversized", &frame_bytes(2));
    let (sender, queue) = WorkQueue::<()>::with_capacity(4);

    let outcome = VideoDecoder::from_process(
        cat(&path),
        geometry(),
        FrameLimits::with_max_pixels(2),
        sender,
        (),
    )
    .run();
    std::fs::remove_file(&path).ok();

    assert_eq!(outcome.state, DecoderState::Failed);
    assert!(matches!(
        outcome.last_error(),
        Some(DecodeError::ImageDecode(_))
    ));
    assert_eq!(outcome.frames_read, 0);
    assert!(outcome.exit_status.is_some());
    assert!(queue.blocking_recv().is_none());
}

#[test]
fn test_large_frames_warn_and_keep_decoding() {
    let path = temp_stream("large", &frame_bytes(3));
    let (sender, queue) = WorkQueue::<()>::with_capacity(4);

    // 6 pixels: above the limit of 4 but within twice of it
    let outcome = VideoDecoder::from_process(
        cat(&path),
        geometry(),
        FrameLimits::with_max_pixels(4),
        sender,
        (),
    )
    .run();
    let items = drain(&queue);
    std::fs::remove_file(&path).ok();

    assert_eq!(outcome.state, DecoderState::Depleted);
    assert!(outcome.last_error().is_none());
    assert_eq!(outcome.frames_read, 3);
    assert_eq!(items.len(), 2);
}

struct ExplodingSink;

impl WorkSink<()> for ExplodingSink {
    fn enqueue(&self, _item: WorkItem<()>) -> crate::error::Result<()> {
        panic!("sink exploded");
    }
}

#[test]
fn test_panicking_loop_marks_state_failed() {
    let path = temp_stream("panic", &frame_bytes(2));
    let decoder = VideoDecoder::from_process(
        cat(&path),
        geometry(),
        FrameLimits::unlimited(),
        ExplodingSink,
        (),
    )
    .spawn()
    .unwrap();

    let started = Instant::now();
    while !decoder.is_finished() {
        assert!(started.elapsed() < Duration::from_secs(10));
        std::thread::sleep(Duration::from_millis(10));
    }
    assert_eq!(decoder.state(), DecoderState::Failed);

    let outcome = decoder.join();
    std::fs::remove_file(&path).ok();
    assert_eq!(outcome.state, DecoderState::Failed);
    assert!(matches!(
        outcome.last_error(),
        Some(DecodeError::Panicked(message)) if message.contains("sink exploded")
    ));
}

#[test]
fn test_closed_queue_fails_decoder() {
    let path = temp_stream("closed", &frame_bytes(3));
    let (sender, queue) = WorkQueue::<()>::with_capacity(4);
    drop(queue);

    let outcome =
        VideoDecoder::from_process(cat(&path), geometry(), FrameLimits::unlimited(), sender, ())
            .run();
    std::fs::remove_file(&path).ok();

    assert_eq!(outcome.state, DecoderState::Failed);
    assert!(matches!(outcome.last_error(), Some(DecodeError::QueueClosed)));
    assert_eq!(outcome.items_enqueued, 0);
}

#[test]
fn test_full_queue_throttles_decoder() {
    let path = temp_stream("throttle", &frame_bytes(4));
    let (sender, queue) = WorkQueue::<()>::with_capacity(1);
    let decoder =
        VideoDecoder::from_process(cat(&path), geometry(), FrameLimits::unlimited(), sender, ())
            .spawn()
            .unwrap();

    std::thread::sleep(Duration::from_millis(300));
    assert!(!decoder.is_finished(), "decoder ran past a full queue");
    assert_eq!(decoder.state(), DecoderState::Running);

    let indices: Vec<u64> = drain(&queue).iter().map(|item| item.index).collect();
    let outcome = decoder.join();
    std::fs::remove_file(&path).ok();

    assert_eq!(indices, vec![1, 2, 3]);
    assert_eq!(outcome.state, DecoderState::Depleted);
}

#[test]
fn test_settings_are_shared_not_copied() {
    let path = temp_stream("settings", &frame_bytes(3));
    let settings = Arc::new(String::from("scale=2"));
    let (sender, queue) = WorkQueue::<Arc<String>>::with_capacity(4);

    let outcome = VideoDecoder::from_process(
        cat(&path),
        geometry(),
        FrameLimits::unlimited(),
        sender,
        settings.clone(),
    )
    .run();
    let items = drain(&queue);
    std::fs::remove_file(&path).ok();

    assert!(outcome.is_success());
    assert_eq!(items.len(), 2);
    assert!(items.iter().all(|item| Arc::ptr_eq(&item.settings, &settings)));
    // frame 1 is the current of item 1 and the previous of item 2
    assert!(items[0].frames.current.ptr_eq(&items[1].frames.previous));
}

#[tokio::test]
async fn test_run_async_with_unbounded_queue() {
    let path = temp_stream("async", &frame_bytes(4));
    let (sender, mut receiver) = tokio::sync::mpsc::unbounded_channel::<WorkItem<()>>();

    let decoder =
        VideoDecoder::from_process(cat(&path), geometry(), FrameLimits::unlimited(), sender, ());
    let outcome = decoder.run_async().await;
    std::fs::remove_file(&path).ok();

    assert_eq!(outcome.state, DecoderState::Depleted);
    let mut indices = Vec::new();
    while let Some(item) = receiver.recv().await {
        indices.push(item.index);
    }
    assert_eq!(indices, vec![1, 2, 3]);
}

#[test]
fn test_dropping_unrun_decoder_reaps_process() {
    let mut command = Command::new("sleep");
    command.arg("30");
    let (sender, _queue) = WorkQueue::<()>::with_capacity(1);
    let decoder = VideoDecoder::from_process(
        DecodeProcess::spawn(command).unwrap(),
        geometry(),
        FrameLimits::unlimited(),
        sender,
        (),
    );

    let started = Instant::now();
    drop(decoder);
    assert!(started.elapsed() < Duration::from_secs(10));
}
