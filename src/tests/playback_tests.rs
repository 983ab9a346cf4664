//! # End-to-end Playback Tests
//!
//! These tests follow a frame from pixels to the tray: encode bitmaps, write them as a
//! flipbook directory (with the odd bad file mixed in), load them back, and drive the
//! engine with a scripted CPU trace.

use std::fs;
use std::io;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

use cpu_flipbook_lib::engine::{AnimationEngine, Mode, Timing};
use cpu_flipbook_lib::flipbook::load_book_from_dir;
use cpu_flipbook_lib::ico::{encode, encoded_len, PixelBuffer};
use cpu_flipbook_lib::sample::SharedSample;
use cpu_flipbook_lib::shutdown;
use cpu_flipbook_lib::sink::{IconSink, SinkError};

const BASE: Duration = Duration::from_millis(50);

/// Write `count` solid-colour 16x16 frames; the blue channel carries the frame index.
fn write_book(dir: &Path, count: u8) {
    for i in 0..count {
        let mut pixels = PixelBuffer::new(16, 16).unwrap();
        for y in 0..16 {
            for x in 0..16 {
                pixels.set_pixel(x, y, [0, 0, i, 255]);
            }
        }
        let icon = encode(&pixels).unwrap();
        fs::write(dir.join(format!("frame_{i:04}.ico")), icon.as_bytes()).unwrap();
    }
}

/// Blue channel of the first pixel, i.e. the index written by `write_book`.
fn frame_tag(icon: &[u8]) -> u8 {
    icon[62]
}

/// Log output collected in memory, one `fmt` line per event.
#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl CapturedLogs {
    fn lines(&self) -> Vec<String> {
        String::from_utf8_lossy(&self.0.lock().unwrap())
            .lines()
            .map(str::to_owned)
            .collect()
    }
}

#[derive(Clone, Default)]
struct RecordingSink(Arc<Mutex<Vec<Vec<u8>>>>);

impl IconSink for RecordingSink {
    fn set_icon(&mut self, icon: &[u8]) -> Result<(), SinkError> {
        self.0.lock().unwrap().push(icon.to_vec());
        Ok(())
    }
}

/// Five good frames plus one undersized file load as a five-frame book.
#[test]
fn loader_skips_garbage_between_encoded_frames() {
    let dir = TempDir::new().unwrap();
    write_book(dir.path(), 5);
    fs::write(dir.path().join("frame_0002a.ico"), b"garbage").unwrap();
    fs::write(dir.path().join("readme.txt"), b"not a frame").unwrap();

    let book = load_book_from_dir(dir.path(), BASE).unwrap();
    assert_eq!(book.len(), 5);
    let tags: Vec<u8> = book.frames().iter().map(|f| frame_tag(f.as_bytes())).collect();
    assert_eq!(tags, vec![0, 1, 2, 3, 4]);
    assert!(book.frames().iter().all(|f| f.len() == encoded_len(16, 16)));
}

/// The undersized file is reported as exactly one skip warning, never as an error.
#[test]
fn loader_logs_one_warning_per_skipped_frame() {
    let dir = TempDir::new().unwrap();
    write_book(dir.path(), 5);
    fs::write(dir.path().join("frame_0002a.ico"), b"garbage").unwrap();
    fs::write(dir.path().join("readme.txt"), b"not a frame").unwrap();

    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_ansi(false)
        .with_max_level(tracing::Level::WARN)
        .with_writer(move || writer.clone())
        .finish();
    let book = tracing::subscriber::with_default(subscriber, || {
        load_book_from_dir(dir.path(), BASE)
    })
    .unwrap();
    assert_eq!(book.len(), 5);

    let lines = logs.lines();
    let skips: Vec<&String> = lines.iter().filter(|l| l.contains("skipping frame")).collect();
    assert_eq!(skips.len(), 1, "expected one skip warning, got: {lines:?}");
    assert!(skips[0].contains("WARN"), "skip should be a warning: {}", skips[0]);
    assert!(skips[0].contains("frame_0002a.ico"), "warning names the file: {}", skips[0]);
    assert!(!lines.iter().any(|l| l.contains("ERROR")), "no errors expected: {lines:?}");
}

/// The engine hands loaded bytes to the sink verbatim.
#[test]
fn engine_emits_loaded_bytes_verbatim() {
    let idle_dir = TempDir::new().unwrap();
    let active_dir = TempDir::new().unwrap();
    write_book(idle_dir.path(), 3);
    write_book(active_dir.path(), 4);

    let idle = load_book_from_dir(idle_dir.path(), BASE).unwrap();
    let active = load_book_from_dir(active_dir.path(), BASE).unwrap();
    let on_disk = fs::read(active_dir.path().join("frame_0000.ico")).unwrap();

    let mut engine = AnimationEngine::new(Some(idle), Some(active), Timing::default());

    // CPU trace 10, 10, 50, 50: the switch at the third sample restarts at frame 0
    let ticks: Vec<_> = [10.0, 10.0, 50.0, 50.0]
        .into_iter()
        .map(|cpu| engine.tick(cpu).unwrap())
        .collect();

    let modes: Vec<Mode> = ticks.iter().map(|t| t.mode).collect();
    assert_eq!(modes, vec![Mode::Idle, Mode::Idle, Mode::Active, Mode::Active]);
    let tags: Vec<u8> = ticks.iter().map(|t| frame_tag(t.frame.as_bytes())).collect();
    assert_eq!(tags, vec![0, 1, 0, 1]);
    assert_eq!(ticks[2].frame.as_bytes(), on_disk.as_slice());
}

/// Busy CPU plays the active book at the refresh floor, quiet CPU at the base rate.
#[tokio::test(start_paused = true)]
async fn render_loop_tracks_cpu_changes() {
    let idle_dir = TempDir::new().unwrap();
    let active_dir = TempDir::new().unwrap();
    write_book(idle_dir.path(), 2);
    write_book(active_dir.path(), 3);

    let engine = AnimationEngine::new(
        Some(load_book_from_dir(idle_dir.path(), BASE).unwrap()),
        Some(load_book_from_dir(active_dir.path(), BASE).unwrap()),
        Timing::default(),
    );

    let sample = SharedSample::new();
    sample.store(100.0);
    let sink = RecordingSink::default();
    let (trigger, listener) = shutdown::channel();
    let task = tokio::spawn(engine.run(sample.clone(), sink.clone(), listener));

    // Active at 33ms: t=0, 33, 66, 99
    tokio::time::sleep(Duration::from_millis(110)).await;
    let busy = sink.0.lock().unwrap().len();
    assert_eq!(busy, 4);

    // Quiet from t=132 on at 50ms: 132, 182
    sample.store(3.0);
    tokio::time::sleep(Duration::from_millis(100)).await;
    trigger.trigger();
    task.await.unwrap();

    let tags: Vec<u8> = sink.0.lock().unwrap().iter().map(|icon| frame_tag(icon)).collect();
    assert_eq!(tags, vec![0, 1, 2, 0, 0, 1]);
}
