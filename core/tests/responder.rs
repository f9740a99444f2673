//! Integration tests for the event → escalation → playback pipeline.

use async_trait::async_trait;
use barkback_core::{
    AssetId, BarkResponder, HighVolumeEvent, NotificationSink, PlaybackBackend, ResponderConfig,
    Result,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Mutex, Notify};

fn test_config() -> ResponderConfig {
    ResponderConfig {
        volumes: vec![0, 1000, 2000, 3000],
        escalation_period: 300,
        topic_volume: "Volume".into(),
        topic_playing: "Playing".into(),
    }
}

/// Backend whose playback completes instantly unless `hold` is set; with
/// `fail_finish` set, every completion reports a dead player instead.
struct FakeBackend {
    assets: Vec<AssetId>,
    hold: AtomicBool,
    fail_finish: AtomicBool,
    release: Notify,
    started: AtomicUsize,
    last_volume: Mutex<Option<i32>>,
}

impl FakeBackend {
    fn new(assets: Vec<&str>) -> Arc<Self> {
        Arc::new(Self {
            assets: assets.into_iter().map(String::from).collect(),
            hold: AtomicBool::new(false),
            fail_finish: AtomicBool::new(false),
            release: Notify::new(),
            started: AtomicUsize::new(0),
            last_volume: Mutex::new(None),
        })
    }
}

#[async_trait]
impl PlaybackBackend for FakeBackend {
    async fn list_available(&self) -> Result<Vec<AssetId>> {
        Ok(self.assets.clone())
    }

    async fn start(&self, _asset: &AssetId, volume: i32) -> Result<()> {
        self.started.fetch_add(1, Ordering::SeqCst);
        *self.last_volume.lock().await = Some(volume);
        Ok(())
    }

    async fn await_finished(&self) -> Result<()> {
        if self.hold.load(Ordering::SeqCst) {
            self.release.notified().await;
        }
        if self.fail_finish.load(Ordering::SeqCst) {
            return Err(barkback_core::BarkError::PlaybackError(
                "player process died".into(),
            ));
        }
        Ok(())
    }
}

/// Sink that records every notification it receives.
struct RecordingSink {
    records: Mutex<Vec<(String, String)>>,
}

impl RecordingSink {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            records: Mutex::new(Vec::new()),
        })
    }

    async fn payloads_on(&self, topic: &str) -> Vec<String> {
        self.records
            .lock()
            .await
            .iter()
            .filter(|(t, _)| t == topic)
            .map(|(_, p)| p.clone())
            .collect()
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn notify(&self, topic: &str, payload: &str) {
        self.records
            .lock()
            .await
            .push((topic.to_string(), payload.to_string()));
    }
}

fn event_at(base: Instant, offset_secs: u64) -> HighVolumeEvent {
    HighVolumeEvent {
        at: base + Duration::from_secs(offset_secs),
        peak: 75.0,
    }
}

#[tokio::test]
async fn test_repeated_events_escalate_then_reset() {
    let backend = FakeBackend::new(vec!["woof.mp3"]);
    let sink = RecordingSink::new();
    let responder = BarkResponder::new(test_config(), backend.clone(), sink.clone())
        .await
        .unwrap();

    let (tx, rx) = mpsc::channel(16);
    let _handle = responder.start(rx);

    // Three episodes inside the escalation window, a fourth far outside it
    let base = Instant::now();
    for offset in [0, 10, 20, 9000] {
        tx.send(event_at(base, offset)).await.unwrap();
        // Let the handler finish before the next event lands
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    let payloads = sink.payloads_on("Playing").await;
    let plays: Vec<&String> = payloads.iter().filter(|p| !p.is_empty()).collect();
    assert_eq!(plays.len(), 4);
    assert!(plays[0].contains("\"Vol\":0"), "got {}", plays[0]);
    assert!(plays[1].contains("\"Vol\":1000"), "got {}", plays[1]);
    assert!(plays[2].contains("\"Vol\":2000"), "got {}", plays[2]);
    assert!(plays[3].contains("\"Vol\":0"), "got {}", plays[3]);

    // Each play is followed by an empty finished marker
    let markers = payloads.iter().filter(|p| p.is_empty()).count();
    assert_eq!(markers, 4);
}

#[tokio::test]
async fn test_event_during_playback_is_absorbed() {
    let backend = FakeBackend::new(vec!["woof.mp3"]);
    backend.hold.store(true, Ordering::SeqCst);
    let sink = RecordingSink::new();
    let responder = BarkResponder::new(test_config(), backend.clone(), sink.clone())
        .await
        .unwrap();

    let (tx, rx) = mpsc::channel(16);
    let _handle = responder.start(rx);

    let base = Instant::now();
    tx.send(event_at(base, 0)).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    tx.send(event_at(base, 1)).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    // Only the first event started playback
    assert_eq!(backend.started.load(Ordering::SeqCst), 1);

    backend.release.notify_waiters();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let payloads = sink.payloads_on("Playing").await;
    assert_eq!(payloads.iter().filter(|p| !p.is_empty()).count(), 1);
    assert_eq!(payloads.iter().filter(|p| p.is_empty()).count(), 1);
}

#[tokio::test]
async fn test_empty_backend_is_a_startup_error() {
    let backend = FakeBackend::new(vec![]);
    let sink = RecordingSink::new();
    let err = BarkResponder::new(test_config(), backend, sink).await;
    assert!(err.is_err());
}

#[tokio::test]
async fn test_requested_volume_never_exceeds_top_tier() {
    // Hammer the policy well past the tier count; the backend must never be
    // asked for more than the loudest configured volume
    let backend = FakeBackend::new(vec!["woof.mp3"]);
    let sink = RecordingSink::new();
    let responder = BarkResponder::new(test_config(), backend.clone(), sink.clone())
        .await
        .unwrap();

    let (tx, rx) = mpsc::channel(16);
    let _handle = responder.start(rx);

    let base = Instant::now();
    for offset in 0..8 {
        tx.send(event_at(base, offset)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
    }

    let last = (*backend.last_volume.lock().await).unwrap();
    assert!(last <= 3000, "volume {} exceeds the top tier", last);
}

#[tokio::test]
async fn test_responder_recovers_after_playback_failure() {
    // A response whose player dies must not wedge the pipeline: the finished
    // marker still goes out and the next event still plays
    let backend = FakeBackend::new(vec!["woof.mp3"]);
    backend.fail_finish.store(true, Ordering::SeqCst);
    let sink = RecordingSink::new();
    let responder = BarkResponder::new(test_config(), backend.clone(), sink.clone())
        .await
        .unwrap();

    let (tx, rx) = mpsc::channel(16);
    let _handle = responder.start(rx);

    let base = Instant::now();
    tx.send(event_at(base, 0)).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    tx.send(event_at(base, 10)).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(backend.started.load(Ordering::SeqCst), 2);
    let payloads = sink.payloads_on("Playing").await;
    assert_eq!(payloads.iter().filter(|p| !p.is_empty()).count(), 2);
    assert_eq!(payloads.iter().filter(|p| p.is_empty()).count(), 2);
}
