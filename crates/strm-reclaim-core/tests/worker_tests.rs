mod common;

use common::{touch, FakeEvents, FakeIndex, Fixture, RecordingNotifier};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use strm_reclaim_core::error::Result;
use strm_reclaim_core::index::TransferIndex;
use strm_reclaim_core::storage::models::TransferRecord;
use strm_reclaim_core::worker::DEFAULT_JOIN_TIMEOUT;
use strm_reclaim_core::{CleanupService, ReclaimEngine};

const INTERVAL: Duration = Duration::from_millis(200);

fn wait_for(mut done: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(3);
    while Instant::now() < deadline {
        if done() {
            return true;
        }
        thread::sleep(Duration::from_millis(20));
    }
    false
}

#[test]
fn test_duplicate_events_collapse_into_one_task_and_one_summary() {
    let fx = Fixture::new();
    let media = fx.media("movie/Foo (2020)/Foo.mkv");
    touch(&media);
    touch(&fx.media("movie/Bar (2019)/Bar.mkv"));
    fx.index.add_record(1, 123, &media);
    let notifier = RecordingNotifier::default();

    let service = CleanupService::start(
        fx.engine(&fx.config()),
        Box::new(notifier.clone()),
        INTERVAL,
        true,
    )
    .unwrap();
    let sender = service.sender();
    let pointer = fx.strm("movie/Foo (2020) {tmdb-123}/Foo.strm");
    assert!(sender.submit(pointer.clone()));
    assert!(sender.submit(pointer));

    assert!(wait_for(|| !notifier.sent().is_empty()));
    let engine = service.stop(DEFAULT_JOIN_TIMEOUT).unwrap();

    let sent = notifier.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].text.starts_with("Scanned: 1 | Matched: 1 | Deleted: 2"));
    assert!(sent[0].text.contains("- Foo.mkv"));
    assert_eq!(engine.history().len(), 1);
    assert!(!media.exists());
    assert!(fx.media("movie/Bar (2019)/Bar.mkv").exists());
}

#[test]
fn test_idle_worker_sends_nothing() {
    let fx = Fixture::new();
    let notifier = RecordingNotifier::default();
    let service = CleanupService::start(
        fx.engine(&fx.config()),
        Box::new(notifier.clone()),
        Duration::from_millis(50),
        true,
    )
    .unwrap();

    thread::sleep(Duration::from_millis(300));
    let engine = service.stop(DEFAULT_JOIN_TIMEOUT).unwrap();

    assert!(notifier.sent().is_empty());
    assert!(engine.history().is_empty());
}

#[test]
fn test_notifications_disabled() {
    let fx = Fixture::new();
    let notifier = RecordingNotifier::default();
    let service = CleanupService::start(
        fx.engine(&fx.config()),
        Box::new(notifier.clone()),
        Duration::from_millis(50),
        false,
    )
    .unwrap();

    // Unmapped path: counted as scanned but never reported.
    assert!(service.sender().submit("/elsewhere/Foo.strm"));
    thread::sleep(Duration::from_millis(300));
    service.stop(DEFAULT_JOIN_TIMEOUT).unwrap();

    assert!(notifier.sent().is_empty());
}

#[test]
fn test_sender_reports_closed_queue_after_stop() {
    let fx = Fixture::new();
    let service = CleanupService::start(
        fx.engine(&fx.config()),
        Box::new(RecordingNotifier::default()),
        INTERVAL,
        true,
    )
    .unwrap();
    let sender = service.sender();
    service.stop(DEFAULT_JOIN_TIMEOUT).unwrap();

    assert!(!sender.submit("/strm/movie/Late.strm"));
    assert!(!sender.submit_event(std::path::Path::new("/strm/movie/readme.txt"), false));
}

/// Transfer index whose first identity query panics.
struct PanicsOnce {
    inner: FakeIndex,
    tripped: Arc<AtomicBool>,
}

impl TransferIndex for PanicsOnce {
    fn query_by_identity(
        &self,
        tmdb_id: u64,
        season: Option<&str>,
        episode: Option<&str>,
    ) -> Result<Vec<TransferRecord>> {
        if !self.tripped.swap(true, Ordering::SeqCst) {
            panic!("index backend crashed");
        }
        self.inner.query_by_identity(tmdb_id, season, episode)
    }

    fn query_by_destination(&self, dest: &str) -> Result<Option<TransferRecord>> {
        self.inner.query_by_destination(dest)
    }

    fn delete_by_id(&self, id: i64) -> Result<()> {
        self.inner.delete_by_id(id)
    }
}

#[test]
fn test_worker_survives_task_panic_and_flushes_partial_batch() {
    let fx = Fixture::new();
    let media = fx.media("movie/Foo (2020)/Foo.mkv");
    touch(&media);
    touch(&fx.media("movie/Bar (2019)/Bar.mkv"));
    fx.index.add_record(1, 123, &media);
    let index = PanicsOnce {
        inner: fx.index.clone(),
        tripped: Arc::new(AtomicBool::new(false)),
    };
    let engine = ReclaimEngine::new(&fx.config(), Box::new(index), Box::new(fx.index.clone()))
        .with_event_bus(Box::new(FakeEvents::default()));
    let notifier = RecordingNotifier::default();

    let service =
        CleanupService::start(engine, Box::new(notifier.clone()), INTERVAL, true).unwrap();
    let sender = service.sender();
    assert!(sender.submit(fx.strm("movie/Bad (2000) {tmdb-7}/Bad.strm")));
    assert!(sender.submit(fx.strm("movie/Foo (2020) {tmdb-123}/Foo.strm")));

    assert!(wait_for(|| notifier.sent().len() >= 2));
    let engine = service.stop(DEFAULT_JOIN_TIMEOUT).unwrap();

    let sent = notifier.sent();
    assert_eq!(sent[0].text, "Scanned: 1 | Matched: 0 | Deleted: 0");
    assert!(sent[1].text.starts_with("Scanned: 1 | Matched: 1 | Deleted: 2"));
    assert!(!media.exists());
    assert_eq!(engine.history().len(), 1);
}
