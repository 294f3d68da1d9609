//! Single-worker task queue between the filesystem event source and the
//! reconciler.
//!
//! Producers on any thread push pointer paths through a [`TaskSender`]; one
//! dedicated thread drains them in order, so at most one cleanup is in
//! flight. A receive timeout equal to the notification interval marks an
//! idle window and flushes the batch summary.

use crate::engine::ReclaimEngine;
use crate::media::is_pointer_file;
use crate::notifier::Notifier;
use crate::stats::BatchAggregator;
use std::any::Any;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

pub const DEBOUNCE_WINDOW: Duration = Duration::from_secs(5);

/// The debounce cache is cleared wholesale once it grows past this.
pub const DEBOUNCE_CACHE_LIMIT: usize = 1000;

pub const DEFAULT_JOIN_TIMEOUT: Duration = Duration::from_secs(1);

const WORKER_THREAD_NAME: &str = "strm-reclaim-worker";

/// Collapses repeated events for the same path inside [`DEBOUNCE_WINDOW`].
///
/// Owned by the worker thread only. When the cache passes
/// [`DEBOUNCE_CACHE_LIMIT`] entries it is dropped in one go, which also
/// forgets paths still inside their window.
#[derive(Debug)]
pub struct Debouncer {
    seen: HashMap<String, Instant>,
    window: Duration,
    limit: usize,
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(DEBOUNCE_WINDOW, DEBOUNCE_CACHE_LIMIT)
    }
}

impl Debouncer {
    pub fn new(window: Duration, limit: usize) -> Self {
        Self {
            seen: HashMap::new(),
            window,
            limit,
        }
    }

    pub fn admit(&mut self, key: &str) -> bool {
        self.admit_at(key, Instant::now())
    }

    /// True when `key` should be processed at `now`.
    pub fn admit_at(&mut self, key: &str, now: Instant) -> bool {
        if let Some(last) = self.seen.get(key) {
            if now.saturating_duration_since(*last) < self.window {
                return false;
            }
        }
        self.seen.insert(key.to_string(), now);
        if self.seen.len() > self.limit {
            debug!("Debounce cache passed {} entries, clearing", self.limit);
            self.seen.clear();
        }
        true
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

enum QueueMessage {
    Task(PathBuf),
    Stop,
}

/// Cloneable, thread-safe handle for enqueueing pointer files.
#[derive(Clone)]
pub struct TaskSender {
    tx: Sender<QueueMessage>,
}

impl TaskSender {
    /// Enqueue a path unconditionally. False once the worker is gone.
    pub fn submit(&self, path: impl Into<PathBuf>) -> bool {
        self.tx.send(QueueMessage::Task(path.into())).is_ok()
    }

    /// Enqueue a create/rename event if it names a pointer file.
    pub fn submit_event(&self, path: &Path, is_dir: bool) -> bool {
        if is_dir || !is_pointer_file(path) {
            return false;
        }
        self.submit(path)
    }
}

pub struct CleanupService {
    sender: TaskSender,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<ReclaimEngine>>,
}

impl CleanupService {
    /// Spawn the worker. `interval` is both the receive timeout and the
    /// quiet period that triggers a batch notification.
    pub fn start(
        engine: ReclaimEngine,
        notifier: Box<dyn Notifier>,
        interval: Duration,
        send_notify: bool,
    ) -> std::io::Result<Self> {
        let (tx, rx) = mpsc::channel();
        let stop = Arc::new(AtomicBool::new(false));
        let worker_stop = Arc::clone(&stop);

        let handle = thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || {
                run_worker(engine, notifier, rx, worker_stop, interval, send_notify)
            })?;

        info!("Cleanup worker started (notify interval {}s)", interval.as_secs());
        Ok(Self {
            sender: TaskSender { tx },
            stop,
            handle: Some(handle),
        })
    }

    pub fn sender(&self) -> TaskSender {
        self.sender.clone()
    }

    /// Signal the worker and wait up to `timeout` for it to exit. Returns the
    /// engine when the worker finished in time; otherwise it is left running
    /// detached.
    pub fn stop(mut self, timeout: Duration) -> Option<ReclaimEngine> {
        self.stop.store(true, Ordering::SeqCst);
        let _ = self.sender.tx.send(QueueMessage::Stop);

        let handle = self.handle.take()?;
        let deadline = Instant::now() + timeout;
        while !handle.is_finished() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }

        if !handle.is_finished() {
            warn!(
                "Cleanup worker did not stop within {}ms, detaching",
                timeout.as_millis()
            );
            return None;
        }
        match handle.join() {
            Ok(engine) => {
                info!("Cleanup worker stopped");
                Some(engine)
            }
            Err(_) => {
                error!("Cleanup worker terminated abnormally");
                None
            }
        }
    }
}

impl Drop for CleanupService {
    fn drop(&mut self) {
        if self.handle.is_some() {
            self.stop.store(true, Ordering::SeqCst);
            let _ = self.sender.tx.send(QueueMessage::Stop);
        }
    }
}

fn run_worker(
    mut engine: ReclaimEngine,
    notifier: Box<dyn Notifier>,
    rx: Receiver<QueueMessage>,
    stop: Arc<AtomicBool>,
    interval: Duration,
    send_notify: bool,
) -> ReclaimEngine {
    let mut debouncer = Debouncer::default();
    let mut batch = BatchAggregator::new(send_notify);

    while !stop.load(Ordering::SeqCst) {
        match rx.recv_timeout(interval) {
            Ok(QueueMessage::Stop) => break,
            Ok(QueueMessage::Task(path)) => {
                let key = path.to_string_lossy().into_owned();
                if !debouncer.admit(&key) {
                    debug!("Duplicate event within debounce window: {}", key);
                    continue;
                }

                let stats = batch.begin_task();
                let result =
                    panic::catch_unwind(AssertUnwindSafe(|| engine.reconcile(&path, stats)));
                match result {
                    Ok(outcome) => debug!("Task finished: {:?}", outcome),
                    Err(payload) => {
                        error!(
                            "Task for {} panicked: {}",
                            key,
                            panic_message(payload.as_ref())
                        );
                        batch.flush(notifier.as_ref());
                    }
                }
            }
            Err(RecvTimeoutError::Timeout) => {
                batch.flush(notifier.as_ref());
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    debug!("Cleanup worker loop exited");
    engine
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
