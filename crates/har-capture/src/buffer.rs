//! Flush scheduler and entry buffer.
//!
//! `CaptureBuffer` accumulates finalized entries and flushes them to the
//! sink under three triggers: a force-flush predicate result, the
//! pending count reaching `max_capture_requests`, or the capture window
//! elapsing since the last flush. The window is anchored to the last
//! flush, not the last append: every append reschedules the wake-up to
//! the same absolute deadline, so bursts of requests never postpone a
//! time-based flush.
//!
//! One buffer exists per layer instance; all state lives behind a mutex
//! so concurrent exchanges on a multi-threaded runtime serialize their
//! appends, the equivalent of the single-threaded cooperative model the
//! format was designed around.

use crate::config::CaptureConfig;
use crate::har::{Entry, HarDocument};
use crate::sink::Sink;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Ordered collection of pending entries with hybrid flush triggers.
pub struct CaptureBuffer {
    max_requests: usize,
    window: Duration,
    sink: Arc<dyn Sink>,
    inner: Mutex<Inner>,
}

struct Inner {
    entries: Vec<Entry>,
    last_flush: Instant,
    timer: Option<JoinHandle<()>>,
    // Bumped on every flush/reschedule; a wake-up whose generation no
    // longer matches is stale and must not flush.
    generation: u64,
}

impl CaptureBuffer {
    /// Create a buffer for the given configuration and sink.
    pub fn new(config: &CaptureConfig, sink: Arc<dyn Sink>) -> Arc<Self> {
        Arc::new(Self {
            max_requests: config.max_capture_requests,
            window: config.max_capture_window,
            sink,
            inner: Mutex::new(Inner {
                entries: Vec::new(),
                last_flush: Instant::now(),
                timer: None,
                generation: 0,
            }),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            // A poisoned lock only means another capture task panicked;
            // the buffered data is still consistent.
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Append a finalized entry and evaluate the flush triggers.
    ///
    /// `force` carries the post-request flush predicate's verdict for the
    /// exchange that produced this entry.
    pub fn append(self: &Arc<Self>, entry: Entry, force: bool) {
        let mut inner = self.lock();
        inner.entries.push(entry);

        let deadline = inner.last_flush + self.window;
        if force || inner.entries.len() >= self.max_requests || Instant::now() >= deadline {
            self.flush_locked(&mut inner);
        } else {
            self.schedule_locked(&mut inner, deadline);
        }
    }

    /// Flush the pending batch, if any. A flush on an empty buffer is a
    /// no-op: nothing is persisted and the window is not reset.
    pub fn flush(&self) {
        let mut inner = self.lock();
        self.flush_locked(&mut inner);
    }

    /// Number of entries waiting for the next flush.
    pub fn pending(&self) -> usize {
        self.lock().entries.len()
    }

    fn flush_locked(&self, inner: &mut Inner) {
        if let Some(timer) = inner.timer.take() {
            timer.abort();
        }
        inner.generation = inner.generation.wrapping_add(1);

        if inner.entries.is_empty() {
            return;
        }

        let batch = std::mem::take(&mut inner.entries);
        inner.last_flush = Instant::now();

        let count = batch.len();
        let document = HarDocument::new(batch);
        let sink = Arc::clone(&self.sink);
        // Fire-and-forget: the buffer has already reset; a failed write
        // is logged and the batch is lost.
        tokio::spawn(async move {
            if let Err(err) = sink.persist(document).await {
                tracing::error!(error = %err, "failed to persist capture batch");
            }
        });
        tracing::debug!(entries = count, "flushed capture batch");
    }

    // Cancel any pending wake-up and schedule a new one for the absolute
    // deadline. The deadline never moves, so repeated rescheduling
    // cannot drift the real flush time.
    fn schedule_locked(self: &Arc<Self>, inner: &mut Inner, deadline: Instant) {
        if let Some(timer) = inner.timer.take() {
            timer.abort();
        }
        inner.generation = inner.generation.wrapping_add(1);
        let generation = inner.generation;

        let buffer = Arc::downgrade(self);
        inner.timer = Some(tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            if let Some(buffer) = buffer.upgrade() {
                buffer.wake(generation);
            }
        }));
    }

    fn wake(&self, generation: u64) {
        let mut inner = self.lock();
        // A flush may have raced the timer between firing and locking
        if inner.generation != generation {
            return;
        }
        self.flush_locked(&mut inner);
    }
}

impl std::fmt::Debug for CaptureBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureBuffer")
            .field("max_requests", &self.max_requests)
            .field("window", &self.window)
            .field("pending", &self.pending())
            .finish()
    }
}
