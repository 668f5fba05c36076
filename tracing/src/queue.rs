//! Asynchronous event queue with a background drain task
//!
//! One process-wide queue serves all producers in the immediate and hybrid
//! modes. Producers append under the queue mutex and signal the condition
//! variable; the drain task swaps the buffer out in O(1) and writes the batch
//! outside the lock. Two atomic counters exist solely so `flush_now` can
//! implement a synchronous barrier.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::config::get_config;
use crate::emit;
use crate::event::Event;
use crate::sink::TextSink;

const FLUSH_NOW_TIMEOUT: Duration = Duration::from_secs(1);
const FLUSH_NOW_POLL: Duration = Duration::from_micros(100);

struct QueueState {
    events: Vec<Event>,
    sink: Option<Arc<TextSink>>,
    drain_interval: Duration,
    batch_hint: usize,
}

pub struct AsyncQueue {
    state: Mutex<QueueState>,
    wake: Condvar,
    running: AtomicBool,
    enqueued: AtomicU64,
    written: AtomicU64,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl AsyncQueue {
    fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                events: Vec::new(),
                sink: None,
                drain_interval: Duration::from_millis(1),
                batch_hint: 128,
            }),
            wake: Condvar::new(),
            running: AtomicBool::new(false),
            enqueued: AtomicU64::new(0),
            written: AtomicU64::new(0),
            worker: Mutex::new(None),
        }
    }

    pub(crate) fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Starts the drain task. Idempotent; tunables are copied from the
    /// configuration record at start time.
    pub(crate) fn start(&'static self, sink: Arc<TextSink>) {
        let mut worker = self.worker.lock().unwrap();
        if self.running.load(Ordering::SeqCst) {
            return;
        }
        {
            let cfg = get_config();
            let mut state = self.state.lock().unwrap();
            state.sink = Some(sink);
            state.drain_interval = Duration::from_millis(cfg.drain_interval_ms.max(1));
            state.batch_hint = cfg.immediate_batch_hint;
        }
        self.running.store(true, Ordering::SeqCst);
        *worker = Some(
            std::thread::Builder::new()
                .name("scopetrace-drain".to_owned())
                .spawn(move || self.drain_loop())
                .expect("failed to spawn trace drain thread"),
        );
    }

    /// Stops and joins the drain task. The task performs one final drain on
    /// the way out, so nothing enqueued before the call is lost.
    pub(crate) fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        self.wake.notify_one();
        let handle = self.worker.lock().unwrap().take();
        if let Some(handle) = handle {
            let _ = handle.join();
        }
    }

    /// Appends one event; no draining happens on the caller's thread.
    pub(crate) fn enqueue(&self, event: Event) {
        {
            self.state.lock().unwrap().events.push(event);
        }
        self.enqueued.fetch_add(1, Ordering::Relaxed);
        self.wake.notify_one();
    }

    /// Synchronous barrier: returns once everything enqueued so far has been
    /// written, or after one second with a warning.
    pub(crate) fn flush_now(&self) {
        self.wake.notify_one();
        let deadline = Instant::now() + FLUSH_NOW_TIMEOUT;
        while self.enqueued.load(Ordering::Relaxed) != self.written.load(Ordering::Relaxed) {
            if Instant::now() >= deadline {
                log::warn!("flush_immediate_queue timed out after 1s; queue not drained");
                return;
            }
            std::thread::sleep(FLUSH_NOW_POLL);
        }
    }

    /// Total events handed to the queue and total written to its sink.
    pub fn counters(&self) -> (u64, u64) {
        (
            self.enqueued.load(Ordering::Relaxed),
            self.written.load(Ordering::Relaxed),
        )
    }

    fn drain_loop(&self) {
        loop {
            let (batch, sink) = {
                let mut state = self.state.lock().unwrap();
                if state.events.is_empty() && self.running.load(Ordering::Relaxed) {
                    let interval = state.drain_interval;
                    let (guard, _timeout) = self.wake.wait_timeout(state, interval).unwrap();
                    state = guard;
                }
                let hint = state.batch_hint;
                let batch = std::mem::replace(&mut state.events, Vec::with_capacity(hint));
                (batch, state.sink.clone())
            };
            self.write_batch(&batch, sink.as_deref());
            if !self.running.load(Ordering::Relaxed) {
                break;
            }
        }
        // final drain, nothing enqueued before stop() is lost
        let (rest, sink) = {
            let mut state = self.state.lock().unwrap();
            (std::mem::take(&mut state.events), state.sink.clone())
        };
        self.write_batch(&rest, sink.as_deref());
    }

    fn write_batch(&self, events: &[Event], sink: Option<&TextSink>) {
        if events.is_empty() {
            return;
        }
        if let Some(sink) = sink {
            let cfg = get_config();
            let mut writer = sink.lock();
            for event in events {
                let _ = emit::print_event(event, cfg, &mut **writer);
            }
            let _ = writer.flush();
        }
        self.written.fetch_add(events.len() as u64, Ordering::Relaxed);
    }
}

lazy_static::lazy_static! {
    static ref GLOBAL_QUEUE: AsyncQueue = AsyncQueue::new();
}

pub(crate) fn global() -> &'static AsyncQueue {
    &GLOBAL_QUEUE
}
