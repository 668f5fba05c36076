//! Where events are recorded and delivered
//!
//! The hot path obtains the current thread's ring, applies the filter,
//! stamps the event and routes it by mode: store into the ring (Buffered),
//! hand to the asynchronous queue (Immediate), or both plus a capacity-driven
//! flush (Hybrid). Depth bookkeeping is unconditional so events recorded
//! after a filtered frame still carry correct nesting and timings.

use std::cell::Cell;
use std::fmt;

use crate::config::{get_config, Config, ConfigCell, FlushPolicy, TracingMode};
use crate::event::{Event, EventKind, MsgBuf, DEPTH_MAX};
use crate::memory;
use crate::queue;
use crate::registry::{self, Registry};
use crate::ring::Ring;
use crate::sink;
use crate::time;

thread_local! {
    static LOCAL_RING: Cell<Option<Box<Ring>>> = const { Cell::new(None) };
    // shared-state mode: cached pointer into the registry-owned ring
    static SHARED_RING: Cell<*mut Ring> = const { Cell::new(std::ptr::null_mut()) };
    static SHARED_RING_GUARD: ThreadRingGuard = ThreadRingGuard {
        key: thread_id::get(),
    };
}

/// Teardown guard for the shared-state mode: tells the registry to destroy
/// this thread's ring when the thread exits.
struct ThreadRingGuard {
    key: usize,
}

impl Drop for ThreadRingGuard {
    fn drop(&mut self) {
        registry::registry().remove_for_thread(self.key);
    }
}

/// Runs `f` with the calling thread's ring, creating and registering it on
/// first use. Events still resident when the thread exits are lost; call
/// [`flush_all`] before joining threads if loss is unacceptable.
fn with_thread_ring<R>(f: impl FnOnce(&mut Ring) -> R) -> R {
    if registry::external_installed() {
        let ptr = SHARED_RING.with(|cell| {
            let mut ptr = cell.get();
            if ptr.is_null() {
                SHARED_RING_GUARD.with(|_| {}); // arm the teardown guard
                ptr = registry::registry().get_or_create_for_current_thread();
                cell.set(ptr);
            }
            ptr
        });
        unsafe { f(&mut *ptr) }
    } else {
        LOCAL_RING.with(|cell| {
            let slot = unsafe { &mut *cell.as_ptr() };
            if slot.is_none() {
                let mut ring = Ring::new(get_config());
                let ptr: *mut Ring = &mut *ring;
                registry::registry().add(ptr);
                ring.registered = true;
                *slot = Some(ring);
            }
            f(slot.as_mut().unwrap())
        })
    }
}

/// Records an Enter event. Called by the scope guard's constructor.
#[inline(always)]
pub fn scope_enter(func: &'static str, file: &'static str, line: u32) {
    let cfg = get_config();
    with_thread_ring(|ring| record_enter(ring, cfg, func, file, line));
}

/// Records an Exit event and runs the scope-exit flush hook. Called by the
/// scope guard's destructor.
#[inline(always)]
pub fn scope_exit(func: &'static str, file: &'static str, line: u32) {
    let cfg = get_config();
    let final_depth = with_thread_ring(|ring| {
        record_exit(ring, cfg, func, file, line);
        ring.depth
    });
    match cfg.flush_on_scope_exit {
        FlushPolicy::Never => {}
        FlushPolicy::OnOutermost => {
            if final_depth == 0 {
                flush_all();
            }
        }
        FlushPolicy::OnEveryExit => flush_current_thread(),
    }
}

/// Records a Message event attached to the current call frame.
///
/// The payload is formatted before the ring is touched, so argument
/// formatting may itself record events.
pub fn message(file: &'static str, line: u32, args: fmt::Arguments<'_>) {
    let cfg = get_config();
    let msg = MsgBuf::from_args(args);
    with_thread_ring(|ring| record_message(ring, cfg, file, line, msg));
}

fn record_enter(
    ring: &mut Ring,
    cfg: &Config,
    func: &'static str,
    file: &'static str,
    line: u32,
) {
    let ts = time::now_ns();
    let depth = ring.depth;
    if depth < DEPTH_MAX {
        ring.start_stack[depth] = ts;
        ring.func_stack[depth] = func;
    }
    if !cfg.filter.should_trace(Some(func), Some(file), depth) {
        // depth bookkeeping stays correct even for filtered frames
        ring.depth = depth + 1;
        return;
    }
    let event = Event {
        ts_ns: ts,
        kind: EventKind::Enter,
        tid: ring.tid,
        color_offset: ring.color_offset,
        depth: depth as u32,
        func,
        file,
        line,
        dur_ns: 0,
        memory_rss: sample_memory(cfg),
        msg: MsgBuf::empty(),
    };
    ring.depth = depth + 1;
    deliver(ring, cfg, event);
}

fn record_exit(
    ring: &mut Ring,
    cfg: &Config,
    func: &'static str,
    file: &'static str,
    line: u32,
) {
    let ts = time::now_ns();
    ring.depth = ring.depth.saturating_sub(1);
    let depth = ring.depth;
    // same inputs the matching Enter was filtered with; filters are quiescent
    // while tracing, so the decisions agree and pairs stay balanced
    if !cfg.filter.should_trace(Some(func), Some(file), depth) {
        return;
    }
    let dur_ns = if depth < DEPTH_MAX {
        ts.saturating_sub(ring.start_stack[depth])
    } else {
        0
    };
    let event = Event {
        ts_ns: ts,
        kind: EventKind::Exit,
        tid: ring.tid,
        color_offset: ring.color_offset,
        depth: depth as u32,
        func,
        file,
        line,
        dur_ns,
        memory_rss: sample_memory(cfg),
        msg: MsgBuf::empty(),
    };
    deliver(ring, cfg, event);
}

fn record_message(ring: &mut Ring, cfg: &Config, file: &'static str, line: u32, msg: MsgBuf) {
    let ts = time::now_ns();
    // a message carries the depth of the enclosing Enter and inherits its name
    let depth = ring.depth.saturating_sub(1);
    let func = if ring.depth > 0 && depth < DEPTH_MAX {
        ring.func_stack[depth]
    } else {
        ""
    };
    let func_dim = if func.is_empty() { None } else { Some(func) };
    if !cfg.filter.should_trace(func_dim, Some(file), depth) {
        return;
    }
    let event = Event {
        ts_ns: ts,
        kind: EventKind::Message,
        tid: ring.tid,
        color_offset: ring.color_offset,
        depth: depth as u32,
        func,
        file,
        line,
        dur_ns: 0,
        memory_rss: sample_memory(cfg),
        msg,
    };
    deliver(ring, cfg, event);
}

#[inline(always)]
fn sample_memory(cfg: &Config) -> u64 {
    if cfg.track_memory {
        memory::current_rss_bytes()
    } else {
        0
    }
}

fn deliver(ring: &mut Ring, cfg: &Config, event: Event) {
    match cfg.mode {
        TracingMode::Buffered => ring.store(event),
        TracingMode::Immediate => {
            ensure_drain_started();
            queue::global().enqueue(event);
        }
        TracingMode::Hybrid => {
            ring.store(event);
            ensure_drain_started();
            queue::global().enqueue(event);
            // check after the slot is stored; the flush takes the ring's
            // flush mutex and the I/O mutex, never the queue mutex
            if ring.occupancy() >= cfg.auto_flush_threshold {
                flush_ring(ring, cfg);
            }
        }
    }
}

fn ensure_drain_started() {
    let queue = queue::global();
    if !queue.is_running() {
        queue.start(sink::immediate_sink());
    }
}

/// Emits a ring's current events to the text sink in chronological order.
///
/// Single-buffer rings are read in place and not cleared: flush is
/// observational and a repeated flush re-emits the same events. A producer
/// writing concurrently can tear slots that are being read; callers that need
/// a race-free flush enable double-buffering, where the active array is
/// swapped out under the ring's flush mutex and reset after emission.
fn flush_ring(ring: &mut Ring, cfg: &Config) {
    let out = sink::text_sink();
    if ring.double_buffered() && cfg.use_double_buffering {
        let _swap = ring.flush_mtx.lock().unwrap();
        let old = ring.swap_active();
        {
            let mut writer = out.lock();
            for event in ring.bufs[old].iter_chrono() {
                let _ = crate::emit::print_event(event, cfg, &mut **writer);
            }
            let _ = writer.flush();
        }
        ring.bufs[old].reset();
    } else {
        let mut writer = out.lock();
        let idx = ring.active_index();
        for event in ring.bufs[idx].iter_chrono() {
            let _ = crate::emit::print_event(event, cfg, &mut **writer);
        }
        let _ = writer.flush();
    }
}

/// Flushes every registered ring.
///
/// Works from a snapshot of the registry taken under its mutex; a ring being
/// destroyed removes itself from the registry before its storage is freed, so
/// the snapshot never dangles.
pub fn flush_all() {
    let cfg = get_config();
    for ptr in registry::registry().snapshot() {
        unsafe { flush_ring(&mut *ptr, cfg) };
    }
}

/// Flushes only the calling thread's ring.
pub fn flush_current_thread() {
    let cfg = get_config();
    with_thread_ring(|ring| flush_ring(ring, cfg));
}

/// Synchronous barrier on the asynchronous queue: returns once every event
/// enqueued so far has reached the sink, or after one second with a warning.
pub fn flush_immediate_queue() {
    queue::global().flush_now();
}

/// Starts the background drain task. Recording in immediate or hybrid mode
/// starts it lazily; calling this explicitly only controls startup timing.
pub fn start_async_immediate() {
    queue::global().start(sink::immediate_sink());
}

/// Stops the drain task after one final drain. The task is restarted by the
/// next immediate- or hybrid-mode event.
pub fn stop_async_immediate() {
    queue::global().stop();
}

/// Enqueued/written totals of the asynchronous queue.
pub fn immediate_queue_counters() -> (u64, u64) {
    queue::global().counters()
}

/// Installs shared configuration and registry instances and switches ring
/// ownership to the registry (rings become heap-allocated, keyed by thread,
/// and are destroyed by a per-thread teardown guard).
///
/// Decided once at startup, before any tracing; not reversible.
pub fn install_external_state(config: &'static ConfigCell, registry: &'static Registry) {
    crate::config::install_external_config(config);
    crate::registry::install_external(registry);
}
