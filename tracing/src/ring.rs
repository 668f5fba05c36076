//! Per-thread circular event store
//!
//! A ring is owned exclusively by one producer thread; only flush, dump and
//! stats read it from outside, under the protocols described in
//! [`crate::dispatch`].

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, Once};

use crate::config::Config;
use crate::event::{Event, DEPTH_MAX};
use crate::time;

#[cfg(feature = "double-buffer")]
const DOUBLE_BUFFER_COMPILED: bool = true;
#[cfg(not(feature = "double-buffer"))]
const DOUBLE_BUFFER_COMPILED: bool = false;

/// One event array with its write cursor.
pub(crate) struct RingBuf {
    slots: Box<[Event]>,
    head: usize,
    wraps: u64,
}

impl RingBuf {
    fn new(capacity: usize) -> Self {
        Self {
            slots: vec![Event::empty(); capacity.max(1)].into_boxed_slice(),
            head: 0,
            wraps: 0,
        }
    }

    pub(crate) fn store(&mut self, e: Event) {
        let cap = self.slots.len();
        self.slots[self.head] = e;
        self.head = (self.head + 1) % cap;
        if self.head == 0 {
            self.wraps += 1;
        }
    }

    /// Number of retrievable events: min(total writes, capacity).
    pub(crate) fn len(&self) -> usize {
        if self.wraps == 0 {
            self.head
        } else {
            self.slots.len()
        }
    }

    /// Events in chronological order. Once wrapped, the oldest retained event
    /// sits at the head cursor.
    pub(crate) fn iter_chrono(&self) -> impl Iterator<Item = &Event> {
        let cap = self.slots.len();
        let start = if self.wraps == 0 { 0 } else { self.head };
        (0..self.len()).map(move |i| &self.slots[(start + i) % cap])
    }

    pub(crate) fn reset(&mut self) {
        self.head = 0;
        self.wraps = 0;
    }

    fn occupancy(&self) -> f32 {
        if self.wraps > 0 {
            1.0
        } else {
            self.head as f32 / self.slots.len() as f32
        }
    }
}

/// Per-thread ring: one or two event arrays, the depth stacks used for
/// duration and message attribution, and the producer's identity.
pub struct Ring {
    pub(crate) bufs: Vec<RingBuf>,
    active: AtomicUsize,
    pub(crate) flush_mtx: Mutex<()>,
    pub(crate) depth: usize,
    pub(crate) tid: u32,
    pub(crate) color_offset: u8,
    pub(crate) registered: bool,
    pub(crate) start_stack: [u64; DEPTH_MAX],
    pub(crate) func_stack: [&'static str; DEPTH_MAX],
}

impl Ring {
    pub(crate) fn new(cfg: &Config) -> Box<Ring> {
        let mut bufs = vec![RingBuf::new(cfg.ring_capacity)];
        if cfg.use_double_buffering {
            if DOUBLE_BUFFER_COMPILED {
                bufs.push(RingBuf::new(cfg.ring_capacity));
            } else {
                static WARNED: Once = Once::new();
                WARNED.call_once(|| {
                    log::error!(
                        "use_double_buffering is set but the double-buffer feature \
                         is not compiled in; the option is ignored"
                    );
                });
            }
        }
        let tid = time::thread_id_hash();
        Box::new(Ring {
            bufs,
            active: AtomicUsize::new(0),
            flush_mtx: Mutex::new(()),
            depth: 0,
            tid,
            color_offset: (tid % 8) as u8,
            registered: false,
            start_stack: [0; DEPTH_MAX],
            func_stack: [""; DEPTH_MAX],
        })
    }

    /// Index of the array the producer currently writes to.
    #[inline(always)]
    pub(crate) fn active_index(&self) -> usize {
        if self.bufs.len() > 1 {
            self.active.load(Ordering::Acquire)
        } else {
            0
        }
    }

    #[inline(always)]
    pub(crate) fn store(&mut self, e: Event) {
        let idx = self.active_index();
        self.bufs[idx].store(e);
    }

    /// Fraction of the active array in use; 1.0 once it has wrapped.
    pub(crate) fn occupancy(&self) -> f32 {
        self.bufs[self.active_index()].occupancy()
    }

    /// Redirects the producer to the other array and returns the index of the
    /// array it just left. Caller must hold `flush_mtx`.
    pub(crate) fn swap_active(&self) -> usize {
        let old = self.active.load(Ordering::Relaxed);
        self.active.store(1 - old, Ordering::Release);
        old
    }

    pub(crate) fn double_buffered(&self) -> bool {
        self.bufs.len() > 1
    }
}

impl Drop for Ring {
    fn drop(&mut self) {
        // centrally owned rings are removed by the registry itself
        if self.registered && !crate::registry::external_installed() {
            let ptr: *mut Ring = self;
            crate::registry::registry().remove(ptr);
            self.registered = false;
        }
    }
}
