//! Process-wide directory of live rings
//!
//! Flush-all and the binary dumper work from a snapshot of the pointer list.
//! The interval between snapshot and use is safe because a ring being
//! destroyed removes itself from the list under the same mutex before its
//! storage is freed.

use std::collections::HashMap;
use std::sync::atomic::{AtomicPtr, Ordering};
use std::sync::Mutex;

use crate::config::get_config;
use crate::ring::Ring;

struct Inner {
    rings: Vec<*mut Ring>,
    // centralized ownership, only populated when external state is installed
    by_thread: HashMap<usize, Box<Ring>>,
}

// raw back-pointers to rings owned elsewhere; owners unregister before freeing
unsafe impl Send for Inner {}

pub struct Registry {
    inner: Mutex<Inner>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                rings: Vec::new(),
                by_thread: HashMap::new(),
            }),
        }
    }

    pub(crate) fn add(&self, ring: *mut Ring) {
        self.inner.lock().unwrap().rings.push(ring);
    }

    pub(crate) fn remove(&self, ring: *mut Ring) {
        self.inner.lock().unwrap().rings.retain(|&r| r != ring);
    }

    pub(crate) fn snapshot(&self) -> Vec<*mut Ring> {
        self.inner.lock().unwrap().rings.clone()
    }

    /// Centralized ring ownership for the shared-state mode: rings are
    /// heap-allocated here, keyed by thread identity, and destroyed when the
    /// thread's teardown guard runs.
    pub(crate) fn get_or_create_for_current_thread(&self) -> *mut Ring {
        let key = thread_id::get();
        let mut inner = self.inner.lock().unwrap();
        if let Some(ring) = inner.by_thread.get_mut(&key) {
            return &mut **ring as *mut Ring;
        }
        let mut ring = Ring::new(get_config());
        ring.registered = true;
        let ptr: *mut Ring = &mut *ring;
        inner.rings.push(ptr);
        inner.by_thread.insert(key, ring);
        ptr
    }

    pub(crate) fn remove_for_thread(&self, key: usize) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(ring) = inner.by_thread.remove(&key) {
            let ptr: *const Ring = &*ring;
            inner.rings.retain(|&r| r as *const Ring != ptr);
            // Box drop frees the ring; its Drop skips deregistration in this
            // mode, the entry was just removed above
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

lazy_static::lazy_static! {
    static ref LOCAL_REGISTRY: Registry = Registry::new();
}

static EXTERNAL_REGISTRY: AtomicPtr<Registry> = AtomicPtr::new(std::ptr::null_mut());

pub(crate) fn install_external(registry: &'static Registry) {
    EXTERNAL_REGISTRY.store(
        registry as *const Registry as *mut Registry,
        Ordering::Release,
    );
}

pub(crate) fn external_installed() -> bool {
    !EXTERNAL_REGISTRY.load(Ordering::Acquire).is_null()
}

/// The active registry: the externally installed one if present, else the
/// process-local instance.
pub(crate) fn registry() -> &'static Registry {
    let external = EXTERNAL_REGISTRY.load(Ordering::Acquire);
    if external.is_null() {
        &LOCAL_REGISTRY
    } else {
        unsafe { &*external }
    }
}
