//! Shared helpers for the integration tests.
//!
//! Tracing state is process-global, so every test resets the configuration,
//! installs a fresh capture sink, and records from spawned threads only (a
//! thread's ring deregisters when the thread exits, keeping tests isolated).
//! Tests touching the global state must be #[serial].
#![allow(dead_code)]

use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use std::thread;

use scopetrace::prelude::*;

/// A writer that appends into a shared byte buffer.
#[derive(Clone, Default)]
pub struct SharedBuf {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuf {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        String::from_utf8(self.bytes.lock().unwrap().clone()).unwrap()
    }

    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_owned).collect()
    }
}

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.bytes.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Resets the global configuration to defaults, disables the scope-exit flush
/// hook (tests flush explicitly), then applies `f`.
pub fn reset_config(f: impl FnOnce(&mut Config)) {
    with_config_mut(|c| {
        *c = Config::default();
        c.flush_on_scope_exit = FlushPolicy::Never;
        f(c);
    });
}

/// Strips the variable columns so lines can be compared verbatim.
pub fn bare(c: &mut Config) {
    c.print_thread = false;
    c.include_file_line = false;
}

/// Replaces the main text sink with a capture buffer and returns it.
pub fn capture_output() -> SharedBuf {
    let buf = SharedBuf::new();
    scopetrace::sink::set_output_writer(Box::new(buf.clone()));
    buf
}

/// Replaces the immediate sink with a capture buffer and returns it.
pub fn capture_immediate() -> SharedBuf {
    let buf = SharedBuf::new();
    scopetrace::sink::set_immediate_output_writer(Box::new(buf.clone()));
    buf
}

/// Runs `f` on a fresh thread and joins it; the thread's ring is created,
/// used and destroyed within the call.
pub fn run_traced(f: impl FnOnce() + Send + 'static) {
    thread::spawn(f).join().unwrap();
}
