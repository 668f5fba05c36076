//! RAII guards
use crate::config::get_config;
use crate::dispatch;
use crate::sink;
use crate::stats;

/// Scope guard: records Enter on construction, Exit (with duration) on drop.
///
/// Created by the `trace_scope!` macro; no allocation, no virtual dispatch.
/// The destructor always runs and always emits the Exit unless the matching
/// Enter was filtered.
pub struct ScopeGuard {
    func: &'static str,
    file: &'static str,
    line: u32,
}

impl ScopeGuard {
    #[inline(always)]
    pub fn new(func: &'static str, file: &'static str, line: u32) -> Self {
        dispatch::scope_enter(func, file, line);
        Self { func, file, line }
    }
}

impl Drop for ScopeGuard {
    #[inline(always)]
    fn drop(&mut self) {
        dispatch::scope_exit(self.func, self.file, self.line);
    }
}

/// Process-lifecycle guard: hold one in `main` for orderly shutdown.
///
/// On drop it flushes all rings (unless disabled), stops the asynchronous
/// drain task after its final drain, and prints the statistics table when
/// `print_stats` is set. This is the library's replacement for an at-exit
/// callback; events recorded after the guard drops stay in their rings.
pub struct TraceGuard {
    flush_on_drop: bool,
}

impl TraceGuard {
    pub fn new() -> Self {
        Self {
            flush_on_drop: true,
        }
    }

    /// Skips the final flush-all; the drain task is still stopped.
    pub fn without_final_flush() -> Self {
        Self {
            flush_on_drop: false,
        }
    }
}

impl Default for TraceGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TraceGuard {
    fn drop(&mut self) {
        if self.flush_on_drop {
            dispatch::flush_all();
        }
        dispatch::stop_async_immediate();
        if get_config().print_stats {
            let out = sink::text_sink();
            let mut writer = out.lock();
            let _ = stats::print(&mut **writer);
            let _ = writer.flush();
        }
    }
}
