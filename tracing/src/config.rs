//! Runtime configuration record and its process-wide accessor
//!
//! Consumer code never reads a static record directly: `get_config` returns
//! either the default process-local record or an externally installed one
//! (see [`crate::dispatch::install_external_state`]). Reads are
//! unsynchronized so the hot path pays nothing; the contract is that the
//! record is only mutated before tracing starts or at quiescent points.

use std::cell::UnsafeCell;
use std::path::PathBuf;
use std::sync::atomic::{AtomicPtr, Ordering};
use std::sync::Mutex;

use crate::filter::FilterSet;

/// How events leave the recorder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TracingMode {
    /// Events stored in the per-thread ring, flushed manually. Lossy once the
    /// ring wraps; no I/O on the hot path.
    Buffered,
    /// Events handed to the asynchronous queue and written by the background
    /// drain task. Loss-free up to the sink's throughput.
    Immediate,
    /// Both at once, with a capacity-driven flush of the ring.
    Hybrid,
}

/// Directory structure under the dump output root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputLayout {
    /// All files directly in the output directory.
    Flat,
    /// One `YYYY-MM-DD` subdirectory per day.
    ByDate,
    /// One `session_NNN` subdirectory, auto-incremented when the configured
    /// session number is zero.
    BySession,
}

/// What the scope-exit hook does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushPolicy {
    Never,
    /// Flush all rings when a scope exit returns the depth to zero.
    OnOutermost,
    /// Flush the current thread's ring on every scope exit.
    OnEveryExit,
}

/// Runtime-tunable knobs read by every other component.
#[derive(Debug, Clone)]
pub struct Config {
    // display
    pub print_timing: bool,
    pub print_timestamp: bool,
    pub print_thread: bool,
    pub colorize_depth: bool,
    pub include_file_line: bool,
    pub include_filename: bool,
    pub include_function_name: bool,
    pub show_full_path: bool,

    // formatting
    pub filename_width: usize,
    pub line_width: usize,
    pub function_width: usize,

    // markers
    pub show_indent_markers: bool,
    pub indent_marker: String,
    pub enter_marker: String,
    pub exit_marker: String,
    pub msg_marker: String,

    // modes
    pub mode: TracingMode,
    pub flush_on_scope_exit: FlushPolicy,
    pub auto_flush_threshold: f32,
    /// Drain-task wait timeout, in milliseconds.
    pub drain_interval_ms: u64,
    /// Capacity hint for the drain task's batch buffer.
    pub immediate_batch_hint: usize,
    pub use_double_buffering: bool,

    // performance
    pub ring_capacity: usize,
    pub print_stats: bool,
    pub track_memory: bool,

    // filter
    pub filter: FilterSet,

    // dump
    pub dump_prefix: String,
    pub dump_suffix: String,
    pub output_dir: Option<PathBuf>,
    pub output_layout: OutputLayout,
    /// Session number for the BySession layout; 0 auto-increments by scanning
    /// existing `session_NNN` siblings.
    pub current_session: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            print_timing: true,
            print_timestamp: false,
            print_thread: true,
            colorize_depth: false,
            include_file_line: true,
            include_filename: true,
            include_function_name: true,
            show_full_path: false,
            filename_width: 20,
            line_width: 5,
            function_width: 20,
            show_indent_markers: true,
            indent_marker: "| ".to_owned(),
            enter_marker: "-> ".to_owned(),
            exit_marker: "<- ".to_owned(),
            msg_marker: "- ".to_owned(),
            mode: TracingMode::Buffered,
            flush_on_scope_exit: FlushPolicy::OnOutermost,
            auto_flush_threshold: 0.9,
            drain_interval_ms: 1,
            immediate_batch_hint: 128,
            use_double_buffering: false,
            ring_capacity: 4096,
            print_stats: false,
            track_memory: false,
            filter: FilterSet::default(),
            dump_prefix: "trace".to_owned(),
            dump_suffix: ".trc".to_owned(),
            output_dir: None,
            output_layout: OutputLayout::Flat,
            current_session: 0,
        }
    }
}

/// Holder for a configuration record readable without locking.
///
/// Mutation goes through [`with_config_mut`], which serializes writers; reads
/// are raw. The discipline that makes this sound in practice is the same one
/// the filter lists already require: no mutation while producers are
/// recording.
pub struct ConfigCell {
    inner: UnsafeCell<Config>,
}

// unsynchronized on purpose - recording must not pay for a lock per event
unsafe impl Sync for ConfigCell {}

impl ConfigCell {
    pub fn new(config: Config) -> Self {
        Self {
            inner: UnsafeCell::new(config),
        }
    }

    fn as_ptr(&self) -> *mut Config {
        self.inner.get()
    }
}

impl Default for ConfigCell {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

lazy_static::lazy_static! {
    static ref LOCAL_CONFIG: ConfigCell = ConfigCell::default();
    static ref WRITER_LOCK: Mutex<()> = Mutex::new(());
}

static EXTERNAL_CONFIG: AtomicPtr<ConfigCell> = AtomicPtr::new(std::ptr::null_mut());

pub(crate) fn install_external_config(cell: &'static ConfigCell) {
    EXTERNAL_CONFIG.store(cell as *const ConfigCell as *mut ConfigCell, Ordering::Release);
}

fn config_cell() -> &'static ConfigCell {
    let external = EXTERNAL_CONFIG.load(Ordering::Acquire);
    if external.is_null() {
        &LOCAL_CONFIG
    } else {
        unsafe { &*external }
    }
}

/// The active configuration record.
#[inline(always)]
pub fn get_config() -> &'static Config {
    unsafe { &*config_cell().as_ptr() }
}

/// Mutates the active configuration record.
///
/// Writers are serialized against each other; they are not serialized against
/// readers. Call only before tracing starts or at quiescent points.
pub fn with_config_mut<R>(f: impl FnOnce(&mut Config) -> R) -> R {
    let _writers = WRITER_LOCK.lock().unwrap();
    unsafe { f(&mut *config_cell().as_ptr()) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_knobs() {
        let c = Config::default();
        assert_eq!(c.ring_capacity, 4096);
        assert!((c.auto_flush_threshold - 0.9).abs() < f32::EPSILON);
        assert_eq!(c.drain_interval_ms, 1);
        assert_eq!(c.mode, TracingMode::Buffered);
        assert_eq!(c.flush_on_scope_exit, FlushPolicy::OnOutermost);
        assert_eq!(c.output_layout, OutputLayout::Flat);
        assert_eq!(c.dump_prefix, "trace");
        assert_eq!(c.dump_suffix, ".trc");
        assert_eq!(c.filter.max_depth, -1);
        assert!(!c.use_double_buffering);
        assert!(!c.track_memory);
    }
}
