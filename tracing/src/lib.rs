//! Scopetrace
//!
//! In-process function-scope tracing with per-thread ring buffers.
//!
//! Application threads record function entry, function exit (with elapsed
//! wall-clock duration) and formatted messages into a ring they own
//! exclusively, at sub-microsecond per-event cost and with no allocation on
//! the hot path. Events are delivered as aligned human-readable text or as a
//! compact length-prefixed binary dump (see the `scopetrace-wire` crate for
//! the format contract).
//!
//! Three delivery disciplines share one API: fully buffered (lossy once the
//! ring wraps, zero I/O while recording), asynchronous immediate (loss-free,
//! a background drain task writes the events), and hybrid (both at once,
//! with a capacity-driven flush of the ring).
//!
//! # Examples
//! ```
//! use scopetrace::prelude::*;
//!
//! fn parse(input: &str) -> usize {
//!     trace_scope!();
//!     trace_msg!("parsing {} bytes", input.len());
//!     input.len()
//! }
//!
//! // a guard in main gives orderly shutdown: final flush, drain-task stop
//! let _guard = TraceGuard::without_final_flush();
//! parse("hello");
//! scopetrace::dispatch::flush_all();
//! ```

pub mod config;
pub mod dispatch;
pub mod dump;
pub mod errors;
pub mod event;
pub mod filter;
pub mod guards;
pub mod ini;
pub mod stats;
pub mod sink;
pub mod time;

mod emit;
mod memory;
mod queue;
mod registry;
mod ring;

#[macro_use]
extern crate lazy_static;

#[macro_use]
mod macros;

pub use crate::config::get_config;
pub use crate::registry::Registry;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod prelude {
    pub use crate::config::{
        get_config, with_config_mut, Config, FlushPolicy, OutputLayout, TracingMode,
    };
    pub use crate::dispatch::{
        flush_all, flush_current_thread, flush_immediate_queue, install_external_state,
        start_async_immediate, stop_async_immediate,
    };
    pub use crate::dump::{dump_binary, generate_dump_filename};
    pub use crate::guards::{ScopeGuard, TraceGuard};
    pub use crate::ini::load_config;
    pub use crate::{trace_arg, trace_msg, trace_scope};
    pub use scopetrace_proc_macros::*;
}
