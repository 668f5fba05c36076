//! Hybrid mode: a real-time stream plus buffered history with auto-flush.
//!
//! ```sh
//! cargo run --example hybrid
//! ```

use scopetrace::prelude::*;

fn main() {
    with_config_mut(|c| {
        c.mode = TracingMode::Hybrid;
        c.ring_capacity = 64;
        c.auto_flush_threshold = 0.9;
        c.flush_on_scope_exit = FlushPolicy::Never;
    });
    let _guard = TraceGuard::without_final_flush();

    for batch in 0..4 {
        trace_scope!("batch");
        for item in 0..20 {
            trace_msg!("batch {batch} item {item}");
        }
    }

    flush_immediate_queue();
}
