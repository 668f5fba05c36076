//! Nested scopes, messages and a final flush through the lifecycle guard.
//!
//! ```sh
//! cargo run --example basic
//! ```

use scopetrace::prelude::*;

fn fibonacci(n: u64) -> u64 {
    trace_scope!();
    if n < 2 {
        return n;
    }
    fibonacci(n - 1) + fibonacci(n - 2)
}

fn main() {
    with_config_mut(|c| {
        c.flush_on_scope_exit = FlushPolicy::Never;
        c.filter.max_depth = 3; // keep the recursion readable
    });
    let _guard = TraceGuard::new();

    trace_scope!("main");
    trace_msg!("fib(8) = {}", fibonacci(8));
}
