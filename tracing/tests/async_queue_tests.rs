//! Asynchronous immediate mode: drain barrier, final drain, ordering.

mod utils;

use scopetrace::dispatch::{
    flush_immediate_queue, immediate_queue_counters, start_async_immediate, stop_async_immediate,
};
use scopetrace::prelude::*;
use serial_test::serial;
use utils::*;

#[test]
#[serial]
fn drain_barrier_makes_written_equal_enqueued() {
    reset_config(|c| {
        bare(c);
        c.mode = TracingMode::Immediate;
        c.drain_interval_ms = 50;
    });
    let buf = capture_output();

    run_traced(|| {
        for i in 0..1000 {
            trace_msg!("event {i:04}");
        }
    });

    flush_immediate_queue();
    let (enqueued, written) = immediate_queue_counters();
    assert_eq!(enqueued, written);

    // all 1000 events, in enqueue order
    let lines = buf.lines();
    assert_eq!(lines.len(), 1000);
    for (i, line) in lines.iter().enumerate() {
        assert_eq!(line, &format!("- event {i:04}"));
    }

    stop_async_immediate();
}

#[test]
#[serial]
fn stop_performs_a_final_drain() {
    reset_config(|c| {
        bare(c);
        c.mode = TracingMode::Immediate;
        // a long interval so the final drain, not the timer, delivers the tail
        c.drain_interval_ms = 500;
    });
    let buf = capture_output();

    run_traced(|| {
        for i in 0..50 {
            trace_msg!("m{i}");
        }
    });
    stop_async_immediate();

    assert_eq!(buf.lines().len(), 50);
}

#[test]
#[serial]
fn queue_restarts_after_an_explicit_stop() {
    reset_config(|c| {
        bare(c);
        c.mode = TracingMode::Immediate;
    });
    let buf = capture_output();

    start_async_immediate();
    run_traced(|| trace_msg!("one"));
    stop_async_immediate();

    // the next immediate-mode event brings the drain task back
    run_traced(|| trace_msg!("two"));
    flush_immediate_queue();
    stop_async_immediate();

    let lines = buf.lines();
    assert_eq!(lines, vec!["- one".to_owned(), "- two".to_owned()]);
}

#[test]
#[serial]
fn per_thread_subsequences_survive_interleaving() {
    reset_config(|c| {
        bare(c);
        c.mode = TracingMode::Immediate;
    });
    let buf = capture_output();

    let threads: Vec<_> = (0..3)
        .map(|t| {
            std::thread::spawn(move || {
                for i in 0..100 {
                    trace_msg!("t{t}-{i:03}");
                }
            })
        })
        .collect();
    for handle in threads {
        handle.join().unwrap();
    }

    flush_immediate_queue();
    stop_async_immediate();

    let lines = buf.lines();
    assert_eq!(lines.len(), 300);
    for t in 0..3 {
        let prefix = format!("- t{t}-");
        let sub: Vec<_> = lines.iter().filter(|l| l.starts_with(&prefix)).collect();
        assert_eq!(sub.len(), 100);
        for (i, line) in sub.iter().enumerate() {
            assert_eq!(**line, format!("- t{t}-{i:03}"));
        }
    }
}

#[test]
#[serial]
fn dedicated_immediate_sink_receives_the_stream() {
    reset_config(|c| {
        bare(c);
        c.mode = TracingMode::Immediate;
    });
    let main_buf = capture_output();
    let immediate_buf = capture_immediate();

    run_traced(|| {
        for i in 0..10 {
            trace_msg!("routed {i}");
        }
    });
    flush_immediate_queue();
    stop_async_immediate();
    scopetrace::sink::clear_immediate_output();

    assert_eq!(immediate_buf.lines().len(), 10);
    assert!(main_buf.contents().is_empty());
}
