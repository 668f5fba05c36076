//! On-demand performance summaries from buffered events
//!
//! Walks a registry snapshot and folds Exit events into per-function
//! aggregates, per thread and globally. Memory figures are process-wide RSS
//! samples, a proxy for attribution, not allocation counts. No hot-path
//! effect.

use std::collections::BTreeMap;
use std::io::{self, Write};

use crate::config::get_config;
use crate::event::EventKind;
use crate::memory;
use crate::registry;

#[derive(Debug, Clone)]
pub struct FunctionStats {
    pub name: &'static str,
    pub calls: u64,
    pub total_ns: u64,
    pub min_ns: u64,
    pub max_ns: u64,
    /// Largest RSS sample seen on this function's events.
    pub peak_rss: u64,
}

impl FunctionStats {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            calls: 0,
            total_ns: 0,
            min_ns: u64::MAX,
            max_ns: 0,
            peak_rss: 0,
        }
    }

    pub fn avg_ns(&self) -> f64 {
        if self.calls > 0 {
            self.total_ns as f64 / self.calls as f64
        } else {
            0.0
        }
    }

    fn fold(&mut self, dur_ns: u64, rss: u64) {
        self.calls += 1;
        self.total_ns += dur_ns;
        self.min_ns = self.min_ns.min(dur_ns);
        self.max_ns = self.max_ns.max(dur_ns);
        self.peak_rss = self.peak_rss.max(rss);
    }

    fn merge(&mut self, other: &FunctionStats) {
        self.calls += other.calls;
        self.total_ns += other.total_ns;
        self.min_ns = self.min_ns.min(other.min_ns);
        self.max_ns = self.max_ns.max(other.max_ns);
        self.peak_rss = self.peak_rss.max(other.peak_rss);
    }
}

#[derive(Debug, Clone)]
pub struct ThreadStats {
    pub tid: u32,
    pub total_events: u64,
    pub peak_rss: u64,
    pub functions: Vec<FunctionStats>,
}

/// Aggregates the events currently buffered in every registered ring.
///
/// Only Exit events with a function name contribute counts and durations; any
/// event with a non-zero memory sample updates the per-thread peak.
pub fn compute() -> Vec<ThreadStats> {
    let cfg = get_config();
    let mut per_thread: BTreeMap<u32, (BTreeMap<&'static str, FunctionStats>, u64, u64)> =
        BTreeMap::new();

    for ptr in registry::registry().snapshot() {
        let ring = unsafe { &*ptr };
        let buffers = if ring.double_buffered() && cfg.use_double_buffering {
            2
        } else {
            1
        };
        let entry = per_thread.entry(ring.tid).or_default();
        for idx in 0..buffers {
            for event in ring.bufs[idx].iter_chrono() {
                entry.2 += 1;
                if event.memory_rss > 0 {
                    entry.1 = entry.1.max(event.memory_rss);
                }
                if event.kind != EventKind::Exit || event.func.is_empty() {
                    continue;
                }
                entry
                    .0
                    .entry(event.func)
                    .or_insert_with(|| FunctionStats::new(event.func))
                    .fold(event.dur_ns, event.memory_rss);
            }
        }
    }

    per_thread
        .into_iter()
        .map(|(tid, (functions, peak_rss, total_events))| ThreadStats {
            tid,
            total_events,
            peak_rss,
            functions: functions.into_values().collect(),
        })
        .collect()
}

/// Duration for the summary table; same scaling as the emitter but with the
/// micro sign.
pub fn format_duration(ns: u64) -> String {
    if ns < 1_000 {
        format!("{ns} ns")
    } else if ns < 1_000_000 {
        format!("{:.2} µs", ns as f64 / 1e3)
    } else if ns < 1_000_000_000 {
        format!("{:.2} ms", ns as f64 / 1e6)
    } else {
        format!("{:.3} s", ns as f64 / 1e9)
    }
}

pub fn format_memory(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * KB;
    const GB: u64 = 1024 * MB;
    if bytes < KB {
        format!("{bytes} B")
    } else if bytes < MB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else if bytes < GB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    }
}

const RULE: &str =
    "--------------------------------------------------------------------------------";
const DOUBLE_RULE: &str =
    "================================================================================";

/// Writes the formatted summary table: global section sorted by total time
/// descending, an RSS summary when samples exist, and a per-thread breakdown
/// when more than one thread recorded.
pub fn print(out: &mut dyn Write) -> io::Result<()> {
    let threads = compute();
    if threads.is_empty() {
        return Ok(());
    }

    writeln!(out)?;
    writeln!(out, "{DOUBLE_RULE}")?;
    writeln!(out, " Performance Metrics Summary")?;
    writeln!(out, "{DOUBLE_RULE}")?;

    let mut global: BTreeMap<&'static str, FunctionStats> = BTreeMap::new();
    let mut global_peak_rss = 0u64;
    for thread in &threads {
        global_peak_rss = global_peak_rss.max(thread.peak_rss);
        for f in &thread.functions {
            global
                .entry(f.name)
                .or_insert_with(|| FunctionStats::new(f.name))
                .merge(f);
        }
    }

    let mut sorted: Vec<&FunctionStats> = global.values().collect();
    sorted.sort_by(|a, b| b.total_ns.cmp(&a.total_ns));

    writeln!(out, "\nGlobal Statistics:")?;
    writeln!(out, "{RULE}")?;
    writeln!(
        out,
        "{:<40} {:>10} {:>12} {:>12} {:>12} {:>12} {:>12}",
        "Function", "Calls", "Total", "Avg", "Min", "Max", "Memory"
    )?;
    writeln!(out, "{RULE}")?;
    for f in &sorted {
        writeln!(
            out,
            "{:<40} {:>10} {:>12} {:>12} {:>12} {:>12} {:>12}",
            f.name,
            f.calls,
            format_duration(f.total_ns),
            format_duration(f.avg_ns() as u64),
            format_duration(f.min_ns),
            format_duration(f.max_ns),
            format_memory(f.peak_rss)
        )?;
    }

    if global_peak_rss > 0 {
        writeln!(out, "\nSystem Memory Summary:")?;
        writeln!(out, "{RULE}")?;
        writeln!(out, "Peak RSS: {}", format_memory(global_peak_rss))?;
        writeln!(
            out,
            "Current RSS: {}",
            format_memory(memory::current_rss_bytes())
        )?;
    }

    if threads.len() > 1 {
        writeln!(out, "\nPer-Thread Breakdown:")?;
        writeln!(out, "{DOUBLE_RULE}")?;
        for thread in &threads {
            writeln!(
                out,
                "\nThread 0x{:08x} ({} events, peak RSS: {}):",
                thread.tid,
                thread.total_events,
                format_memory(thread.peak_rss)
            )?;
            writeln!(out, "{RULE}")?;
            writeln!(
                out,
                "{:<40} {:>10} {:>12} {:>12} {:>12}",
                "Function", "Calls", "Total", "Avg", "Memory"
            )?;
            writeln!(out, "{RULE}")?;
            let mut by_total = thread.functions.clone();
            by_total.sort_by(|a, b| b.total_ns.cmp(&a.total_ns));
            for f in &by_total {
                writeln!(
                    out,
                    "{:<40} {:>10} {:>12} {:>12} {:>12}",
                    f.name,
                    f.calls,
                    format_duration(f.total_ns),
                    format_duration(f.avg_ns() as u64),
                    format_memory(f.peak_rss)
                )?;
            }
        }
    }

    writeln!(out, "{DOUBLE_RULE}")?;
    writeln!(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_scaling_uses_the_micro_sign() {
        assert_eq!(format_duration(999), "999 ns");
        assert_eq!(format_duration(1_230), "1.23 µs");
        assert_eq!(format_duration(45_600_000), "45.60 ms");
        assert_eq!(format_duration(2_500_000_000), "2.500 s");
    }

    #[test]
    fn memory_scaling() {
        assert_eq!(format_memory(512), "512 B");
        assert_eq!(format_memory(2048), "2.00 KB");
        assert_eq!(format_memory(3 * 1024 * 1024), "3.00 MB");
        assert_eq!(format_memory(5 * 1024 * 1024 * 1024), "5.00 GB");
    }

    #[test]
    fn fold_tracks_extremes() {
        let mut f = FunctionStats::new("f");
        f.fold(100, 0);
        f.fold(300, 2048);
        f.fold(200, 1024);
        assert_eq!(f.calls, 3);
        assert_eq!(f.total_ns, 600);
        assert_eq!(f.min_ns, 100);
        assert_eq!(f.max_ns, 300);
        assert_eq!(f.peak_rss, 2048);
        assert!((f.avg_ns() - 200.0).abs() < 1e-9);
    }
}
