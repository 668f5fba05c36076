//! Text emitter: one event in, one line out
//!
//! All formatting decisions live here; the recorder knows nothing about
//! columns or colors. Per-line atomicity comes from the callers: flush-ring
//! holds the sink mutex, the drain task is a single consumer.

use std::io::{self, Write};

use chrono::TimeZone;

use crate::config::Config;
use crate::event::{Event, EventKind};

const PALETTE: [&str; 8] = [
    "\x1b[31m", // red
    "\x1b[32m", // green
    "\x1b[33m", // yellow
    "\x1b[34m", // blue
    "\x1b[35m", // magenta
    "\x1b[36m", // cyan
    "\x1b[37m", // white
    "\x1b[91m", // bright red
];
const RESET: &str = "\x1b[0m";

/// Basename of a path, handling both separators.
pub(crate) fn base_name(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

/// Auto-scaled duration: ns, us, ms or s by magnitude.
pub fn format_duration(ns: u64) -> String {
    if ns < 1_000 {
        format!("{ns} ns")
    } else if ns < 1_000_000 {
        format!("{:.2} us", ns as f64 / 1e3)
    } else if ns < 1_000_000_000 {
        format!("{:.2} ms", ns as f64 / 1e6)
    } else {
        format!("{:.3} s", ns as f64 / 1e9)
    }
}

/// Writes one formatted event line, trailing newline included.
pub fn print_event(e: &Event, cfg: &Config, out: &mut dyn Write) -> io::Result<()> {
    if cfg.colorize_depth {
        let idx = (e.depth as usize + e.color_offset as usize) % PALETTE.len();
        out.write_all(PALETTE[idx].as_bytes())?;
    }

    if cfg.print_timestamp {
        let secs = (e.ts_ns / 1_000_000_000) as i64;
        let nanos = (e.ts_ns % 1_000_000_000) as u32;
        if let Some(dt) = chrono::Local.timestamp_opt(secs, nanos).single() {
            write!(out, "[{}] ", dt.format("%Y-%m-%d %H:%M:%S%.3f"))?;
        }
    }

    if cfg.print_thread {
        write!(out, "({:08x}) ", e.tid)?;
    }

    // aligned prefix before the indentation so columns stay stable
    if cfg.include_file_line && !e.file.is_empty() {
        let mut printed = false;
        if cfg.include_filename {
            let path = if cfg.show_full_path {
                e.file
            } else {
                base_name(e.file)
            };
            let width = if cfg.filename_width > 0 {
                cfg.filename_width
            } else {
                20
            };
            write!(out, "{:<w$.w$}", path, w = width)?;
            printed = true;
        }
        if cfg.include_function_name {
            let line_width = if cfg.line_width > 0 { cfg.line_width } else { 5 };
            let func_width = if cfg.function_width > 0 {
                cfg.function_width
            } else {
                20
            };
            if printed {
                write!(out, ":")?;
            }
            write!(out, "{:>w$}", e.line, w = line_width)?;
            write!(out, " {:<w$.w$}", e.func, w = func_width)?;
            printed = true;
        }
        if printed {
            write!(out, " ")?;
        }
    }

    let marker = if cfg.show_indent_markers {
        cfg.indent_marker.as_str()
    } else {
        "  "
    };
    for _ in 0..e.depth {
        out.write_all(marker.as_bytes())?;
    }

    match e.kind {
        EventKind::Enter => write!(out, "{}{}", cfg.enter_marker, e.func)?,
        EventKind::Exit => {
            if cfg.print_timing {
                write!(
                    out,
                    "{}{}  [{}]",
                    cfg.exit_marker,
                    e.func,
                    format_duration(e.dur_ns)
                )?;
            } else {
                write!(out, "{}{}", cfg.exit_marker, e.func)?;
            }
        }
        EventKind::Message => write!(out, "{}{}", cfg.msg_marker, e.msg.as_str())?,
    }

    if cfg.colorize_depth {
        out.write_all(RESET.as_bytes())?;
    }
    writeln!(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::MsgBuf;

    fn bare_config() -> Config {
        Config {
            print_thread: false,
            include_file_line: false,
            ..Config::default()
        }
    }

    fn event(kind: EventKind, depth: u32) -> Event {
        Event {
            kind,
            depth,
            tid: 0xabcd_1234,
            func: "parse_header",
            file: "src/codec/reader.rs",
            line: 42,
            ..Event::empty()
        }
    }

    fn render(e: &Event, cfg: &Config) -> String {
        let mut out = Vec::new();
        print_event(e, cfg, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn duration_units_scale_by_magnitude() {
        assert_eq!(format_duration(500), "500 ns");
        assert_eq!(format_duration(1_500), "1.50 us");
        assert_eq!(format_duration(2_500_000), "2.50 ms");
        assert_eq!(format_duration(3_200_000_000), "3.200 s");
    }

    #[test]
    fn enter_line_with_markers() {
        let line = render(&event(EventKind::Enter, 2), &bare_config());
        assert_eq!(line, "| | -> parse_header\n");
    }

    #[test]
    fn exit_line_carries_duration() {
        let mut e = event(EventKind::Exit, 0);
        e.dur_ns = 1_500;
        let line = render(&e, &bare_config());
        assert_eq!(line, "<- parse_header  [1.50 us]\n");
    }

    #[test]
    fn exit_without_timing() {
        let mut cfg = bare_config();
        cfg.print_timing = false;
        let mut e = event(EventKind::Exit, 0);
        e.dur_ns = 1_500;
        assert_eq!(render(&e, &cfg), "<- parse_header\n");
    }

    #[test]
    fn message_line_uses_the_payload() {
        let mut e = event(EventKind::Message, 1);
        e.msg = MsgBuf::from_args(format_args!("step {}", 3));
        assert_eq!(render(&e, &bare_config()), "| - step 3\n");
    }

    #[test]
    fn plain_indentation_when_markers_are_off() {
        let mut cfg = bare_config();
        cfg.show_indent_markers = false;
        let line = render(&event(EventKind::Enter, 3), &cfg);
        assert_eq!(line, "      -> parse_header\n");
    }

    #[test]
    fn thread_id_is_eight_hex_digits() {
        let mut cfg = bare_config();
        cfg.print_thread = true;
        let line = render(&event(EventKind::Enter, 0), &cfg);
        assert!(line.starts_with("(abcd1234) "));
    }

    #[test]
    fn prefix_block_aligns_and_truncates() {
        let mut cfg = bare_config();
        cfg.include_file_line = true;
        cfg.filename_width = 8;
        cfg.line_width = 4;
        cfg.function_width = 6;
        let line = render(&event(EventKind::Enter, 0), &cfg);
        // basename head-truncated to 8, line right-aligned in 4, function to 6
        assert_eq!(line, "reader.r:  42 parse_ -> parse_header\n");
    }

    #[test]
    fn full_path_when_configured() {
        let mut cfg = bare_config();
        cfg.include_file_line = true;
        cfg.show_full_path = true;
        cfg.filename_width = 19;
        let line = render(&event(EventKind::Enter, 0), &cfg);
        assert!(line.starts_with("src/codec/reader.rs:"));
    }

    #[test]
    fn colorize_wraps_the_line() {
        let mut cfg = bare_config();
        cfg.colorize_depth = true;
        let mut e = event(EventKind::Enter, 1);
        e.color_offset = 2;
        let line = render(&e, &cfg);
        // (depth 1 + offset 2) % 8 = 3 -> blue
        assert!(line.starts_with("\x1b[34m"));
        assert!(line.ends_with("\x1b[0m\n"));
    }

    #[test]
    fn base_name_handles_both_separators() {
        assert_eq!(base_name("a/b/c.rs"), "c.rs");
        assert_eq!(base_name("a\\b\\c.rs"), "c.rs");
        assert_eq!(base_name("c.rs"), "c.rs");
        assert_eq!(base_name(""), "");
    }
}
