//! Configuration-file loader
//!
//! INI-style grammar: `[section]` headers, `key = value` pairs, `#` and `;`
//! comments (full-line and inline), case-insensitive booleans, integers,
//! floats and optionally-quoted strings. Unparsable lines and unknown keys
//! are skipped with a warning and parsing continues; the return value only
//! reports whether the file could be opened.

use std::fs;
use std::path::Path;

use crate::config::{with_config_mut, Config, FlushPolicy, OutputLayout, TracingMode};
use crate::sink;

/// Loads an INI file into the active configuration record.
pub fn load_config<P: AsRef<Path>>(path: P) -> bool {
    let path = path.as_ref();
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            log::warn!("could not open config file {}: {e}", path.display());
            return false;
        }
    };
    let origin = path.display().to_string();
    with_config_mut(|cfg| apply(cfg, &text, &origin));
    true
}

pub(crate) fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "on" | "yes"
    )
}

pub(crate) fn parse_int(value: &str) -> i64 {
    value.trim().parse().unwrap_or(0)
}

pub(crate) fn parse_float(value: &str) -> f32 {
    value.trim().parse().unwrap_or(0.0)
}

pub(crate) fn unquote(value: &str) -> &str {
    let v = value.trim();
    v.strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(v)
}

/// Applies INI text to a configuration record. `origin` names the source in
/// warnings.
pub(crate) fn apply(cfg: &mut Config, text: &str, origin: &str) {
    let mut section = String::new();
    for (idx, raw) in text.lines().enumerate() {
        let line_num = idx + 1;
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }
        if line.starts_with('[') && line.ends_with(']') {
            section = line[1..line.len() - 1].trim().to_owned();
            if !matches!(
                section.as_str(),
                "output"
                    | "display"
                    | "formatting"
                    | "markers"
                    | "modes"
                    | "filter"
                    | "performance"
                    | "dump"
            ) {
                log::warn!("unknown section [{section}] in {origin}:{line_num}");
            }
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            log::warn!("invalid line in {origin}:{line_num} (no '=')");
            continue;
        };
        let key = key.trim();
        let mut value = value.trim();
        if let Some(pos) = value.find(['#', ';']) {
            value = value[..pos].trim_end();
        }
        apply_key(cfg, &section, key, value, origin, line_num);
    }
}

fn apply_key(cfg: &mut Config, section: &str, key: &str, value: &str, origin: &str, line: usize) {
    let unknown = || log::warn!("unknown key '{key}' in [{section}] at {origin}:{line}");
    match section {
        "output" => match key {
            "file" => {
                if let Err(e) = sink::set_output_path(unquote(value)) {
                    log::warn!("could not open output file '{value}': {e}");
                }
            }
            "immediate_file" => {
                if let Err(e) = sink::set_immediate_output_path(unquote(value)) {
                    log::warn!("could not open immediate output file '{value}': {e}");
                }
            }
            _ => unknown(),
        },
        "display" => match key {
            "print_timing" => cfg.print_timing = parse_bool(value),
            "print_timestamp" => cfg.print_timestamp = parse_bool(value),
            "print_thread" => cfg.print_thread = parse_bool(value),
            "colorize_depth" => cfg.colorize_depth = parse_bool(value),
            "include_file_line" => cfg.include_file_line = parse_bool(value),
            "include_filename" => cfg.include_filename = parse_bool(value),
            "include_function_name" => cfg.include_function_name = parse_bool(value),
            "show_full_path" => cfg.show_full_path = parse_bool(value),
            _ => unknown(),
        },
        "formatting" => match key {
            "filename_width" => cfg.filename_width = parse_int(value).max(0) as usize,
            "line_width" => cfg.line_width = parse_int(value).max(0) as usize,
            "function_width" => cfg.function_width = parse_int(value).max(0) as usize,
            _ => unknown(),
        },
        "markers" => match key {
            "show_indent_markers" => cfg.show_indent_markers = parse_bool(value),
            "indent_marker" => cfg.indent_marker = unquote(value).to_owned(),
            "enter_marker" => cfg.enter_marker = unquote(value).to_owned(),
            "exit_marker" => cfg.exit_marker = unquote(value).to_owned(),
            "message_marker" => cfg.msg_marker = unquote(value).to_owned(),
            _ => unknown(),
        },
        "modes" => match key {
            "mode" => match value.to_ascii_lowercase().as_str() {
                "buffered" => cfg.mode = TracingMode::Buffered,
                "immediate" => cfg.mode = TracingMode::Immediate,
                "hybrid" => cfg.mode = TracingMode::Hybrid,
                other => log::warn!("unknown mode '{other}' in {origin}:{line}"),
            },
            "flush_on_scope_exit" => match value.to_ascii_lowercase().as_str() {
                "never" => cfg.flush_on_scope_exit = FlushPolicy::Never,
                "outermost" => cfg.flush_on_scope_exit = FlushPolicy::OnOutermost,
                "every" => cfg.flush_on_scope_exit = FlushPolicy::OnEveryExit,
                other => log::warn!("unknown flush policy '{other}' in {origin}:{line}"),
            },
            "use_double_buffering" => cfg.use_double_buffering = parse_bool(value),
            "auto_flush_threshold" => cfg.auto_flush_threshold = parse_float(value),
            "immediate_flush_interval_ms" => {
                cfg.drain_interval_ms = parse_int(value).max(0) as u64
            }
            "immediate_queue_size" => {
                cfg.immediate_batch_hint = parse_int(value).max(0) as usize
            }
            _ => unknown(),
        },
        "filter" => match key {
            "include_function" => cfg
                .filter
                .include_functions
                .push(unquote(value).to_owned()),
            "exclude_function" => cfg
                .filter
                .exclude_functions
                .push(unquote(value).to_owned()),
            "include_file" => cfg.filter.include_files.push(unquote(value).to_owned()),
            "exclude_file" => cfg.filter.exclude_files.push(unquote(value).to_owned()),
            "max_depth" => cfg.filter.max_depth = parse_int(value) as i32,
            _ => unknown(),
        },
        "performance" => match key {
            "print_stats" => cfg.print_stats = parse_bool(value),
            "track_memory" => cfg.track_memory = parse_bool(value),
            "ring_capacity" => {
                let capacity = parse_int(value);
                if capacity > 0 {
                    cfg.ring_capacity = capacity as usize;
                } else {
                    log::warn!("ignoring non-positive ring_capacity in {origin}:{line}");
                }
            }
            _ => unknown(),
        },
        "dump" => match key {
            "prefix" => cfg.dump_prefix = unquote(value).to_owned(),
            "suffix" => cfg.dump_suffix = unquote(value).to_owned(),
            "output_dir" => cfg.output_dir = Some(unquote(value).into()),
            "layout" => match value.to_ascii_lowercase().as_str() {
                "flat" => cfg.output_layout = OutputLayout::Flat,
                "date" | "bydate" => cfg.output_layout = OutputLayout::ByDate,
                "session" | "bysession" => cfg.output_layout = OutputLayout::BySession,
                other => log::warn!("unknown layout '{other}' in {origin}:{line}"),
            },
            "session" => cfg.current_session = parse_int(value).max(0) as u32,
            _ => unknown(),
        },
        "" => log::warn!("key '{key}' outside any section at {origin}:{line}"),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn booleans_accept_all_spellings() {
        for v in ["true", "1", "on", "yes", "YES", "On", "TRUE"] {
            assert!(parse_bool(v), "{v}");
        }
        for v in ["false", "0", "off", "no", "No", "bogus", ""] {
            assert!(!parse_bool(v), "{v}");
        }
    }

    #[test]
    fn unquote_strips_one_pair() {
        assert_eq!(unquote("\"| \""), "| ");
        assert_eq!(unquote("plain"), "plain");
        assert_eq!(unquote("  spaced  "), "spaced");
        assert_eq!(unquote("\"unterminated"), "\"unterminated");
    }

    #[test]
    fn bad_numbers_become_zero() {
        assert_eq!(parse_int("12"), 12);
        assert_eq!(parse_int("-3"), -3);
        assert_eq!(parse_int("xyz"), 0);
        assert_eq!(parse_float("0.75"), 0.75);
        assert_eq!(parse_float("abc"), 0.0);
    }

    #[test]
    fn applies_sections_and_skips_garbage() {
        let mut cfg = Config::default();
        let text = r#"
# full-line comment
[display]
print_timing = off
print_timestamp = yes     ; inline comment
this line has no equals sign

[modes]
mode = Hybrid
auto_flush_threshold = 0.5
flush_on_scope_exit = never

[filter]
include_function = core_*
include_function = io_*
exclude_function = core_debug
max_depth = 7

[performance]
ring_capacity = 64

[dump]
prefix = "session"
layout = bydate

[bogus_section]
whatever = 1
"#;
        apply(&mut cfg, text, "test.ini");
        assert!(!cfg.print_timing);
        assert!(cfg.print_timestamp);
        assert_eq!(cfg.mode, TracingMode::Hybrid);
        assert_eq!(cfg.flush_on_scope_exit, FlushPolicy::Never);
        assert!((cfg.auto_flush_threshold - 0.5).abs() < 1e-6);
        assert_eq!(cfg.filter.include_functions, vec!["core_*", "io_*"]);
        assert_eq!(cfg.filter.exclude_functions, vec!["core_debug"]);
        assert_eq!(cfg.filter.max_depth, 7);
        assert_eq!(cfg.ring_capacity, 64);
        assert_eq!(cfg.dump_prefix, "session");
        assert_eq!(cfg.output_layout, OutputLayout::ByDate);
    }

    #[test]
    fn unknown_keys_do_not_abort_parsing() {
        let mut cfg = Config::default();
        let text = "[display]\nno_such_knob = 1\nprint_thread = off\n";
        apply(&mut cfg, text, "test.ini");
        assert!(!cfg.print_thread);
    }

    #[test]
    fn markers_can_be_quoted_to_keep_spaces() {
        let mut cfg = Config::default();
        let text = "[markers]\nindent_marker = \"|  \"\nenter_marker = >> \n";
        apply(&mut cfg, text, "test.ini");
        assert_eq!(cfg.indent_marker, "|  ");
        assert_eq!(cfg.enter_marker, ">>");
    }
}
