//! Binary dump of all registered rings
//!
//! One timestamped file per invocation, encoded by the wire crate. The dumper
//! reads rings without mutating them, the same way a flush would.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::PathBuf;

use chrono::Local;
use scopetrace_wire::{Encoder, Record, RecordKind};

use crate::config::{get_config, OutputLayout};
use crate::errors::Result;
use crate::event::{Event, EventKind};
use crate::registry;

/// Builds the timestamped dump path for this instant and creates the target
/// directory: `<dir>/<prefix>_YYYYMMDD_HHMMSS_mmm<suffix>`, with the layout
/// deciding the subdirectory (none, `YYYY-MM-DD`, or `session_NNN`). On
/// directory-creation failure the file goes to the current directory with a
/// warning.
pub fn generate_dump_filename(prefix: Option<&str>) -> PathBuf {
    let cfg = get_config();
    let prefix = prefix.unwrap_or(&cfg.dump_prefix);
    let now = Local::now();

    let base = cfg
        .output_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from("."));
    let mut dir = match cfg.output_layout {
        OutputLayout::Flat => base,
        OutputLayout::ByDate => base.join(now.format("%Y-%m-%d").to_string()),
        OutputLayout::BySession => {
            let session = if cfg.current_session == 0 {
                max_existing_session(&base) + 1
            } else {
                cfg.current_session
            };
            base.join(format!("session_{session:03}"))
        }
    };

    if !dir.exists() {
        if let Err(e) = fs::create_dir_all(&dir) {
            log::warn!("failed to create dump directory {}: {e}", dir.display());
            dir = PathBuf::from(".");
        }
    }

    dir.join(format!(
        "{prefix}_{}_{:03}{}",
        now.format("%Y%m%d_%H%M%S"),
        now.timestamp_subsec_millis(),
        cfg.dump_suffix
    ))
}

fn max_existing_session(base: &std::path::Path) -> u32 {
    let Ok(entries) = fs::read_dir(base) else {
        return 0;
    };
    entries
        .flatten()
        .filter(|e| e.path().is_dir())
        .filter_map(|e| {
            e.file_name()
                .to_str()
                .and_then(|name| name.strip_prefix("session_"))
                .and_then(|n| n.parse::<u32>().ok())
        })
        .max()
        .unwrap_or(0)
}

/// Serializes every registered ring to one binary file and returns its path.
///
/// Ring contents are read as-is: per buffer in chronological order, both
/// arrays when double-buffering is active. Ring state is not mutated.
pub fn dump_binary(prefix: Option<&str>) -> Result<PathBuf> {
    let cfg = get_config();
    let path = generate_dump_filename(prefix);
    let file = File::create(&path)?;
    let mut encoder = Encoder::new(BufWriter::new(file));
    encoder.write_header()?;

    for ptr in registry::registry().snapshot() {
        let ring = unsafe { &*ptr };
        let buffers = if ring.double_buffered() && cfg.use_double_buffering {
            2
        } else {
            1
        };
        for idx in 0..buffers {
            for event in ring.bufs[idx].iter_chrono() {
                encoder.write_record(&to_record(event))?;
            }
        }
    }
    encoder.finish()?;
    Ok(path)
}

fn to_record(e: &Event) -> Record {
    Record {
        kind: match e.kind {
            EventKind::Enter => RecordKind::Enter,
            EventKind::Exit => RecordKind::Exit,
            EventKind::Message => RecordKind::Message,
        },
        tid: e.tid,
        color_offset: e.color_offset,
        ts_ns: e.ts_ns,
        depth: e.depth,
        dur_ns: e.dur_ns,
        memory_rss: e.memory_rss,
        file: e.file.to_owned(),
        func: e.func.to_owned(),
        msg: e.msg.as_str().to_owned(),
        line: e.line,
    }
}
