//! Process-wide text output targets
//!
//! The sink mutex is the global I/O mutex: flush-ring holds it for a whole
//! ring so lines from concurrent flushes do not interleave, and the drain
//! task holds it per batch. Replacing the writer closes the previous one by
//! dropping it.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::errors::Result;

pub struct TextSink {
    inner: Mutex<Box<dyn Write + Send>>,
}

impl TextSink {
    pub fn stdout() -> Self {
        Self::from_writer(Box::new(io::stdout()))
    }

    pub fn from_writer(writer: Box<dyn Write + Send>) -> Self {
        Self {
            inner: Mutex::new(writer),
        }
    }

    pub fn set_writer(&self, writer: Box<dyn Write + Send>) {
        let mut guard = self.inner.lock().unwrap();
        let _ = guard.flush();
        *guard = writer;
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, Box<dyn Write + Send>> {
        self.inner.lock().unwrap()
    }
}

lazy_static::lazy_static! {
    static ref MAIN_SINK: Arc<TextSink> = Arc::new(TextSink::stdout());
    static ref IMMEDIATE_SINK: Mutex<Option<Arc<TextSink>>> = Mutex::new(None);
}

/// The sink flushed rings are emitted to.
pub fn text_sink() -> Arc<TextSink> {
    MAIN_SINK.clone()
}

/// Redirects flushed text output to a file, truncating it.
pub fn set_output_path<P: AsRef<Path>>(path: P) -> Result<()> {
    let file = File::create(path)?;
    MAIN_SINK.set_writer(Box::new(BufWriter::new(file)));
    Ok(())
}

pub fn set_output_writer(writer: Box<dyn Write + Send>) {
    MAIN_SINK.set_writer(writer);
}

/// Gives the asynchronous queue its own output file instead of the main sink.
/// Takes effect the next time the drain task starts.
pub fn set_immediate_output_path<P: AsRef<Path>>(path: P) -> Result<()> {
    let file = File::create(path)?;
    *IMMEDIATE_SINK.lock().unwrap() = Some(Arc::new(TextSink::from_writer(Box::new(
        BufWriter::new(file),
    ))));
    Ok(())
}

pub fn set_immediate_output_writer(writer: Box<dyn Write + Send>) {
    *IMMEDIATE_SINK.lock().unwrap() = Some(Arc::new(TextSink::from_writer(writer)));
}

/// Drops the dedicated immediate sink; the queue falls back to the main sink.
pub fn clear_immediate_output() {
    *IMMEDIATE_SINK.lock().unwrap() = None;
}

/// The sink the drain task writes to: the dedicated immediate target when one
/// is configured, else the main sink.
pub(crate) fn immediate_sink() -> Arc<TextSink> {
    IMMEDIATE_SINK
        .lock()
        .unwrap()
        .clone()
        .unwrap_or_else(text_sink)
}
