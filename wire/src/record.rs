/// Kind tag of a trace record, first byte of every record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RecordKind {
    Enter = 0,
    Exit = 1,
    Message = 2,
}

impl TryFrom<u8> for RecordKind {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(RecordKind::Enter),
            1 => Ok(RecordKind::Exit),
            2 => Ok(RecordKind::Message),
            other => Err(other),
        }
    }
}

/// One decoded trace event.
///
/// Field order matches the on-disk layout: kind, thread id, color offset,
/// timestamp, depth, duration, memory sample, then the three length-prefixed
/// strings (file, function, message) and the source line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub kind: RecordKind,
    pub tid: u32,
    pub color_offset: u8,
    pub ts_ns: u64,
    pub depth: u32,
    pub dur_ns: u64,
    pub memory_rss: u64,
    pub file: String,
    pub func: String,
    pub msg: String,
    pub line: u32,
}
