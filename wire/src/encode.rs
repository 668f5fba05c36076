use std::io::{self, Write};

use crate::{Record, FORMAT_VERSION, MAGIC};

/// Streaming writer for the dump format.
///
/// `write_header` must be called once before the first record.
pub struct Encoder<W: Write> {
    out: W,
}

impl<W: Write> Encoder<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn write_header(&mut self) -> io::Result<()> {
        self.out.write_all(&MAGIC)?;
        self.out.write_all(&FORMAT_VERSION.to_le_bytes())?;
        self.out.write_all(&0u32.to_le_bytes())
    }

    pub fn write_record(&mut self, r: &Record) -> io::Result<()> {
        self.out.write_all(&[r.kind as u8])?;
        self.out.write_all(&r.tid.to_le_bytes())?;
        self.out.write_all(&[r.color_offset])?;
        self.out.write_all(&r.ts_ns.to_le_bytes())?;
        self.out.write_all(&r.depth.to_le_bytes())?;
        self.out.write_all(&r.dur_ns.to_le_bytes())?;
        self.out.write_all(&r.memory_rss.to_le_bytes())?;
        self.write_str(&r.file)?;
        self.write_str(&r.func)?;
        self.write_str(&r.msg)?;
        self.out.write_all(&r.line.to_le_bytes())
    }

    // 2-byte length prefix bounds a string at 65535 bytes; longer input is cut
    // at the last char boundary that fits.
    fn write_str(&mut self, s: &str) -> io::Result<()> {
        let mut n = s.len().min(u16::MAX as usize);
        while n > 0 && !s.is_char_boundary(n) {
            n -= 1;
        }
        self.out.write_all(&(n as u16).to_le_bytes())?;
        self.out.write_all(&s.as_bytes()[..n])
    }

    /// Flushes and returns the underlying writer.
    pub fn finish(mut self) -> io::Result<W> {
        self.out.flush()?;
        Ok(self.out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RecordKind;

    #[test]
    fn header_layout() {
        let mut enc = Encoder::new(Vec::new());
        enc.write_header().unwrap();
        let bytes = enc.finish().unwrap();
        assert_eq!(&bytes[..8], b"TRCLOG10");
        assert_eq!(u32::from_le_bytes(bytes[8..12].try_into().unwrap()), 2);
        assert_eq!(u32::from_le_bytes(bytes[12..16].try_into().unwrap()), 0);
    }

    #[test]
    fn record_layout_is_fixed() {
        let mut enc = Encoder::new(Vec::new());
        enc.write_record(&Record {
            kind: RecordKind::Exit,
            tid: 0xdead_beef,
            color_offset: 5,
            ts_ns: 42,
            depth: 3,
            dur_ns: 7,
            memory_rss: 0,
            file: "a.rs".into(),
            func: "f".into(),
            msg: String::new(),
            line: 10,
        })
        .unwrap();
        let bytes = enc.finish().unwrap();
        // 1 + 4 + 1 + 8 + 4 + 8 + 8 fixed bytes, then (2+4) + (2+1) + (2+0) strings, then 4
        assert_eq!(bytes.len(), 34 + 6 + 3 + 2 + 4);
        assert_eq!(bytes[0], 1);
        assert_eq!(u32::from_le_bytes(bytes[1..5].try_into().unwrap()), 0xdead_beef);
        assert_eq!(bytes[5], 5);
        assert_eq!(u16::from_le_bytes(bytes[34..36].try_into().unwrap()), 4);
        assert_eq!(&bytes[36..40], b"a.rs");
    }
}
