use std::io::{self, Read};

use thiserror::Error;

use crate::{Record, RecordKind, FORMAT_VERSION, MAGIC};

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
    #[error("bad magic, not a trace dump")]
    BadMagic,
    #[error("unsupported format version {0}")]
    UnsupportedVersion(u32),
    #[error("invalid record kind {0}")]
    InvalidKind(u8),
    #[error("invalid utf-8 in {0} field")]
    InvalidUtf8(&'static str),
}

/// Streaming reader for the dump format.
///
/// The header is validated on construction; records are then read until end
/// of file. A truncated record surfaces as an `Io` error, a clean end of
/// stream as `Ok(None)`.
pub struct Decoder<R: Read> {
    input: R,
}

impl<R: Read> Decoder<R> {
    pub fn new(mut input: R) -> Result<Self, DecodeError> {
        let mut magic = [0u8; 8];
        input.read_exact(&mut magic)?;
        if magic != MAGIC {
            return Err(DecodeError::BadMagic);
        }
        let version = read_u32(&mut input)?;
        if version != FORMAT_VERSION {
            return Err(DecodeError::UnsupportedVersion(version));
        }
        let _reserved = read_u32(&mut input)?;
        Ok(Self { input })
    }

    pub fn read_record(&mut self) -> Result<Option<Record>, DecodeError> {
        let mut kind_byte = [0u8; 1];
        match self.input.read_exact(&mut kind_byte) {
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
            other => other?,
        }
        let kind = RecordKind::try_from(kind_byte[0]).map_err(DecodeError::InvalidKind)?;
        let tid = read_u32(&mut self.input)?;
        let color_offset = read_u8(&mut self.input)?;
        let ts_ns = read_u64(&mut self.input)?;
        let depth = read_u32(&mut self.input)?;
        let dur_ns = read_u64(&mut self.input)?;
        let memory_rss = read_u64(&mut self.input)?;
        let file = read_string(&mut self.input, "file")?;
        let func = read_string(&mut self.input, "function")?;
        let msg = read_string(&mut self.input, "message")?;
        let line = read_u32(&mut self.input)?;
        Ok(Some(Record {
            kind,
            tid,
            color_offset,
            ts_ns,
            depth,
            dur_ns,
            memory_rss,
            file,
            func,
            msg,
            line,
        }))
    }

    /// Reads every remaining record.
    pub fn read_all(mut self) -> Result<Vec<Record>, DecodeError> {
        let mut records = Vec::new();
        while let Some(r) = self.read_record()? {
            records.push(r);
        }
        Ok(records)
    }
}

fn read_u8<R: Read>(input: &mut R) -> io::Result<u8> {
    let mut buf = [0u8; 1];
    input.read_exact(&mut buf)?;
    Ok(buf[0])
}

fn read_u32<R: Read>(input: &mut R) -> io::Result<u32> {
    let mut buf = [0u8; 4];
    input.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_u64<R: Read>(input: &mut R) -> io::Result<u64> {
    let mut buf = [0u8; 8];
    input.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

fn read_string<R: Read>(input: &mut R, field: &'static str) -> Result<String, DecodeError> {
    let mut len_buf = [0u8; 2];
    input.read_exact(&mut len_buf)?;
    let len = u16::from_le_bytes(len_buf) as usize;
    let mut bytes = vec![0u8; len];
    input.read_exact(&mut bytes)?;
    String::from_utf8(bytes).map_err(|_| DecodeError::InvalidUtf8(field))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Encoder;

    fn sample(kind: RecordKind, func: &str) -> Record {
        Record {
            kind,
            tid: 0x1234_5678,
            color_offset: 2,
            ts_ns: 1_000_000_001,
            depth: 1,
            dur_ns: 2500,
            memory_rss: 4096,
            file: "src/lib.rs".into(),
            func: func.into(),
            msg: "hello".into(),
            line: 77,
        }
    }

    #[test]
    fn roundtrip() {
        let mut enc = Encoder::new(Vec::new());
        enc.write_header().unwrap();
        let records = vec![
            sample(RecordKind::Enter, "outer"),
            sample(RecordKind::Message, "outer"),
            sample(RecordKind::Exit, "outer"),
        ];
        for r in &records {
            enc.write_record(r).unwrap();
        }
        let bytes = enc.finish().unwrap();
        let decoded = Decoder::new(bytes.as_slice()).unwrap().read_all().unwrap();
        assert_eq!(decoded, records);
    }

    #[test]
    fn rejects_bad_magic() {
        let bytes = b"NOTADUMP\x02\x00\x00\x00\x00\x00\x00\x00";
        assert!(matches!(
            Decoder::new(&bytes[..]),
            Err(DecodeError::BadMagic)
        ));
    }

    #[test]
    fn rejects_unknown_version() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&MAGIC);
        bytes.extend_from_slice(&9u32.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());
        assert!(matches!(
            Decoder::new(bytes.as_slice()),
            Err(DecodeError::UnsupportedVersion(9))
        ));
    }

    #[test]
    fn truncated_record_is_an_error() {
        let mut enc = Encoder::new(Vec::new());
        enc.write_header().unwrap();
        enc.write_record(&sample(RecordKind::Enter, "f")).unwrap();
        let mut bytes = enc.finish().unwrap();
        bytes.truncate(bytes.len() - 3);
        let mut dec = Decoder::new(bytes.as_slice()).unwrap();
        assert!(matches!(dec.read_record(), Err(DecodeError::Io(_))));
    }

    #[test]
    fn empty_dump_has_no_records() {
        let mut enc = Encoder::new(Vec::new());
        enc.write_header().unwrap();
        let bytes = enc.finish().unwrap();
        let records = Decoder::new(bytes.as_slice()).unwrap().read_all().unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn invalid_kind_is_rejected() {
        let mut enc = Encoder::new(Vec::new());
        enc.write_header().unwrap();
        let mut bytes = enc.finish().unwrap();
        bytes.push(7);
        let mut dec = Decoder::new(bytes.as_slice()).unwrap();
        assert!(matches!(dec.read_record(), Err(DecodeError::InvalidKind(7))));
    }
}
