//! Bounds-checked little-endian reads over a wire buffer.

use veloq_common::{Result, VeloqError};

/// Sequential reader over an encoded buffer. Every read is bounds-checked
/// and fails with [`VeloqError::CorruptEncoding`] on truncation.
pub struct ReadCursor<'a> {
    buf: &'a [u8],
    position: usize,
}

impl<'a> ReadCursor<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, position: 0 }
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        let raw = self.read_bytes(4)?;
        Ok(i32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let raw = self.read_bytes(4)?;
        Ok(u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]))
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self.position.checked_add(len).ok_or_else(|| {
            VeloqError::CorruptEncoding("read length overflows buffer offset".to_string())
        })?;
        if end > self.buf.len() {
            return Err(VeloqError::CorruptEncoding(format!(
                "unexpected end of input: need {len} bytes at offset {}, {} available",
                self.position,
                self.buf.len() - self.position
            )));
        }
        let slice = &self.buf[self.position..end];
        self.position = end;
        Ok(slice)
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.position
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }
}

/// Append an `i32`, little-endian.
pub fn write_i32(out: &mut Vec<u8>, value: i32) {
    out.extend_from_slice(&value.to_le_bytes());
}

/// Append a `u32`, little-endian.
pub fn write_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_le_bytes());
}
