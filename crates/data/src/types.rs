//! Logical column types and their raw-buffer codec primitives.
//!
//! A [`Type`] is a stateless descriptor: exactly one static instance exists
//! per concrete type identity, and types are compared by name so encoding
//! compatibility does not depend on sharing in-process identity.

use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

use serde::Serialize;

use veloq_common::{Result, VeloqError};

use crate::block::BlockBuilder;

/// Native representation classes a [`Type`] maps values onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NativeKind {
    Boolean,
    Int64,
    Float64,
    Bytes,
}

/// A logical column type descriptor.
///
/// Fixed-width types occupy `byte_size()` bytes per value (nulls included,
/// zero-filled); variable-width types have a per-row length determined at
/// write time.
#[derive(Debug)]
pub struct Type {
    name: &'static str,
    kind: NativeKind,
    fixed_size: Option<usize>,
}

pub static BOOLEAN: Type = Type {
    name: "boolean",
    kind: NativeKind::Boolean,
    fixed_size: Some(1),
};

pub static BIGINT: Type = Type {
    name: "bigint",
    kind: NativeKind::Int64,
    fixed_size: Some(8),
};

pub static DOUBLE: Type = Type {
    name: "double",
    kind: NativeKind::Float64,
    fixed_size: Some(8),
};

pub static VARCHAR: Type = Type {
    name: "varchar",
    kind: NativeKind::Bytes,
    fixed_size: None,
};

pub static VARBINARY: Type = Type {
    name: "varbinary",
    kind: NativeKind::Bytes,
    fixed_size: None,
};

impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Type {}

impl Type {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn native_kind(&self) -> NativeKind {
        self.kind
    }

    pub fn is_fixed_width(&self) -> bool {
        self.fixed_size.is_some()
    }

    /// Per-value byte size, if this is a fixed-width type.
    pub fn fixed_byte_size(&self) -> Option<usize> {
        self.fixed_size
    }

    /// Per-value byte size of a fixed-width type.
    pub fn byte_size(&self) -> Result<usize> {
        self.fixed_size
            .ok_or_else(|| self.unsupported("byte_size"))
    }

    /// Read a boolean stored at `offset` in a raw value buffer.
    pub fn read_boolean(&self, buf: &[u8], offset: usize) -> Result<bool> {
        self.expect_kind(NativeKind::Boolean, "read_boolean")?;
        Ok(self.fixed_slice(buf, offset)?[0] != 0)
    }

    /// Read an i64 stored little-endian at `offset` in a raw value buffer.
    pub fn read_long(&self, buf: &[u8], offset: usize) -> Result<i64> {
        self.expect_kind(NativeKind::Int64, "read_long")?;
        let raw = self.fixed_slice(buf, offset)?;
        let mut arr = [0u8; 8];
        arr.copy_from_slice(raw);
        Ok(i64::from_le_bytes(arr))
    }

    /// Read an f64 stored little-endian at `offset` in a raw value buffer.
    pub fn read_double(&self, buf: &[u8], offset: usize) -> Result<f64> {
        self.expect_kind(NativeKind::Float64, "read_double")?;
        let raw = self.fixed_slice(buf, offset)?;
        let mut arr = [0u8; 8];
        arr.copy_from_slice(raw);
        Ok(f64::from_le_bytes(arr))
    }

    /// Append a boolean to a raw value buffer.
    pub fn write_boolean(&self, out: &mut Vec<u8>, value: bool) -> Result<()> {
        self.expect_kind(NativeKind::Boolean, "write_boolean")?;
        out.push(u8::from(value));
        Ok(())
    }

    /// Append an i64, little-endian, to a raw value buffer.
    pub fn write_long(&self, out: &mut Vec<u8>, value: i64) -> Result<()> {
        self.expect_kind(NativeKind::Int64, "write_long")?;
        out.extend_from_slice(&value.to_le_bytes());
        Ok(())
    }

    /// Append an f64, little-endian, to a raw value buffer.
    pub fn write_double(&self, out: &mut Vec<u8>, value: f64) -> Result<()> {
        self.expect_kind(NativeKind::Float64, "write_double")?;
        out.extend_from_slice(&value.to_le_bytes());
        Ok(())
    }

    /// Raw-representation equality. Doubles compare by bit pattern, matching
    /// [`Type::hash_value`], so NaN membership behaves consistently in sets.
    pub fn equal_to(&self, left: &[u8], right: &[u8]) -> bool {
        left == right
    }

    /// Hash of a value's raw representation.
    pub fn hash_value(&self, raw: &[u8]) -> u64 {
        let mut hasher = ahash::AHasher::default();
        raw.hash(&mut hasher);
        hasher.finish()
    }

    /// Three-way comparison of two raw-encoded values of this type.
    pub fn compare(&self, left: &[u8], right: &[u8]) -> Result<Ordering> {
        match self.kind {
            NativeKind::Boolean => {
                let l = self.read_boolean(left, 0)?;
                let r = self.read_boolean(right, 0)?;
                Ok(l.cmp(&r))
            }
            NativeKind::Int64 => {
                let l = self.read_long(left, 0)?;
                let r = self.read_long(right, 0)?;
                Ok(l.cmp(&r))
            }
            NativeKind::Float64 => {
                let l = self.read_double(left, 0)?;
                let r = self.read_double(right, 0)?;
                Ok(l.total_cmp(&r))
            }
            NativeKind::Bytes => Ok(left.cmp(right)),
        }
    }

    /// Append the value encoded in `raw` to a block builder of this type.
    pub fn append_raw(&self, raw: &[u8], builder: &mut BlockBuilder) -> Result<()> {
        match self.kind {
            NativeKind::Boolean => builder.append_boolean(self.read_boolean(raw, 0)?),
            NativeKind::Int64 => builder.append_long(self.read_long(raw, 0)?),
            NativeKind::Float64 => builder.append_double(self.read_double(raw, 0)?),
            NativeKind::Bytes => builder.append_bytes(raw),
        }
    }

    pub(crate) fn expect_kind(&self, kind: NativeKind, operation: &str) -> Result<()> {
        if self.kind == kind {
            Ok(())
        } else {
            Err(self.unsupported(operation))
        }
    }

    fn unsupported(&self, operation: &str) -> VeloqError {
        VeloqError::Unsupported(format!("{operation} on type {}", self.name))
    }

    fn fixed_slice<'a>(&self, buf: &'a [u8], offset: usize) -> Result<&'a [u8]> {
        let size = self.byte_size()?;
        let end = offset.checked_add(size);
        end.and_then(|end| buf.get(offset..end)).ok_or_else(|| {
            VeloqError::InvalidArgument(format!(
                "buffer of {} bytes too short for {} read at offset {offset}",
                buf.len(),
                self.name
            ))
        })
    }
}

/// A materialized single value, suitable for external display or JSON
/// serialization. `value_at` on a block always succeeds and returns
/// [`Datum::Null`] for null positions.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Datum {
    Null,
    Boolean(bool),
    Int64(i64),
    Float64(f64),
    Bytes(Vec<u8>),
}

impl Datum {
    pub fn is_null(&self) -> bool {
        matches!(self, Datum::Null)
    }

    /// Convenience constructor for utf8 values in varchar blocks.
    pub fn utf8(s: &str) -> Self {
        Datum::Bytes(s.as_bytes().to_vec())
    }
}
