//! Immutable columnar blocks and their single-pass builders.

use veloq_common::{Result, VeloqError};

use crate::types::{Datum, NativeKind, Type};

/// An ordered, fixed-length, immutable sequence of values of one [`Type`]
/// with a parallel null flag per position.
///
/// Fixed-width blocks pack values into a single byte buffer
/// (`position_count * byte_size`); null positions still reserve space and
/// are zero-filled. Variable-width blocks keep a payload buffer plus an
/// offsets array of `position_count + 1` entries.
#[derive(Debug, Clone)]
pub struct Block {
    ty: &'static Type,
    nulls: Vec<bool>,
    data: BlockData,
}

#[derive(Debug, Clone)]
enum BlockData {
    Fixed { values: Vec<u8> },
    Variable { offsets: Vec<usize>, bytes: Vec<u8> },
}

impl Block {
    /// Reconstruct a fixed-width block from decoded parts.
    pub fn from_fixed_parts(ty: &'static Type, nulls: Vec<bool>, values: Vec<u8>) -> Result<Self> {
        let size = ty.byte_size()?;
        if values.len() != nulls.len() * size {
            return Err(VeloqError::InvalidArgument(format!(
                "fixed-width value buffer holds {} bytes, expected {} for {} positions of {}",
                values.len(),
                nulls.len() * size,
                nulls.len(),
                ty.name()
            )));
        }
        Ok(Self {
            ty,
            nulls,
            data: BlockData::Fixed { values },
        })
    }

    /// Reconstruct a variable-width block from decoded parts. The payload
    /// buffer is taken as-is; values are addressed through `offsets` without
    /// copying them out.
    pub fn from_variable_parts(
        ty: &'static Type,
        nulls: Vec<bool>,
        offsets: Vec<usize>,
        bytes: Vec<u8>,
    ) -> Result<Self> {
        if ty.is_fixed_width() {
            return Err(VeloqError::InvalidArgument(format!(
                "{} is fixed-width, cannot build a variable-width block",
                ty.name()
            )));
        }
        if offsets.len() != nulls.len() + 1 {
            return Err(VeloqError::InvalidArgument(format!(
                "offsets array holds {} entries, expected {} for {} positions",
                offsets.len(),
                nulls.len() + 1,
                nulls.len()
            )));
        }
        if offsets.first() != Some(&0) {
            return Err(VeloqError::InvalidArgument(
                "offsets array must start at 0".to_string(),
            ));
        }
        if offsets.windows(2).any(|w| w[0] > w[1]) {
            return Err(VeloqError::InvalidArgument(
                "offsets array must be non-decreasing".to_string(),
            ));
        }
        if offsets.last() != Some(&bytes.len()) {
            return Err(VeloqError::InvalidArgument(format!(
                "offsets end at {:?} but payload holds {} bytes",
                offsets.last(),
                bytes.len()
            )));
        }
        Ok(Self {
            ty,
            nulls,
            data: BlockData::Variable { offsets, bytes },
        })
    }

    pub fn block_type(&self) -> &'static Type {
        self.ty
    }

    pub fn position_count(&self) -> usize {
        self.nulls.len()
    }

    pub fn is_null(&self, position: usize) -> Result<bool> {
        self.check_position(position)?;
        Ok(self.nulls[position])
    }

    /// Null flags for all positions, in position order.
    pub fn nulls(&self) -> &[bool] {
        &self.nulls
    }

    pub fn get_boolean(&self, position: usize) -> Result<bool> {
        self.check_value_access(position, NativeKind::Boolean, "get_boolean")?;
        match &self.data {
            BlockData::Fixed { values } => self.ty.read_boolean(values, position),
            BlockData::Variable { .. } => Err(VeloqError::Unsupported(format!(
                "get_boolean on variable-width type {}",
                self.ty.name()
            ))),
        }
    }

    pub fn get_long(&self, position: usize) -> Result<i64> {
        self.check_value_access(position, NativeKind::Int64, "get_long")?;
        match &self.data {
            BlockData::Fixed { values } => self.ty.read_long(values, position * 8),
            BlockData::Variable { .. } => Err(VeloqError::Unsupported(format!(
                "get_long on variable-width type {}",
                self.ty.name()
            ))),
        }
    }

    pub fn get_double(&self, position: usize) -> Result<f64> {
        self.check_value_access(position, NativeKind::Float64, "get_double")?;
        match &self.data {
            BlockData::Fixed { values } => self.ty.read_double(values, position * 8),
            BlockData::Variable { .. } => Err(VeloqError::Unsupported(format!(
                "get_double on variable-width type {}",
                self.ty.name()
            ))),
        }
    }

    pub fn get_bytes(&self, position: usize) -> Result<&[u8]> {
        self.check_value_access(position, NativeKind::Bytes, "get_bytes")?;
        match &self.data {
            BlockData::Variable { offsets, bytes } => {
                Ok(&bytes[offsets[position]..offsets[position + 1]])
            }
            BlockData::Fixed { .. } => Err(VeloqError::Unsupported(format!(
                "get_bytes on fixed-width type {}",
                self.ty.name()
            ))),
        }
    }

    /// Materialize the value at `position`. Always succeeds for in-range
    /// positions; null positions yield [`Datum::Null`].
    pub fn value_at(&self, position: usize) -> Result<Datum> {
        self.check_position(position)?;
        if self.nulls[position] {
            return Ok(Datum::Null);
        }
        Ok(match self.ty.native_kind() {
            NativeKind::Boolean => Datum::Boolean(self.get_boolean(position)?),
            NativeKind::Int64 => Datum::Int64(self.get_long(position)?),
            NativeKind::Float64 => Datum::Float64(self.get_double(position)?),
            NativeKind::Bytes => Datum::Bytes(self.get_bytes(position)?.to_vec()),
        })
    }

    /// Raw stored bytes at `position`: the zero-filled reserved bytes for a
    /// fixed-width null, the empty slice for a variable-width null.
    pub fn raw_value(&self, position: usize) -> Result<&[u8]> {
        self.check_position(position)?;
        match &self.data {
            BlockData::Fixed { values } => {
                let size = self.ty.byte_size()?;
                Ok(&values[position * size..(position + 1) * size])
            }
            BlockData::Variable { offsets, bytes } => {
                Ok(&bytes[offsets[position]..offsets[position + 1]])
            }
        }
    }

    /// Byte length of the value at `position` (0 for variable-width nulls).
    pub fn value_length(&self, position: usize) -> Result<usize> {
        self.check_position(position)?;
        match &self.data {
            BlockData::Fixed { .. } => self.ty.byte_size(),
            BlockData::Variable { offsets, .. } => Ok(offsets[position + 1] - offsets[position]),
        }
    }

    /// The packed value buffer of a fixed-width block.
    pub fn fixed_values(&self) -> Result<&[u8]> {
        match &self.data {
            BlockData::Fixed { values } => Ok(values),
            BlockData::Variable { .. } => Err(VeloqError::Unsupported(format!(
                "fixed_values on variable-width type {}",
                self.ty.name()
            ))),
        }
    }

    /// The offsets array of a variable-width block (`position_count + 1`
    /// entries, starting at 0).
    pub fn variable_offsets(&self) -> Result<&[usize]> {
        match &self.data {
            BlockData::Variable { offsets, .. } => Ok(offsets),
            BlockData::Fixed { .. } => Err(VeloqError::Unsupported(format!(
                "variable_offsets on fixed-width type {}",
                self.ty.name()
            ))),
        }
    }

    /// The concatenated payload buffer of a variable-width block.
    pub fn variable_bytes(&self) -> Result<&[u8]> {
        match &self.data {
            BlockData::Variable { bytes, .. } => Ok(bytes),
            BlockData::Fixed { .. } => Err(VeloqError::Unsupported(format!(
                "variable_bytes on fixed-width type {}",
                self.ty.name()
            ))),
        }
    }

    /// Copy a contiguous region of positions into a new block.
    pub fn region(&self, offset: usize, length: usize) -> Result<Block> {
        let end = offset.checked_add(length).ok_or_else(|| {
            VeloqError::InvalidArgument("region bounds overflow".to_string())
        })?;
        if end > self.position_count() {
            return Err(VeloqError::InvalidArgument(format!(
                "region {offset}..{end} out of range for block with {} positions",
                self.position_count()
            )));
        }
        let mut builder = BlockBuilder::with_capacity(self.ty, length);
        for position in offset..end {
            if self.nulls[position] {
                builder.append_null();
            } else {
                self.ty.append_raw(self.raw_value(position)?, &mut builder)?;
            }
        }
        Ok(builder.build())
    }

    fn check_position(&self, position: usize) -> Result<()> {
        if position < self.position_count() {
            Ok(())
        } else {
            Err(VeloqError::IndexOutOfRange {
                position,
                count: self.position_count(),
            })
        }
    }

    fn check_value_access(
        &self,
        position: usize,
        kind: NativeKind,
        operation: &str,
    ) -> Result<()> {
        self.ty.expect_kind(kind, operation)?;
        self.check_position(position)?;
        if self.nulls[position] {
            return Err(VeloqError::IllegalState(format!(
                "{operation} on null position {position}"
            )));
        }
        Ok(())
    }
}

/// Mutable, append-only, single-pass accumulator for one [`Block`].
///
/// Append order determines position order. `build` consumes the builder, so
/// appending past the terminal build is unrepresentable.
#[derive(Debug)]
pub struct BlockBuilder {
    ty: &'static Type,
    nulls: Vec<bool>,
    data: BlockData,
}

impl BlockBuilder {
    pub fn new(ty: &'static Type) -> Self {
        Self::with_capacity(ty, 0)
    }

    pub fn with_capacity(ty: &'static Type, positions: usize) -> Self {
        let data = match ty.fixed_byte_size() {
            Some(size) => BlockData::Fixed {
                values: Vec::with_capacity(positions * size),
            },
            None => {
                let mut offsets = Vec::with_capacity(positions + 1);
                offsets.push(0);
                BlockData::Variable {
                    offsets,
                    bytes: Vec::new(),
                }
            }
        };
        Self {
            ty,
            nulls: Vec::with_capacity(positions),
            data,
        }
    }

    pub fn block_type(&self) -> &'static Type {
        self.ty
    }

    /// Append a null position. Fixed-width builders reserve zero-filled
    /// space so the packed buffer stays position-addressable.
    pub fn append_null(&mut self) {
        self.nulls.push(true);
        match &mut self.data {
            BlockData::Fixed { values } => {
                let size = self.ty.fixed_byte_size().unwrap_or(0);
                values.resize(values.len() + size, 0);
            }
            BlockData::Variable { offsets, bytes } => {
                offsets.push(bytes.len());
            }
        }
    }

    pub fn append_boolean(&mut self, value: bool) -> Result<()> {
        match &mut self.data {
            BlockData::Fixed { values } => self.ty.write_boolean(values, value)?,
            BlockData::Variable { .. } => {
                return Err(VeloqError::Unsupported(format!(
                    "append_boolean on type {}",
                    self.ty.name()
                )))
            }
        }
        self.nulls.push(false);
        Ok(())
    }

    pub fn append_long(&mut self, value: i64) -> Result<()> {
        match &mut self.data {
            BlockData::Fixed { values } => self.ty.write_long(values, value)?,
            BlockData::Variable { .. } => {
                return Err(VeloqError::Unsupported(format!(
                    "append_long on type {}",
                    self.ty.name()
                )))
            }
        }
        self.nulls.push(false);
        Ok(())
    }

    pub fn append_double(&mut self, value: f64) -> Result<()> {
        match &mut self.data {
            BlockData::Fixed { values } => self.ty.write_double(values, value)?,
            BlockData::Variable { .. } => {
                return Err(VeloqError::Unsupported(format!(
                    "append_double on type {}",
                    self.ty.name()
                )))
            }
        }
        self.nulls.push(false);
        Ok(())
    }

    pub fn append_bytes(&mut self, value: &[u8]) -> Result<()> {
        self.ty.expect_kind(NativeKind::Bytes, "append_bytes")?;
        match &mut self.data {
            BlockData::Variable { offsets, bytes } => {
                bytes.extend_from_slice(value);
                offsets.push(bytes.len());
            }
            BlockData::Fixed { .. } => {
                return Err(VeloqError::Unsupported(format!(
                    "append_bytes on fixed-width type {}",
                    self.ty.name()
                )))
            }
        }
        self.nulls.push(false);
        Ok(())
    }

    /// Append a materialized value; the datum's shape must match the
    /// builder's type.
    pub fn append_datum(&mut self, datum: &Datum) -> Result<()> {
        match datum {
            Datum::Null => {
                self.append_null();
                Ok(())
            }
            Datum::Boolean(v) => self.append_boolean(*v),
            Datum::Int64(v) => self.append_long(*v),
            Datum::Float64(v) => self.append_double(*v),
            Datum::Bytes(v) => self.append_bytes(v),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.nulls.is_empty()
    }

    pub fn position_count(&self) -> usize {
        self.nulls.len()
    }

    /// Terminal build: freeze the accumulated positions into an immutable
    /// block.
    pub fn build(self) -> Block {
        Block {
            ty: self.ty,
            nulls: self.nulls,
            data: self.data,
        }
    }
}
