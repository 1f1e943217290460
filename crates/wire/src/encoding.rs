//! Block codecs: the binary layouts blocks use to cross process boundaries.

use veloq_common::{Result, VeloqError};
use veloq_data::{Block, Type};

use crate::cursor::{write_i32, ReadCursor};

/// A stateless codec bound to one [`Type`]. Implementations agree
/// byte-for-byte with any other implementation of the same layout, so a
/// block can be reconstructed on another process knowing only the
/// registered encoding name.
pub trait BlockEncoding: Send + Sync {
    /// Registered name; written as the self-describing header by the page
    /// codec.
    fn name(&self) -> &'static str;

    fn block_type(&self) -> &'static Type;

    fn write_block(&self, out: &mut Vec<u8>, block: &Block) -> Result<()>;

    fn read_block(&self, cursor: &mut ReadCursor<'_>) -> Result<Block>;
}

/// Layout: `position_count: i32`, `position_count * byte_size` raw value
/// bytes (null positions zero-filled), null bitmap.
pub struct FixedWidthEncoding {
    ty: &'static Type,
}

impl FixedWidthEncoding {
    pub fn new(ty: &'static Type) -> Result<Self> {
        if !ty.is_fixed_width() {
            return Err(VeloqError::InvalidArgument(format!(
                "{} is variable-width, fixed-width encoding does not apply",
                ty.name()
            )));
        }
        Ok(Self { ty })
    }
}

impl BlockEncoding for FixedWidthEncoding {
    fn name(&self) -> &'static str {
        self.ty.name()
    }

    fn block_type(&self) -> &'static Type {
        self.ty
    }

    fn write_block(&self, out: &mut Vec<u8>, block: &Block) -> Result<()> {
        check_block_type(self.ty, block)?;
        let count = checked_position_count(block)?;
        write_i32(out, count);
        out.extend_from_slice(block.fixed_values()?);
        write_null_bitmap(out, block.nulls());
        Ok(())
    }

    fn read_block(&self, cursor: &mut ReadCursor<'_>) -> Result<Block> {
        let count = read_position_count(cursor)?;
        let size = self.ty.byte_size()?;
        let value_len = count.checked_mul(size).ok_or_else(|| {
            VeloqError::CorruptEncoding("fixed-width value buffer length overflow".to_string())
        })?;
        let mut values = cursor.read_bytes(value_len)?.to_vec();
        let nulls = read_null_bitmap(cursor, count)?;
        // null positions decode to the type's zero value; their wire bytes
        // are never semantically read back
        for (position, &null) in nulls.iter().enumerate() {
            if null {
                values[position * size..(position + 1) * size].fill(0);
            }
        }
        Block::from_fixed_parts(self.ty, nulls, values)
    }
}

/// Layout: `position_count: i32`, `position_count` per-position i32 lengths
/// (not offsets; nulls have length 0), null bitmap, `total_length: i32`,
/// `total_length` concatenated payload bytes.
pub struct VariableWidthEncoding {
    ty: &'static Type,
}

impl VariableWidthEncoding {
    pub fn new(ty: &'static Type) -> Result<Self> {
        if ty.is_fixed_width() {
            return Err(VeloqError::InvalidArgument(format!(
                "{} is fixed-width, variable-width encoding does not apply",
                ty.name()
            )));
        }
        Ok(Self { ty })
    }
}

impl BlockEncoding for VariableWidthEncoding {
    fn name(&self) -> &'static str {
        self.ty.name()
    }

    fn block_type(&self) -> &'static Type {
        self.ty
    }

    fn write_block(&self, out: &mut Vec<u8>, block: &Block) -> Result<()> {
        check_block_type(self.ty, block)?;
        let count = checked_position_count(block)?;
        write_i32(out, count);

        let mut total: i64 = 0;
        for position in 0..block.position_count() {
            let length = block.value_length(position)?;
            if length > i32::MAX as usize {
                return Err(VeloqError::InvalidArgument(format!(
                    "value of {length} bytes at position {position} exceeds the wire limit"
                )));
            }
            write_i32(out, length as i32);
            total += length as i64;
        }
        if total > i32::MAX as i64 {
            return Err(VeloqError::InvalidArgument(format!(
                "block payload of {total} bytes exceeds the wire limit"
            )));
        }

        write_null_bitmap(out, block.nulls());
        write_i32(out, total as i32);
        out.extend_from_slice(block.variable_bytes()?);
        Ok(())
    }

    fn read_block(&self, cursor: &mut ReadCursor<'_>) -> Result<Block> {
        let count = read_position_count(cursor)?;

        let mut offsets = Vec::with_capacity(count + 1);
        offsets.push(0usize);
        let mut sum: i64 = 0;
        for _ in 0..count {
            let length = cursor.read_i32()?;
            if length < 0 {
                return Err(VeloqError::CorruptEncoding(format!(
                    "negative value length {length}"
                )));
            }
            sum += length as i64;
            if sum > i32::MAX as i64 {
                return Err(VeloqError::CorruptEncoding(
                    "value length sum overflows the wire limit".to_string(),
                ));
            }
            offsets.push(sum as usize);
        }

        let nulls = read_null_bitmap(cursor, count)?;

        let total = cursor.read_i32()?;
        if i64::from(total) != sum {
            return Err(VeloqError::CorruptEncoding(format!(
                "length sum mismatch: per-position lengths total {sum}, header says {total}"
            )));
        }
        let bytes = cursor.read_bytes(total as usize)?.to_vec();
        Block::from_variable_parts(self.ty, nulls, offsets, bytes)
    }
}

fn check_block_type(ty: &'static Type, block: &Block) -> Result<()> {
    if block.block_type() == ty {
        Ok(())
    } else {
        Err(VeloqError::InvalidArgument(format!(
            "block of type {} fed to {} encoding",
            block.block_type().name(),
            ty.name()
        )))
    }
}

fn checked_position_count(block: &Block) -> Result<i32> {
    i32::try_from(block.position_count()).map_err(|_| {
        VeloqError::InvalidArgument(format!(
            "block with {} positions exceeds the wire limit",
            block.position_count()
        ))
    })
}

fn read_position_count(cursor: &mut ReadCursor<'_>) -> Result<usize> {
    let count = cursor.read_i32()?;
    if count < 0 {
        return Err(VeloqError::CorruptEncoding(format!(
            "negative position count {count}"
        )));
    }
    Ok(count as usize)
}

/// Pack null flags 8 per byte, MSB-first: all complete groups of 8 first,
/// then one tail byte for the remaining `count & 7` bits (unused low bits
/// stay zero).
fn write_null_bitmap(out: &mut Vec<u8>, nulls: &[bool]) {
    let count = nulls.len();
    let mut position = 0;
    while position < (count & !7) {
        let mut value = 0u8;
        for bit in 0..8 {
            if nulls[position + bit] {
                value |= 0b1000_0000 >> bit;
            }
        }
        out.push(value);
        position += 8;
    }

    if count & 7 > 0 {
        let mut value = 0u8;
        let mut mask = 0b1000_0000u8;
        for &null in &nulls[count & !7..] {
            if null {
                value |= mask;
            }
            mask >>= 1;
        }
        out.push(value);
    }
}

/// Inverse of [`write_null_bitmap`], using the identical two-pass grouping.
fn read_null_bitmap(cursor: &mut ReadCursor<'_>, count: usize) -> Result<Vec<bool>> {
    let mut nulls = Vec::with_capacity(count);
    while nulls.len() < (count & !7) {
        let value = cursor.read_u8()?;
        for bit in 0..8 {
            nulls.push(value & (0b1000_0000 >> bit) != 0);
        }
    }

    if count & 7 > 0 {
        let value = cursor.read_u8()?;
        let mut mask = 0b1000_0000u8;
        for _ in 0..(count & 7) {
            nulls.push(value & mask != 0);
            mask >>= 1;
        }
    }
    Ok(nulls)
}
