//! Channel sets: hash indexes over one channel's distinct values, used for
//! set-membership tests (IN-lists, semi joins).

use std::collections::HashSet;

use ahash::RandomState;

use veloq_common::{Result, VeloqError};
use veloq_data::{Block, Datum, Page, Type};

/// Bit-canonical set key: doubles key by bit pattern, so NaN membership is
/// stable and hashing agrees with [`Type::hash_value`] semantics.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum SetKey {
    Boolean(bool),
    Int64(i64),
    Float64Bits(u64),
    Bytes(Vec<u8>),
}

impl SetKey {
    fn from_datum(datum: &Datum) -> Option<SetKey> {
        match datum {
            Datum::Null => None,
            Datum::Boolean(v) => Some(SetKey::Boolean(*v)),
            Datum::Int64(v) => Some(SetKey::Int64(*v)),
            Datum::Float64(v) => Some(SetKey::Float64Bits(v.to_bits())),
            Datum::Bytes(v) => Some(SetKey::Bytes(v.clone())),
        }
    }
}

/// Immutable hash index over every distinct non-null value observed on one
/// channel, plus an explicit null-presence flag (SQL set membership must
/// distinguish "absent" from "was compared against a null").
///
/// Frozen by [`ChannelSetBuilder::build`]; concurrent lookups are safe by
/// immutability, not by locking.
#[derive(Debug)]
pub struct ChannelSet {
    ty: &'static Type,
    values: HashSet<SetKey, RandomState>,
    has_null: bool,
}

impl ChannelSet {
    pub fn set_type(&self) -> &'static Type {
        self.ty
    }

    /// True iff the value appeared at some non-null input position.
    /// `Datum::Null` is never a member; see [`ChannelSet::contains_null`].
    pub fn contains(&self, datum: &Datum) -> bool {
        match SetKey::from_datum(datum) {
            Some(key) => self.values.contains(&key),
            None => false,
        }
    }

    pub fn contains_null(&self) -> bool {
        self.has_null
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Growable accumulator for a [`ChannelSet`], fed page by page. Insertion
/// order across pages does not affect final membership.
pub struct ChannelSetBuilder {
    ty: &'static Type,
    values: HashSet<SetKey, RandomState>,
    has_null: bool,
}

impl ChannelSetBuilder {
    pub fn new(ty: &'static Type) -> Self {
        Self::with_expected_positions(ty, 0)
    }

    /// Sizing from an expected-row-count hint reduces rehashing while the
    /// build side streams in.
    pub fn with_expected_positions(ty: &'static Type, expected_positions: usize) -> Self {
        Self {
            ty,
            values: HashSet::with_capacity_and_hasher(expected_positions, RandomState::new()),
            has_null: false,
        }
    }

    pub fn add_block(&mut self, block: &Block) -> Result<()> {
        if block.block_type() != self.ty {
            return Err(VeloqError::InvalidArgument(format!(
                "block of type {} fed to {} set builder",
                block.block_type().name(),
                self.ty.name()
            )));
        }
        for position in 0..block.position_count() {
            match SetKey::from_datum(&block.value_at(position)?) {
                None => self.has_null = true,
                Some(key) => {
                    self.values.insert(key);
                }
            }
        }
        Ok(())
    }

    pub fn add_page(&mut self, page: &Page, channel: usize) -> Result<()> {
        self.add_block(page.block(channel)?)
    }

    /// Distinct values accumulated so far.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Freeze into an immutable set.
    pub fn build(self) -> ChannelSet {
        ChannelSet {
            ty: self.ty,
            values: self.values,
            has_null: self.has_null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use veloq_data::{BlockBuilder, BIGINT, DOUBLE, VARCHAR};

    fn bigint_page(values: &[Option<i64>]) -> Page {
        let mut builder = BlockBuilder::new(&BIGINT);
        for v in values {
            match v {
                Some(v) => builder.append_long(*v).unwrap(),
                None => builder.append_null(),
            }
        }
        Page::single(builder.build())
    }

    #[test]
    fn membership_across_pages_with_null_tracking() {
        let mut builder = ChannelSetBuilder::with_expected_positions(&BIGINT, 16);
        builder
            .add_page(&bigint_page(&[Some(1), Some(2), Some(2), Some(3)]), 0)
            .unwrap();
        builder
            .add_page(&bigint_page(&[Some(3), Some(4), None]), 0)
            .unwrap();
        let set = builder.build();

        for v in 1..=4 {
            assert!(set.contains(&Datum::Int64(v)), "expected {v} in set");
        }
        assert!(!set.contains(&Datum::Int64(5)));
        assert!(set.contains_null());
        assert!(!set.contains(&Datum::Null));
        assert_eq!(set.len(), 4);
    }

    #[test]
    fn insertion_order_does_not_affect_membership() {
        let mut forward = ChannelSetBuilder::new(&BIGINT);
        forward
            .add_page(&bigint_page(&[Some(1), Some(2), Some(3)]), 0)
            .unwrap();
        let mut reverse = ChannelSetBuilder::new(&BIGINT);
        reverse
            .add_page(&bigint_page(&[Some(3), Some(2), Some(1)]), 0)
            .unwrap();

        let forward = forward.build();
        let reverse = reverse.build();
        for v in 1..=3 {
            assert_eq!(
                forward.contains(&Datum::Int64(v)),
                reverse.contains(&Datum::Int64(v))
            );
        }
        assert_eq!(forward.len(), reverse.len());
    }

    #[test]
    fn type_mismatch_rejected() {
        let mut builder = ChannelSetBuilder::new(&VARCHAR);
        let page = bigint_page(&[Some(1)]);
        assert!(matches!(
            builder.add_page(&page, 0),
            Err(VeloqError::InvalidArgument(_))
        ));
    }

    #[test]
    fn nan_membership_is_stable() {
        let mut builder = BlockBuilder::new(&DOUBLE);
        builder.append_double(f64::NAN).unwrap();
        let page = Page::single(builder.build());

        let mut set_builder = ChannelSetBuilder::new(&DOUBLE);
        set_builder.add_page(&page, 0).unwrap();
        let set = set_builder.build();
        assert!(set.contains(&Datum::Float64(f64::NAN)));
        assert!(!set.contains(&Datum::Float64(0.0)));
    }
}
