//! Pages: row batches with one block per channel.

use veloq_common::{Result, VeloqError};

use crate::block::Block;
use crate::types::Datum;

/// A batch of blocks, one per logical column ("channel"), all sharing the
/// same position count. Pages are the unit of flow between operators and
/// carry no ordering guarantee beyond "all channels describe the same rows
/// in the same row order".
#[derive(Debug, Clone)]
pub struct Page {
    position_count: usize,
    blocks: Vec<Block>,
}

impl Page {
    pub fn new(blocks: Vec<Block>) -> Result<Self> {
        let first = blocks.first().ok_or_else(|| {
            VeloqError::InvalidArgument("page requires at least one block".to_string())
        })?;
        let position_count = first.position_count();
        for (channel, block) in blocks.iter().enumerate() {
            if block.position_count() != position_count {
                return Err(VeloqError::InvalidArgument(format!(
                    "channel {channel} has {} positions, channel 0 has {position_count}",
                    block.position_count()
                )));
            }
        }
        Ok(Self {
            position_count,
            blocks,
        })
    }

    pub fn single(block: Block) -> Self {
        Self {
            position_count: block.position_count(),
            blocks: vec![block],
        }
    }

    pub fn channel_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn position_count(&self) -> usize {
        self.position_count
    }

    pub fn block(&self, channel: usize) -> Result<&Block> {
        self.blocks.get(channel).ok_or_else(|| {
            VeloqError::InvalidArgument(format!(
                "channel {channel} out of range for page with {} channels",
                self.blocks.len()
            ))
        })
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn into_blocks(self) -> Vec<Block> {
        self.blocks
    }

    /// Copy a contiguous row range into a new page.
    pub fn region(&self, offset: usize, length: usize) -> Result<Page> {
        let blocks = self
            .blocks
            .iter()
            .map(|b| b.region(offset, length))
            .collect::<Result<Vec<_>>>()?;
        Page::new(blocks)
    }

    /// Materialize every row; used by sinks, tests, and external display.
    pub fn rows(&self) -> Result<Vec<Vec<Datum>>> {
        let mut rows = Vec::with_capacity(self.position_count);
        for position in 0..self.position_count {
            let mut row = Vec::with_capacity(self.blocks.len());
            for block in &self.blocks {
                row.push(block.value_at(position)?);
            }
            rows.push(row);
        }
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::BlockBuilder;
    use crate::types::{BIGINT, VARCHAR};

    fn bigint_block(values: &[i64]) -> Block {
        let mut builder = BlockBuilder::new(&BIGINT);
        for v in values {
            builder.append_long(*v).unwrap();
        }
        builder.build()
    }

    fn varchar_block(values: &[&str]) -> Block {
        let mut builder = BlockBuilder::new(&VARCHAR);
        for v in values {
            builder.append_bytes(v.as_bytes()).unwrap();
        }
        builder.build()
    }

    #[test]
    fn page_shares_position_count_across_channels() {
        let page = Page::new(vec![
            bigint_block(&[1, 2, 3]),
            varchar_block(&["a", "b", "c"]),
        ])
        .unwrap();
        assert_eq!(page.channel_count(), 2);
        assert_eq!(page.position_count(), 3);
        assert_eq!(page.block(1).unwrap().get_bytes(0).unwrap(), b"a");
    }

    #[test]
    fn mismatched_channel_lengths_rejected() {
        let err = Page::new(vec![bigint_block(&[1, 2]), varchar_block(&["a"])]);
        assert!(matches!(err, Err(VeloqError::InvalidArgument(_))));
    }

    #[test]
    fn empty_block_list_rejected() {
        assert!(matches!(
            Page::new(Vec::new()),
            Err(VeloqError::InvalidArgument(_))
        ));
    }

    #[test]
    fn channel_out_of_range() {
        let page = Page::single(bigint_block(&[1]));
        assert!(matches!(page.block(1), Err(VeloqError::InvalidArgument(_))));
    }

    #[test]
    fn rows_materialize_in_row_order() {
        let page = Page::new(vec![bigint_block(&[1, 2]), varchar_block(&["a", "b"])]).unwrap();
        let rows = page.rows().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], vec![Datum::Int64(1), Datum::utf8("a")]);
        assert_eq!(rows[1], vec![Datum::Int64(2), Datum::utf8("b")]);
    }

    #[test]
    fn region_truncates_rows() {
        let page = Page::new(vec![bigint_block(&[1, 2, 3])]).unwrap();
        let region = page.region(0, 2).unwrap();
        assert_eq!(region.position_count(), 2);
        assert_eq!(region.block(0).unwrap().get_long(1).unwrap(), 2);
    }
}
