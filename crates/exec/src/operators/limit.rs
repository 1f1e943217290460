//! Row limit: truncates the stream and finishes early.

use veloq_common::{Result, VeloqError};
use veloq_data::Page;

use crate::operator::Operator;

pub struct LimitOperator {
    remaining: usize,
    pending: Option<Page>,
    finishing: bool,
}

impl LimitOperator {
    pub fn new(limit: usize) -> Self {
        Self {
            remaining: limit,
            pending: None,
            finishing: limit == 0,
        }
    }
}

impl Operator for LimitOperator {
    fn name(&self) -> &'static str {
        "LimitOperator"
    }

    fn needs_input(&self) -> bool {
        !self.finishing && self.pending.is_none() && self.remaining > 0
    }

    fn add_input(&mut self, page: Page) -> Result<()> {
        if !self.needs_input() {
            return Err(VeloqError::IllegalState(
                "LimitOperator cannot accept input".to_string(),
            ));
        }
        let take = page.position_count().min(self.remaining);
        let page = if take == page.position_count() {
            page
        } else {
            page.region(0, take)?
        };
        self.remaining -= take;
        if self.remaining == 0 {
            self.finishing = true;
        }
        if page.position_count() > 0 {
            self.pending = Some(page);
        }
        Ok(())
    }

    fn output(&mut self) -> Result<Option<Page>> {
        Ok(self.pending.take())
    }

    fn is_finished(&self) -> bool {
        self.finishing && self.pending.is_none()
    }

    fn finish(&mut self) -> Result<()> {
        self.finishing = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use veloq_data::{BlockBuilder, BIGINT};

    use super::*;

    fn page(values: &[i64]) -> Page {
        let mut builder = BlockBuilder::new(&BIGINT);
        for v in values {
            builder.append_long(*v).unwrap();
        }
        Page::single(builder.build())
    }

    #[test]
    fn truncates_the_final_page_and_finishes_early() {
        let mut op = LimitOperator::new(3);
        op.add_input(page(&[1, 2])).unwrap();
        assert_eq!(op.output().unwrap().unwrap().position_count(), 2);

        op.add_input(page(&[3, 4, 5])).unwrap();
        assert!(!op.needs_input());
        let out = op.output().unwrap().unwrap();
        assert_eq!(out.position_count(), 1);
        assert_eq!(out.block(0).unwrap().get_long(0).unwrap(), 3);
        assert!(op.is_finished());
    }

    #[test]
    fn zero_limit_is_immediately_finished() {
        let op = LimitOperator::new(0);
        assert!(!op.needs_input());
        assert!(op.is_finished());
    }

    #[test]
    fn input_past_the_limit_is_illegal_state() {
        let mut op = LimitOperator::new(1);
        op.add_input(page(&[1])).unwrap();
        let _ = op.output().unwrap();
        assert!(matches!(
            op.add_input(page(&[2])),
            Err(VeloqError::IllegalState(_))
        ));
    }
}
