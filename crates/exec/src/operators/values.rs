//! Source operator emitting a fixed list of pages.

use std::collections::VecDeque;

use veloq_common::{OperatorId, Result, VeloqError};
use veloq_data::Page;

use crate::operator::{Operator, OperatorFactory, PipelineContext};

pub struct ValuesOperator {
    pages: VecDeque<Page>,
}

impl ValuesOperator {
    pub fn new(pages: Vec<Page>) -> Self {
        Self {
            pages: pages.into(),
        }
    }
}

impl Operator for ValuesOperator {
    fn name(&self) -> &'static str {
        "ValuesOperator"
    }

    fn needs_input(&self) -> bool {
        false
    }

    fn add_input(&mut self, _page: Page) -> Result<()> {
        Err(VeloqError::IllegalState(
            "ValuesOperator accepts no input".to_string(),
        ))
    }

    fn output(&mut self) -> Result<Option<Page>> {
        Ok(self.pages.pop_front())
    }

    fn is_finished(&self) -> bool {
        self.pages.is_empty()
    }

    fn finish(&mut self) -> Result<()> {
        self.pages.clear();
        Ok(())
    }
}

pub struct ValuesOperatorFactory {
    operator_id: OperatorId,
    pages: Vec<Page>,
}

impl ValuesOperatorFactory {
    pub fn new(operator_id: OperatorId, pages: Vec<Page>) -> Self {
        Self { operator_id, pages }
    }
}

impl OperatorFactory for ValuesOperatorFactory {
    fn operator_id(&self) -> OperatorId {
        self.operator_id
    }

    fn create(&self, _ctx: &PipelineContext) -> Result<Box<dyn Operator>> {
        Ok(Box::new(ValuesOperator::new(self.pages.clone())))
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
    fn drains_pages_then_finishes() {
        let mut op = ValuesOperator::new(vec![page(&[1]), page(&[2, 3])]);
        assert!(!op.is_finished());
        assert_eq!(op.output().unwrap().unwrap().position_count(), 1);
        assert_eq!(op.output().unwrap().unwrap().position_count(), 2);
        assert!(op.output().unwrap().is_none());
        assert!(op.is_finished());
    }

    #[test]
    fn rejects_input() {
        let mut op = ValuesOperator::new(Vec::new());
        assert!(!op.needs_input());
        assert!(matches!(
            op.add_input(page(&[1])),
            Err(VeloqError::IllegalState(_))
        ));
    }

    #[test]
    fn finish_discards_remaining_pages() {
        let mut op = ValuesOperator::new(vec![page(&[1])]);
        op.finish().unwrap();
        assert!(op.is_finished());
        assert!(op.output().unwrap().is_none());
    }
}
