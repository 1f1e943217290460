//! Projection through a compiled row-evaluation function.

use std::sync::Arc;

use veloq_common::{Result, VeloqError};
use veloq_data::{BlockBuilder, Page, Type};

use crate::operator::Operator;

/// The expression-compiler boundary: a row-evaluation function with fixed
/// output types, invoked once per input position. Compiled ahead of
/// execution by machinery outside this core.
pub trait RowEvaluator: Send + Sync {
    fn output_types(&self) -> &[&'static Type];

    /// Append exactly one value (or null) to each output builder for the
    /// row at `position`.
    fn evaluate(&self, page: &Page, position: usize, out: &mut [BlockBuilder]) -> Result<()>;
}

/// One-page-in, one-page-out projection. Holding a pending output page
/// saturates the operator until the driver pulls it.
pub struct EvalOperator {
    evaluator: Arc<dyn RowEvaluator>,
    pending: Option<Page>,
    finishing: bool,
}

impl EvalOperator {
    pub fn new(evaluator: Arc<dyn RowEvaluator>) -> Self {
        Self {
            evaluator,
            pending: None,
            finishing: false,
        }
    }
}

impl Operator for EvalOperator {
    fn name(&self) -> &'static str {
        "EvalOperator"
    }

    fn needs_input(&self) -> bool {
        !self.finishing && self.pending.is_none()
    }

    fn add_input(&mut self, page: Page) -> Result<()> {
        if !self.needs_input() {
            return Err(VeloqError::IllegalState(
                "EvalOperator cannot accept input".to_string(),
            ));
        }
        let mut builders = self
            .evaluator
            .output_types()
            .iter()
            .map(|ty| BlockBuilder::with_capacity(*ty, page.position_count()))
            .collect::<Vec<_>>();
        for position in 0..page.position_count() {
            self.evaluator.evaluate(&page, position, &mut builders)?;
        }
        let blocks = builders.into_iter().map(BlockBuilder::build).collect();
        self.pending = Some(Page::new(blocks)?);
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
    use veloq_data::{Datum, BIGINT, VARCHAR};

    use super::*;

    struct LabelledDouble;

    impl RowEvaluator for LabelledDouble {
        fn output_types(&self) -> &[&'static Type] {
            const TYPES: &[&'static Type] = &[&BIGINT, &VARCHAR];
            TYPES
        }

        fn evaluate(
            &self,
            page: &Page,
            position: usize,
            out: &mut [BlockBuilder],
        ) -> Result<()> {
            let block = page.block(0)?;
            if block.is_null(position)? {
                out[0].append_null();
                out[1].append_null();
                return Ok(());
            }
            let v = block.get_long(position)?;
            out[0].append_long(v * 2)?;
            out[1].append_bytes(format!("row-{v}").as_bytes())
        }
    }

    fn page(values: &[Option<i64>]) -> Page {
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
    fn projects_rows_through_the_evaluator() {
        let mut op = EvalOperator::new(Arc::new(LabelledDouble));
        op.add_input(page(&[Some(2), None, Some(5)])).unwrap();
        let out = op.output().unwrap().expect("pending page");
        assert_eq!(out.channel_count(), 2);
        assert_eq!(out.block(0).unwrap().value_at(0).unwrap(), Datum::Int64(4));
        assert_eq!(out.block(0).unwrap().value_at(1).unwrap(), Datum::Null);
        assert_eq!(
            out.block(1).unwrap().value_at(2).unwrap(),
            Datum::utf8("row-5")
        );
    }

    #[test]
    fn saturated_operator_rejects_input() {
        let mut op = EvalOperator::new(Arc::new(LabelledDouble));
        op.add_input(page(&[Some(1)])).unwrap();
        assert!(!op.needs_input());
        assert!(matches!(
            op.add_input(page(&[Some(2)])),
            Err(VeloqError::IllegalState(_))
        ));
    }

    #[test]
    fn finish_flushes_then_finishes() {
        let mut op = EvalOperator::new(Arc::new(LabelledDouble));
        op.add_input(page(&[Some(1)])).unwrap();
        op.finish().unwrap();
        assert!(!op.needs_input());
        assert!(!op.is_finished());
        assert!(op.output().unwrap().is_some());
        assert!(op.is_finished());
    }
}
