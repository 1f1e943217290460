//! Probe side of a set-membership test: appends a boolean membership
//! channel to each input page (semi-join shape).

use std::sync::Arc;

use veloq_common::{OperatorId, Result, VeloqError};
use veloq_data::{BlockBuilder, Page, BOOLEAN};

use crate::channel_set::ChannelSet;
use crate::operator::{Operator, OperatorFactory, PipelineContext};
use crate::operators::set_builder::SetSupplier;
use crate::signal::{Blocked, Subscription};

pub struct SetProbeOperatorFactory {
    operator_id: OperatorId,
    supplier: Arc<SetSupplier>,
    channel: usize,
}

impl SetProbeOperatorFactory {
    pub fn new(operator_id: OperatorId, supplier: Arc<SetSupplier>, channel: usize) -> Self {
        Self {
            operator_id,
            supplier,
            channel,
        }
    }
}

impl OperatorFactory for SetProbeOperatorFactory {
    fn operator_id(&self) -> OperatorId {
        self.operator_id
    }

    fn create(&self, _ctx: &PipelineContext) -> Result<Box<dyn Operator>> {
        Ok(Box::new(SetProbeOperator::new(
            self.supplier.subscribe(),
            self.channel,
        )))
    }
}

/// Blocks until the build side publishes its set, then holds a read-only
/// reference for lock-free lookups.
///
/// Membership follows SQL three-valued logic: a null probe value is
/// unknown, and a miss against a set that saw nulls is unknown (the value
/// was compared against a null), both surfaced as a null membership flag.
pub struct SetProbeOperator {
    subscription: Subscription<ChannelSet>,
    channel: usize,
    set: Option<Arc<ChannelSet>>,
    pending: Option<Page>,
    finishing: bool,
}

impl SetProbeOperator {
    pub fn new(subscription: Subscription<ChannelSet>, channel: usize) -> Self {
        Self {
            subscription,
            channel,
            set: None,
            pending: None,
            finishing: false,
        }
    }

    fn set_available(&self) -> bool {
        self.set.is_some() || self.subscription.try_get().is_some()
    }
}

impl Operator for SetProbeOperator {
    fn name(&self) -> &'static str {
        "SetProbeOperator"
    }

    fn needs_input(&self) -> bool {
        !self.finishing && self.pending.is_none() && self.set_available()
    }

    fn blocked(&self) -> Blocked {
        if self.set_available() {
            Blocked::ready()
        } else {
            self.subscription.blocked()
        }
    }

    fn add_input(&mut self, page: Page) -> Result<()> {
        if !self.needs_input() {
            return Err(VeloqError::IllegalState(
                "SetProbeOperator cannot accept input".to_string(),
            ));
        }
        if self.set.is_none() {
            self.set = self.subscription.try_get();
        }
        let set = self.set.as_ref().ok_or_else(|| {
            VeloqError::IllegalState("channel set is not yet published".to_string())
        })?;

        let probe = page.block(self.channel)?;
        let mut membership = BlockBuilder::with_capacity(&BOOLEAN, page.position_count());
        for position in 0..page.position_count() {
            let value = probe.value_at(position)?;
            if value.is_null() {
                membership.append_null();
            } else if set.contains(&value) {
                membership.append_boolean(true)?;
            } else if set.contains_null() {
                membership.append_null();
            } else {
                membership.append_boolean(false)?;
            }
        }

        let mut blocks = page.into_blocks();
        blocks.push(membership.build());
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
    use veloq_common::{EngineConfig, MetricsRegistry, PipelineId, QueryId};
    use veloq_data::{Datum, BIGINT};

    use crate::channel_set::ChannelSetBuilder;

    use super::*;

    fn test_ctx() -> PipelineContext {
        PipelineContext::new(
            QueryId(5),
            PipelineId(1),
            EngineConfig::default(),
            MetricsRegistry::new(),
        )
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

    fn supplier_with(values: &[Option<i64>]) -> Arc<SetSupplier> {
        let supplier = Arc::new(SetSupplier::new(&BIGINT));
        let mut builder = ChannelSetBuilder::new(&BIGINT);
        builder.add_page(&page(values), 0).unwrap();
        supplier.publish(builder.build()).unwrap();
        supplier
    }

    #[test]
    fn blocked_until_set_is_published() {
        let supplier = Arc::new(SetSupplier::new(&BIGINT));
        let factory = SetProbeOperatorFactory::new(OperatorId(2), Arc::clone(&supplier), 0);
        let ctx = test_ctx();
        let mut op = factory.create(&ctx).unwrap();

        assert!(!op.needs_input());
        assert!(!op.blocked().is_ready());
        assert!(matches!(
            op.add_input(page(&[Some(1)])),
            Err(VeloqError::IllegalState(_))
        ));

        supplier
            .publish(ChannelSetBuilder::new(&BIGINT).build())
            .unwrap();
        assert!(op.blocked().is_ready());
        assert!(op.needs_input());
    }

    #[test]
    fn appends_membership_channel() {
        let factory =
            SetProbeOperatorFactory::new(OperatorId(2), supplier_with(&[Some(1), Some(3)]), 0);
        let ctx = test_ctx();
        let mut op = factory.create(&ctx).unwrap();

        op.add_input(page(&[Some(1), Some(2), Some(3)])).unwrap();
        let out = op.output().unwrap().expect("probed page");
        assert_eq!(out.channel_count(), 2);
        let membership = out.block(1).unwrap();
        assert_eq!(membership.value_at(0).unwrap(), Datum::Boolean(true));
        assert_eq!(membership.value_at(1).unwrap(), Datum::Boolean(false));
        assert_eq!(membership.value_at(2).unwrap(), Datum::Boolean(true));
    }

    #[test]
    fn null_semantics_follow_three_valued_logic() {
        let factory = SetProbeOperatorFactory::new(
            OperatorId(2),
            supplier_with(&[Some(1), None]),
            0,
        );
        let ctx = test_ctx();
        let mut op = factory.create(&ctx).unwrap();

        op.add_input(page(&[Some(1), Some(2), None])).unwrap();
        let out = op.output().unwrap().expect("probed page");
        let membership = out.block(1).unwrap();
        // member: true; miss against a null-bearing set: unknown; null probe: unknown
        assert_eq!(membership.value_at(0).unwrap(), Datum::Boolean(true));
        assert_eq!(membership.value_at(1).unwrap(), Datum::Null);
        assert_eq!(membership.value_at(2).unwrap(), Datum::Null);
    }

    #[test]
    fn saturated_probe_rejects_input() {
        let factory = SetProbeOperatorFactory::new(OperatorId(2), supplier_with(&[Some(1)]), 0);
        let ctx = test_ctx();
        let mut op = factory.create(&ctx).unwrap();
        op.add_input(page(&[Some(1)])).unwrap();
        assert!(matches!(
            op.add_input(page(&[Some(2)])),
            Err(VeloqError::IllegalState(_))
        ));
    }
}
