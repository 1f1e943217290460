//! Build side of a set-membership probe: accumulates one channel's values
//! into a channel set and publishes it exactly once on finish.

use std::sync::Arc;

use tracing::info;

use veloq_common::{MetricsRegistry, OperatorId, QueryId, Result, VeloqError};
use veloq_data::{Page, Type};

use crate::channel_set::{ChannelSet, ChannelSetBuilder};
use crate::operator::{Operator, OperatorFactory, PipelineContext};
use crate::signal::{Publication, Subscription};

/// Shared publication handle decoupling "when the build side finishes"
/// from "when probe-side operators are instantiated". Probe factories take
/// a reference before the set exists; their operators block until it is
/// published.
pub struct SetSupplier {
    ty: &'static Type,
    publication: Publication<ChannelSet>,
}

impl SetSupplier {
    pub fn new(ty: &'static Type) -> Self {
        Self {
            ty,
            publication: Publication::new(),
        }
    }

    pub fn set_type(&self) -> &'static Type {
        self.ty
    }

    pub fn subscribe(&self) -> Subscription<ChannelSet> {
        self.publication.subscribe()
    }

    /// Publish the frozen set; a second attempt fails with `IllegalState`.
    pub fn publish(&self, set: ChannelSet) -> Result<()> {
        self.publication.publish(set)
    }
}

pub struct SetBuilderOperatorFactory {
    operator_id: OperatorId,
    supplier: Arc<SetSupplier>,
    channel: usize,
}

impl SetBuilderOperatorFactory {
    pub fn new(operator_id: OperatorId, ty: &'static Type, channel: usize) -> Self {
        Self {
            operator_id,
            supplier: Arc::new(SetSupplier::new(ty)),
            channel,
        }
    }

    /// Handle shared with probe-side factories created later in the
    /// query's pipeline-activation order.
    pub fn supplier(&self) -> Arc<SetSupplier> {
        Arc::clone(&self.supplier)
    }
}

impl OperatorFactory for SetBuilderOperatorFactory {
    fn operator_id(&self) -> OperatorId {
        self.operator_id
    }

    fn create(&self, ctx: &PipelineContext) -> Result<Box<dyn Operator>> {
        Ok(Box::new(SetBuilderOperator::new(
            Arc::clone(&self.supplier),
            self.channel,
            ctx,
        )))
    }
}

/// Sink operator feeding a [`ChannelSetBuilder`]; publishes through its
/// supplier when finished.
pub struct SetBuilderOperator {
    supplier: Arc<SetSupplier>,
    channel: usize,
    builder: Option<ChannelSetBuilder>,
    query_id: QueryId,
    metrics: MetricsRegistry,
    finished: bool,
}

impl SetBuilderOperator {
    pub fn new(supplier: Arc<SetSupplier>, channel: usize, ctx: &PipelineContext) -> Self {
        let builder = ChannelSetBuilder::with_expected_positions(
            supplier.set_type(),
            ctx.config.expected_set_positions,
        );
        Self {
            supplier,
            channel,
            builder: Some(builder),
            query_id: ctx.query_id,
            metrics: ctx.metrics.clone(),
            finished: false,
        }
    }
}

impl Operator for SetBuilderOperator {
    fn name(&self) -> &'static str {
        "SetBuilderOperator"
    }

    fn needs_input(&self) -> bool {
        !self.finished
    }

    fn add_input(&mut self, page: Page) -> Result<()> {
        let builder = self.builder.as_mut().ok_or_else(|| {
            VeloqError::IllegalState("SetBuilderOperator is already finished".to_string())
        })?;
        builder.add_page(&page, self.channel)
    }

    fn output(&mut self) -> Result<Option<Page>> {
        Ok(None)
    }

    fn is_finished(&self) -> bool {
        self.finished
    }

    fn finish(&mut self) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        let builder = self.builder.take().ok_or_else(|| {
            VeloqError::IllegalState("set builder already consumed".to_string())
        })?;
        let set = builder.build();
        info!(
            query_id = %self.query_id,
            positions = set.len(),
            has_null = set.contains_null(),
            "channel set published"
        );
        self.metrics.record_channel_set(self.query_id, set.len() as u64);
        self.supplier.publish(set)?;
        self.finished = true;
        Ok(())
    }
}
