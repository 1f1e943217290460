//! The pipelined processing-stage protocol and its construction boundary.

use veloq_common::{EngineConfig, MetricsRegistry, OperatorId, PipelineId, QueryId, Result};
use veloq_data::Page;

use crate::signal::Blocked;

/// Per-pipeline context handed to operator factories and drivers.
#[derive(Clone)]
pub struct PipelineContext {
    pub query_id: QueryId,
    pub pipeline_id: PipelineId,
    pub config: EngineConfig,
    pub metrics: MetricsRegistry,
}

impl PipelineContext {
    pub fn new(
        query_id: QueryId,
        pipeline_id: PipelineId,
        config: EngineConfig,
        metrics: MetricsRegistry,
    ) -> Self {
        Self {
            query_id,
            pipeline_id,
            config,
            metrics,
        }
    }
}

/// A pipeline stage. State machine per instance: accepting input (when
/// `needs_input`), blocked or ready, terminal once `is_finished`.
///
/// The pull/push hybrid lets one worker interleave many pipelines
/// cooperatively: a stage that is logically waiting yields through
/// [`Operator::blocked`] instead of occupying the thread.
pub trait Operator: Send {
    fn name(&self) -> &'static str;

    /// True iff the operator can currently accept another `add_input`
    /// call. Always false past `finish()`.
    fn needs_input(&self) -> bool;

    /// Feed one page. Only valid while `needs_input()` is true; feeding a
    /// saturated operator is a caller bug surfaced as `IllegalState`.
    fn add_input(&mut self, page: Page) -> Result<()>;

    /// Pull the next ready batch, or `None` if no output is currently
    /// available (not necessarily finished).
    fn output(&mut self) -> Result<Option<Page>>;

    /// Signal resolving when the operator can make further progress. The
    /// driver neither calls into a blocked operator nor busy-polls this.
    fn blocked(&self) -> Blocked {
        Blocked::ready()
    }

    /// Once true, stays true; no further input/output calls are valid.
    fn is_finished(&self) -> bool;

    /// Idempotent. No more input will arrive; flush buffered state into a
    /// final output phase.
    fn finish(&mut self) -> Result<()>;
}

/// Construction boundary wiring this core into the surrounding
/// planner/scheduler: one fresh operator instance per driver. Factories for
/// build/probe pairs share the set publication handle, so probe-side
/// operators may be created long after the build side started running.
pub trait OperatorFactory: Send + Sync {
    fn operator_id(&self) -> OperatorId;

    fn create(&self, ctx: &PipelineContext) -> Result<Box<dyn Operator>>;
}
