//! The driver: steps an ordered operator chain to completion.

use std::time::Instant;

use tracing::debug;

use veloq_common::{DriverId, Result, VeloqError};

use crate::operator::{Operator, PipelineContext};
use crate::signal::Blocked;

/// Owns one operator chain and moves pages along it, one unit of progress
/// per invocation, never advancing past an unresolved blocked signal.
///
/// A driver runs on at most one worker at a time; suspension happens only
/// between steps, at which point [`Driver::close`] may tear the chain down
/// without feeding further input.
pub struct Driver {
    ctx: PipelineContext,
    driver_id: DriverId,
    operators: Vec<Box<dyn Operator>>,
    finish_propagated: Vec<bool>,
    closed: bool,
}

impl Driver {
    pub fn new(
        ctx: PipelineContext,
        driver_id: DriverId,
        operators: Vec<Box<dyn Operator>>,
    ) -> Result<Self> {
        if operators.is_empty() {
            return Err(VeloqError::InvalidArgument(
                "driver requires at least one operator".to_string(),
            ));
        }
        let finish_propagated = vec![false; operators.len()];
        Ok(Self {
            ctx,
            driver_id,
            operators,
            finish_propagated,
            closed: false,
        })
    }

    pub fn context(&self) -> &PipelineContext {
        &self.ctx
    }

    pub fn driver_id(&self) -> DriverId {
        self.driver_id
    }

    /// The chain completes when its terminal operator is finished.
    pub fn is_finished(&self) -> bool {
        self.closed
            || self
                .operators
                .last()
                .map(|op| op.is_finished())
                .unwrap_or(true)
    }

    /// Aggregate blocked signal: the first operator whose signal is
    /// unresolved. Ready iff every stage can make progress.
    pub fn blocked(&self) -> Blocked {
        for op in &self.operators {
            let blocked = op.blocked();
            if !blocked.is_ready() {
                return blocked;
            }
        }
        Blocked::ready()
    }

    /// One cooperative quantum: feed each downstream operator that needs
    /// input from its upstream neighbor and propagate finish across
    /// exhausted boundaries. Returns true if the chain made progress.
    pub fn step(&mut self) -> Result<bool> {
        if self.is_finished() {
            return Ok(false);
        }
        if !self.blocked().is_ready() {
            self.ctx
                .metrics
                .inc_driver_blocked(self.ctx.query_id, self.ctx.pipeline_id);
            return Ok(false);
        }
        self.ctx
            .metrics
            .inc_driver_step(self.ctx.query_id, self.ctx.pipeline_id);

        let mut moved = false;
        for i in 0..self.operators.len() - 1 {
            let (left, right) = self.operators.split_at_mut(i + 1);
            let upstream = &mut left[i];
            let downstream = &mut right[0];

            if downstream.needs_input() && !upstream.is_finished() {
                if let Some(page) = upstream.output()? {
                    self.ctx.metrics.record_operator_output(
                        self.ctx.query_id,
                        self.ctx.pipeline_id,
                        upstream.name(),
                        page.position_count() as u64,
                        1,
                    );
                    downstream.add_input(page)?;
                    moved = true;
                }
            }

            if upstream.is_finished() && !self.finish_propagated[i + 1] {
                downstream.finish()?;
                self.finish_propagated[i + 1] = true;
                moved = true;
            }
        }
        Ok(moved)
    }

    /// Step to completion, suspending on the aggregate blocked signal
    /// instead of spinning.
    pub async fn run(&mut self) -> Result<()> {
        let started = Instant::now();
        debug!(
            query_id = %self.ctx.query_id,
            pipeline_id = %self.ctx.pipeline_id,
            driver_id = %self.driver_id,
            operators = self.operators.len(),
            "driver started"
        );
        while !self.is_finished() {
            if self.step()? {
                continue;
            }
            if self.is_finished() {
                break;
            }
            let blocked = self.blocked();
            if blocked.is_ready() {
                tokio::task::yield_now().await;
            } else {
                blocked.await;
            }
        }
        self.ctx.metrics.observe_driver_run(
            self.ctx.query_id,
            self.ctx.pipeline_id,
            started.elapsed().as_secs_f64(),
        );
        debug!(
            query_id = %self.ctx.query_id,
            pipeline_id = %self.ctx.pipeline_id,
            driver_id = %self.driver_id,
            "driver finished"
        );
        Ok(())
    }

    /// Tear the chain down between steps. Operators are dropped and must
    /// release buffered state without requiring further input.
    pub fn close(&mut self) {
        self.operators.clear();
        self.finish_propagated.clear();
        self.closed = true;
    }
}
