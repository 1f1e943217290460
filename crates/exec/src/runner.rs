//! The task runner: multiplexes drivers over a bounded pool of cpu slots.
//!
//! A driver holds a slot only while it is stepping; it releases the slot
//! before suspending on its blocked signal, so slot count bounds the
//! threads doing work, not the number of concurrently live pipelines.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Semaphore;
use tracing::{error, info};

use veloq_common::{EngineConfig, Result, VeloqError};

use crate::driver::Driver;

pub struct TaskRunner {
    cpu_slots: Arc<Semaphore>,
}

impl TaskRunner {
    pub fn new(cpu_slots: usize) -> Self {
        Self {
            cpu_slots: Arc::new(Semaphore::new(cpu_slots.max(1))),
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.cpu_slots)
    }

    /// Drive every chain to completion; resolves when all have finished.
    /// Each driver is stepped in bursts while it makes progress, then
    /// parked on its aggregate blocked signal.
    pub async fn run_drivers(&self, drivers: Vec<Driver>) -> Result<()> {
        let mut handles = Vec::with_capacity(drivers.len());
        for driver in drivers {
            let slots = Arc::clone(&self.cpu_slots);
            handles.push(tokio::spawn(run_driver(slots, driver)));
        }
        for handle in handles {
            handle
                .await
                .map_err(|e| VeloqError::IllegalState(format!("driver task failed: {e}")))??;
        }
        Ok(())
    }
}

async fn run_driver(slots: Arc<Semaphore>, mut driver: Driver) -> Result<()> {
    let ctx = driver.context().clone();
    let started = Instant::now();
    loop {
        let permit = slots
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| VeloqError::IllegalState(format!("task runner shut down: {e}")))?;

        let mut progressed = true;
        while progressed && !driver.is_finished() {
            progressed = match driver.step() {
                Ok(progressed) => progressed,
                Err(e) => {
                    error!(
                        query_id = %ctx.query_id,
                        pipeline_id = %ctx.pipeline_id,
                        driver_id = %driver.driver_id(),
                        error = %e,
                        "driver failed"
                    );
                    return Err(e);
                }
            };
        }
        drop(permit);

        if driver.is_finished() {
            break;
        }
        let blocked = driver.blocked();
        if blocked.is_ready() {
            tokio::task::yield_now().await;
        } else {
            blocked.await;
        }
    }

    ctx.metrics
        .observe_driver_run(ctx.query_id, ctx.pipeline_id, started.elapsed().as_secs_f64());
    info!(
        query_id = %ctx.query_id,
        pipeline_id = %ctx.pipeline_id,
        driver_id = %driver.driver_id(),
        "driver completed"
    );
    Ok(())
}
