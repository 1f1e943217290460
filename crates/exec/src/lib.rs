//! Pipelined operator execution for the Veloq core.
//!
//! Architecture role:
//! - the operator/factory protocol every processing stage implements
//! - blocked signals and the one-shot publication cell
//! - channel sets (hash indexes for set-membership probes)
//! - the driver that steps an operator chain cooperatively
//! - the task runner that multiplexes drivers over bounded cpu slots
//!
//! Key modules:
//! - [`operator`]
//! - [`signal`]
//! - [`channel_set`]
//! - [`driver`]
//! - [`operators`]
//! - [`runner`]
//!
//! No operator blocks a worker thread: waits are expressed only through
//! [`signal::Blocked`], which the runner awaits between step bursts.

pub mod channel_set;
pub mod driver;
pub mod operator;
pub mod operators;
pub mod runner;
pub mod signal;

pub use channel_set::{ChannelSet, ChannelSetBuilder};
pub use driver::Driver;
pub use operator::{Operator, OperatorFactory, PipelineContext};
pub use runner::TaskRunner;
pub use signal::{Blocked, Publication, Subscription};
