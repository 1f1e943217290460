//! Concrete operators exercising the pipeline protocol.

pub mod buffer;
pub mod eval;
pub mod limit;
pub mod set_builder;
pub mod set_probe;
pub mod values;

pub use buffer::{PageBuffer, PageBufferSinkOperator, PageBufferSourceOperator};
pub use eval::{EvalOperator, RowEvaluator};
pub use limit::LimitOperator;
pub use set_builder::{SetBuilderOperator, SetBuilderOperatorFactory, SetSupplier};
pub use set_probe::{SetProbeOperator, SetProbeOperatorFactory};
pub use values::{ValuesOperator, ValuesOperatorFactory};
