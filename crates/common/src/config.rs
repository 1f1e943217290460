use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Target row count for pages produced by sources and projections.
    pub batch_size_rows: usize,
    /// Page capacity of a bounded page buffer before backpressure engages.
    pub page_buffer_capacity: usize,
    /// Sizing hint for channel-set builders (expected distinct positions).
    pub expected_set_positions: usize,
    /// Root directory for page spool files crossing stage boundaries.
    pub spool_dir: String,
    /// Concurrent driver slots in the task runner.
    pub cpu_slots: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            batch_size_rows: 8192,
            page_buffer_capacity: 16,
            expected_set_positions: 8192,
            spool_dir: ".veloq_spool".to_string(),
            cpu_slots: 4,
        }
    }
}
