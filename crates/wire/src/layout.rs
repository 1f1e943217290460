use serde::{Deserialize, Serialize};

use veloq_common::{DriverId, PipelineId, QueryId};

pub fn spool_path(query_id: QueryId, pipeline_id: PipelineId, driver_id: DriverId) -> String {
    format!("spool/{query_id}/{pipeline_id}/part-{driver_id}.pages")
}

pub fn pipeline_dir(query_id: QueryId, pipeline_id: PipelineId) -> String {
    format!("spool/{query_id}/{pipeline_id}")
}

pub fn index_path(query_id: QueryId, pipeline_id: PipelineId) -> String {
    format!("{}/index.json", pipeline_dir(query_id, pipeline_id))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpoolPartMeta {
    pub driver_id: DriverId,
    pub file: String,
    pub bytes: u64,
    pub rows: u64,
    pub pages: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSpoolIndex {
    pub query_id: QueryId,
    pub pipeline_id: PipelineId,
    pub parts: Vec<SpoolPartMeta>,
}
