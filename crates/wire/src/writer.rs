use std::fs::{self, File};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use veloq_common::metrics::global_metrics;
use veloq_common::{DriverId, EngineConfig, PipelineId, QueryId, Result, VeloqError};
use veloq_data::Page;

use crate::cursor::write_u32;
use crate::layout::{index_path, pipeline_dir, spool_path, PipelineSpoolIndex, SpoolPartMeta};
use crate::page_codec::write_page;
use crate::registry::BlockEncodingRegistry;

pub(crate) const SPOOL_MAGIC: &[u8; 4] = b"VQPS";
pub(crate) const SPOOL_VERSION: u32 = 1;

/// Persists page streams crossing a stage boundary, one part file per
/// producing driver plus a json index sidecar per pipeline.
pub struct PageSpoolWriter {
    root_dir: PathBuf,
    registry: Arc<BlockEncodingRegistry>,
}

impl PageSpoolWriter {
    pub fn new(root_dir: impl Into<PathBuf>, registry: Arc<BlockEncodingRegistry>) -> Self {
        Self {
            root_dir: root_dir.into(),
            registry,
        }
    }

    pub fn from_config(config: &EngineConfig, registry: Arc<BlockEncodingRegistry>) -> Self {
        Self::new(&config.spool_dir, registry)
    }

    pub fn write_part(
        &self,
        query_id: QueryId,
        pipeline_id: PipelineId,
        driver_id: DriverId,
        pages: &[Page],
    ) -> Result<SpoolPartMeta> {
        let rel = spool_path(query_id, pipeline_id, driver_id);
        let abs = self.root_dir.join(&rel);
        if let Some(parent) = abs.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut payload = Vec::new();
        payload.extend_from_slice(SPOOL_MAGIC);
        write_u32(&mut payload, SPOOL_VERSION);
        write_u32(&mut payload, pages.len() as u32);

        let mut rows = 0u64;
        for page in pages {
            let mut encoded = Vec::new();
            write_page(&mut encoded, page, &self.registry)?;
            write_u32(&mut payload, encoded.len() as u32);
            payload.extend_from_slice(&encoded);
            rows += page.position_count() as u64;
        }

        let mut file = File::create(&abs)?;
        file.write_all(&payload)?;
        file.flush()?;
        global_metrics().record_wire_encoded("spool", payload.len() as u64);

        Ok(SpoolPartMeta {
            driver_id,
            file: rel,
            bytes: payload.len() as u64,
            rows,
            pages: pages.len() as u64,
        })
    }

    pub fn write_index(
        &self,
        query_id: QueryId,
        pipeline_id: PipelineId,
        mut parts: Vec<SpoolPartMeta>,
    ) -> Result<PipelineSpoolIndex> {
        parts.sort_by_key(|p| p.driver_id.0);
        let index = PipelineSpoolIndex {
            query_id,
            pipeline_id,
            parts,
        };

        let dir = self.root_dir.join(pipeline_dir(query_id, pipeline_id));
        fs::create_dir_all(&dir)?;

        let json = serde_json::to_vec_pretty(&index)
            .map_err(|e| VeloqError::InvalidArgument(format!("index json encode failed: {e}")))?;
        fs::write(self.root_dir.join(index_path(query_id, pipeline_id)), &json)?;

        Ok(index)
    }
}
