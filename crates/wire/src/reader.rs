use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use veloq_common::metrics::global_metrics;
use veloq_common::{DriverId, EngineConfig, PipelineId, QueryId, Result, VeloqError};
use veloq_data::Page;

use crate::cursor::ReadCursor;
use crate::layout::{index_path, spool_path, PipelineSpoolIndex, SpoolPartMeta};
use crate::page_codec::read_page;
use crate::registry::BlockEncodingRegistry;
use crate::writer::{SPOOL_MAGIC, SPOOL_VERSION};

pub struct PageSpoolReader {
    root_dir: PathBuf,
    registry: Arc<BlockEncodingRegistry>,
}

impl PageSpoolReader {
    pub fn new(root_dir: impl Into<PathBuf>, registry: Arc<BlockEncodingRegistry>) -> Self {
        Self {
            root_dir: root_dir.into(),
            registry,
        }
    }

    pub fn from_config(config: &EngineConfig, registry: Arc<BlockEncodingRegistry>) -> Self {
        Self::new(&config.spool_dir, registry)
    }

    pub fn read_index(
        &self,
        query_id: QueryId,
        pipeline_id: PipelineId,
    ) -> Result<PipelineSpoolIndex> {
        let bytes = fs::read(self.root_dir.join(index_path(query_id, pipeline_id)))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| VeloqError::CorruptEncoding(format!("index json decode failed: {e}")))
    }

    pub fn part_meta(
        &self,
        query_id: QueryId,
        pipeline_id: PipelineId,
        driver_id: DriverId,
    ) -> Result<SpoolPartMeta> {
        let index = self.read_index(query_id, pipeline_id)?;
        index
            .parts
            .into_iter()
            .find(|p| p.driver_id == driver_id)
            .ok_or_else(|| {
                VeloqError::InvalidArgument(format!(
                    "no spool part for driver {driver_id} in pipeline {pipeline_id}"
                ))
            })
    }

    pub fn read_part(
        &self,
        query_id: QueryId,
        pipeline_id: PipelineId,
        driver_id: DriverId,
    ) -> Result<Vec<Page>> {
        let rel = spool_path(query_id, pipeline_id, driver_id);
        let bytes = fs::read(self.root_dir.join(rel))?;
        let pages = decode_spool_bytes(&bytes, &self.registry)?;
        global_metrics().record_wire_decoded("spool", bytes.len() as u64);
        Ok(pages)
    }
}

fn decode_spool_bytes(bytes: &[u8], registry: &BlockEncodingRegistry) -> Result<Vec<Page>> {
    let mut cursor = ReadCursor::new(bytes);
    if cursor.read_bytes(4)? != SPOOL_MAGIC {
        return Err(VeloqError::CorruptEncoding(
            "invalid spool file magic".to_string(),
        ));
    }
    let version = cursor.read_u32()?;
    if version != SPOOL_VERSION {
        return Err(VeloqError::CorruptEncoding(format!(
            "unsupported spool version {version}"
        )));
    }

    let page_count = cursor.read_u32()?;
    let mut pages = Vec::with_capacity(page_count as usize);
    for _ in 0..page_count {
        let len = cursor.read_u32()? as usize;
        let payload = cursor.read_bytes(len)?;
        let mut page_cursor = ReadCursor::new(payload);
        let page = read_page(&mut page_cursor, registry)?;
        if !page_cursor.is_empty() {
            return Err(VeloqError::CorruptEncoding(format!(
                "{} trailing bytes after page payload",
                page_cursor.remaining()
            )));
        }
        pages.push(page);
    }
    Ok(pages)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use veloq_common::{DriverId, PipelineId, QueryId, VeloqError};
    use veloq_data::{BlockBuilder, Page, BIGINT};

    use crate::registry::BlockEncodingRegistry;
    use crate::writer::PageSpoolWriter;

    use super::{decode_spool_bytes, PageSpoolReader};

    #[test]
    fn truncated_spool_file_is_corrupt() {
        let root = tempfile::tempdir().expect("temp dir");
        let registry = Arc::new(BlockEncodingRegistry::default());
        let writer = PageSpoolWriter::new(root.path(), Arc::clone(&registry));

        let mut builder = BlockBuilder::new(&BIGINT);
        builder.append_long(42).unwrap();
        let pages = vec![Page::single(builder.build())];
        let meta = writer
            .write_part(QueryId(1), PipelineId(0), DriverId(0), &pages)
            .expect("write part");

        let path = root.path().join(&meta.file);
        let bytes = std::fs::read(&path).expect("read spool file");
        let truncated = &bytes[..bytes.len() - 3];
        assert!(matches!(
            decode_spool_bytes(truncated, &registry),
            Err(VeloqError::CorruptEncoding(_))
        ));
    }

    #[test]
    fn bad_magic_is_corrupt() {
        let registry = Arc::new(BlockEncodingRegistry::default());
        assert!(matches!(
            decode_spool_bytes(b"NOPE\x01\x00\x00\x00\x00\x00\x00\x00", &registry),
            Err(VeloqError::CorruptEncoding(_))
        ));
    }

    #[test]
    fn missing_part_meta_is_invalid_argument() {
        let root = tempfile::tempdir().expect("temp dir");
        let registry = Arc::new(BlockEncodingRegistry::default());
        let writer = PageSpoolWriter::new(root.path(), Arc::clone(&registry));
        writer
            .write_index(QueryId(1), PipelineId(0), Vec::new())
            .expect("write index");

        let reader = PageSpoolReader::new(root.path(), registry);
        assert!(matches!(
            reader.part_meta(QueryId(1), PipelineId(0), DriverId(9)),
            Err(VeloqError::InvalidArgument(_))
        ));
    }
}
