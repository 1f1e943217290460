//! Self-describing page serialization: each channel's payload is preceded
//! by its encoding name, so readers resolve codecs through a registry
//! without sharing in-process type identity.

use veloq_common::{Result, VeloqError};
use veloq_data::Page;

use crate::cursor::{write_i32, ReadCursor};
use crate::registry::BlockEncodingRegistry;

pub fn write_page(out: &mut Vec<u8>, page: &Page, registry: &BlockEncodingRegistry) -> Result<()> {
    let channels = i32::try_from(page.channel_count()).map_err(|_| {
        VeloqError::InvalidArgument(format!(
            "page with {} channels exceeds the wire limit",
            page.channel_count()
        ))
    })?;
    write_i32(out, channels);
    for block in page.blocks() {
        let encoding = registry.encoding_for(block.block_type())?;
        let name = encoding.name().as_bytes();
        write_i32(out, name.len() as i32);
        out.extend_from_slice(name);
        encoding.write_block(out, block)?;
    }
    Ok(())
}

pub fn read_page(cursor: &mut ReadCursor<'_>, registry: &BlockEncodingRegistry) -> Result<Page> {
    let channels = cursor.read_i32()?;
    if channels <= 0 {
        return Err(VeloqError::CorruptEncoding(format!(
            "page channel count must be positive, got {channels}"
        )));
    }

    let mut blocks = Vec::with_capacity(channels as usize);
    for _ in 0..channels {
        let name_len = cursor.read_i32()?;
        if name_len < 0 {
            return Err(VeloqError::CorruptEncoding(format!(
                "negative encoding name length {name_len}"
            )));
        }
        let name_bytes = cursor.read_bytes(name_len as usize)?;
        let name = std::str::from_utf8(name_bytes).map_err(|_| {
            VeloqError::CorruptEncoding("encoding name is not utf8".to_string())
        })?;
        let encoding = registry.lookup(name)?.read_encoding(cursor)?;
        blocks.push(encoding.read_block(cursor)?);
    }

    let position_count = blocks[0].position_count();
    if blocks.iter().any(|b| b.position_count() != position_count) {
        return Err(VeloqError::CorruptEncoding(
            "page channels disagree on position count".to_string(),
        ));
    }
    Page::new(blocks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use veloq_data::{BlockBuilder, Datum, BIGINT, DOUBLE, VARCHAR};

    fn sample_page() -> Page {
        let mut ids = BlockBuilder::new(&BIGINT);
        ids.append_long(1).unwrap();
        ids.append_null();
        ids.append_long(3).unwrap();

        let mut names = BlockBuilder::new(&VARCHAR);
        names.append_bytes(b"alice").unwrap();
        names.append_bytes(b"bob").unwrap();
        names.append_null();

        let mut scores = BlockBuilder::new(&DOUBLE);
        scores.append_double(1.5).unwrap();
        scores.append_double(-2.0).unwrap();
        scores.append_double(0.0).unwrap();

        Page::new(vec![ids.build(), names.build(), scores.build()]).unwrap()
    }

    #[test]
    fn page_round_trips_through_registry() {
        let registry = BlockEncodingRegistry::default();
        let page = sample_page();

        let mut out = Vec::new();
        write_page(&mut out, &page, &registry).expect("encode");
        let mut cursor = ReadCursor::new(&out);
        let decoded = read_page(&mut cursor, &registry).expect("decode");
        assert!(cursor.is_empty());

        assert_eq!(decoded.channel_count(), 3);
        assert_eq!(decoded.rows().unwrap(), page.rows().unwrap());
        assert_eq!(decoded.block(0).unwrap().value_at(1).unwrap(), Datum::Null);
    }

    #[test]
    fn unknown_encoding_name_fails_decode() {
        let registry = BlockEncodingRegistry::default();
        let page = sample_page();
        let mut out = Vec::new();
        write_page(&mut out, &page, &registry).expect("encode");

        let mut empty = BlockEncodingRegistry::new();
        empty.register_type(&BIGINT).unwrap();
        assert!(matches!(
            read_page(&mut ReadCursor::new(&out), &empty),
            Err(VeloqError::CorruptEncoding(_))
        ));
    }

    #[test]
    fn zero_channel_page_is_corrupt() {
        let registry = BlockEncodingRegistry::default();
        let mut out = Vec::new();
        write_i32(&mut out, 0);
        assert!(matches!(
            read_page(&mut ReadCursor::new(&out), &registry),
            Err(VeloqError::CorruptEncoding(_))
        ));
    }
}
