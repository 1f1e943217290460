//! Binary wire format for Veloq blocks and pages.
//!
//! Architecture role:
//! - block codecs (fixed- and variable-width) and their registry
//! - self-describing page serialization (encoding name precedes payload)
//! - page spool files for batches crossing process/stage boundaries
//!
//! Key modules:
//! - [`cursor`]
//! - [`encoding`]
//! - [`registry`]
//! - [`page_codec`]
//! - [`layout`], [`writer`], [`reader`]
//!
//! Interop contract: every `i32`/`u32` wire field is little-endian, and the
//! null bitmap packs 8 positions per byte MSB-first. Variable-width blocks
//! carry per-position lengths (not offsets); readers derive offsets by
//! prefix sum.

pub mod cursor;
pub mod encoding;
pub mod layout;
pub mod page_codec;
pub mod reader;
pub mod registry;
pub mod writer;

pub use cursor::ReadCursor;
pub use encoding::{BlockEncoding, FixedWidthEncoding, VariableWidthEncoding};
pub use page_codec::{read_page, write_page};
pub use reader::PageSpoolReader;
pub use registry::{BlockEncodingFactory, BlockEncodingRegistry};
pub use writer::PageSpoolWriter;
