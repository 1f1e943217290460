//! Columnar value containers used by the Veloq execution core.
//!
//! Architecture role:
//! - logical column types and their raw-buffer codec primitives
//! - immutable blocks and their single-pass builders
//! - pages (row batches: one block per channel)
//!
//! Key modules:
//! - [`types`]
//! - [`block`]
//! - [`page`]
//!
//! Values are stored little-endian in fixed-width block buffers, so block
//! encoders can emit value bytes verbatim.

pub mod block;
pub mod page;
pub mod types;

pub use block::{Block, BlockBuilder};
pub use page::Page;
pub use types::{Datum, NativeKind, Type, BIGINT, BOOLEAN, DOUBLE, VARBINARY, VARCHAR};
