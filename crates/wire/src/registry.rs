//! Name-keyed registry of block encoding factories.
//!
//! The registry is an injected instance rather than ambient global state:
//! tests construct isolated registries, and production code builds one at
//! startup with the explicit registration list in
//! [`BlockEncodingRegistry::default`].

use std::collections::HashMap;
use std::sync::Arc;

use veloq_common::{Result, VeloqError};
use veloq_data::{Type, BIGINT, BOOLEAN, DOUBLE, VARBINARY, VARCHAR};

use crate::cursor::ReadCursor;
use crate::encoding::{BlockEncoding, FixedWidthEncoding, VariableWidthEncoding};

/// Produces encoding instances for one registered name. A factory for a
/// parameterized type family would read its parameters from the stream
/// header; the singleton types carry none.
pub trait BlockEncodingFactory: Send + Sync {
    fn name(&self) -> &'static str;

    /// Read-side construction from a self-describing stream.
    fn read_encoding(&self, cursor: &mut ReadCursor<'_>) -> Result<Arc<dyn BlockEncoding>>;

    /// Write-side instance.
    fn encoding(&self) -> Arc<dyn BlockEncoding>;
}

struct TypeEncodingFactory {
    encoding: Arc<dyn BlockEncoding>,
}

impl BlockEncodingFactory for TypeEncodingFactory {
    fn name(&self) -> &'static str {
        self.encoding.name()
    }

    fn read_encoding(&self, _cursor: &mut ReadCursor<'_>) -> Result<Arc<dyn BlockEncoding>> {
        Ok(Arc::clone(&self.encoding))
    }

    fn encoding(&self) -> Arc<dyn BlockEncoding> {
        Arc::clone(&self.encoding)
    }
}

pub struct BlockEncodingRegistry {
    factories: HashMap<&'static str, Arc<dyn BlockEncodingFactory>>,
}

impl BlockEncodingRegistry {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    pub fn register(&mut self, factory: Arc<dyn BlockEncodingFactory>) -> Result<()> {
        let name = factory.name();
        if self.factories.contains_key(name) {
            return Err(VeloqError::InvalidArgument(format!(
                "encoding '{name}' is already registered"
            )));
        }
        self.factories.insert(name, factory);
        Ok(())
    }

    /// Register the width-appropriate encoding for a type.
    pub fn register_type(&mut self, ty: &'static Type) -> Result<()> {
        let encoding: Arc<dyn BlockEncoding> = if ty.is_fixed_width() {
            Arc::new(FixedWidthEncoding::new(ty)?)
        } else {
            Arc::new(VariableWidthEncoding::new(ty)?)
        };
        self.register(Arc::new(TypeEncodingFactory { encoding }))
    }

    pub fn lookup(&self, name: &str) -> Result<&Arc<dyn BlockEncodingFactory>> {
        self.factories.get(name).ok_or_else(|| {
            VeloqError::CorruptEncoding(format!("unknown block encoding '{name}'"))
        })
    }

    pub fn encoding_for(&self, ty: &'static Type) -> Result<Arc<dyn BlockEncoding>> {
        Ok(self.lookup(ty.name())?.encoding())
    }
}

impl Default for BlockEncodingRegistry {
    /// Process-wide startup registration list: every singleton type with
    /// its width-appropriate encoding.
    fn default() -> Self {
        let mut registry = Self::new();
        for ty in [&BOOLEAN, &BIGINT, &DOUBLE, &VARCHAR, &VARBINARY] {
            registry.register_type(ty).expect("register builtin encoding");
        }
        registry
    }
}
