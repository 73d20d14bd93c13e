use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use arbor_stream::{TokenReader, TokenWriter};
use arbor_types::{TypeName, Value};

use crate::builtin;
use crate::error::SchemaResult;

/// Converter for a value type whose layout is opaque to field walking.
///
/// A codec owns the complete stream form of its values: it writes exactly
/// one value and reads exactly one value back.
pub trait ScalarCodec: Send + Sync {
    fn write(&self, writer: &mut dyn TokenWriter, value: &Value) -> SchemaResult<()>;

    fn read(&self, reader: &mut dyn TokenReader) -> SchemaResult<Value>;

    /// Value used for fields that were never set.
    fn default_value(&self) -> Value;
}

/// Codecs keyed by the exact declared type name.
///
/// Lookup happens before generic object walking, so a registered codec
/// always wins over a schema type of the same name.
#[derive(Clone, Default)]
pub struct CodecRegistry {
    codecs: HashMap<TypeName, Arc<dyn ScalarCodec>>,
}

impl CodecRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the math and curve codecs.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        builtin::register_all(&mut registry);
        registry
    }

    /// Register (or replace) the codec for `type_name`.
    pub fn register(&mut self, type_name: TypeName, codec: Arc<dyn ScalarCodec>) {
        self.codecs.insert(type_name, codec);
    }

    pub fn get(&self, type_name: &str) -> Option<&dyn ScalarCodec> {
        self.codecs.get(type_name).map(|c| c.as_ref())
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.codecs.contains_key(type_name)
    }

    pub fn len(&self) -> usize {
        self.codecs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codecs.is_empty()
    }
}

impl fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.codecs.keys().map(TypeName::as_str).collect();
        names.sort_unstable();
        f.debug_struct("CodecRegistry").field("codecs", &names).finish()
    }
}
