//! Schema files: enums and types declared in TOML.
//!
//! ```toml
//! [[enums]]
//! name = "Team"
//! variants = ["Red", "Blue"]
//!
//! [[types]]
//! name = "Enemy"
//! kind = "entity"
//! fields = [
//!     { name = "hp", type = "int" },
//!     { name = "target", type = "entity<Enemy>" },
//! ]
//! ```
//!
//! Entity and component types without a `base` derive from the matching
//! root. Types may appear in any order; bases are registered first.

use std::path::Path;

use arbor_types::TypeName;
use serde::{Deserialize, Serialize};

use crate::error::{SchemaError, SchemaResult};
use crate::schema::{EnumDef, Schema, TypeDef, TypeKind, COMPONENT_ROOT, ENTITY_ROOT};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SchemaFile {
    #[serde(default)]
    pub enums: Vec<EnumDef>,
    #[serde(default)]
    pub types: Vec<TypeDef>,
}

impl SchemaFile {
    pub fn parse(text: &str) -> SchemaResult<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> SchemaResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| SchemaError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&text)
    }

    /// Register everything into a fresh schema.
    pub fn into_schema(self) -> SchemaResult<Schema> {
        let mut schema = Schema::new();
        for def in self.enums {
            schema.register_enum(def)?;
        }

        let mut pending: Vec<TypeDef> = self
            .types
            .into_iter()
            .map(|mut def| {
                if def.base.is_none() {
                    def.base = match def.kind {
                        TypeKind::Entity => Some(TypeName::from_static(ENTITY_ROOT)),
                        TypeKind::Component => Some(TypeName::from_static(COMPONENT_ROOT)),
                        TypeKind::Object => None,
                    };
                }
                def
            })
            .collect();

        while !pending.is_empty() {
            let before = pending.len();
            let mut deferred = Vec::new();
            for def in pending {
                let ready = def.base.as_ref().map_or(true, |b| schema.contains(b.as_str()));
                if ready {
                    schema.register(def)?;
                } else {
                    deferred.push(def);
                }
            }
            if deferred.len() == before {
                // No progress: the first remaining type reports its missing base.
                if let Some(def) = deferred.into_iter().next() {
                    schema.register(def)?;
                }
                break;
            }
            pending = deferred;
        }
        Ok(schema)
    }
}
