//! Registered host-type schema for Arbor.
//!
//! Rust has no runtime reflection, so the shape of every persisted host type
//! is declared up front:
//!
//! - [`Schema`]: entity, component and object types with single inheritance,
//!   plus enums
//! - [`FieldIntrospector`]: the ordered, cached list of persisted fields of a
//!   type, after applying visibility and opt-out markers
//! - [`CodecRegistry`]: [`ScalarCodec`]s for value types with no public
//!   layout (vectors, colors, curves), consulted before field walking
//! - [`SchemaFile`]: the same declarations read from TOML

pub mod builtin;
pub mod codec;
pub mod error;
pub mod field;
pub mod file;
pub mod introspect;
pub mod schema;

pub use codec::{CodecRegistry, ScalarCodec};
pub use error::{SchemaError, SchemaResult};
pub use field::{FieldDef, FieldFlags, FieldType, Visibility};
pub use file::SchemaFile;
pub use introspect::{FieldIntrospector, PersistedField, SkippedField};
pub use schema::{EnumDef, Schema, TypeDef, TypeKind, COMPONENT_ROOT, ENTITY_ROOT};
