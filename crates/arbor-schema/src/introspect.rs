//! Field introspection: which fields of a type are persisted, in what order.
//!
//! A field is persisted unless it is constant, static or excluded, private
//! without `expose`, public but `transient`, or reserved by a type in its
//! ancestry for engine bookkeeping. A field whose declared type cannot be
//! serialized on its own is skipped with a warning rather than failing,
//! which keeps schemas with host-only fields loadable.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use arbor_types::{Guid, ObjectValue, TypeName, Value};
use tracing::warn;

use crate::codec::CodecRegistry;
use crate::error::SchemaResult;
use crate::field::{FieldDef, FieldType, Visibility};
use crate::schema::{Schema, TypeDef, TypeKind};

/// One persisted field, resolved against the schema.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PersistedField {
    pub name: String,
    /// Effective type; a polymorphic `opaque<T>` field is walked as `object<T>`.
    pub ty: FieldType,
    pub declared_in: TypeName,
    pub polymorphic: bool,
}

/// A field left out because its type has no persisted form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SkippedField {
    pub type_name: TypeName,
    pub field: String,
    pub ty: FieldType,
}

/// Per-session introspection cache.
///
/// Create one per serializer or deserializer; results are cached per type
/// for the lifetime of the introspector and never shared across sessions.
#[derive(Debug)]
pub struct FieldIntrospector<'s> {
    schema: &'s Schema,
    codecs: &'s CodecRegistry,
    cache: HashMap<TypeName, Arc<[PersistedField]>>,
    skipped: Vec<SkippedField>,
}

impl<'s> FieldIntrospector<'s> {
    pub fn new(schema: &'s Schema, codecs: &'s CodecRegistry) -> Self {
        Self {
            schema,
            codecs,
            cache: HashMap::new(),
            skipped: Vec::new(),
        }
    }

    pub fn schema(&self) -> &'s Schema {
        self.schema
    }

    pub fn codecs(&self) -> &'s CodecRegistry {
        self.codecs
    }

    /// Persisted fields of `type_name`, base type fields first.
    pub fn persisted_fields(&mut self, type_name: &str) -> SchemaResult<Arc<[PersistedField]>> {
        if let Some(hit) = self.cache.get(type_name) {
            return Ok(Arc::clone(hit));
        }
        let schema = self.schema;
        let def = schema.require(type_name)?;
        let mut chain: Vec<&TypeDef> = schema.ancestry(type_name).collect();
        chain.reverse();
        let reserved: HashSet<&str> = chain
            .iter()
            .flat_map(|d| d.reserved.iter().map(String::as_str))
            .collect();

        let mut fields = Vec::new();
        for owner in &chain {
            for field in &owner.fields {
                if !is_eligible(field) || reserved.contains(field.name.as_str()) {
                    continue;
                }
                let ty = effective_type(field);
                if !field.flags.polymorphic && !self.is_serializable(&ty, &mut HashSet::new()) {
                    warn!(
                        type_name = %def.name,
                        field = %field.name,
                        field_type = %field.ty,
                        "field type has no persisted form; skipping"
                    );
                    self.skipped.push(SkippedField {
                        type_name: def.name.clone(),
                        field: field.name.clone(),
                        ty: field.ty.clone(),
                    });
                    continue;
                }
                fields.push(PersistedField {
                    name: field.name.clone(),
                    ty,
                    declared_in: owner.name.clone(),
                    polymorphic: field.flags.polymorphic,
                });
            }
        }

        let fields: Arc<[PersistedField]> = fields.into();
        self.cache.insert(def.name.clone(), Arc::clone(&fields));
        Ok(fields)
    }

    /// Look up one persisted field by name.
    pub fn field(&mut self, type_name: &str, field: &str) -> SchemaResult<Option<PersistedField>> {
        let fields = self.persisted_fields(type_name)?;
        Ok(fields.iter().find(|f| f.name == field).cloned())
    }

    /// Fields skipped so far in this session.
    pub fn skipped_fields(&self) -> &[SkippedField] {
        &self.skipped
    }

    /// Value of a field that was never set.
    pub fn default_value(&self, ty: &FieldType) -> Value {
        match ty {
            FieldType::Bool => Value::Bool(false),
            FieldType::Int => Value::Int(0),
            FieldType::UInt => Value::UInt(0),
            FieldType::Float => Value::Float(0.0),
            FieldType::String => Value::String(String::new()),
            FieldType::Guid => Value::Guid(Guid::nil()),
            FieldType::Enum(name) => Value::Enum(
                self.schema
                    .enum_def(name.as_str())
                    .and_then(|e| e.default_variant())
                    .unwrap_or_default()
                    .to_string(),
            ),
            FieldType::List(_) => Value::List(Vec::new()),
            FieldType::Object(name) => self
                .codecs
                .get(name.as_str())
                .map_or(Value::Null, |codec| codec.default_value()),
            FieldType::Entity(_) => Value::Entity(None),
            FieldType::Asset => Value::Asset(None),
            FieldType::Opaque(_) => Value::Null,
        }
    }

    /// A fresh instance of `type_name` with every persisted field defaulted.
    pub fn instantiate(&mut self, type_name: &str) -> SchemaResult<ObjectValue> {
        let name = self.schema.require(type_name)?.name.clone();
        let fields = self.persisted_fields(type_name)?;
        let mut object = ObjectValue::empty(name);
        for field in fields.iter() {
            object
                .fields
                .insert(field.name.clone(), self.default_value(&field.ty));
        }
        Ok(object)
    }

    fn is_serializable(&self, ty: &FieldType, visiting: &mut HashSet<TypeName>) -> bool {
        match ty {
            FieldType::Bool
            | FieldType::Int
            | FieldType::UInt
            | FieldType::Float
            | FieldType::String
            | FieldType::Guid
            | FieldType::Asset => true,
            FieldType::Enum(name) => self.schema.enum_def(name.as_str()).is_some(),
            FieldType::List(inner) => self.is_serializable(inner, visiting),
            FieldType::Entity(name) => self
                .schema
                .get(name.as_str())
                .is_some_and(|d| d.kind == TypeKind::Entity),
            FieldType::Opaque(_) => false,
            FieldType::Object(name) => {
                self.codecs.contains(name.as_str()) || self.has_persisted_layout(name, visiting)
            }
        }
    }

    /// Does the object type carry at least one serializable field?
    ///
    /// Abstract types count as serializable: their values are always a
    /// concrete subtype written with a type tag.
    fn has_persisted_layout(&self, name: &TypeName, visiting: &mut HashSet<TypeName>) -> bool {
        let Some(def) = self.schema.get(name.as_str()) else {
            return false;
        };
        if def.kind == TypeKind::Entity {
            return false;
        }
        if def.is_abstract {
            return true;
        }
        if !visiting.insert(name.clone()) {
            // Recursive type: its layout is being checked further up.
            return true;
        }
        let result = self.schema.ancestry(name.as_str()).any(|owner| {
            owner.fields.iter().any(|f| {
                is_eligible(f)
                    && (f.flags.polymorphic || self.is_serializable(&effective_type(f), visiting))
            })
        });
        visiting.remove(name);
        result
    }
}

fn is_eligible(field: &FieldDef) -> bool {
    let flags = field.flags;
    if flags.constant || flags.is_static || flags.excluded {
        return false;
    }
    match field.visibility {
        Visibility::Public => !flags.transient,
        Visibility::Private => flags.expose,
    }
}

fn effective_type(field: &FieldDef) -> FieldType {
    match &field.ty {
        FieldType::Opaque(name) if field.flags.polymorphic => FieldType::Object(name.clone()),
        other => other.clone(),
    }
}
