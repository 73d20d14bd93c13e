//! Object graph writer.
//!
//! Entities are written as `{ .name, [.type], .id, [.enabled], .components,
//! <fields>... }`. Embedded objects carry `.type` only when their concrete
//! type differs from the declared one. Entity-valued fields are written as
//! the bare GUID of the target, never embedded.

use arbor_schema::{CodecRegistry, FieldIntrospector, FieldType, Schema, SkippedField, TypeKind};
use arbor_stream::{names, TokenWriter};
use arbor_types::{EntityId, ObjectValue, Value};
use tracing::{debug, warn};

use crate::entity::{Component, Entities, Entity};
use crate::error::{GraphError, GraphResult};
use crate::resolver::AssetResolver;

/// Serializer session over one entity arena.
///
/// Holds its own [`FieldIntrospector`], so field layouts are computed once
/// per type for the lifetime of the writer.
pub struct GraphWriter<'a> {
    schema: &'a Schema,
    codecs: &'a CodecRegistry,
    fields: FieldIntrospector<'a>,
    resolver: &'a dyn AssetResolver,
    entities: &'a Entities,
}

impl<'a> GraphWriter<'a> {
    pub fn new(
        schema: &'a Schema,
        codecs: &'a CodecRegistry,
        resolver: &'a dyn AssetResolver,
        entities: &'a Entities,
    ) -> Self {
        Self {
            schema,
            codecs,
            fields: FieldIntrospector::new(schema, codecs),
            resolver,
            entities,
        }
    }

    /// Fields left out of the layouts computed so far.
    pub fn skipped_fields(&self) -> &[SkippedField] {
        self.fields.skipped_fields()
    }

    /// Write the entity behind `id` as one object value.
    pub fn write_entity_id(
        &mut self,
        writer: &mut dyn TokenWriter,
        id: EntityId,
        declared: &str,
    ) -> GraphResult<()> {
        let entities = self.entities;
        let entity = entities.get(id).ok_or(GraphError::DanglingHandle(id))?;
        self.write_entity(writer, entity, declared)
    }

    /// Write one entity as an object value. `declared` is the statically
    /// expected entity type; `.type` is written only when it differs.
    pub fn write_entity(
        &mut self,
        writer: &mut dyn TokenWriter,
        entity: &Entity,
        declared: &str,
    ) -> GraphResult<()> {
        self.write_entity_inner(writer, entity, declared)
            .map_err(|e| {
                GraphError::entity(&entity.name, entity.type_name.as_str(), Some(entity.guid), e)
            })?;
        debug!(entity = %entity.name, guid = %entity.guid, "entity written");
        Ok(())
    }

    /// Write entities as an array.
    pub fn write_entity_array(
        &mut self,
        writer: &mut dyn TokenWriter,
        ids: impl IntoIterator<Item = EntityId>,
        declared: &str,
    ) -> GraphResult<()> {
        writer.write_start_array()?;
        for id in ids {
            self.write_entity_id(writer, id, declared)?;
        }
        writer.write_end_array()?;
        Ok(())
    }

    fn write_entity_inner(
        &mut self,
        writer: &mut dyn TokenWriter,
        entity: &Entity,
        declared: &str,
    ) -> GraphResult<()> {
        let concrete = entity.type_name.as_str();
        let def = self
            .schema
            .get(concrete)
            .ok_or_else(|| GraphError::UnknownType(concrete.to_string()))?;
        if def.kind != TypeKind::Entity || !self.schema.is_assignable(concrete, declared) {
            return Err(GraphError::NotAssignable {
                concrete: concrete.to_string(),
                declared: declared.to_string(),
            });
        }
        if def.is_abstract {
            return Err(GraphError::AbstractType(concrete.to_string()));
        }

        writer.write_start_object()?;
        writer.write_property_name(names::NAME)?;
        writer.write_str(&entity.name)?;
        if concrete != declared {
            writer.write_property_name(names::TYPE)?;
            writer.write_type_id(concrete)?;
        }
        writer.write_property_name(names::ID)?;
        writer.write_guid(entity.guid)?;
        if !entity.enabled {
            writer.write_property_name(names::ENABLED)?;
            writer.write_bool(false)?;
        }

        writer.write_property_name(names::COMPONENTS)?;
        writer.write_start_array()?;
        for (index, component) in entity.components.iter().enumerate() {
            self.write_component(writer, component)
                .map_err(|e| GraphError::component(index, e))?;
        }
        writer.write_end_array()?;

        self.write_fields(writer, concrete, &entity.fields)?;
        writer.write_end_object()?;
        Ok(())
    }

    fn write_component(
        &mut self,
        writer: &mut dyn TokenWriter,
        component: &Component,
    ) -> GraphResult<()> {
        match component {
            Component::Unknown(unknown) => Ok(unknown.raw.replay(writer)?),
            Component::Known(obj) => {
                let degenerate = match self.schema.get(obj.type_name.as_str()) {
                    None => Some("unregistered type"),
                    Some(def) if def.kind != TypeKind::Component => Some("not a component type"),
                    Some(def) if def.is_abstract => Some("abstract type"),
                    Some(_) => None,
                };
                if let Some(reason) = degenerate {
                    warn!(component = %obj.type_name, reason, "skipping component");
                    return Ok(());
                }
                self.write_object(writer, obj, arbor_schema::COMPONENT_ROOT)
            }
        }
    }

    /// Write persisted fields of `type_name` as properties, defaulting the
    /// ones missing from `values`.
    fn write_fields(
        &mut self,
        writer: &mut dyn TokenWriter,
        type_name: &str,
        values: &arbor_types::FieldMap,
    ) -> GraphResult<()> {
        let fields = self.fields.persisted_fields(type_name)?;
        for field in fields.iter() {
            writer.write_property_name(&field.name)?;
            let path = writer.path();
            let result = match values.get(&field.name) {
                Some(value) => self.write_value(writer, &field.ty, value),
                None => {
                    let value = self.fields.default_value(&field.ty);
                    self.write_value(writer, &field.ty, &value)
                }
            };
            result.map_err(|e| GraphError::property(&field.name, path, e))?;
        }
        Ok(())
    }

    fn write_object(
        &mut self,
        writer: &mut dyn TokenWriter,
        obj: &ObjectValue,
        declared: &str,
    ) -> GraphResult<()> {
        let concrete = obj.type_name.as_str();
        let def = self
            .schema
            .get(concrete)
            .ok_or_else(|| GraphError::UnknownType(concrete.to_string()))?;
        if def.kind == TypeKind::Entity || !self.schema.is_assignable(concrete, declared) {
            return Err(GraphError::NotAssignable {
                concrete: concrete.to_string(),
                declared: declared.to_string(),
            });
        }
        if def.is_abstract {
            return Err(GraphError::AbstractType(concrete.to_string()));
        }

        writer.write_start_object()?;
        if concrete != declared {
            writer.write_property_name(names::TYPE)?;
            writer.write_type_id(concrete)?;
        }
        self.write_fields(writer, concrete, &obj.fields)?;
        writer.write_end_object()?;
        Ok(())
    }

    fn write_value(
        &mut self,
        writer: &mut dyn TokenWriter,
        ty: &FieldType,
        value: &Value,
    ) -> GraphResult<()> {
        match (ty, value) {
            (FieldType::Bool, Value::Bool(b)) => writer.write_bool(*b)?,
            (FieldType::Int, Value::Int(i)) => writer.write_i64(*i)?,
            (FieldType::UInt, Value::UInt(u)) => writer.write_u64(*u)?,
            (FieldType::Float, Value::Float(f)) => writer.write_f64(*f)?,
            (FieldType::String, Value::String(s)) => writer.write_str(s)?,
            (FieldType::Guid, Value::Guid(g)) => writer.write_guid(*g)?,
            (FieldType::Enum(name), Value::Enum(variant)) => {
                let def = self
                    .schema
                    .enum_def(name.as_str())
                    .ok_or_else(|| GraphError::UnknownType(name.to_string()))?;
                if !def.contains(variant) {
                    return Err(GraphError::UnknownVariant {
                        enum_name: name.to_string(),
                        variant: variant.clone(),
                    });
                }
                writer.write_str(variant)?;
            }
            // No null collections on the wire.
            (FieldType::List(_), Value::Null) => {
                writer.write_start_array()?;
                writer.write_end_array()?;
            }
            (FieldType::List(element), Value::List(items)) => {
                writer.write_start_array()?;
                for item in items {
                    self.write_value(writer, element, item)?;
                }
                writer.write_end_array()?;
            }
            (FieldType::Object(name), value) => {
                let codecs = self.codecs;
                if let Some(codec) = codecs.get(name.as_str()) {
                    // Codec values have no null form; an unset one reads back
                    // as the default, so write that.
                    match value {
                        Value::Null => codec.write(writer, &codec.default_value())?,
                        value => codec.write(writer, value)?,
                    }
                } else if value.is_null() {
                    writer.write_null()?;
                } else if let Value::Object(obj) = value {
                    self.write_object(writer, obj, name.as_str())?;
                } else {
                    return Err(GraphError::mismatch(ty, value));
                }
            }
            (FieldType::Entity(_), Value::Entity(None)) => writer.write_null()?,
            (FieldType::Entity(declared), Value::Entity(Some(id))) => {
                let target = self
                    .entities
                    .get(*id)
                    .ok_or(GraphError::DanglingHandle(*id))?;
                if !self
                    .schema
                    .is_assignable(target.type_name.as_str(), declared.as_str())
                {
                    return Err(GraphError::NotAssignable {
                        concrete: target.type_name.to_string(),
                        declared: declared.to_string(),
                    });
                }
                writer.write_guid(target.guid)?;
            }
            (FieldType::Asset, Value::Asset(None)) => writer.write_null()?,
            (FieldType::Asset, Value::Asset(Some(asset))) => {
                let key = asset.key();
                self.resolver.add_asset(asset, &key);
                writer.write_start_object()?;
                writer.write_property_name(names::ID)?;
                writer.write_str(&key.id)?;
                writer.write_property_name(names::LOCAL_ID)?;
                writer.write_i64(key.local_id)?;
                writer.write_end_object()?;
            }
            (FieldType::Opaque(_), _) => writer.write_null()?,
            (_, value) => return Err(GraphError::mismatch(ty, value)),
        }
        Ok(())
    }
}

impl std::fmt::Debug for GraphWriter<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphWriter")
            .field("entities", &self.entities.len())
            .finish_non_exhaustive()
    }
}
