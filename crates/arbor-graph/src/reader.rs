//! Object graph reader and the reference resolution pass.
//!
//! Entity references are looked up among the entities already read in this
//! batch (including the one being read). A miss is recorded as an
//! [`UnresolvedReference`] and retried once by [`GraphReader::finish`],
//! after the whole batch is in the arena. Resolution is a single linear
//! pass, so forward and cyclic references need no ordering.

use arbor_schema::{
    CodecRegistry, FieldIntrospector, FieldType, PersistedField, Schema, SkippedField, TypeKind,
    COMPONENT_ROOT,
};
use arbor_stream::{names, RawValue, Token, TokenReader};
use arbor_types::{AssetKey, EntityId, Guid, ObjectValue, TypeName, Value};
use tracing::{debug, warn};

use crate::diagnostic::{Diagnostic, DiagnosticKind};
use crate::entity::{Component, Entities, Entity, UnknownComponent};
use crate::error::{GraphError, GraphResult};
use crate::reference::{
    render_segments, value_at_mut, FieldSlot, Link, PathSegment, ReferenceShape,
    UnresolvedReference,
};
use crate::resolver::{AssetLookup, AssetResolver};

/// Reader behaviour switches.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReadOptions {
    /// Keep a component that fails to decode as [`Component::Unknown`] with a
    /// diagnostic instead of failing its entity.
    pub salvage_components: bool,
}

/// A fully resolved load batch.
#[derive(Debug)]
pub struct LoadedBatch {
    pub entities: Entities,
    pub diagnostics: Vec<Diagnostic>,
}

/// The entity currently being decoded.
struct InFlight {
    id: EntityId,
    guid: Guid,
    name: String,
    type_name: TypeName,
}

enum Lookup {
    Bound(EntityId),
    Missing,
    WrongType(TypeName),
}

/// Deserializer session producing one load batch.
///
/// Entities read through the session are not observable until
/// [`finish`](Self::finish) has run the resolution pass.
pub struct GraphReader<'a> {
    schema: &'a Schema,
    codecs: &'a CodecRegistry,
    fields: FieldIntrospector<'a>,
    resolver: &'a dyn AssetResolver,
    options: ReadOptions,
    entities: Entities,
    pending: Vec<UnresolvedReference>,
    diagnostics: Vec<Diagnostic>,
    in_flight: Option<InFlight>,
    component: Option<usize>,
    path: Vec<PathSegment>,
}

impl<'a> GraphReader<'a> {
    pub fn new(
        schema: &'a Schema,
        codecs: &'a CodecRegistry,
        resolver: &'a dyn AssetResolver,
        options: ReadOptions,
    ) -> Self {
        Self {
            schema,
            codecs,
            fields: FieldIntrospector::new(schema, codecs),
            resolver,
            options,
            entities: Entities::new(),
            pending: Vec::new(),
            diagnostics: Vec::new(),
            in_flight: None,
            component: None,
            path: Vec::new(),
        }
    }

    pub fn skipped_fields(&self) -> &[SkippedField] {
        self.fields.skipped_fields()
    }

    /// Number of entities read so far.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// References still waiting for the resolution pass.
    pub fn pending_references(&self) -> usize {
        self.pending.len()
    }

    /// Read one entity object. `declared` is used when the stream carries no
    /// `.type` tag.
    pub fn read_entity(
        &mut self,
        reader: &mut dyn TokenReader,
        declared: &str,
    ) -> GraphResult<EntityId> {
        self.in_flight = None;
        reader.ensure_start_object()?;
        reader.ensure_property_name(names::NAME)?;
        let name = reader.read_string()?;

        let mut type_name = declared.to_string();
        let mut guid = None;
        let pending_mark = self.pending.len();
        let diagnostics_mark = self.diagnostics.len();
        let result =
            self.read_entity_body(reader, name.clone(), declared, &mut type_name, &mut guid);
        self.in_flight = None;
        self.component = None;
        self.path.clear();
        let id = result.map_err(|e| {
            // The failed entity never reaches the arena, so its id goes to
            // the next one read; nothing it recorded may outlive it.
            self.pending.truncate(pending_mark);
            self.diagnostics.truncate(diagnostics_mark);
            GraphError::entity(&name, &type_name, guid, e)
        })?;
        debug!(entity = %name, %id, "entity read");
        Ok(id)
    }

    /// Read an array of entities.
    pub fn read_entity_array(
        &mut self,
        reader: &mut dyn TokenReader,
        declared: &str,
    ) -> GraphResult<Vec<EntityId>> {
        reader.ensure_start_array()?;
        let mut ids = Vec::new();
        while !reader.at_end_array()? {
            ids.push(self.read_entity(reader, declared)?);
        }
        reader.ensure_end_array()?;
        Ok(ids)
    }

    /// Run the resolution pass and hand over the batch.
    pub fn finish(mut self) -> LoadedBatch {
        let pending = std::mem::take(&mut self.pending);
        let count = pending.len();
        for reference in pending {
            self.resolve(reference);
        }
        debug!(
            entities = self.entities.len(),
            references = count,
            diagnostics = self.diagnostics.len(),
            "load batch resolved"
        );
        LoadedBatch {
            entities: self.entities,
            diagnostics: self.diagnostics,
        }
    }

    fn read_entity_body(
        &mut self,
        reader: &mut dyn TokenReader,
        name: String,
        declared: &str,
        type_out: &mut String,
        guid_out: &mut Option<Guid>,
    ) -> GraphResult<EntityId> {
        if reader.next_property_is(names::TYPE)? {
            reader.next_token()?;
            *type_out = reader.read_type_id()?;
        }
        let type_name = self.check_type(type_out, declared, TypeKind::Entity)?;
        reader.ensure_property_name(names::ID)?;
        let guid = reader.read_guid()?;
        *guid_out = Some(guid);
        if self.entities.contains_guid(guid) {
            return Err(GraphError::DuplicateGuid(guid));
        }
        let id = self.entities.next_id();
        self.in_flight = Some(InFlight {
            id,
            guid,
            name: name.clone(),
            type_name: type_name.clone(),
        });

        let mut entity = Entity {
            name,
            guid,
            type_name: type_name.clone(),
            enabled: true,
            components: Vec::new(),
            fields: self.fields.instantiate(type_name.as_str())?.fields,
        };
        if reader.next_property_is(names::ENABLED)? {
            reader.next_token()?;
            entity.enabled = reader.read_bool()?;
        }
        if reader.next_property_is(names::COMPONENTS)? {
            reader.next_token()?;
            entity.components = self.read_components(reader)?;
        }

        let fields = self.fields.persisted_fields(type_name.as_str())?;
        while !reader.at_end_object()? {
            let property = reader.read_property_name()?;
            match fields.iter().find(|f| f.name == property) {
                Some(field) => {
                    self.component = None;
                    self.path.clear();
                    let value = self.read_field(reader, field)?;
                    entity.fields.insert(property, value);
                }
                None => {
                    debug!(entity = %entity.name, %property, "skipping unknown property");
                    reader.skip_value()?;
                }
            }
        }
        reader.ensure_end_object()?;
        self.entities.insert(entity)
    }

    fn read_components(&mut self, reader: &mut dyn TokenReader) -> GraphResult<Vec<Component>> {
        reader.ensure_start_array()?;
        let mut components = Vec::new();
        let mut index = 0;
        while !reader.at_end_array()? {
            let raw = reader.capture_value()?;
            let position = index;
            index += 1;
            if raw.tokens() == [Token::Null] {
                continue;
            }
            let tag = raw.type_tag().map(str::to_string);
            let registered = tag.as_deref().is_some_and(|t| {
                self.schema
                    .get(t)
                    .is_some_and(|d| d.kind == TypeKind::Component && !d.is_abstract)
            });
            if !registered {
                let message = match &tag {
                    Some(t) => format!("component type `{t}` is not registered; kept verbatim"),
                    None => "component has no type tag; kept verbatim".to_string(),
                };
                self.diagnose(
                    DiagnosticKind::UnknownComponentType,
                    self.component_path(position),
                    message,
                );
                components.push(Component::Unknown(UnknownComponent {
                    type_name: tag,
                    raw,
                }));
                continue;
            }

            let pending_mark = self.pending.len();
            let diagnostics_mark = self.diagnostics.len();
            self.component = Some(components.len());
            self.path.clear();
            match self.read_component(&raw) {
                Ok(obj) => components.push(Component::Known(obj)),
                Err(err) if self.options.salvage_components => {
                    self.pending.truncate(pending_mark);
                    self.diagnostics.truncate(diagnostics_mark);
                    self.diagnose(
                        DiagnosticKind::SalvagedComponent,
                        self.component_path(position),
                        format!("failed to decode, kept verbatim: {err}"),
                    );
                    components.push(Component::Unknown(UnknownComponent {
                        type_name: tag,
                        raw,
                    }));
                }
                Err(err) => return Err(GraphError::component(position, err)),
            }
        }
        reader.ensure_end_array()?;
        self.component = None;
        Ok(components)
    }

    fn read_component(&mut self, raw: &RawValue) -> GraphResult<ObjectValue> {
        let mut cursor = raw.reader();
        let obj = self.read_object(&mut cursor, COMPONENT_ROOT)?;
        cursor.ensure_end_of_stream()?;
        Ok(obj)
    }

    fn read_object(
        &mut self,
        reader: &mut dyn TokenReader,
        declared: &str,
    ) -> GraphResult<ObjectValue> {
        reader.ensure_start_object()?;
        let concrete = if reader.next_property_is(names::TYPE)? {
            reader.next_token()?;
            reader.read_type_id()?
        } else {
            declared.to_string()
        };
        let type_name = self.check_type(&concrete, declared, TypeKind::Object)?;
        let mut obj = self.fields.instantiate(type_name.as_str())?;
        let fields = self.fields.persisted_fields(type_name.as_str())?;
        while !reader.at_end_object()? {
            let property = reader.read_property_name()?;
            match fields.iter().find(|f| f.name == property) {
                Some(field) => {
                    let value = self.read_field(reader, field)?;
                    obj.fields.insert(property, value);
                }
                None => {
                    debug!(object = %type_name, %property, "skipping unknown property");
                    reader.skip_value()?;
                }
            }
        }
        reader.ensure_end_object()?;
        Ok(obj)
    }

    /// Validate a concrete type read from the stream against the declared
    /// one. `kind` is `Entity` for entities; anything else accepts component
    /// and object types.
    fn check_type(&self, concrete: &str, declared: &str, kind: TypeKind) -> GraphResult<TypeName> {
        let def = self
            .schema
            .get(concrete)
            .ok_or_else(|| GraphError::UnknownType(concrete.to_string()))?;
        let kind_ok = match kind {
            TypeKind::Entity => def.kind == TypeKind::Entity,
            _ => def.kind != TypeKind::Entity,
        };
        if !kind_ok || !self.schema.is_assignable(concrete, declared) {
            return Err(GraphError::NotAssignable {
                concrete: concrete.to_string(),
                declared: declared.to_string(),
            });
        }
        if def.is_abstract {
            return Err(GraphError::AbstractType(concrete.to_string()));
        }
        Ok(def.name.clone())
    }

    fn read_field(
        &mut self,
        reader: &mut dyn TokenReader,
        field: &PersistedField,
    ) -> GraphResult<Value> {
        let path = reader.path();
        self.path.push(PathSegment::Field(field.name.clone()));
        let value = self
            .read_value(reader, &field.ty)
            .map_err(|e| GraphError::property(&field.name, path, e))?;
        self.path.pop();
        Ok(value)
    }

    fn read_value(&mut self, reader: &mut dyn TokenReader, ty: &FieldType) -> GraphResult<Value> {
        let value = match ty {
            FieldType::Bool => Value::Bool(reader.read_bool()?),
            FieldType::Int => Value::Int(reader.read_i64()?),
            FieldType::UInt => Value::UInt(reader.read_u64()?),
            FieldType::Float => Value::Float(reader.read_f64()?),
            FieldType::String => Value::String(reader.read_string()?),
            FieldType::Guid => Value::Guid(reader.read_guid()?),
            FieldType::Enum(name) => {
                let variant = reader.read_string()?;
                let def = self
                    .schema
                    .enum_def(name.as_str())
                    .ok_or_else(|| GraphError::UnknownType(name.to_string()))?;
                if !def.contains(&variant) {
                    return Err(GraphError::UnknownVariant {
                        enum_name: name.to_string(),
                        variant,
                    });
                }
                Value::Enum(variant)
            }
            FieldType::List(element) => self.read_list(reader, element)?,
            FieldType::Object(name) => {
                let codecs = self.codecs;
                match codecs.get(name.as_str()) {
                    Some(codec) if reader.try_read_null()? => codec.default_value(),
                    Some(codec) => codec.read(reader)?,
                    None if reader.try_read_null()? => Value::Null,
                    None => Value::Object(Box::new(self.read_object(reader, name.as_str())?)),
                }
            }
            FieldType::Entity(declared) => {
                if reader.try_read_null()? {
                    return Ok(Value::Entity(None));
                }
                let guid = reader.read_guid()?;
                match self.lookup(guid, declared) {
                    Lookup::Bound(id) => Value::Entity(Some(id)),
                    Lookup::Missing => {
                        self.defer(ReferenceShape::Scalar(guid), declared);
                        Value::Entity(None)
                    }
                    Lookup::WrongType(found) => {
                        self.wrong_type(guid, &found, declared);
                        Value::Entity(None)
                    }
                }
            }
            FieldType::Asset => self.read_asset(reader)?,
            FieldType::Opaque(_) => {
                reader.skip_value()?;
                Value::Null
            }
        };
        Ok(value)
    }

    fn read_list(&mut self, reader: &mut dyn TokenReader, element: &FieldType) -> GraphResult<Value> {
        if reader.try_read_null()? {
            return Ok(Value::List(Vec::new()));
        }
        reader.ensure_start_array()?;
        if let FieldType::Entity(declared) = element {
            let mut links = Vec::new();
            while !reader.at_end_array()? {
                if reader.try_read_null()? {
                    links.push(Link::Bound(None));
                    continue;
                }
                let guid = reader.read_guid()?;
                links.push(match self.lookup(guid, declared) {
                    Lookup::Bound(id) => Link::Bound(Some(id)),
                    Lookup::Missing => Link::Unbound(guid),
                    Lookup::WrongType(found) => {
                        self.wrong_type(guid, &found, declared);
                        Link::Bound(None)
                    }
                });
            }
            reader.ensure_end_array()?;
            let items = links
                .iter()
                .map(|link| match link {
                    Link::Bound(id) => Value::Entity(*id),
                    Link::Unbound(_) => Value::Entity(None),
                })
                .collect();
            if links.iter().any(|l| matches!(l, Link::Unbound(_))) {
                self.defer(ReferenceShape::Collection(links), declared);
            }
            return Ok(Value::List(items));
        }

        let mut items = Vec::new();
        while !reader.at_end_array()? {
            self.path.push(PathSegment::Index(items.len()));
            items.push(self.read_value(reader, element)?);
            self.path.pop();
        }
        reader.ensure_end_array()?;
        Ok(Value::List(items))
    }

    fn read_asset(&mut self, reader: &mut dyn TokenReader) -> GraphResult<Value> {
        if reader.try_read_null()? {
            return Ok(Value::Asset(None));
        }
        reader.ensure_start_object()?;
        reader.ensure_property_name(names::ID)?;
        let id = reader.read_string()?;
        reader.ensure_property_name(names::LOCAL_ID)?;
        let local_id = reader.read_i64()?;
        reader.ensure_end_object()?;
        let key = AssetKey::new(id, local_id)?;
        match self.resolver.try_get_asset(&key) {
            AssetLookup::Resolved(asset) => Ok(Value::Asset(Some(asset))),
            AssetLookup::Unavailable => Ok(Value::Asset(None)),
            AssetLookup::NotFound => {
                self.diagnose(
                    DiagnosticKind::UnresolvedAsset,
                    self.current_path(),
                    format!("asset {key} not found"),
                );
                Ok(Value::Asset(None))
            }
        }
    }

    /// Find `guid` among the entities read so far, the in-flight one included.
    fn lookup(&self, guid: Guid, declared: &TypeName) -> Lookup {
        let found = match &self.in_flight {
            Some(current) if current.guid == guid => Some((current.id, &current.type_name)),
            _ => self
                .entities
                .by_guid(guid)
                .map(|id| (id, &self.entities[id].type_name)),
        };
        match found {
            None => Lookup::Missing,
            Some((id, type_name)) if self.schema.is_assignable(type_name.as_str(), declared.as_str()) => {
                Lookup::Bound(id)
            }
            Some((_, type_name)) => Lookup::WrongType(type_name.clone()),
        }
    }

    fn defer(&mut self, shape: ReferenceShape, expected: &TypeName) {
        let Some(current) = &self.in_flight else {
            debug_assert!(false, "reference read outside an entity");
            return;
        };
        self.pending.push(UnresolvedReference {
            slot: FieldSlot {
                owner: current.id,
                component: self.component,
                path: self.path.clone(),
            },
            expected: expected.clone(),
            shape,
        });
    }

    fn wrong_type(&mut self, guid: Guid, found: &TypeName, expected: &TypeName) {
        self.diagnose(
            DiagnosticKind::UnresolvedReference,
            self.current_path(),
            format!("entity {guid} is a `{found}`, expected `{expected}`"),
        );
    }

    fn resolve(&mut self, reference: UnresolvedReference) {
        let owner = match self.entities.get(reference.slot.owner) {
            Some(entity) => entity.name.clone(),
            None => return,
        };
        let path = reference.slot.render(&owner);
        let value = match reference.shape {
            ReferenceShape::Scalar(guid) => {
                Value::Entity(self.resolve_guid(guid, &reference.expected, &path))
            }
            ReferenceShape::Collection(links) => Value::List(
                links
                    .into_iter()
                    .map(|link| match link {
                        Link::Bound(id) => Value::Entity(id),
                        Link::Unbound(guid) => {
                            Value::Entity(self.resolve_guid(guid, &reference.expected, &path))
                        }
                    })
                    .collect(),
            ),
        };
        match value_at_mut(&mut self.entities, &reference.slot) {
            Some(slot) => *slot = value,
            None => warn!(%path, "reference slot vanished before resolution"),
        }
    }

    fn resolve_guid(&mut self, guid: Guid, expected: &TypeName, path: &str) -> Option<EntityId> {
        match self.entities.by_guid(guid) {
            Some(id) if self
                .schema
                .is_assignable(self.entities[id].type_name.as_str(), expected.as_str()) =>
            {
                Some(id)
            }
            Some(id) => {
                let found = self.entities[id].type_name.clone();
                self.diagnose(
                    DiagnosticKind::UnresolvedReference,
                    path.to_string(),
                    format!("entity {guid} is a `{found}`, expected `{expected}`"),
                );
                None
            }
            None => {
                self.diagnose(
                    DiagnosticKind::UnresolvedReference,
                    path.to_string(),
                    format!("no entity with guid {guid} in this batch"),
                );
                None
            }
        }
    }

    fn current_path(&self) -> String {
        let mut out = self
            .in_flight
            .as_ref()
            .map_or_else(String::new, |c| c.name.clone());
        if let Some(index) = self.component {
            out.push_str(&format!(".components[{index}]"));
        }
        render_segments(&mut out, &self.path);
        out
    }

    fn component_path(&self, index: usize) -> String {
        let owner = self.in_flight.as_ref().map_or("", |c| c.name.as_str());
        format!("{owner}.components[{index}]")
    }

    fn diagnose(&mut self, kind: DiagnosticKind, path: String, message: String) {
        warn!(%kind, %path, %message, "load diagnostic");
        self.diagnostics.push(Diagnostic {
            kind,
            path,
            message,
        });
    }
}

impl std::fmt::Debug for GraphReader<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphReader")
            .field("entities", &self.entities.len())
            .field("pending", &self.pending.len())
            .field("diagnostics", &self.diagnostics.len())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
