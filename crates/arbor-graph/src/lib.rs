//! Object graph serialization for Arbor.
//!
//! Entities are GUID-identified records with an ordered component list and
//! schema-described fields. This crate writes them to any
//! [`TokenWriter`](arbor_stream::TokenWriter) and reads them back:
//!
//! - [`GraphWriter`]: writes entities; entity-valued fields become bare GUIDs
//! - [`GraphReader`]: reads a batch of entities, binding references to
//!   entities already read and deferring the rest
//! - [`GraphReader::finish`]: the single resolution pass; its
//!   [`LoadedBatch`] is the only way to observe the loaded entities
//!
//! Components of unregistered types survive a load/save cycle untouched as
//! [`Component::Unknown`]. Reference and asset resolution failures never
//! fail a load; they become [`Diagnostic`]s.

pub mod diagnostic;
pub mod entity;
pub mod error;
pub mod reader;
pub mod reference;
pub mod resolver;
pub mod writer;

pub use diagnostic::{Diagnostic, DiagnosticKind};
pub use entity::{Component, Entities, Entity, UnknownComponent};
pub use error::{GraphError, GraphResult};
pub use reader::{GraphReader, LoadedBatch, ReadOptions};
pub use reference::{FieldSlot, Link, PathSegment, ReferenceShape, UnresolvedReference};
pub use resolver::{AssetLookup, AssetResolver, InMemoryAssetResolver, NullAssetResolver};
pub use writer::GraphWriter;

#[cfg(test)]
mod tests {
    use super::*;
    use arbor_schema::{
        CodecRegistry, EnumDef, FieldDef, FieldIntrospector, FieldType, Schema, TypeDef,
        ENTITY_ROOT,
    };
    use arbor_stream::{BinaryReader, BinaryWriter, StreamError, TextReader, TextWriter, TokenReader};
    use arbor_types::{
        AssetKey, AssetRef, DetachedAsset, EntityId, FieldMap, Guid, Scalar, TypeName, Value, Vec3,
    };

    struct Fixture {
        schema: Schema,
        codecs: CodecRegistry,
    }

    impl Fixture {
        fn new() -> Self {
            let mut schema = Schema::new();
            schema
                .register_enum(EnumDef::new("Mood", ["Calm", "Angry"]).unwrap())
                .unwrap();
            schema
                .register(
                    TypeDef::object("Stats")
                        .unwrap()
                        .field(FieldDef::new("hp", FieldType::Int))
                        .field(FieldDef::new("tags", FieldType::list(FieldType::String))),
                )
                .unwrap();
            schema
                .register(
                    TypeDef::object("Buff")
                        .unwrap()
                        .field(FieldDef::new("power", FieldType::Float)),
                )
                .unwrap();
            schema
                .register(
                    TypeDef::object("FireBuff")
                        .unwrap()
                        .extends("Buff")
                        .unwrap()
                        .field(FieldDef::new("heat", FieldType::Int)),
                )
                .unwrap();
            schema
                .register(
                    TypeDef::component("Mover")
                        .unwrap()
                        .field(FieldDef::new("speed", FieldType::Float))
                        .field(FieldDef::new("follow", FieldType::entity("Actor").unwrap())),
                )
                .unwrap();
            schema
                .register(
                    TypeDef::entity("Actor")
                        .unwrap()
                        .field(FieldDef::new(
                            "mood",
                            FieldType::Enum(TypeName::from_static("Mood")),
                        ))
                        .field(FieldDef::new("position", FieldType::object("Vector3").unwrap()))
                        .field(FieldDef::new("stats", FieldType::object("Stats").unwrap()))
                        .field(FieldDef::new("buff", FieldType::object("Buff").unwrap()))
                        .field(FieldDef::new("friend", FieldType::entity("Actor").unwrap()))
                        .field(FieldDef::new(
                            "allies",
                            FieldType::list(FieldType::entity("Actor").unwrap()),
                        ))
                        .field(FieldDef::new("icon", FieldType::Asset)),
                )
                .unwrap();
            schema
                .register(
                    TypeDef::entity("Prop")
                        .unwrap()
                        .field(FieldDef::new("weight", FieldType::Float)),
                )
                .unwrap();
            Self {
                schema,
                codecs: CodecRegistry::with_builtins(),
            }
        }

        fn instance(&self, type_name: &str) -> FieldMap {
            FieldIntrospector::new(&self.schema, &self.codecs)
                .instantiate(type_name)
                .unwrap()
                .fields
        }

        fn actor(&self, name: &str, guid: u128) -> Entity {
            let mut entity =
                Entity::new(name, TypeName::from_static("Actor")).with_guid(Guid::from_u128(guid));
            entity.fields = self.instance("Actor");
            entity
        }

        fn mover(&self, speed: f64, follow: Option<EntityId>) -> Component {
            let mut fields = self.instance("Mover");
            fields.insert("speed".into(), Value::Float(speed));
            fields.insert("follow".into(), Value::Entity(follow));
            Component::Known(arbor_types::ObjectValue::new(
                TypeName::from_static("Mover"),
                fields,
            ))
        }

        fn save(
            &self,
            backend: Backend,
            entities: &Entities,
            resolver: &dyn AssetResolver,
        ) -> GraphResult<Vec<u8>> {
            let mut graph = GraphWriter::new(&self.schema, &self.codecs, resolver, entities);
            let ids: Vec<EntityId> = entities.iter().map(|(id, _)| id).collect();
            Ok(match backend {
                Backend::Binary => {
                    let mut out = BinaryWriter::new();
                    graph.write_entity_array(&mut out, ids, ENTITY_ROOT)?;
                    out.finish()?
                }
                Backend::Text => {
                    let mut out = TextWriter::new();
                    graph.write_entity_array(&mut out, ids, ENTITY_ROOT)?;
                    out.finish()?.into_bytes()
                }
            })
        }

        fn load(
            &self,
            backend: Backend,
            bytes: Vec<u8>,
            resolver: &dyn AssetResolver,
            options: ReadOptions,
        ) -> GraphResult<LoadedBatch> {
            let mut graph = GraphReader::new(&self.schema, &self.codecs, resolver, options);
            match backend {
                Backend::Binary => {
                    let mut input = BinaryReader::new(bytes);
                    graph.read_entity_array(&mut input, ENTITY_ROOT)?;
                    input.ensure_end_of_stream()?;
                }
                Backend::Text => {
                    let mut input = TextReader::from_slice(&bytes)?;
                    graph.read_entity_array(&mut input, ENTITY_ROOT)?;
                    input.ensure_end_of_stream()?;
                }
            }
            Ok(graph.finish())
        }

        fn load_json(&self, json: &str, options: ReadOptions) -> GraphResult<LoadedBatch> {
            self.load(Backend::Text, json.as_bytes().to_vec(), &NullAssetResolver, options)
        }
    }

    #[derive(Clone, Copy, Debug)]
    enum Backend {
        Binary,
        Text,
    }

    fn fields(pairs: &[(&str, Value)]) -> FieldMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn quoted(guid: u128) -> String {
        format!("\"{}\"", Guid::from_u128(guid))
    }

    #[test]
    fn round_trip_on_both_backends() {
        let fx = Fixture::new();
        let mut entities = Entities::new();
        let a_id = EntityId::new(0);
        let b_id = EntityId::new(1);

        let mut a = fx.actor("A", 1).with_component(fx.mover(2.5, Some(b_id)));
        a.set("mood", Value::Enum("Angry".into()));
        a.set(
            "position",
            Value::Scalar(Scalar::Vec3(Vec3 {
                x: 1.0,
                y: 2.0,
                z: 3.0,
            })),
        );
        a.set(
            "stats",
            Value::object(
                TypeName::from_static("Stats"),
                fields(&[("hp", Value::Int(-7)), ("tags", Value::List(vec!["boss".into()]))]),
            ),
        );
        a.set(
            "buff",
            Value::object(
                TypeName::from_static("FireBuff"),
                fields(&[("power", Value::Float(1.5)), ("heat", Value::Int(9))]),
            ),
        );
        a.set("friend", Value::Entity(Some(b_id)));
        a.set(
            "allies",
            Value::List(vec![Value::Entity(Some(b_id)), Value::Entity(Some(a_id))]),
        );
        entities.insert(a).unwrap();
        let mut b = fx.actor("B", 2).disabled();
        b.set("friend", Value::Entity(Some(a_id)));
        entities.insert(b).unwrap();

        for backend in [Backend::Binary, Backend::Text] {
            let bytes = fx.save(backend, &entities, &NullAssetResolver).unwrap();
            let batch = fx
                .load(backend, bytes, &NullAssetResolver, ReadOptions::default())
                .unwrap();
            assert!(batch.diagnostics.is_empty(), "{backend:?}: {:?}", batch.diagnostics);
            assert_eq!(batch.entities.len(), 2);
            for (id, original) in entities.iter() {
                assert_eq!(&batch.entities[id], original, "{backend:?}");
            }
        }
    }

    #[test]
    fn type_tags_only_where_types_differ() {
        let fx = Fixture::new();
        let mut entities = Entities::new();
        let mut a = fx.actor("A", 1);
        a.set(
            "stats",
            Value::object(TypeName::from_static("Stats"), fx.instance("Stats")),
        );
        a.set(
            "buff",
            Value::object(TypeName::from_static("FireBuff"), fx.instance("FireBuff")),
        );
        let a = entities.insert(a).unwrap();

        let mut out = TextWriter::new();
        GraphWriter::new(&fx.schema, &fx.codecs, &NullAssetResolver, &entities)
            .write_entity_id(&mut out, a, "Actor")
            .unwrap();
        let json = out.into_json().unwrap();
        assert!(json.get(".type").is_none());
        assert!(json.get(".enabled").is_none());
        assert!(json["stats"].get(".type").is_none());
        assert_eq!(json["buff"][".type"], "FireBuff");

        let mut out = TextWriter::new();
        GraphWriter::new(&fx.schema, &fx.codecs, &NullAssetResolver, &entities)
            .write_entity_id(&mut out, a, ENTITY_ROOT)
            .unwrap();
        assert_eq!(out.into_json().unwrap()[".type"], "Actor");
    }

    #[test]
    fn forward_and_self_references() {
        let fx = Fixture::new();
        let json = format!(
            r#"[
                {{".name": "A", ".type": "Actor", ".id": {g1}, ".components": [],
                  "friend": {g2}, "allies": [{g1}, null, {g2}]}},
                {{".name": "B", ".type": "Actor", ".id": {g2}, ".components": [],
                  "friend": {g2}}}
            ]"#,
            g1 = quoted(1),
            g2 = quoted(2),
        );
        let batch = fx.load_json(&json, ReadOptions::default()).unwrap();
        assert!(batch.diagnostics.is_empty());
        let a = batch.entities.by_guid(Guid::from_u128(1)).unwrap();
        let b = batch.entities.by_guid(Guid::from_u128(2)).unwrap();
        assert_eq!(batch.entities[a].get("friend"), Some(&Value::Entity(Some(b))));
        assert_eq!(
            batch.entities[a].get("allies"),
            Some(&Value::List(vec![
                Value::Entity(Some(a)),
                Value::Entity(None),
                Value::Entity(Some(b)),
            ]))
        );
        assert_eq!(batch.entities[b].get("friend"), Some(&Value::Entity(Some(b))));
    }

    #[test]
    fn unresolved_reference_degrades_to_unset() {
        let fx = Fixture::new();
        let json = format!(
            r#"[{{".name": "A", ".type": "Actor", ".id": {}, ".components": [], "friend": {}}}]"#,
            quoted(1),
            quoted(2),
        );
        let batch = fx.load_json(&json, ReadOptions::default()).unwrap();
        assert_eq!(batch.diagnostics.len(), 1);
        let diagnostic = &batch.diagnostics[0];
        assert_eq!(diagnostic.kind, DiagnosticKind::UnresolvedReference);
        assert_eq!(diagnostic.path, "A.friend");
        assert_eq!(batch.entities[EntityId::new(0)].get("friend"), Some(&Value::Entity(None)));
    }

    #[test]
    fn reference_to_wrong_type_is_left_unset() {
        let fx = Fixture::new();
        let actor = format!(
            r#"{{".name": "A", ".type": "Actor", ".id": {}, ".components": [], "friend": {}}}"#,
            quoted(1),
            quoted(2),
        );
        let prop = format!(
            r#"{{".name": "P", ".type": "Prop", ".id": {}, ".components": []}}"#,
            quoted(2)
        );
        for json in [format!("[{actor}, {prop}]"), format!("[{prop}, {actor}]")] {
            let batch = fx.load_json(&json, ReadOptions::default()).unwrap();
            assert_eq!(batch.diagnostics.len(), 1, "{json}");
            assert!(batch.diagnostics[0].message.contains("Prop"));
            let a = batch.entities.by_guid(Guid::from_u128(1)).unwrap();
            assert_eq!(batch.entities[a].get("friend"), Some(&Value::Entity(None)));
        }
    }

    #[test]
    fn unknown_properties_are_skipped() {
        let fx = Fixture::new();
        let json = format!(
            r#"[{{".name": "A", ".type": "Actor", ".id": {}, ".components": [],
                 "legacy": {{"x": [1, 2, {{"y": null}}]}}, "mood": "Angry"}}]"#,
            quoted(1),
        );
        let batch = fx.load_json(&json, ReadOptions::default()).unwrap();
        let a = &batch.entities[EntityId::new(0)];
        assert!(a.get("legacy").is_none());
        assert_eq!(a.get("mood"), Some(&Value::Enum("Angry".into())));
        assert_eq!(a.get("stats"), Some(&Value::Null));
    }

    #[test]
    fn unknown_component_round_trips_verbatim() {
        let fx = Fixture::new();
        let json = format!(
            r#"[{{".name": "A", ".type": "Actor", ".id": {}, ".components": [
                {{".type": "Ghost", "haunt": [1, "two", true]}},
                {{".type": "Mover", "speed": 4.0}}
            ]}}]"#,
            quoted(1),
        );
        let batch = fx.load_json(&json, ReadOptions::default()).unwrap();
        assert_eq!(batch.diagnostics.len(), 1);
        assert_eq!(batch.diagnostics[0].kind, DiagnosticKind::UnknownComponentType);
        assert_eq!(batch.diagnostics[0].path, "A.components[0]");

        let a = &batch.entities[EntityId::new(0)];
        assert!(a.components[0].is_unknown());
        assert_eq!(a.components[0].type_name(), Some("Ghost"));
        assert_eq!(
            a.component("Mover").and_then(|m| m.get("speed")),
            Some(&Value::Float(4.0))
        );

        let mut out = TextWriter::new();
        GraphWriter::new(&fx.schema, &fx.codecs, &NullAssetResolver, &batch.entities)
            .write_entity(&mut out, a, ENTITY_ROOT)
            .unwrap();
        let written = out.into_json().unwrap();
        let original: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(written[".components"][0], original[0][".components"][0]);
    }

    #[test]
    fn broken_component_fails_entity_in_strict_mode() {
        let fx = Fixture::new();
        let json = format!(
            r#"[{{".name": "A", ".type": "Actor", ".id": {}, ".components": [
                {{".type": "Mover", "follow": {}, "speed": "fast"}}
            ]}}]"#,
            quoted(1),
            quoted(9),
        );
        let err = fx.load_json(&json, ReadOptions::default()).unwrap_err();
        let crumbs = err.breadcrumbs();
        assert!(crumbs[0].starts_with("entity `A` of type `Actor`"));
        assert_eq!(crumbs[1], "component #0");
        assert!(crumbs[2].starts_with("property `speed`"));
        assert!(matches!(
            err.root_cause(),
            GraphError::Stream(StreamError::UnexpectedToken { .. })
        ));

        let salvage = ReadOptions {
            salvage_components: true,
        };
        let batch = fx.load_json(&json, salvage).unwrap();
        // The component's pending reference is rolled back with it.
        assert_eq!(batch.diagnostics.len(), 1);
        assert_eq!(batch.diagnostics[0].kind, DiagnosticKind::SalvagedComponent);
        let a = &batch.entities[EntityId::new(0)];
        assert!(a.components[0].is_unknown());
        assert_eq!(a.components[0].type_name(), Some("Mover"));
    }

    #[test]
    fn duplicate_guid_is_fatal() {
        let fx = Fixture::new();
        let json = format!(
            r#"[{{".name": "A", ".type": "Prop", ".id": {g}, ".components": []}},
                {{".name": "B", ".type": "Prop", ".id": {g}, ".components": []}}]"#,
            g = quoted(3),
        );
        let err = fx.load_json(&json, ReadOptions::default()).unwrap_err();
        assert!(err.breadcrumbs()[0].starts_with("entity `B` of type `Prop`"));
        assert!(matches!(err.root_cause(), GraphError::DuplicateGuid(g) if *g == Guid::from_u128(3)));
    }

    #[test]
    fn abstract_or_foreign_entity_types_rejected() {
        let fx = Fixture::new();
        let untagged = format!(
            r#"[{{".name": "A", ".id": {}, ".components": []}}]"#,
            quoted(1)
        );
        let err = fx.load_json(&untagged, ReadOptions::default()).unwrap_err();
        assert!(matches!(err.root_cause(), GraphError::AbstractType(t) if t == ENTITY_ROOT));

        let component_as_entity = format!(
            r#"[{{".name": "A", ".type": "Mover", ".id": {}, ".components": []}}]"#,
            quoted(1)
        );
        let err = fx
            .load_json(&component_as_entity, ReadOptions::default())
            .unwrap_err();
        assert!(matches!(err.root_cause(), GraphError::NotAssignable { .. }));
    }

    #[test]
    fn assets_go_through_the_resolver() {
        let fx = Fixture::new();
        let key = AssetKey::new("textures/orc", 4).unwrap();
        let mut entities = Entities::new();
        let mut a = fx.actor("A", 1);
        a.set("icon", Value::Asset(Some(AssetRef::new(DetachedAsset(key.clone())))));
        entities.insert(a).unwrap();

        let resolver = InMemoryAssetResolver::new();
        let bytes = fx.save(Backend::Binary, &entities, &resolver).unwrap();
        assert_eq!(resolver.referenced_assets(), vec![key.clone()]);

        let batch = fx
            .load(Backend::Binary, bytes.clone(), &resolver, ReadOptions::default())
            .unwrap();
        let icon = batch.entities[EntityId::new(0)].get("icon").unwrap();
        assert!(matches!(icon, Value::Asset(Some(asset)) if asset.key() == key));

        let empty = InMemoryAssetResolver::new();
        let batch = fx
            .load(Backend::Binary, bytes.clone(), &empty, ReadOptions::default())
            .unwrap();
        assert_eq!(batch.diagnostics.len(), 1);
        assert_eq!(batch.diagnostics[0].kind, DiagnosticKind::UnresolvedAsset);
        assert_eq!(batch.diagnostics[0].path, "A.icon");

        let batch = fx
            .load(Backend::Binary, bytes, &NullAssetResolver, ReadOptions::default())
            .unwrap();
        assert!(batch.diagnostics.is_empty());
        assert_eq!(
            batch.entities[EntityId::new(0)].get("icon"),
            Some(&Value::Asset(None))
        );
    }

    #[test]
    fn write_errors_name_the_property() {
        let fx = Fixture::new();
        let mut entities = Entities::new();
        let mut a = fx.actor("A", 1);
        a.set("mood", Value::Int(3));
        entities.insert(a).unwrap();
        let err = fx
            .save(Backend::Text, &entities, &NullAssetResolver)
            .unwrap_err();
        assert!(err.breadcrumbs()[1].starts_with("property `mood`"));
        assert!(matches!(err.root_cause(), GraphError::ValueMismatch { .. }));

        let mut entities = Entities::new();
        let mut a = fx.actor("A", 1);
        a.set("mood", Value::Enum("Sleepy".into()));
        a.set("friend", Value::Entity(Some(EntityId::new(7))));
        entities.insert(a).unwrap();
        let err = fx
            .save(Backend::Binary, &entities, &NullAssetResolver)
            .unwrap_err();
        assert!(matches!(err.root_cause(), GraphError::UnknownVariant { .. }));
    }

    #[test]
    fn dangling_handles_are_write_errors() {
        let fx = Fixture::new();
        let mut entities = Entities::new();
        let mut a = fx.actor("A", 1);
        a.set("friend", Value::Entity(Some(EntityId::new(7))));
        entities.insert(a).unwrap();
        let err = fx
            .save(Backend::Binary, &entities, &NullAssetResolver)
            .unwrap_err();
        assert!(matches!(err.root_cause(), GraphError::DanglingHandle(id) if id.index() == 7));
    }

    #[test]
    fn degenerate_components_are_skipped_on_write() {
        let fx = Fixture::new();
        let mut entities = Entities::new();
        let a = fx
            .actor("A", 1)
            .with_component(Component::Known(arbor_types::ObjectValue::empty(
                TypeName::from_static("Stats"),
            )))
            .with_component(fx.mover(1.0, None));
        let a = entities.insert(a).unwrap();
        let mut out = TextWriter::new();
        GraphWriter::new(&fx.schema, &fx.codecs, &NullAssetResolver, &entities)
            .write_entity_id(&mut out, a, "Actor")
            .unwrap();
        let json = out.into_json().unwrap();
        let components = json[".components"].as_array().unwrap();
        assert_eq!(components.len(), 1);
        assert_eq!(components[0][".type"], "Mover");
    }

    #[test]
    fn failed_entity_leaves_nothing_behind() {
        let fx = Fixture::new();
        let mut graph =
            GraphReader::new(&fx.schema, &fx.codecs, &NullAssetResolver, ReadOptions::default());
        let broken = format!(
            r#"{{".name": "A", ".type": "Actor", ".id": {}, ".components": [],
                 "friend": {}, "mood": "Sad"}}"#,
            quoted(1),
            quoted(9),
        );
        let mut input = TextReader::parse(&broken).unwrap();
        assert!(graph.read_entity(&mut input, ENTITY_ROOT).is_err());
        assert_eq!(graph.pending_references(), 0);

        // B takes the id A would have had.
        let next = format!(
            r#"{{".name": "B", ".type": "Actor", ".id": {g}, ".components": [], "friend": {g}}}"#,
            g = quoted(2),
        );
        let mut input = TextReader::parse(&next).unwrap();
        let b = graph.read_entity(&mut input, ENTITY_ROOT).unwrap();
        let batch = graph.finish();
        assert!(batch.diagnostics.is_empty(), "{:?}", batch.diagnostics);
        assert_eq!(batch.entities[b].get("friend"), Some(&Value::Entity(Some(b))));
    }

    #[test]
    fn salvaged_component_drops_its_diagnostics() {
        let fx = Fixture::new();
        // `follow` names a Prop, which is reported before `speed` fails.
        let json = format!(
            r#"[{{".name": "P", ".type": "Prop", ".id": {p}, ".components": []}},
                {{".name": "A", ".type": "Actor", ".id": {a}, ".components": [
                    {{".type": "Mover", "follow": {p}, "speed": "fast"}}
                ]}}]"#,
            p = quoted(2),
            a = quoted(1),
        );
        let salvage = ReadOptions {
            salvage_components: true,
        };
        let batch = fx.load_json(&json, salvage).unwrap();
        assert_eq!(batch.diagnostics.len(), 1, "{:?}", batch.diagnostics);
        assert_eq!(batch.diagnostics[0].kind, DiagnosticKind::SalvagedComponent);
    }

    #[test]
    fn unset_codec_field_is_written_as_default() {
        let fx = Fixture::new();
        let mut entities = Entities::new();
        let mut a = fx.actor("A", 1);
        a.set("position", Value::Null);
        entities.insert(a).unwrap();
        for backend in [Backend::Binary, Backend::Text] {
            let bytes = fx.save(backend, &entities, &NullAssetResolver).unwrap();
            let batch = fx
                .load(backend, bytes, &NullAssetResolver, ReadOptions::default())
                .unwrap();
            let expected = fx.instance("Actor").remove("position");
            assert_eq!(batch.entities[EntityId::new(0)].get("position"), expected.as_ref());
        }
        let text = fx.save(Backend::Text, &entities, &NullAssetResolver).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&text).unwrap();
        assert!(!json[0]["position"].is_null());
    }
}
