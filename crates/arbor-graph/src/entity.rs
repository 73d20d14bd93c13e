use std::collections::HashMap;
use std::ops::Index;

use arbor_stream::RawValue;
use arbor_types::{EntityId, FieldMap, Guid, ObjectValue, TypeName, Value};

use crate::error::{GraphError, GraphResult};

/// A named, GUID-identified record with a list of components.
///
/// `type_name` is the concrete entity type; `fields` holds the values of
/// its persisted fields (missing entries persist as defaults).
#[derive(Clone, Debug, PartialEq)]
pub struct Entity {
    pub name: String,
    pub guid: Guid,
    pub type_name: TypeName,
    pub enabled: bool,
    pub components: Vec<Component>,
    pub fields: FieldMap,
}

impl Entity {
    /// A new enabled entity with a fresh GUID.
    pub fn new(name: impl Into<String>, type_name: TypeName) -> Self {
        Self {
            name: name.into(),
            guid: Guid::generate(),
            type_name,
            enabled: true,
            components: Vec::new(),
            fields: FieldMap::new(),
        }
    }

    pub fn with_guid(mut self, guid: Guid) -> Self {
        self.guid = guid;
        self
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn with_component(mut self, component: Component) -> Self {
        self.components.push(component);
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(field.into(), value.into());
    }

    /// First known component of the given type.
    pub fn component(&self, type_name: &str) -> Option<&ObjectValue> {
        self.components
            .iter()
            .filter_map(Component::known)
            .find(|c| c.type_name == type_name)
    }
}

/// An entry in an entity's component list.
#[derive(Clone, Debug, PartialEq)]
pub enum Component {
    /// A component of a registered type.
    Known(ObjectValue),
    /// A component that could not be decoded, kept verbatim so the next save
    /// writes it back unchanged.
    Unknown(UnknownComponent),
}

impl Component {
    pub fn known(&self) -> Option<&ObjectValue> {
        match self {
            Self::Known(obj) => Some(obj),
            Self::Unknown(_) => None,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown(_))
    }

    /// Persisted type name, when there is one.
    pub fn type_name(&self) -> Option<&str> {
        match self {
            Self::Known(obj) => Some(obj.type_name.as_str()),
            Self::Unknown(u) => u.type_name.as_deref(),
        }
    }
}

impl From<ObjectValue> for Component {
    fn from(obj: ObjectValue) -> Self {
        Self::Known(obj)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct UnknownComponent {
    /// The `.type` tag found in the stream, if any.
    pub type_name: Option<String>,
    pub raw: RawValue,
}

/// Arena of entities addressed by [`EntityId`], indexed by GUID.
#[derive(Clone, Debug, Default)]
pub struct Entities {
    items: Vec<Entity>,
    by_guid: HashMap<Guid, EntityId>,
}

impl Entities {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entity. GUIDs are unique within an arena.
    pub fn insert(&mut self, entity: Entity) -> GraphResult<EntityId> {
        if self.by_guid.contains_key(&entity.guid) {
            return Err(GraphError::DuplicateGuid(entity.guid));
        }
        let id = EntityId::new(self.items.len());
        self.by_guid.insert(entity.guid, id);
        self.items.push(entity);
        Ok(id)
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.items.get(id.index())
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.items.get_mut(id.index())
    }

    pub fn by_guid(&self, guid: Guid) -> Option<EntityId> {
        self.by_guid.get(&guid).copied()
    }

    pub fn contains_guid(&self, guid: Guid) -> bool {
        self.by_guid.contains_key(&guid)
    }

    /// Handle the next inserted entity will receive.
    pub fn next_id(&self) -> EntityId {
        EntityId::new(self.items.len())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &Entity)> {
        self.items
            .iter()
            .enumerate()
            .map(|(i, e)| (EntityId::new(i), e))
    }
}

impl Index<EntityId> for Entities {
    type Output = Entity;

    fn index(&self, id: EntityId) -> &Entity {
        &self.items[id.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enemy(name: &str) -> Entity {
        Entity::new(name, TypeName::from_static("Enemy"))
    }

    #[test]
    fn insert_assigns_sequential_handles() {
        let mut arena = Entities::new();
        let a = arena.insert(enemy("a")).unwrap();
        assert_eq!(arena.next_id().index(), 1);
        let b = arena.insert(enemy("b")).unwrap();
        assert_eq!(a.index(), 0);
        assert_eq!(b.index(), 1);
        assert_eq!(arena[b].name, "b");
        assert_eq!(arena.by_guid(arena[a].guid), Some(a));
    }

    #[test]
    fn duplicate_guid_rejected() {
        let mut arena = Entities::new();
        let guid = Guid::from_u128(5);
        arena.insert(enemy("a").with_guid(guid)).unwrap();
        let err = arena.insert(enemy("b").with_guid(guid)).unwrap_err();
        assert!(matches!(err, GraphError::DuplicateGuid(g) if g == guid));
        assert_eq!(arena.len(), 1);
    }

    #[test]
    fn component_lookup() {
        let e = enemy("a")
            .with_component(ObjectValue::empty(TypeName::from_static("Mover")).into())
            .with_field("hp", 3i64);
        assert!(e.component("Mover").is_some());
        assert!(e.component("Other").is_none());
        assert_eq!(e.get("hp"), Some(&Value::Int(3)));
        assert_eq!(e.components[0].type_name(), Some("Mover"));
    }
}
