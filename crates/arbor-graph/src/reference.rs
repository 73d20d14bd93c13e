//! Deferred entity references and the slots they patch.

use std::fmt::Write as _;

use arbor_types::{EntityId, Guid, TypeName, Value};

use crate::entity::{Component, Entities, Entity};

/// One step from a field map down to a nested value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PathSegment {
    Field(String),
    Index(usize),
}

/// Address of a value inside an entity: the owner, optionally one of its
/// components, then a path through fields and list indexes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldSlot {
    pub owner: EntityId,
    pub component: Option<usize>,
    pub path: Vec<PathSegment>,
}

impl FieldSlot {
    /// Render relative to the owning entity's name, e.g. `A.components[0].target`.
    pub fn render(&self, owner_name: &str) -> String {
        let mut out = owner_name.to_string();
        if let Some(index) = self.component {
            let _ = write!(out, ".components[{index}]");
        }
        render_segments(&mut out, &self.path);
        out
    }
}

pub(crate) fn render_segments(out: &mut String, path: &[PathSegment]) {
    for segment in path {
        let _ = match segment {
            PathSegment::Field(name) => write!(out, ".{name}"),
            PathSegment::Index(i) => write!(out, "[{i}]"),
        };
    }
}

/// One element of a collection reference.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Link {
    /// Already known: bound at read time, or a null element.
    Bound(Option<EntityId>),
    /// Waiting for the resolution pass.
    Unbound(Guid),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReferenceShape {
    Scalar(Guid),
    Collection(Vec<Link>),
}

/// A reference that could not be bound while reading.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnresolvedReference {
    pub slot: FieldSlot,
    /// Declared entity type of the field (or list element).
    pub expected: TypeName,
    pub shape: ReferenceShape,
}

/// Mutable access to the value a slot addresses.
pub fn value_at_mut<'e>(entities: &'e mut Entities, slot: &FieldSlot) -> Option<&'e mut Value> {
    let entity: &mut Entity = entities.get_mut(slot.owner)?;
    let fields = match slot.component {
        None => &mut entity.fields,
        Some(index) => match entity.components.get_mut(index)? {
            Component::Known(obj) => &mut obj.fields,
            Component::Unknown(_) => return None,
        },
    };
    let (first, rest) = slot.path.split_first()?;
    let PathSegment::Field(name) = first else {
        return None;
    };
    let mut value = fields.get_mut(name)?;
    for segment in rest {
        value = match (segment, value) {
            (PathSegment::Field(name), Value::Object(obj)) => obj.fields.get_mut(name)?,
            (PathSegment::Index(i), Value::List(items)) => items.get_mut(*i)?,
            _ => return None,
        };
    }
    Some(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbor_types::{FieldMap, ObjectValue};

    fn arena() -> (Entities, EntityId) {
        let mut entities = Entities::new();
        let inner = ObjectValue::empty(TypeName::from_static("Stats"))
            .with("targets", Value::List(vec![Value::Entity(None), Value::Entity(None)]));
        let entity = Entity::new("A", TypeName::from_static("Enemy"))
            .with_field("stats", Value::Object(Box::new(inner)))
            .with_component(Component::Known(ObjectValue::new(
                TypeName::from_static("Mover"),
                FieldMap::from([("follow".to_string(), Value::Entity(None))]),
            )));
        let id = entities.insert(entity).unwrap();
        (entities, id)
    }

    #[test]
    fn nested_slot_patching() {
        let (mut entities, id) = arena();
        let slot = FieldSlot {
            owner: id,
            component: None,
            path: vec![
                PathSegment::Field("stats".into()),
                PathSegment::Field("targets".into()),
                PathSegment::Index(1),
            ],
        };
        *value_at_mut(&mut entities, &slot).unwrap() = Value::Entity(Some(id));
        let stats = entities[id].get("stats").unwrap().as_object().unwrap();
        assert_eq!(
            stats.get("targets").unwrap().as_list().unwrap()[1],
            Value::Entity(Some(id))
        );
        assert_eq!(slot.render("A"), "A.stats.targets[1]");
    }

    #[test]
    fn component_slot() {
        let (mut entities, id) = arena();
        let slot = FieldSlot {
            owner: id,
            component: Some(0),
            path: vec![PathSegment::Field("follow".into())],
        };
        assert!(value_at_mut(&mut entities, &slot).is_some());
        assert_eq!(slot.render("A"), "A.components[0].follow");
    }

    #[test]
    fn invalid_slots_yield_none() {
        let (mut entities, id) = arena();
        let wrong_shape = FieldSlot {
            owner: id,
            component: None,
            path: vec![
                PathSegment::Field("stats".into()),
                PathSegment::Index(0),
            ],
        };
        assert!(value_at_mut(&mut entities, &wrong_shape).is_none());
        let missing = FieldSlot {
            owner: id,
            component: Some(9),
            path: vec![PathSegment::Field("x".into())],
        };
        assert!(value_at_mut(&mut entities, &missing).is_none());
    }
}
