use std::collections::BTreeMap;

use crate::asset::AssetRef;
use crate::guid::Guid;
use crate::handle::EntityId;
use crate::name::TypeName;
use crate::scalar::Scalar;

/// Field values of one object instance, keyed by field name.
pub type FieldMap = BTreeMap<String, Value>;

/// Dynamic value of a persisted field.
///
/// The variant set mirrors the declared field types of the schema. Entity
/// references hold an arena handle, never an embedded copy: the stream form
/// of an entity reference is the target's GUID.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    String(String),
    Guid(Guid),
    /// Enum variant, persisted by name.
    Enum(String),
    List(Vec<Value>),
    /// Embedded object, owned by the field that holds it.
    Object(Box<ObjectValue>),
    /// Identity reference to an entity; `None` when unset or unresolved.
    Entity(Option<EntityId>),
    /// Reference to an asset outside the database.
    Asset(Option<AssetRef>),
    /// Codec-backed math or curve value.
    Scalar(Scalar),
}

impl Value {
    /// Short description used in error messages.
    pub fn describe(&self) -> String {
        match self {
            Self::Null => "null".into(),
            Self::Bool(b) => format!("bool {b}"),
            Self::Int(i) => format!("int {i}"),
            Self::UInt(u) => format!("uint {u}"),
            Self::Float(f) => format!("float {f}"),
            Self::String(s) if s.chars().count() > 32 => {
                format!("string {:?}...", s.chars().take(32).collect::<String>())
            }
            Self::String(s) => format!("string {s:?}"),
            Self::Guid(g) => format!("guid {g}"),
            Self::Enum(v) => format!("enum {v}"),
            Self::List(items) => format!("list of {}", items.len()),
            Self::Object(obj) => format!("object {}", obj.type_name),
            Self::Entity(Some(id)) => format!("entity {id}"),
            Self::Entity(None) => "entity (unset)".into(),
            Self::Asset(Some(asset)) => format!("asset {}", asset.key()),
            Self::Asset(None) => "asset (unset)".into(),
            Self::Scalar(s) => s.kind().into(),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn object(type_name: TypeName, fields: FieldMap) -> Self {
        Self::Object(Box::new(ObjectValue::new(type_name, fields)))
    }

    pub fn as_object(&self) -> Option<&ObjectValue> {
        match self {
            Self::Object(obj) => Some(obj),
            _ => None,
        }
    }

    pub fn as_entity(&self) -> Option<EntityId> {
        match self {
            Self::Entity(id) => *id,
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Self::UInt(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<Guid> for Value {
    fn from(v: Guid) -> Self {
        Self::Guid(v)
    }
}

impl From<Scalar> for Value {
    fn from(v: Scalar) -> Self {
        Self::Scalar(v)
    }
}

/// An embedded object or component: its concrete type plus field values.
#[derive(Clone, Debug, PartialEq)]
pub struct ObjectValue {
    pub type_name: TypeName,
    pub fields: FieldMap,
}

impl ObjectValue {
    pub fn new(type_name: TypeName, fields: FieldMap) -> Self {
        Self { type_name, fields }
    }

    /// Object with no field values set; missing fields persist as defaults.
    pub fn empty(type_name: TypeName) -> Self {
        Self::new(type_name, FieldMap::new())
    }

    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }
}
