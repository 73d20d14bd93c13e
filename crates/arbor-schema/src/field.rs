use std::fmt;
use std::str::FromStr;

use arbor_types::TypeName;
use serde::{Deserialize, Serialize};

use crate::error::SchemaError;

/// Declared type of a field.
///
/// The compact text form (`int`, `list<entity<Enemy>>`, `object<Vector3>`)
/// is what schema files use; it round-trips through `Display`/`FromStr`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum FieldType {
    Bool,
    Int,
    UInt,
    Float,
    String,
    Guid,
    Enum(TypeName),
    List(Box<FieldType>),
    /// A registered object type or a codec-backed value type.
    Object(TypeName),
    /// Identity reference to an entity of this type (or a subtype).
    Entity(TypeName),
    /// Reference to an external asset.
    Asset,
    /// Host type with no persisted layout.
    Opaque(TypeName),
}

impl FieldType {
    pub fn list(element: FieldType) -> Self {
        Self::List(Box::new(element))
    }

    pub fn object(name: &str) -> Result<Self, SchemaError> {
        Ok(Self::Object(TypeName::new(name)?))
    }

    pub fn entity(name: &str) -> Result<Self, SchemaError> {
        Ok(Self::Entity(TypeName::new(name)?))
    }

    /// Element type of a list.
    pub fn element(&self) -> Option<&FieldType> {
        match self {
            Self::List(inner) => Some(inner),
            _ => None,
        }
    }

    /// Returns `true` for entity references and lists of them.
    pub fn is_reference(&self) -> bool {
        match self {
            Self::Entity(_) => true,
            Self::List(inner) => inner.is_reference(),
            _ => false,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool => f.write_str("bool"),
            Self::Int => f.write_str("int"),
            Self::UInt => f.write_str("uint"),
            Self::Float => f.write_str("float"),
            Self::String => f.write_str("string"),
            Self::Guid => f.write_str("guid"),
            Self::Asset => f.write_str("asset"),
            Self::Enum(name) => write!(f, "enum<{name}>"),
            Self::List(inner) => write!(f, "list<{inner}>"),
            Self::Object(name) => write!(f, "object<{name}>"),
            Self::Entity(name) => write!(f, "entity<{name}>"),
            Self::Opaque(name) => write!(f, "opaque<{name}>"),
        }
    }
}

impl FromStr for FieldType {
    type Err = SchemaError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| SchemaError::InvalidFieldType {
            input: input.to_string(),
            reason: reason.to_string(),
        };
        let s = input.trim();
        let Some((head, rest)) = s.split_once('<') else {
            return match s {
                "bool" => Ok(Self::Bool),
                "int" => Ok(Self::Int),
                "uint" => Ok(Self::UInt),
                "float" => Ok(Self::Float),
                "string" => Ok(Self::String),
                "guid" => Ok(Self::Guid),
                "asset" => Ok(Self::Asset),
                "enum" | "list" | "object" | "entity" | "opaque" => {
                    Err(invalid("missing type argument"))
                }
                _ => Err(invalid("unknown field type")),
            };
        };
        let arg = rest
            .strip_suffix('>')
            .ok_or_else(|| invalid("unterminated type argument"))?
            .trim();
        let name = || TypeName::new(arg).map_err(|_| invalid("invalid type name"));
        match head.trim() {
            "list" => Ok(Self::list(arg.parse()?)),
            "enum" => Ok(Self::Enum(name()?)),
            "object" => Ok(Self::Object(name()?)),
            "entity" => Ok(Self::Entity(name()?)),
            "opaque" => Ok(Self::Opaque(name()?)),
            _ => Err(invalid("unknown generic field type")),
        }
    }
}

impl TryFrom<String> for FieldType {
    type Error = SchemaError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<FieldType> for String {
    fn from(ty: FieldType) -> Self {
        ty.to_string()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    Private,
}

/// Persistence markers on a field.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldFlags {
    pub constant: bool,
    #[serde(rename = "static")]
    pub is_static: bool,
    /// Explicitly opted out of persistence.
    pub excluded: bool,
    /// Opts a private field in.
    pub expose: bool,
    /// Opts a public field out.
    pub transient: bool,
    /// May hold a subtype of the declared type, even one with no
    /// persisted layout of its own.
    pub polymorphic: bool,
}

/// One declared field of a host type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: FieldType,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(flatten)]
    pub flags: FieldFlags,
}

impl FieldDef {
    /// A public field with no markers.
    pub fn new(name: impl Into<String>, ty: FieldType) -> Self {
        Self {
            name: name.into(),
            ty,
            visibility: Visibility::Public,
            flags: FieldFlags::default(),
        }
    }

    pub fn private(mut self) -> Self {
        self.visibility = Visibility::Private;
        self
    }

    pub fn exposed(mut self) -> Self {
        self.flags.expose = true;
        self
    }

    pub fn transient(mut self) -> Self {
        self.flags.transient = true;
        self
    }

    pub fn excluded(mut self) -> Self {
        self.flags.excluded = true;
        self
    }

    pub fn constant(mut self) -> Self {
        self.flags.constant = true;
        self
    }

    pub fn shared(mut self) -> Self {
        self.flags.is_static = true;
        self
    }

    pub fn polymorphic(mut self) -> Self {
        self.flags.polymorphic = true;
        self
    }
}
