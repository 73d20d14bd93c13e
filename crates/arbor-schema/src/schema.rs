//! Registry of host types and enums.

use std::collections::HashMap;

use arbor_types::TypeName;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{SchemaError, SchemaResult};
use crate::field::FieldDef;

/// Root of every entity type.
pub const ENTITY_ROOT: &str = "Entity";
/// Root of every component type.
pub const COMPONENT_ROOT: &str = "Component";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeKind {
    /// Identity-bearing record living in a folder.
    Entity,
    /// Data block embedded in an entity's component list.
    Component,
    /// Plain embedded value object.
    Object,
}

/// Declaration of one host type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDef {
    pub name: TypeName,
    #[serde(default)]
    pub base: Option<TypeName>,
    pub kind: TypeKind,
    #[serde(default, rename = "abstract")]
    pub is_abstract: bool,
    #[serde(default)]
    pub fields: Vec<FieldDef>,
    /// Field names the type handles itself; never walked generically.
    #[serde(default)]
    pub reserved: Vec<String>,
}

impl TypeDef {
    fn bare(name: TypeName, kind: TypeKind, base: Option<TypeName>) -> Self {
        Self {
            name,
            base,
            kind,
            is_abstract: false,
            fields: Vec::new(),
            reserved: Vec::new(),
        }
    }

    /// An entity type deriving directly from `Entity`.
    pub fn entity(name: &str) -> SchemaResult<Self> {
        Ok(Self::bare(
            TypeName::new(name)?,
            TypeKind::Entity,
            Some(TypeName::from_static(ENTITY_ROOT)),
        ))
    }

    /// A component type deriving directly from `Component`.
    pub fn component(name: &str) -> SchemaResult<Self> {
        Ok(Self::bare(
            TypeName::new(name)?,
            TypeKind::Component,
            Some(TypeName::from_static(COMPONENT_ROOT)),
        ))
    }

    /// A standalone embedded object type.
    pub fn object(name: &str) -> SchemaResult<Self> {
        Ok(Self::bare(TypeName::new(name)?, TypeKind::Object, None))
    }

    pub fn extends(mut self, base: &str) -> SchemaResult<Self> {
        self.base = Some(TypeName::new(base)?);
        Ok(self)
    }

    pub fn field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    pub fn abstract_type(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    pub fn reserve(mut self, name: impl Into<String>) -> Self {
        self.reserved.push(name.into());
        self
    }

    /// Field declared directly on this type (not inherited).
    pub fn own_field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Named set of enum variants; the first variant is the default.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumDef {
    pub name: TypeName,
    pub variants: Vec<String>,
}

impl EnumDef {
    pub fn new<I, S>(name: &str, variants: I) -> SchemaResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Ok(Self {
            name: TypeName::new(name)?,
            variants: variants.into_iter().map(Into::into).collect(),
        })
    }

    pub fn contains(&self, variant: &str) -> bool {
        self.variants.iter().any(|v| v == variant)
    }

    pub fn default_variant(&self) -> Option<&str> {
        self.variants.first().map(String::as_str)
    }
}

/// The registered host types of one application.
///
/// Types are registered base-first; a registered type never changes. The
/// two roots `Entity` and `Component` are always present.
#[derive(Clone, Debug)]
pub struct Schema {
    types: HashMap<TypeName, TypeDef>,
    order: Vec<TypeName>,
    enums: HashMap<TypeName, EnumDef>,
}

impl Schema {
    pub fn new() -> Self {
        let mut schema = Self {
            types: HashMap::new(),
            order: Vec::new(),
            enums: HashMap::new(),
        };
        let entity = TypeDef::bare(TypeName::from_static(ENTITY_ROOT), TypeKind::Entity, None)
            .abstract_type()
            .reserve("name")
            .reserve("guid")
            .reserve("enabled")
            .reserve("components");
        let component = TypeDef::bare(
            TypeName::from_static(COMPONENT_ROOT),
            TypeKind::Component,
            None,
        )
        .abstract_type();
        for root in [entity, component] {
            schema.order.push(root.name.clone());
            schema.types.insert(root.name.clone(), root);
        }
        schema
    }

    /// Register a type after validating it against what is already known.
    pub fn register(&mut self, def: TypeDef) -> SchemaResult<()> {
        if self.types.contains_key(&def.name) {
            return Err(SchemaError::DuplicateType(def.name.to_string()));
        }
        self.check_base(&def)?;
        self.check_fields(&def)?;
        debug!(type_name = %def.name, fields = def.fields.len(), "registered type");
        self.order.push(def.name.clone());
        self.types.insert(def.name.clone(), def);
        Ok(())
    }

    pub fn register_enum(&mut self, def: EnumDef) -> SchemaResult<()> {
        if self.enums.contains_key(&def.name) {
            return Err(SchemaError::DuplicateEnum(def.name.to_string()));
        }
        if def.variants.is_empty() {
            return Err(SchemaError::InvalidField {
                type_name: def.name.to_string(),
                field: String::new(),
                reason: "enum has no variants".into(),
            });
        }
        self.enums.insert(def.name.clone(), def);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&TypeDef> {
        self.types.get(name)
    }

    pub fn require(&self, name: &str) -> SchemaResult<&TypeDef> {
        self.get(name)
            .ok_or_else(|| SchemaError::UnknownType(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    pub fn enum_def(&self, name: &str) -> Option<&EnumDef> {
        self.enums.get(name)
    }

    /// Registered types in registration order (roots first).
    pub fn types(&self) -> impl Iterator<Item = &TypeDef> {
        self.order.iter().filter_map(|name| self.types.get(name))
    }

    pub fn enums(&self) -> impl Iterator<Item = &EnumDef> {
        self.enums.values()
    }

    /// The type followed by its bases, ending at a root.
    pub fn ancestry<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a TypeDef> + 'a {
        let mut next = self.get(name);
        std::iter::from_fn(move || {
            let current = next?;
            next = current.base.as_ref().and_then(|b| self.get(b.as_str()));
            Some(current)
        })
    }

    /// Can a value of type `concrete` be stored where `declared` is expected?
    pub fn is_assignable(&self, concrete: &str, declared: &str) -> bool {
        self.ancestry(concrete).any(|def| def.name == declared)
    }

    fn check_base(&self, def: &TypeDef) -> SchemaResult<()> {
        let Some(base_name) = &def.base else {
            return match def.kind {
                TypeKind::Object => Ok(()),
                TypeKind::Entity | TypeKind::Component => Err(SchemaError::IncompatibleBase {
                    name: def.name.to_string(),
                    base: String::new(),
                    reason: format!(
                        "{} types must derive from `{}`",
                        kind_label(def.kind),
                        root_of(def.kind)
                    ),
                }),
            };
        };
        let base = self.get(base_name.as_str()).ok_or_else(|| SchemaError::UnknownBase {
            name: def.name.to_string(),
            base: base_name.to_string(),
        })?;
        if base.kind != def.kind {
            return Err(SchemaError::IncompatibleBase {
                name: def.name.to_string(),
                base: base_name.to_string(),
                reason: format!(
                    "a {} type cannot extend a {} type",
                    kind_label(def.kind),
                    kind_label(base.kind)
                ),
            });
        }
        Ok(())
    }

    fn check_fields(&self, def: &TypeDef) -> SchemaResult<()> {
        let inherited: Vec<&TypeDef> = match &def.base {
            Some(base) => self.ancestry(base.as_str()).collect(),
            None => Vec::new(),
        };
        for (i, field) in def.fields.iter().enumerate() {
            if field.name.is_empty() || field.name.starts_with('.') {
                return Err(SchemaError::InvalidField {
                    type_name: def.name.to_string(),
                    field: field.name.clone(),
                    reason: "field names must be non-empty and not start with '.'".into(),
                });
            }
            if def.fields[..i].iter().any(|f| f.name == field.name) {
                return Err(SchemaError::FieldCollision {
                    type_name: def.name.to_string(),
                    field: field.name.clone(),
                    existing: "another field of the same type".into(),
                });
            }
            for ancestor in &inherited {
                let clashes = ancestor.own_field(&field.name).is_some()
                    || ancestor.reserved.iter().any(|r| *r == field.name);
                if clashes {
                    return Err(SchemaError::FieldCollision {
                        type_name: def.name.to_string(),
                        field: field.name.clone(),
                        existing: format!("a field of `{}`", ancestor.name),
                    });
                }
            }
        }
        Ok(())
    }
}

impl Default for Schema {
    fn default() -> Self {
        Self::new()
    }
}

fn kind_label(kind: TypeKind) -> &'static str {
    match kind {
        TypeKind::Entity => "entity",
        TypeKind::Component => "component",
        TypeKind::Object => "object",
    }
}

fn root_of(kind: TypeKind) -> &'static str {
    match kind {
        TypeKind::Component => COMPONENT_ROOT,
        _ => ENTITY_ROOT,
    }
}
