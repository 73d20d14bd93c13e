use arbor_schema::SchemaError;
use arbor_stream::StreamError;
use arbor_types::{EntityId, Guid, TypeError};

/// Errors from writing or reading an object graph.
///
/// Failures deep inside a value are wrapped on the way out: the property
/// that failed, then the component (if any), then the entity. Use
/// [`GraphError::breadcrumbs`] to render that chain.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error(transparent)]
    Stream(#[from] StreamError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Type(#[from] TypeError),

    /// An entity failed to encode or decode.
    #[error("entity `{name}` of type `{type_name}`{}", guid_label(.guid))]
    Entity {
        name: String,
        type_name: String,
        guid: Option<Guid>,
        #[source]
        source: Box<GraphError>,
    },

    /// One component of an entity failed.
    #[error("component #{index}")]
    Component {
        index: usize,
        #[source]
        source: Box<GraphError>,
    },

    /// A single field failed.
    #[error("property `{field}` at {path}")]
    Property {
        field: String,
        path: String,
        #[source]
        source: Box<GraphError>,
    },

    /// The in-memory value does not match the declared field type.
    #[error("expected {expected}, found {found}")]
    ValueMismatch { expected: String, found: String },

    #[error("type `{concrete}` is not assignable to `{declared}`")]
    NotAssignable { concrete: String, declared: String },

    #[error("type `{0}` is abstract and cannot be instantiated")]
    AbstractType(String),

    #[error("unknown type `{0}`")]
    UnknownType(String),

    #[error("duplicate entity guid {0}")]
    DuplicateGuid(Guid),

    /// An entity reference points outside the arena.
    #[error("entity handle {0} does not exist")]
    DanglingHandle(EntityId),

    #[error("`{variant}` is not a variant of enum `{enum_name}`")]
    UnknownVariant { enum_name: String, variant: String },
}

fn guid_label(guid: &Option<Guid>) -> String {
    guid.map(|g| format!(" ({g})")).unwrap_or_default()
}

impl GraphError {
    pub(crate) fn entity(
        name: &str,
        type_name: &str,
        guid: Option<Guid>,
        source: GraphError,
    ) -> Self {
        Self::Entity {
            name: name.to_string(),
            type_name: type_name.to_string(),
            guid,
            source: Box::new(source),
        }
    }

    pub(crate) fn component(index: usize, source: GraphError) -> Self {
        Self::Component {
            index,
            source: Box::new(source),
        }
    }

    pub(crate) fn property(field: &str, path: String, source: GraphError) -> Self {
        Self::Property {
            field: field.to_string(),
            path,
            source: Box::new(source),
        }
    }

    pub(crate) fn mismatch(expected: impl ToString, found: &arbor_types::Value) -> Self {
        Self::ValueMismatch {
            expected: expected.to_string(),
            found: found.describe(),
        }
    }

    /// Context chain from the outermost entity down to the root cause.
    pub fn breadcrumbs(&self) -> Vec<String> {
        let mut crumbs = Vec::new();
        let mut current = self;
        loop {
            crumbs.push(current.to_string());
            current = match current {
                Self::Entity { source, .. }
                | Self::Component { source, .. }
                | Self::Property { source, .. } => source,
                _ => return crumbs,
            };
        }
    }

    /// The innermost error, below all entity/component/property context.
    pub fn root_cause(&self) -> &GraphError {
        match self {
            Self::Entity { source, .. }
            | Self::Component { source, .. }
            | Self::Property { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

pub type GraphResult<T> = Result<T, GraphError>;
