use arbor_stream::StreamError;
use arbor_types::TypeError;
use thiserror::Error;

/// Errors raised while registering types or running scalar codecs.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// A type with this name is already registered.
    #[error("type `{0}` is already registered")]
    DuplicateType(String),

    /// An enum with this name is already registered.
    #[error("enum `{0}` is already registered")]
    DuplicateEnum(String),

    /// The type or enum is not registered.
    #[error("unknown type `{0}`")]
    UnknownType(String),

    /// The declared base type has not been registered yet.
    #[error("type `{name}` extends unknown base `{base}`")]
    UnknownBase { name: String, base: String },

    /// The base type is of a different kind (entity, component, object).
    #[error("type `{name}` cannot extend `{base}`: {reason}")]
    IncompatibleBase {
        name: String,
        base: String,
        reason: String,
    },

    /// A field name is declared twice or shadows an inherited field.
    #[error("field `{field}` of `{type_name}` collides with {existing}")]
    FieldCollision {
        type_name: String,
        field: String,
        existing: String,
    },

    /// A field definition is malformed.
    #[error("invalid field `{field}` of `{type_name}`: {reason}")]
    InvalidField {
        type_name: String,
        field: String,
        reason: String,
    },

    /// A field type string could not be parsed.
    #[error("invalid field type `{input}`: {reason}")]
    InvalidFieldType { input: String, reason: String },

    /// A scalar codec was handed a value of the wrong shape.
    #[error("codec `{codec}` cannot encode {found}")]
    CodecMismatch { codec: String, found: String },

    /// A schema file could not be read.
    #[error("cannot read schema file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A schema file could not be parsed.
    #[error("schema file error: {0}")]
    File(#[from] toml::de::Error),

    #[error(transparent)]
    Stream(#[from] StreamError),

    #[error(transparent)]
    Type(#[from] TypeError),
}

pub type SchemaResult<T> = Result<T, SchemaError>;
