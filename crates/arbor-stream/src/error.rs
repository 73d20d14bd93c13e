use thiserror::Error;

/// Structural errors raised while writing or reading a token stream.
///
/// Every variant that can be tied to a position carries the stream path
/// (e.g. `$.folders[0].objs[2]`) so tooling can point at the failure.
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("unexpected token at {path}: expected {expected}, found {found}")]
    UnexpectedToken {
        expected: String,
        found: String,
        path: String,
    },

    #[error("unexpected end of stream at {path}: expected {expected}")]
    UnexpectedEof { expected: String, path: String },

    #[error("unbalanced stream at {path}: {reason}")]
    Unbalanced { reason: String, path: String },

    #[error("missing property `{name}` at {path}")]
    MissingProperty { name: String, path: String },

    #[error("invalid value at {path}: {reason}")]
    InvalidValue { reason: String, path: String },

    #[error("corrupt binary stream at offset {offset}: {reason}")]
    Corrupt { offset: u64, reason: String },

    #[error("text encoding error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StreamError {
    /// Stream path recorded with the error, when there is one.
    pub fn path(&self) -> Option<&str> {
        match self {
            Self::UnexpectedToken { path, .. }
            | Self::UnexpectedEof { path, .. }
            | Self::Unbalanced { path, .. }
            | Self::MissingProperty { path, .. }
            | Self::InvalidValue { path, .. } => Some(path),
            Self::Corrupt { .. } | Self::Json(_) => None,
        }
    }
}

pub type StreamResult<T> = Result<T, StreamError>;
