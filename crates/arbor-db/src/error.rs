use std::path::PathBuf;

use arbor_graph::GraphError;
use arbor_schema::SchemaError;
use arbor_stream::StreamError;
use arbor_types::{EntityId, FolderId, Guid};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error(transparent)]
    Stream(#[from] StreamError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Graph(#[from] GraphError),

    /// A folder failed to encode or decode.
    #[error("folder `{path}`")]
    Folder {
        path: String,
        #[source]
        source: Box<DbError>,
    },

    #[error("unknown folder {0}")]
    UnknownFolder(FolderId),

    #[error("unknown entity {0}")]
    UnknownEntity(EntityId),

    #[error("duplicate folder guid {0}")]
    DuplicateFolderGuid(Guid),

    #[error("cannot infer database format from {0}: expected a .json or .bin extension")]
    UnknownFormat(PathBuf),

    #[error("invalid container magic: expected ARBR, got {actual}")]
    InvalidMagic { actual: String },

    #[error("unsupported container version: {0}")]
    UnsupportedVersion(u32),

    #[error("unsupported container flags: {0:#04x}")]
    UnsupportedFlags(u8),

    #[error("container truncated: {len} bytes")]
    Truncated { len: usize },

    #[error("container CRC32 mismatch: stored {expected:08x}, computed {actual:08x}")]
    CrcMismatch { expected: u32, actual: u32 },

    #[error("compression failed: {0}")]
    CompressionFailed(String),

    #[error("decompression failed: {0}")]
    DecompressionFailed(String),

    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DbError {
    /// Wrap with folder context unless an inner folder already did.
    pub(crate) fn in_folder(self, path: impl FnOnce() -> String) -> Self {
        match self {
            folder @ Self::Folder { .. } => folder,
            other => Self::Folder {
                path: path(),
                source: Box::new(other),
            },
        }
    }

    /// Context chain from the innermost folder down to the root cause.
    pub fn breadcrumbs(&self) -> Vec<String> {
        match self {
            Self::Folder { source, .. } => {
                let mut crumbs = vec![self.to_string()];
                crumbs.extend(source.breadcrumbs());
                crumbs
            }
            Self::Graph(graph) => graph.breadcrumbs(),
            other => vec![other.to_string()],
        }
    }
}

pub type DbResult<T> = Result<T, DbError>;
