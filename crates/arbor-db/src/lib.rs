//! File-backed folder tree database for Arbor.
//!
//! A [`Database`] is a strict tree of named, GUID-identified folders over
//! an arena of entities. This crate persists it:
//!
//! - [`TreeWriter`] / [`TreeReader`]: the folder tree on top of the object
//!   graph writer and reader, one load batch per file
//! - [`structural_checksum`]: a 64-bit hash of tree shape and membership,
//!   stored as `.hash` and compared on load
//! - [`container`]: `ARBR` framing (version, optional zstd, CRC32) around
//!   binary streams
//! - [`Arbor`]: the facade tying schema, codecs and [`ArborConfig`] to
//!   in-memory and atomic on-disk saves and loads
//!
//! # Design Rules
//!
//! 1. A load builds a fresh database; nothing is observable until references
//!    are resolved.
//! 2. Disabled entities are omitted on write unless configured otherwise.
//! 3. The checksum never gates a load; a mismatch only marks it stale.
//! 4. File saves go through a temporary file and a rename.

pub mod arbor;
pub mod checksum;
pub mod config;
pub mod container;
pub mod database;
pub mod error;
pub mod format;
pub mod tree;

pub use arbor::{Arbor, LoadedDatabase, SavedDatabase};
pub use checksum::{structural_checksum, Membership};
pub use config::ArborConfig;
pub use database::{Database, Folder};
pub use error::{DbError, DbResult};
pub use format::Format;
pub use tree::{DecodedTree, TreeReader, TreeWriter};

// Re-export the types embedders need alongside the database.
pub use arbor_graph::{
    AssetResolver, Component, Diagnostic, DiagnosticKind, Entities, Entity, InMemoryAssetResolver,
    LoadedBatch, NullAssetResolver,
};
pub use arbor_schema::{CodecRegistry, Schema, SchemaFile};
pub use arbor_types::{EntityId, FolderId, Guid, TypeName, Value};
