use std::io::Write;
use std::path::Path;

use arbor_graph::{
    AssetResolver, Diagnostic, Entities, GraphReader, GraphWriter, LoadedBatch,
    NullAssetResolver, ReadOptions,
};
use arbor_schema::{CodecRegistry, Schema, ENTITY_ROOT};
use arbor_stream::{BinaryReader, BinaryWriter, TextReader, TextWriter, TokenReader};
use arbor_types::EntityId;
use tracing::{debug, warn};

use crate::checksum::{structural_checksum, Membership};
use crate::config::ArborConfig;
use crate::container;
use crate::database::Database;
use crate::error::{DbError, DbResult};
use crate::format::Format;
use crate::tree::{DecodedTree, TreeReader, TreeWriter};

/// Bytes of a saved database plus the checksum recorded in them.
#[derive(Clone, Debug)]
pub struct SavedDatabase {
    pub bytes: Vec<u8>,
    pub checksum: u64,
}

/// A loaded database with its load report.
#[derive(Debug)]
pub struct LoadedDatabase {
    pub database: Database,
    /// The `.hash` found in the file.
    pub stored_checksum: Option<u64>,
    /// Checksum of the tree as loaded.
    pub computed_checksum: u64,
    pub diagnostics: Vec<Diagnostic>,
}

impl LoadedDatabase {
    /// Has the tree drifted from the checksum stored with it?
    pub fn is_stale(&self) -> bool {
        self.stored_checksum != Some(self.computed_checksum)
    }
}

/// Persistence entry point: a schema, its codecs and settings.
///
/// Every save or load runs in its own serializer session; an `Arbor` can be
/// shared between threads.
#[derive(Debug)]
pub struct Arbor {
    schema: Schema,
    codecs: CodecRegistry,
    config: ArborConfig,
}

impl Arbor {
    /// Built-in codecs and default settings.
    pub fn new(schema: Schema) -> Self {
        Self {
            schema,
            codecs: CodecRegistry::with_builtins(),
            config: ArborConfig::default(),
        }
    }

    pub fn with_codecs(mut self, codecs: CodecRegistry) -> Self {
        self.codecs = codecs;
        self
    }

    pub fn with_config(mut self, config: ArborConfig) -> Self {
        self.config = config;
        self
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn codecs(&self) -> &CodecRegistry {
        &self.codecs
    }

    pub fn config(&self) -> &ArborConfig {
        &self.config
    }

    fn read_options(&self) -> ReadOptions {
        ReadOptions {
            salvage_components: self.config.salvage_components,
        }
    }

    /// Checksum the tree would be saved with under the current settings.
    pub fn checksum(&self, db: &Database) -> u64 {
        structural_checksum(db, Membership::for_writer(self.config.write_disabled_entities))
    }

    pub fn save_to_bytes(
        &self,
        db: &Database,
        format: Format,
        resolver: &dyn AssetResolver,
    ) -> DbResult<SavedDatabase> {
        let checksum = self.checksum(db);
        let mut tree = TreeWriter::new(
            &self.schema,
            &self.codecs,
            resolver,
            db,
            self.config.write_disabled_entities,
        );
        let bytes = match format {
            Format::Binary => {
                let mut out = BinaryWriter::new().with_aliases(self.config.binary_aliases);
                tree.write(&mut out, checksum)?;
                container::seal(&out.finish()?, self.config.compression_level)?
            }
            Format::Text => {
                let mut out = TextWriter::new().with_pretty(self.config.pretty_text);
                tree.write(&mut out, checksum)?;
                out.finish()?.into_bytes()
            }
        };
        debug!(%format, bytes = bytes.len(), checksum, "database saved");
        Ok(SavedDatabase { bytes, checksum })
    }

    pub fn load_from_bytes(
        &self,
        bytes: &[u8],
        format: Format,
        resolver: &dyn AssetResolver,
    ) -> DbResult<LoadedDatabase> {
        let tree = TreeReader::new(&self.schema, &self.codecs, resolver, self.read_options());
        let DecodedTree {
            database,
            stored_checksum,
            diagnostics,
        } = match format {
            Format::Binary => {
                let mut input = BinaryReader::new(container::open(bytes)?);
                tree.read(&mut input)?
            }
            Format::Text => {
                let mut input = TextReader::from_slice(bytes)?;
                tree.read(&mut input)?
            }
        };
        let loaded = LoadedDatabase {
            computed_checksum: structural_checksum(&database, Membership::All),
            database,
            stored_checksum,
            diagnostics,
        };
        if loaded.is_stale() {
            warn!(
                stored = ?loaded.stored_checksum,
                computed = loaded.computed_checksum,
                "stored structural checksum is stale"
            );
        }
        Ok(loaded)
    }

    /// Save to `path`, picking the format from its extension.
    pub fn save(&self, db: &Database, path: &Path) -> DbResult<SavedDatabase> {
        self.save_with(db, path, &NullAssetResolver)
    }

    /// Save through a temporary file in the target directory, renamed into
    /// place once fully written.
    pub fn save_with(
        &self,
        db: &Database,
        path: &Path,
        resolver: &dyn AssetResolver,
    ) -> DbResult<SavedDatabase> {
        let format = Format::from_path(path)?;
        let saved = self.save_to_bytes(db, format, resolver)?;
        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        let mut file = tempfile::NamedTempFile::new_in(dir)?;
        file.write_all(&saved.bytes)?;
        file.as_file().sync_all()?;
        file.persist(path).map_err(|e| DbError::Io(e.error))?;
        debug!(path = %path.display(), "database file written");
        Ok(saved)
    }

    pub fn load(&self, path: &Path) -> DbResult<LoadedDatabase> {
        self.load_with(path, &NullAssetResolver)
    }

    pub fn load_with(&self, path: &Path, resolver: &dyn AssetResolver) -> DbResult<LoadedDatabase> {
        let format = Format::from_path(path)?;
        let bytes = std::fs::read(path)?;
        self.load_from_bytes(&bytes, format, resolver)
    }

    /// Serialize one entity of `entities` on its own.
    pub fn write_entity(
        &self,
        entities: &Entities,
        id: EntityId,
        format: Format,
        resolver: &dyn AssetResolver,
    ) -> DbResult<Vec<u8>> {
        let mut graph = GraphWriter::new(&self.schema, &self.codecs, resolver, entities);
        Ok(match format {
            Format::Binary => {
                let mut out = BinaryWriter::new().with_aliases(self.config.binary_aliases);
                graph.write_entity_id(&mut out, id, ENTITY_ROOT)?;
                out.finish()?
            }
            Format::Text => {
                let mut out = TextWriter::new().with_pretty(self.config.pretty_text);
                graph.write_entity_id(&mut out, id, ENTITY_ROOT)?;
                out.finish()?.into_bytes()
            }
        })
    }

    /// Read a stream of entities written by [`write_entity`](Self::write_entity),
    /// either a single entity or an array of them, as one load batch.
    pub fn read_entities(
        &self,
        bytes: &[u8],
        format: Format,
        resolver: &dyn AssetResolver,
    ) -> DbResult<LoadedBatch> {
        let mut graph = GraphReader::new(&self.schema, &self.codecs, resolver, self.read_options());
        match format {
            Format::Binary => {
                let mut input = BinaryReader::new(bytes.to_vec());
                read_one_or_many(&mut graph, &mut input)?;
            }
            Format::Text => {
                let mut input = TextReader::from_slice(bytes)?;
                read_one_or_many(&mut graph, &mut input)?;
            }
        }
        Ok(graph.finish())
    }
}

fn read_one_or_many(graph: &mut GraphReader<'_>, input: &mut dyn TokenReader) -> DbResult<()> {
    if matches!(input.peek()?, Some(arbor_stream::Token::StartArray)) {
        graph.read_entity_array(input, ENTITY_ROOT)?;
    } else {
        graph.read_entity(input, ENTITY_ROOT)?;
    }
    input.ensure_end_of_stream()?;
    Ok(())
}
