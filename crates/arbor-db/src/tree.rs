//! Folder tree (de)serialization.
//!
//! ```text
//! Database := { ".hash": u64, ".folders": Folder }
//! Folder   := { ".name": string, ".id": guid,
//!               ".folders": [Folder...], ".objs": [Entity...] }
//! ```
//!
//! Sub-folders nest positionally, so the stream carries no parent links;
//! the reader rebuilds them together with depths as it recurses.

use std::collections::HashSet;

use arbor_graph::{AssetResolver, Diagnostic, GraphReader, GraphWriter, ReadOptions};
use arbor_schema::{CodecRegistry, Schema, ENTITY_ROOT};
use arbor_stream::{names, StreamError, TokenReader, TokenWriter};
use arbor_types::{EntityId, FolderId, Guid};
use tracing::debug;

use crate::database::{Database, Folder};
use crate::error::{DbError, DbResult};

/// Writes a [`Database`] as one object value.
pub struct TreeWriter<'a> {
    db: &'a Database,
    graph: GraphWriter<'a>,
    write_disabled: bool,
}

impl<'a> TreeWriter<'a> {
    pub fn new(
        schema: &'a Schema,
        codecs: &'a CodecRegistry,
        resolver: &'a dyn AssetResolver,
        db: &'a Database,
        write_disabled: bool,
    ) -> Self {
        Self {
            db,
            graph: GraphWriter::new(schema, codecs, resolver, db.entities()),
            write_disabled,
        }
    }

    /// Write the database, recording `checksum` as its `.hash`.
    pub fn write(&mut self, writer: &mut dyn TokenWriter, checksum: u64) -> DbResult<()> {
        writer.write_start_object()?;
        writer.write_property_name(names::HASH)?;
        writer.write_u64(checksum)?;
        writer.write_property_name(names::FOLDERS)?;
        self.write_folder(writer, self.db.root())?;
        writer.write_end_object()?;
        Ok(())
    }

    fn write_folder(&mut self, writer: &mut dyn TokenWriter, id: FolderId) -> DbResult<()> {
        let db = self.db;
        let folder = &db[id];
        self.write_folder_inner(writer, folder).map_err(|e| {
            e.in_folder(|| db.path(id).unwrap_or_else(|| folder.name.clone()))
        })?;
        debug!(folder = %folder.name, objects = folder.objects.len(), "folder written");
        Ok(())
    }

    fn write_folder_inner(&mut self, writer: &mut dyn TokenWriter, folder: &Folder) -> DbResult<()> {
        writer.write_start_object()?;
        writer.write_property_name(names::NAME)?;
        writer.write_str(&folder.name)?;
        writer.write_property_name(names::ID)?;
        writer.write_guid(folder.guid)?;

        writer.write_property_name(names::FOLDERS)?;
        writer.write_start_array()?;
        for child in &folder.sub_folders {
            self.write_folder(writer, *child)?;
        }
        writer.write_end_array()?;

        let db = self.db;
        let objects: Vec<EntityId> = folder
            .objects
            .iter()
            .copied()
            .filter(|id| self.write_disabled || db.entity(*id).is_some_and(|e| e.enabled))
            .collect();
        writer.write_property_name(names::OBJECTS)?;
        self.graph.write_entity_array(writer, objects, ENTITY_ROOT)?;

        writer.write_end_object()?;
        Ok(())
    }
}

/// Result of decoding a folder tree.
#[derive(Debug)]
pub struct DecodedTree {
    pub database: Database,
    /// `.hash` as stored, if present.
    pub stored_checksum: Option<u64>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Reads a [`Database`] written by [`TreeWriter`].
pub struct TreeReader<'a> {
    graph: GraphReader<'a>,
    folders: Vec<Folder>,
    guids: HashSet<Guid>,
}

impl<'a> TreeReader<'a> {
    pub fn new(
        schema: &'a Schema,
        codecs: &'a CodecRegistry,
        resolver: &'a dyn AssetResolver,
        options: ReadOptions,
    ) -> Self {
        Self {
            graph: GraphReader::new(schema, codecs, resolver, options),
            folders: Vec::new(),
            guids: HashSet::new(),
        }
    }

    /// Decode a whole stream. Entities become reachable only after the
    /// reference resolution pass has run.
    pub fn read(mut self, reader: &mut dyn TokenReader) -> DbResult<DecodedTree> {
        reader.ensure_start_object()?;
        let mut stored_checksum = None;
        let mut root = None;
        while !reader.at_end_object()? {
            let property = reader.read_property_name()?;
            match property.as_str() {
                names::HASH => stored_checksum = Some(reader.read_u64()?),
                names::FOLDERS if root.is_none() => {
                    root = Some(self.read_folder(reader, None, 0, "")?);
                }
                _ => {
                    debug!(%property, "skipping unknown database property");
                    reader.skip_value()?;
                }
            }
        }
        if root.is_none() {
            return Err(StreamError::MissingProperty {
                name: names::FOLDERS.to_string(),
                path: reader.path(),
            }
            .into());
        }
        reader.ensure_end_object()?;
        reader.ensure_end_of_stream()?;

        let batch = self.graph.finish();
        debug!(
            folders = self.folders.len(),
            entities = batch.entities.len(),
            "database read"
        );
        Ok(DecodedTree {
            database: Database::from_parts(self.folders, batch.entities),
            stored_checksum,
            diagnostics: batch.diagnostics,
        })
    }

    fn read_folder(
        &mut self,
        reader: &mut dyn TokenReader,
        parent: Option<FolderId>,
        depth: u32,
        parent_path: &str,
    ) -> DbResult<FolderId> {
        reader.ensure_start_object()?;
        reader.ensure_property_name(names::NAME)?;
        let name = reader.read_string()?;
        let path = if parent_path.is_empty() {
            name.clone()
        } else {
            format!("{parent_path}/{name}")
        };
        self.read_folder_body(reader, name, parent, depth, &path)
            .map_err(|e| e.in_folder(|| path.clone()))
    }

    fn read_folder_body(
        &mut self,
        reader: &mut dyn TokenReader,
        name: String,
        parent: Option<FolderId>,
        depth: u32,
        path: &str,
    ) -> DbResult<FolderId> {
        reader.ensure_property_name(names::ID)?;
        let guid = reader.read_guid()?;
        if !self.guids.insert(guid) {
            return Err(DbError::DuplicateFolderGuid(guid));
        }
        let id = FolderId::new(self.folders.len());
        self.folders.push(Folder {
            name,
            guid,
            depth,
            parent,
            sub_folders: Vec::new(),
            objects: Vec::new(),
        });

        while !reader.at_end_object()? {
            let property = reader.read_property_name()?;
            match property.as_str() {
                names::FOLDERS => {
                    reader.ensure_start_array()?;
                    while !reader.at_end_array()? {
                        let child = self.read_folder(reader, Some(id), depth + 1, path)?;
                        self.folders[id.index()].sub_folders.push(child);
                    }
                    reader.ensure_end_array()?;
                }
                names::OBJECTS => {
                    let objects = self.graph.read_entity_array(reader, ENTITY_ROOT)?;
                    self.folders[id.index()].objects.extend(objects);
                }
                _ => {
                    debug!(folder = path, %property, "skipping unknown folder property");
                    reader.skip_value()?;
                }
            }
        }
        reader.ensure_end_object()?;
        debug!(folder = path, depth, "folder read");
        Ok(id)
    }
}
