use std::collections::HashMap;
use std::ops::Index;

use arbor_graph::{Entities, Entity};
use arbor_types::{EntityId, FolderId, Guid};

use crate::error::{DbError, DbResult};

/// A node of the folder tree.
///
/// Folders own their sub-folders and list the entities they contain; the
/// entities themselves live in the database's entity arena.
#[derive(Clone, Debug, PartialEq)]
pub struct Folder {
    pub name: String,
    pub guid: Guid,
    /// Distance from the root; the root is 0.
    pub depth: u32,
    pub parent: Option<FolderId>,
    pub sub_folders: Vec<FolderId>,
    pub objects: Vec<EntityId>,
}

/// A folder tree plus the entities its folders contain.
#[derive(Clone, Debug)]
pub struct Database {
    folders: Vec<Folder>,
    by_guid: HashMap<Guid, FolderId>,
    entities: Entities,
}

impl Database {
    /// An empty database whose root folder gets a fresh GUID.
    pub fn new(root_name: impl Into<String>) -> Self {
        Self::with_root(root_name, Guid::generate())
    }

    pub fn with_root(root_name: impl Into<String>, guid: Guid) -> Self {
        let root = Folder {
            name: root_name.into(),
            guid,
            depth: 0,
            parent: None,
            sub_folders: Vec::new(),
            objects: Vec::new(),
        };
        Self {
            folders: vec![root],
            by_guid: HashMap::from([(guid, FolderId::new(0))]),
            entities: Entities::new(),
        }
    }

    /// Assemble a database from a decoded tree. `folders[0]` is the root.
    pub(crate) fn from_parts(folders: Vec<Folder>, entities: Entities) -> Self {
        let by_guid = folders
            .iter()
            .enumerate()
            .map(|(i, f)| (f.guid, FolderId::new(i)))
            .collect();
        Self {
            folders,
            by_guid,
            entities,
        }
    }

    pub fn root(&self) -> FolderId {
        FolderId::new(0)
    }

    pub fn folder(&self, id: FolderId) -> Option<&Folder> {
        self.folders.get(id.index())
    }

    pub fn folder_mut(&mut self, id: FolderId) -> Option<&mut Folder> {
        self.folders.get_mut(id.index())
    }

    /// Add a sub-folder with a fresh GUID.
    pub fn add_folder(&mut self, parent: FolderId, name: impl Into<String>) -> DbResult<FolderId> {
        self.add_folder_with_guid(parent, name, Guid::generate())
    }

    pub fn add_folder_with_guid(
        &mut self,
        parent: FolderId,
        name: impl Into<String>,
        guid: Guid,
    ) -> DbResult<FolderId> {
        let depth = self
            .folder(parent)
            .ok_or(DbError::UnknownFolder(parent))?
            .depth
            + 1;
        if self.by_guid.contains_key(&guid) {
            return Err(DbError::DuplicateFolderGuid(guid));
        }
        let id = FolderId::new(self.folders.len());
        self.folders.push(Folder {
            name: name.into(),
            guid,
            depth,
            parent: Some(parent),
            sub_folders: Vec::new(),
            objects: Vec::new(),
        });
        self.by_guid.insert(guid, id);
        self.folders[parent.index()].sub_folders.push(id);
        Ok(id)
    }

    /// Add an entity to the arena and list it in `folder`.
    pub fn add_entity(&mut self, folder: FolderId, entity: Entity) -> DbResult<EntityId> {
        if self.folder(folder).is_none() {
            return Err(DbError::UnknownFolder(folder));
        }
        let id = self.entities.insert(entity)?;
        self.folders[folder.index()].objects.push(id);
        Ok(id)
    }

    pub fn entities(&self) -> &Entities {
        &self.entities
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(id)
    }

    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(id)
    }

    pub fn folder_by_guid(&self, guid: Guid) -> Option<FolderId> {
        self.by_guid.get(&guid).copied()
    }

    pub fn entity_by_guid(&self, guid: Guid) -> Option<EntityId> {
        self.entities.by_guid(guid)
    }

    pub fn folder_count(&self) -> usize {
        self.folders.len()
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Folders in depth-first pre-order, starting at the root.
    pub fn walk(&self) -> Vec<FolderId> {
        let mut order = Vec::with_capacity(self.folders.len());
        let mut stack = vec![self.root()];
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.folders[id.index()].sub_folders.iter().rev().copied());
        }
        order
    }

    /// Slash-joined names from the root down to `id`.
    pub fn path(&self, id: FolderId) -> Option<String> {
        let mut names = Vec::new();
        let mut current = Some(id);
        while let Some(folder) = current.and_then(|id| self.folder(id)) {
            names.push(folder.name.as_str());
            current = folder.parent;
        }
        if names.is_empty() {
            return None;
        }
        names.reverse();
        Some(names.join("/"))
    }

    /// Folder that lists `entity`, if any.
    pub fn folder_of(&self, entity: EntityId) -> Option<FolderId> {
        self.folders
            .iter()
            .position(|f| f.objects.contains(&entity))
            .map(FolderId::new)
    }
}

impl Index<FolderId> for Database {
    type Output = Folder;

    fn index(&self, id: FolderId) -> &Folder {
        &self.folders[id.index()]
    }
}
