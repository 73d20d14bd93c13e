use std::fmt;

/// Arena index of an entity inside one loaded batch or database.
///
/// Handles are only meaningful for the arena that produced them; they are
/// never persisted (references are written as the target's [`Guid`]).
///
/// [`Guid`]: crate::Guid
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(u32);

impl EntityId {
    pub fn new(index: usize) -> Self {
        Self(u32::try_from(index).expect("entity arena exceeds u32::MAX entries"))
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e#{}", self.0)
    }
}

/// Arena index of a folder inside a database.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FolderId(u32);

impl FolderId {
    pub fn new(index: usize) -> Self {
        Self(u32::try_from(index).expect("folder arena exceeds u32::MAX entries"))
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for FolderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "f#{}", self.0)
    }
}
