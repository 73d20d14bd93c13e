use std::collections::HashMap;
use std::sync::RwLock;

use arbor_types::{AssetKey, AssetRef};

/// Outcome of looking up an external asset.
#[derive(Clone, Debug, PartialEq)]
pub enum AssetLookup {
    Resolved(AssetRef),
    /// The resolver has no asset store; the field loads as null silently.
    Unavailable,
    /// The store exists but has no asset under this key.
    NotFound,
}

/// Bridge to the host's external asset store.
///
/// Implementations must satisfy these invariants:
/// - `add_asset` is called once per asset-valued field written during a
///   save, so the resolver can collect every referenced asset.
/// - `try_get_asset` never fails hard: a missing asset is reported as
///   [`AssetLookup::NotFound`] and the loader degrades the field to null.
pub trait AssetResolver: Send + Sync {
    fn add_asset(&self, asset: &AssetRef, key: &AssetKey);

    fn try_get_asset(&self, key: &AssetKey) -> AssetLookup;
}

/// Resolver for hosts without an asset store: accepts every save and
/// resolves every load to null.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullAssetResolver;

impl AssetResolver for NullAssetResolver {
    fn add_asset(&self, _asset: &AssetRef, _key: &AssetKey) {}

    fn try_get_asset(&self, _key: &AssetKey) -> AssetLookup {
        AssetLookup::Unavailable
    }
}

/// In-memory asset catalogue.
///
/// Intended for tests and embedding. Assets added during a save are also
/// entered into the catalogue, so a save followed by a load through the same
/// resolver binds the same handles.
pub struct InMemoryAssetResolver {
    catalogue: RwLock<HashMap<AssetKey, AssetRef>>,
    referenced: RwLock<Vec<AssetKey>>,
}

impl InMemoryAssetResolver {
    pub fn new() -> Self {
        Self {
            catalogue: RwLock::new(HashMap::new()),
            referenced: RwLock::new(Vec::new()),
        }
    }

    /// Make an asset available to loads.
    pub fn insert(&self, asset: AssetRef) {
        let key = asset.key();
        self.catalogue
            .write()
            .expect("lock poisoned")
            .insert(key, asset);
    }

    /// Number of catalogued assets.
    pub fn len(&self) -> usize {
        self.catalogue.read().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.catalogue.read().expect("lock poisoned").is_empty()
    }

    /// Keys of every asset added during saves, in first-seen order.
    pub fn referenced_assets(&self) -> Vec<AssetKey> {
        self.referenced.read().expect("lock poisoned").clone()
    }

    pub fn clear_referenced(&self) {
        self.referenced.write().expect("lock poisoned").clear();
    }
}

impl Default for InMemoryAssetResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl AssetResolver for InMemoryAssetResolver {
    fn add_asset(&self, asset: &AssetRef, key: &AssetKey) {
        {
            let mut referenced = self.referenced.write().expect("lock poisoned");
            if !referenced.contains(key) {
                referenced.push(key.clone());
            }
        }
        self.catalogue
            .write()
            .expect("lock poisoned")
            .entry(key.clone())
            .or_insert_with(|| asset.clone());
    }

    fn try_get_asset(&self, key: &AssetKey) -> AssetLookup {
        match self.catalogue.read().expect("lock poisoned").get(key) {
            Some(asset) => AssetLookup::Resolved(asset.clone()),
            None => AssetLookup::NotFound,
        }
    }
}

impl std::fmt::Debug for InMemoryAssetResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryAssetResolver")
            .field("asset_count", &self.len())
            .field(
                "referenced",
                &self.referenced.read().expect("lock poisoned").len(),
            )
            .finish()
    }
}
