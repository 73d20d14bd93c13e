use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Identity of an asset living outside the database: an opaque asset id plus
/// a numeric sub-id addressing one object inside that asset.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AssetKey {
    pub id: String,
    pub local_id: i64,
}

impl AssetKey {
    pub fn new(id: impl Into<String>, local_id: i64) -> Result<Self, TypeError> {
        let id = id.into();
        if id.is_empty() {
            return Err(TypeError::InvalidAssetKey("empty asset id".into()));
        }
        Ok(Self { id, local_id })
    }
}

impl fmt::Display for AssetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.id, self.local_id)
    }
}

/// An object owned by the host's asset store.
///
/// The database never owns external assets; it only records their
/// [`AssetKey`] and asks an injected resolver to map keys back to objects.
pub trait ExternalAsset: fmt::Debug + Send + Sync {
    /// The identity under which this asset is persisted.
    fn key(&self) -> AssetKey;
}

/// Shared, non-owning handle to an external asset.
///
/// Two handles are equal when their assets report the same key.
#[derive(Clone, Debug)]
pub struct AssetRef(Arc<dyn ExternalAsset>);

impl AssetRef {
    pub fn new(asset: impl ExternalAsset + 'static) -> Self {
        Self(Arc::new(asset))
    }

    pub fn from_arc(asset: Arc<dyn ExternalAsset>) -> Self {
        Self(asset)
    }

    pub fn key(&self) -> AssetKey {
        self.0.key()
    }

    pub fn asset(&self) -> &dyn ExternalAsset {
        self.0.as_ref()
    }
}

impl PartialEq for AssetRef {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.key() == other.key()
    }
}

/// Asset known only by its key, used when the host has no richer object to
/// hand out.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DetachedAsset(pub AssetKey);

impl ExternalAsset for DetachedAsset {
    fn key(&self) -> AssetKey {
        self.0.clone()
    }
}
