//! Foundation types for Arbor.
//!
//! This crate provides the identity, handle, and value types shared by every
//! other Arbor crate.
//!
//! # Key Types
//!
//! - [`Guid`]: Stable identity of a folder or entity
//! - [`TypeName`]: Name of a registered host type (the persisted type id)
//! - [`EntityId`] / [`FolderId`]: Arena handles, never persisted
//! - [`Value`] / [`ObjectValue`]: Dynamic field values of host objects
//! - [`Scalar`]: Codec-backed math and curve values
//! - [`AssetKey`] / [`AssetRef`]: External asset identity and handle

pub mod asset;
pub mod error;
pub mod guid;
pub mod handle;
pub mod name;
pub mod scalar;
pub mod value;

pub use asset::{AssetKey, AssetRef, DetachedAsset, ExternalAsset};
pub use error::TypeError;
pub use guid::Guid;
pub use handle::{EntityId, FolderId};
pub use name::TypeName;
pub use scalar::{Color, Curve, Keyframe, Quat, Rect, Scalar, Vec2, Vec3, Vec4, WrapMode};
pub use value::{FieldMap, ObjectValue, Value};
