//! Structural checksum of a folder tree.
//!
//! The checksum covers shape and membership only: folder GUIDs, depths,
//! sub-folder counts and the GUIDs of persisted member entities, in
//! depth-first order. Field contents never affect it. It is a freshness
//! signal, not an identity.

use crate::database::Database;

/// Domain tag prepended to every structural hash.
pub const DOMAIN: &str = "arbor-structure-v1";

/// Which entities count as members.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Membership {
    /// Only enabled entities, matching a writer that omits disabled ones.
    EnabledOnly,
    /// Every listed entity.
    All,
}

impl Membership {
    pub fn for_writer(write_disabled_entities: bool) -> Self {
        if write_disabled_entities {
            Self::All
        } else {
            Self::EnabledOnly
        }
    }
}

/// 64-bit structural checksum of `db`.
pub fn structural_checksum(db: &Database, membership: Membership) -> u64 {
    let mut hasher = blake3::Hasher::new();
    hasher.update(DOMAIN.as_bytes());
    hasher.update(b":");
    for id in db.walk() {
        let folder = &db[id];
        hasher.update(folder.guid.as_bytes());
        hasher.update(&folder.depth.to_le_bytes());
        hasher.update(&(folder.sub_folders.len() as u32).to_le_bytes());
        let members: Vec<_> = folder
            .objects
            .iter()
            .filter_map(|e| db.entity(*e))
            .filter(|e| membership == Membership::All || e.enabled)
            .collect();
        hasher.update(&(members.len() as u32).to_le_bytes());
        for entity in members {
            hasher.update(entity.guid.as_bytes());
        }
    }
    let digest = hasher.finalize();
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest.as_bytes()[..8]);
    u64::from_le_bytes(head)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbor_graph::Entity;
    use arbor_types::{Guid, TypeName};
    use proptest::prelude::*;

    fn prop(name: &str, guid: u128) -> Entity {
        Entity::new(name, TypeName::from_static("Prop")).with_guid(Guid::from_u128(guid))
    }

    fn sample() -> Database {
        let mut db = Database::with_root("Root", Guid::from_u128(1));
        let a = db
            .add_folder_with_guid(db.root(), "A", Guid::from_u128(2))
            .unwrap();
        db.add_entity(a, prop("x", 10)).unwrap();
        db.add_entity(db.root(), prop("y", 11)).unwrap();
        db
    }

    #[test]
    fn deterministic() {
        assert_eq!(
            structural_checksum(&sample(), Membership::All),
            structural_checksum(&sample(), Membership::All)
        );
    }

    #[test]
    fn field_contents_do_not_matter() {
        let base = structural_checksum(&sample(), Membership::All);
        let mut db = sample();
        let id = db.entity_by_guid(Guid::from_u128(10)).unwrap();
        let entity = db.entity_mut(id).unwrap();
        entity.name = "renamed".into();
        entity.set("weight", 3.5f64);
        assert_eq!(structural_checksum(&db, Membership::All), base);
    }

    #[test]
    fn membership_and_shape_matter() {
        let base = structural_checksum(&sample(), Membership::All);

        let mut db = sample();
        db.add_entity(db.root(), prop("z", 12)).unwrap();
        assert_ne!(structural_checksum(&db, Membership::All), base);

        let mut db = sample();
        db.add_folder_with_guid(db.root(), "B", Guid::from_u128(3))
            .unwrap();
        assert_ne!(structural_checksum(&db, Membership::All), base);

        // Same entity, different folder.
        let mut moved = Database::with_root("Root", Guid::from_u128(1));
        let a = moved
            .add_folder_with_guid(moved.root(), "A", Guid::from_u128(2))
            .unwrap();
        moved.add_entity(moved.root(), prop("x", 10)).unwrap();
        moved.add_entity(a, prop("y", 11)).unwrap();
        assert_ne!(structural_checksum(&moved, Membership::All), base);
    }

    #[test]
    fn disabled_members_follow_membership() {
        let mut db = sample();
        let before = structural_checksum(&db, Membership::EnabledOnly);
        let id = db.entity_by_guid(Guid::from_u128(11)).unwrap();
        db.entity_mut(id).unwrap().enabled = false;
        assert_ne!(structural_checksum(&db, Membership::EnabledOnly), before);
        assert_eq!(
            structural_checksum(&db, Membership::All),
            structural_checksum(&sample(), Membership::All)
        );
    }

    proptest! {
        #[test]
        fn any_extra_member_changes_the_checksum(extra in 100u128..10_000) {
            let base = structural_checksum(&sample(), Membership::All);
            let mut db = sample();
            db.add_entity(db.root(), prop("p", extra)).unwrap();
            prop_assert_ne!(structural_checksum(&db, Membership::All), base);
        }
    }
}
