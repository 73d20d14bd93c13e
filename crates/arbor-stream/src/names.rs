//! Reserved property names written by the engine itself.
//!
//! Host fields can never collide with these: every reserved name starts with
//! a dot. The binary backend may replace them with one-byte aliases; the
//! alias is an encoding detail and decodes back to the same name.

pub const NAME: &str = ".name";
pub const ID: &str = ".id";
pub const TYPE: &str = ".type";
pub const ENABLED: &str = ".enabled";
pub const COMPONENTS: &str = ".components";
pub const LOCAL_ID: &str = ".localId";
pub const HASH: &str = ".hash";
pub const FOLDERS: &str = ".folders";
pub const OBJECTS: &str = ".objs";

/// Alias table; the alias of a name is its index. Append only.
const ALIASES: [&str; 9] = [
    NAME, ID, TYPE, ENABLED, COMPONENTS, LOCAL_ID, HASH, FOLDERS, OBJECTS,
];

/// Returns `true` if `name` is reserved for engine bookkeeping.
pub fn is_reserved(name: &str) -> bool {
    name.starts_with('.')
}

/// One-byte alias for a reserved name.
pub fn alias_of(name: &str) -> Option<u8> {
    ALIASES.iter().position(|n| *n == name).map(|i| i as u8)
}

/// Reserved name for a one-byte alias.
pub fn name_of_alias(alias: u8) -> Option<&'static str> {
    ALIASES.get(alias as usize).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases_roundtrip() {
        for name in ALIASES {
            let alias = alias_of(name).unwrap();
            assert_eq!(name_of_alias(alias), Some(name));
        }
    }

    #[test]
    fn host_names_have_no_alias() {
        assert_eq!(alias_of("health"), None);
        assert_eq!(name_of_alias(200), None);
    }

    #[test]
    fn reserved_prefix() {
        assert!(is_reserved(".anything"));
        assert!(!is_reserved("name"));
    }
}
