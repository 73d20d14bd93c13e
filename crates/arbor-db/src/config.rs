use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::DbResult;

/// Persistence settings.
///
/// Every field has a default, so a TOML file only names what it changes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArborConfig {
    /// Indent text database files.
    pub pretty_text: bool,
    /// Use one-byte aliases for reserved property names in binary files.
    pub binary_aliases: bool,
    /// zstd level for binary containers; `None` stores the body as is.
    pub compression_level: Option<i32>,
    /// Persist disabled entities with `.enabled: false` instead of omitting them.
    pub write_disabled_entities: bool,
    /// Keep undecodable components as unknown instead of failing the load.
    pub salvage_components: bool,
}

impl Default for ArborConfig {
    fn default() -> Self {
        Self {
            pretty_text: true,
            binary_aliases: true,
            compression_level: None,
            write_disabled_entities: false,
            salvage_components: false,
        }
    }
}

impl ArborConfig {
    pub fn from_toml_str(text: &str) -> DbResult<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> DbResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = ArborConfig::default();
        assert!(c.pretty_text);
        assert!(c.binary_aliases);
        assert!(c.compression_level.is_none());
        assert!(!c.write_disabled_entities);
        assert!(!c.salvage_components);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let c = ArborConfig::from_toml_str("compression_level = 9\nsalvage_components = true\n")
            .unwrap();
        assert_eq!(c.compression_level, Some(9));
        assert!(c.salvage_components);
        assert!(c.pretty_text);
    }

    #[test]
    fn unknown_types_rejected() {
        assert!(ArborConfig::from_toml_str("pretty_text = \"yes\"").is_err());
    }
}
