use std::fmt;
use std::path::Path;

use crate::error::{DbError, DbResult};

/// On-disk encoding of a database file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Format {
    /// `ARBR` container around the binary token stream.
    Binary,
    /// JSON document.
    Text,
}

impl Format {
    /// Pick the backend from the file extension (`.bin` or `.json`).
    pub fn from_path(path: &Path) -> DbResult<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("bin") => Ok(Self::Binary),
            Some(ext) if ext.eq_ignore_ascii_case("json") => Ok(Self::Text),
            _ => Err(DbError::UnknownFormat(path.to_path_buf())),
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Binary => "bin",
            Self::Text => "json",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Binary => "binary",
            Self::Text => "text",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_from_extension() {
        assert_eq!(Format::from_path(Path::new("db/world.bin")).unwrap(), Format::Binary);
        assert_eq!(Format::from_path(Path::new("world.JSON")).unwrap(), Format::Text);
        assert!(matches!(
            Format::from_path(Path::new("world.yaml")),
            Err(DbError::UnknownFormat(_))
        ));
        assert!(Format::from_path(Path::new("world")).is_err());
    }
}
