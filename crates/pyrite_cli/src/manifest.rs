//! pyrite.toml manifest parsing.

use serde::Deserialize;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
pub struct Manifest {
    pub name: String,
    pub version: String,
}

pub fn load_manifest(path: &Path) -> io::Result<Manifest> {
    let s = std::fs::read_to_string(path)?;
    toml::from_str(&s).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

/// Package root for a source file: nearest ancestor with pyrite.toml.
pub fn find_package_root(entry_path: &Path) -> Option<PathBuf> {
    entry_path
        .ancestors()
        .find(|p| p.join("pyrite.toml").exists())
        .map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_minimal_manifest() {
        let m: Manifest = toml::from_str("name = \"demo\"\nversion = \"0.1.0\"\n").expect("toml");
        assert_eq!(m.name, "demo");
        assert_eq!(m.version, "0.1.0");
    }

    #[test]
    fn missing_name_is_an_error() {
        let res: Result<Manifest, _> = toml::from_str("version = \"0.1.0\"\n");
        assert!(res.is_err());
    }
}
