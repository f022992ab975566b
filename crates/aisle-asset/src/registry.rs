//! Custom-mesh registry: fixture type -> asset URL

use aisle_core::{AisleError, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// TOML layout of a registry file
#[derive(Debug, Deserialize)]
struct RegistryFile {
    #[serde(default)]
    meshes: HashMap<String, String>,
}

/// Which asset URL draws which fixture type
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshRegistry {
    urls: HashMap<String, String>,
}

impl MeshRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a `[meshes]` table of `type = "url"` pairs
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let file: RegistryFile = toml::from_str(s)?;
        Ok(Self { urls: file.meshes })
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content).map_err(|e| {
            AisleError::ConfigError(format!("Failed to parse {}: {}", path.display(), e))
        })
    }

    /// Register or replace the asset for a fixture type
    pub fn register(&mut self, key: impl Into<String>, url: impl Into<String>) {
        self.urls.insert(key.into(), url.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.urls.remove(key)
    }

    pub fn url_for(&self, key: &str) -> Option<&str> {
        self.urls.get(key).map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_from_toml() {
        let registry = MeshRegistry::from_toml_str(
            r#"
[meshes]
shelf = "assets/gondola.glb"
fridge = "https://cdn.example.com/fridge.glb"
"#,
        )
        .unwrap();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.url_for("shelf"), Some("assets/gondola.glb"));
        assert_eq!(registry.url_for("wall"), None);
    }

    #[test]
    fn test_register_replaces() {
        let mut registry = MeshRegistry::new();
        registry.register("pillar", "a.glb");
        registry.register("pillar", "b.glb");
        assert_eq!(registry.url_for("pillar"), Some("b.glb"));
        assert_eq!(registry.remove("pillar").as_deref(), Some("b.glb"));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = MeshRegistry::load_from_file("/definitely/not/here.toml");
        assert!(matches!(result, Err(AisleError::IoError(_))));
    }
}
