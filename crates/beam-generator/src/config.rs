//! YAML configuration documents

use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde_yaml::{Mapping, Value};

use crate::error::{BuildError, Result};

/// Key under which a document carries its transform chain
pub const TRANSFORMS_KEY: &str = "transforms";

/// A nested key/value document with its origin kept for error messages.
///
/// The root is always a mapping; key order is preserved.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConfigDocument {
    root: Mapping,
    origin: String,
}

impl ConfigDocument {
    pub fn from_mapping(root: Mapping) -> Self {
        Self {
            root,
            origin: "<memory>".to_string(),
        }
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        Self::parse(text, "<inline>".to_string())
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| BuildError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text, path.display().to_string())
    }

    fn parse(text: &str, origin: String) -> Result<Self> {
        let value: Value = serde_yaml::from_str(text).map_err(|source| BuildError::Yaml {
            origin: origin.clone(),
            source,
        })?;
        let root = match value {
            Value::Mapping(root) => root,
            Value::Null => Mapping::new(),
            other => {
                return Err(BuildError::Config(format!(
                    "{origin}: expected a mapping at the document root, found {}",
                    describe(&other)
                )))
            }
        };
        log::debug!("Loaded configuration {origin} ({} keys)", root.len());
        Ok(Self { root, origin })
    }

    /// Where the document came from (a path, `<inline>` or `<memory>`)
    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn as_mapping(&self) -> &Mapping {
        &self.root
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.root.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.root.contains_key(key)
    }

    /// Nested mapping stored under `key`
    pub fn section(&self, key: &str) -> Option<&Mapping> {
        self.root.get(key).and_then(Value::as_mapping)
    }

    pub fn section_mut(&mut self, key: &str) -> Option<&mut Mapping> {
        self.root.get_mut(key).and_then(Value::as_mapping_mut)
    }

    /// Set `key`, returning the previous value.
    pub fn insert(&mut self, key: &str, value: Value) -> Option<Value> {
        self.root.insert(Value::String(key.to_string()), value)
    }

    /// The transform chain this document describes.
    ///
    /// A document with a `transforms` entry yields that entry; otherwise the
    /// whole document is taken as the chain.
    pub fn transform_chain(&self) -> Value {
        self.get(TRANSFORMS_KEY)
            .cloned()
            .unwrap_or_else(|| Value::Mapping(self.root.clone()))
    }

    /// Deserialize the mapping `section` (or the root when `None`) into `T`.
    pub fn deserialize<T: DeserializeOwned>(&self, section: Option<&str>) -> Result<T> {
        let mapping = match section {
            None => &self.root,
            Some(key) => self.section(key).ok_or_else(|| {
                BuildError::Config(format!("{}: missing `{key}` section", self.origin))
            })?,
        };
        serde_yaml::from_value(Value::Mapping(mapping.clone())).map_err(|source| BuildError::Yaml {
            origin: self.origin.clone(),
            source,
        })
    }
}

pub(crate) fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a sequence",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mapping_document() {
        let doc = ConfigDocument::from_yaml_str(
            r#"
n_particle: 10
input:
  species: electron
"#,
        )
        .unwrap();

        assert_eq!(doc.origin(), "<inline>");
        assert_eq!(doc.get("n_particle").and_then(Value::as_u64), Some(10));
        assert!(doc.section("input").is_some());
        assert!(doc.section("n_particle").is_none());
    }

    #[test]
    fn test_empty_document_is_empty_mapping() {
        let doc = ConfigDocument::from_yaml_str("").unwrap();
        assert!(doc.as_mapping().is_empty());
    }

    #[test]
    fn test_rejects_non_mapping_root() {
        let result = ConfigDocument::from_yaml_str("- 1\n- 2\n");
        assert!(matches!(result, Err(BuildError::Config(_))));
    }

    #[test]
    fn test_rejects_malformed_yaml() {
        let result = ConfigDocument::from_yaml_str("a: [1, 2\n");
        assert!(matches!(result, Err(BuildError::Yaml { .. })));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = ConfigDocument::from_path("/nonexistent/beam/base.yaml");
        let error = result.unwrap_err();
        assert!(matches!(error, BuildError::Io { .. }));
        assert!(error.is_config());
    }

    #[test]
    fn test_transform_chain_unwraps_transforms_key() {
        let wrapped = ConfigDocument::from_yaml_str(
            "transforms:\n  s1: { type: scale, variable: x, factor: 2.0 }\n",
        )
        .unwrap();
        let bare = ConfigDocument::from_yaml_str("s1: { type: scale, variable: x, factor: 2.0 }\n")
            .unwrap();

        assert_eq!(wrapped.transform_chain(), bare.transform_chain());
    }
}
