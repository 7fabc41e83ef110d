// SPDX-License-Identifier: MIT

//! Entity loader - YAML/JSON file loading and parsing
//!
//! A definitions file maps entity ids to their sources:
//!
//! ```yaml
//! entities:
//!   hash:person:
//!     pickKeys: [name, email]
//!   collection:people:
//!     map: hash:person
//! ```

use crate::core::error::Result;
use crate::point::entity::EntitySource;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Parsed contents of a definitions file
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EntityFile {
    #[serde(default)]
    pub entities: BTreeMap<String, EntitySource>,
}

/// Loads entity definitions from YAML or JSON files
pub struct EntityLoader;

impl EntityLoader {
    pub fn new() -> Self {
        Self
    }

    /// Load definitions from a file; `.json` files are parsed as JSON,
    /// anything else as YAML
    pub fn load_file<P: AsRef<Path>>(&self, path: P) -> Result<EntityFile> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        log::debug!("loading entities from {}", path.display());

        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::parse_json(&content),
            _ => Self::parse_yaml(&content),
        }
    }

    pub fn parse_yaml(content: &str) -> Result<EntityFile> {
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn parse_json(content: &str) -> Result<EntityFile> {
        Ok(serde_json::from_str(content)?)
    }
}

impl Default for EntityLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::DataPointError;
    use crate::point::reducer::ReducerInput;
    use serde_json::json;

    #[test]
    fn test_parse_yaml_entities() {
        let yaml = r#"
entities:
  hash:person:
    pickKeys: [name, email]
    addKeys:
      display: $name
  collection:people:
    value: $results
    map: hash:person
  request:searchPeople:
    url: https://swapi.co/api/people
    options:
      qs:
        $search: $personName
"#;
        let file = EntityLoader::parse_yaml(yaml).unwrap();
        assert_eq!(file.entities.len(), 3);

        let person = &file.entities["hash:person"];
        assert_eq!(
            person.pick_keys,
            Some(vec!["name".to_string(), "email".to_string()])
        );

        let people = &file.entities["collection:people"];
        assert!(matches!(
            &people.map,
            Some(ReducerInput::Source(v)) if v == &json!("hash:person")
        ));

        let search = &file.entities["request:searchPeople"];
        assert_eq!(search.url.as_deref(), Some("https://swapi.co/api/people"));
    }

    #[test]
    fn test_parse_json_entities() {
        let content = r#"{"entities": {"transform:name": {"value": "$name"}}}"#;
        let file = EntityLoader::parse_json(content).unwrap();
        assert!(file.entities.contains_key("transform:name"));
    }

    #[test]
    fn test_empty_file() {
        let file = EntityLoader::parse_yaml("entities: {}").unwrap();
        assert!(file.entities.is_empty());
    }

    #[test]
    fn test_parse_invalid_yaml() {
        let result = EntityLoader::parse_yaml("entities: [not, a, map");
        assert!(matches!(result, Err(DataPointError::Yaml(_))));
    }

    #[test]
    fn test_unknown_entity_field() {
        let yaml = r#"
entities:
  hash:a:
    pikKeys: [a]
"#;
        assert!(EntityLoader::parse_yaml(yaml).is_err());
    }

    #[test]
    fn test_missing_file() {
        let result = EntityLoader::new().load_file("/nonexistent/entities.yaml");
        assert!(matches!(result, Err(DataPointError::Io(_))));
    }
}
