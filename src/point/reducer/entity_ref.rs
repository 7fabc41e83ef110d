// SPDX-License-Identifier: MIT

//! Entity reference syntax: `[?]<type>:<name>[[]][?]`

use crate::core::error::{DataPointError, Result};
use crate::point::entity::EntityType;

/// Descriptor for a reference to a registered entity
#[derive(Debug, Clone, PartialEq)]
pub struct EntityReducer {
    pub id: String,
    pub entity_type: EntityType,
    /// `[]` suffix: resolve once per element of an array input
    pub as_collection: bool,
    /// `?` marker: pass falsy values through without resolving
    pub has_empty_conditional: bool,
}

impl EntityReducer {
    pub fn new(id: impl Into<String>, entity_type: EntityType) -> Self {
        Self {
            id: id.into(),
            entity_type,
            as_collection: false,
            has_empty_conditional: false,
        }
    }

    /// Returns `None` when the string does not look like an entity
    /// reference at all, and an error when it names an unknown type.
    pub fn parse(source: &str) -> Option<Result<Self>> {
        let mut rest = source.trim();
        let mut has_empty_conditional = false;
        let mut as_collection = false;

        if let Some(stripped) = rest.strip_prefix('?') {
            has_empty_conditional = true;
            rest = stripped;
        }
        if let Some(stripped) = rest.strip_suffix('?') {
            has_empty_conditional = true;
            rest = stripped;
        }
        if let Some(stripped) = rest.strip_suffix("[]") {
            as_collection = true;
            rest = stripped;
        }

        let (type_name, name) = rest.split_once(':')?;
        if !is_identifier(type_name) || name.is_empty() || name.contains(char::is_whitespace) {
            return None;
        }

        let entity_type = match EntityType::parse(type_name) {
            Some(t) => t,
            None => return Some(Err(DataPointError::UnknownEntityType(type_name.to_string()))),
        };

        Some(Ok(Self {
            id: rest.to_string(),
            entity_type,
            as_collection,
            has_empty_conditional,
        }))
    }
}

fn is_identifier(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_reference() {
        let r = EntityReducer::parse("hash:person").unwrap().unwrap();
        assert_eq!(r, EntityReducer::new("hash:person", EntityType::Hash));
    }

    #[test]
    fn test_collection_and_conditional_markers() {
        let r = EntityReducer::parse("request:user[]?").unwrap().unwrap();
        assert_eq!(r.id, "request:user");
        assert!(r.as_collection);
        assert!(r.has_empty_conditional);

        let r = EntityReducer::parse("?transform:a").unwrap().unwrap();
        assert_eq!(r.id, "transform:a");
        assert!(!r.as_collection);
        assert!(r.has_empty_conditional);
    }

    #[test]
    fn test_not_a_reference() {
        assert!(EntityReducer::parse("no colon here").is_none());
        assert!(EntityReducer::parse("hash:").is_none());
        assert!(EntityReducer::parse("two words:name").is_none());
    }

    #[test]
    fn test_unknown_type() {
        let result = EntityReducer::parse("widget:a").unwrap();
        assert!(matches!(result, Err(DataPointError::UnknownEntityType(t)) if t == "widget"));
    }
}
