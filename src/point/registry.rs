// SPDX-License-Identifier: MIT

use crate::point::entity::Entity;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Clone)]
pub struct EntityRegistry {
    entities: Arc<RwLock<HashMap<String, Arc<Entity>>>>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self {
            entities: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Insert or replace the entity under its id
    pub async fn register(&self, entity: Entity) {
        let mut entities = self.entities.write().await;
        entities.insert(entity.id.clone(), Arc::new(entity));
    }

    pub async fn get(&self, id: &str) -> Option<Arc<Entity>> {
        let entities = self.entities.read().await;
        entities.get(id).cloned()
    }

    pub async fn contains(&self, id: &str) -> bool {
        self.entities.read().await.contains_key(id)
    }

    /// Registered ids, sorted
    pub async fn ids(&self) -> Vec<String> {
        let entities = self.entities.read().await;
        let mut ids: Vec<String> = entities.keys().cloned().collect();
        ids.sort();
        ids
    }
}

impl Default for EntityRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::point::entity::{EntityKind, EntitySource};

    fn entity(id: &str) -> Entity {
        Entity::create(id, EntitySource::new()).unwrap()
    }

    #[tokio::test]
    async fn test_register_and_get_entity() {
        let registry = EntityRegistry::new();

        registry.register(entity("transform:a")).await;

        let retrieved = registry.get("transform:a").await;
        assert!(retrieved.is_some());
        assert_eq!(retrieved.unwrap().id, "transform:a");
    }

    #[tokio::test]
    async fn test_get_nonexistent_entity() {
        let registry = EntityRegistry::new();
        assert!(registry.get("transform:nope").await.is_none());
        assert!(!registry.contains("transform:nope").await);
    }

    #[tokio::test]
    async fn test_register_overwrites_existing() {
        let registry = EntityRegistry::new();

        registry.register(entity("transform:same")).await;
        registry
            .register(Entity::create("transform:same", EntitySource::new().value("$a")).unwrap())
            .await;

        let retrieved = registry.get("transform:same").await.unwrap();
        assert!(matches!(retrieved.kind, EntityKind::Transform(Some(_))));
        assert_eq!(registry.ids().await, vec!["transform:same"]);
    }

    #[tokio::test]
    async fn test_registry_is_clone() {
        let registry = EntityRegistry::new();
        registry.register(entity("transform:one")).await;

        let cloned = registry.clone();
        assert!(cloned.get("transform:one").await.is_some());

        // Registering on clone should be visible to original
        cloned.register(entity("hash:two")).await;
        assert!(registry.get("hash:two").await.is_some());
        assert_eq!(registry.ids().await, vec!["hash:two", "transform:one"]);
    }
}
