// SPDX-License-Identifier: MIT

//! The `DataPoint` manager: entity registry, middleware and transport

use crate::core::error::{RequestError, Result};
use crate::core::http::HttpTransport;
use crate::core::transport::{RequestOptions, Transport, TransportResponse};
use crate::point::accumulator::{Accumulator, ResolveOptions};
use crate::point::entity::{Entity, EntitySource};
use crate::point::loader::EntityLoader;
use crate::point::middleware::MiddlewareRegistry;
use crate::point::reducer::{self, ReducerInput};
use crate::point::registry::EntityRegistry;
use async_trait::async_trait;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;

/// Transport for managers that never issue requests
pub struct NoTransport;

#[async_trait]
impl Transport for NoTransport {
    async fn dispatch(
        &self,
        options: &RequestOptions,
    ) -> std::result::Result<TransportResponse, RequestError> {
        Err(RequestError::new(format!(
            "no transport configured for {}",
            options.url
        )))
    }
}

#[derive(Clone)]
pub struct DataPoint {
    entities: EntityRegistry,
    middleware: MiddlewareRegistry,
    transport: Arc<dyn Transport>,
}

impl DataPoint {
    /// Manager backed by the HTTP transport
    pub fn new() -> Result<Self> {
        Ok(Self::with_transport(Arc::new(HttpTransport::new()?)))
    }

    pub fn with_transport(transport: Arc<dyn Transport>) -> Self {
        Self {
            entities: EntityRegistry::new(),
            middleware: MiddlewareRegistry::new(),
            transport,
        }
    }

    pub fn entities(&self) -> &EntityRegistry {
        &self.entities
    }

    pub fn middleware(&self) -> &MiddlewareRegistry {
        &self.middleware
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Validate and register one entity. Malformed definitions are
    /// rejected here, never at resolve time.
    pub async fn add_entity(&self, id: &str, source: EntitySource) -> Result<()> {
        let entity = Entity::create(id, source)?;
        log::debug!("registered {}", id);
        self.entities.register(entity).await;
        Ok(())
    }

    /// Register several entities. Every definition is validated before
    /// any is registered, so one invalid source leaves the registry as it was.
    pub async fn add_entities<I, S>(&self, sources: I) -> Result<()>
    where
        I: IntoIterator<Item = (S, EntitySource)>,
        S: AsRef<str>,
    {
        let entities = sources
            .into_iter()
            .map(|(id, source)| Entity::create(id.as_ref(), source))
            .collect::<Result<Vec<_>>>()?;

        for entity in entities {
            log::debug!("registered {}", entity.id);
            self.entities.register(entity).await;
        }
        Ok(())
    }

    /// Register every entity of a YAML/JSON definitions file
    pub async fn load_file<P: AsRef<Path>>(&self, path: P) -> Result<usize> {
        let file = EntityLoader::new().load_file(path)?;
        let count = file.entities.len();
        self.add_entities(file.entities).await?;
        log::info!("loaded {} entities", count);
        Ok(count)
    }

    /// Resolve a reducer (or entity id) against a value
    pub async fn resolve(&self, reducer: impl Into<ReducerInput>, input: Value) -> Result<Value> {
        self.resolve_with(reducer, input, ResolveOptions::default())
            .await
    }

    pub async fn resolve_with(
        &self,
        reducer: impl Into<ReducerInput>,
        input: Value,
        options: ResolveOptions,
    ) -> Result<Value> {
        self.transform(reducer, input, options)
            .await
            .map(|acc| acc.value)
    }

    /// Like `resolve_with`, returning the whole accumulator with the
    /// engine-internal fields removed
    pub async fn transform(
        &self,
        reducer: impl Into<ReducerInput>,
        input: Value,
        options: ResolveOptions,
    ) -> Result<Accumulator> {
        let reducer = reducer.into().create()?;
        let acc = Accumulator::with_options(input, options);
        reducer::resolve(self, acc, &reducer)
            .await
            .map(Accumulator::stripped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::DataPointError;
    use crate::point::reducer::Reducer;
    use serde_json::json;

    fn manager() -> DataPoint {
        DataPoint::with_transport(Arc::new(NoTransport))
    }

    #[tokio::test]
    async fn test_add_entity_rejects_invalid_definition() {
        let dp = manager();
        let err = dp
            .add_entity("hash:bad", EntitySource::new().value(json!(5)))
            .await
            .unwrap_err();
        assert!(matches!(err, DataPointError::Config(_)));
        assert!(!dp.entities().contains("hash:bad").await);

        let err = dp.add_entity("widget:a", EntitySource::new()).await.unwrap_err();
        assert!(matches!(err, DataPointError::UnknownEntityType(_)));
    }

    #[tokio::test]
    async fn test_add_entities_is_all_or_nothing() {
        let dp = manager();
        let err = dp
            .add_entities(vec![
                ("hash:good", EntitySource::new().value("$a")),
                ("transform:bad", EntitySource::new().value(json!("not a reducer"))),
            ])
            .await
            .unwrap_err();
        assert!(matches!(err, DataPointError::Config(_)));
        assert!(dp.entities().ids().await.is_empty());

        dp.add_entities(vec![("hash:good", EntitySource::new().value("$a"))])
            .await
            .unwrap();
        assert!(dp.entities().contains("hash:good").await);
    }

    #[tokio::test]
    async fn test_resolve_rejects_malformed_reducer() {
        let err = manager().resolve(json!(true), json!(1)).await.unwrap_err();
        assert!(matches!(err, DataPointError::Config(_)));
    }

    #[tokio::test]
    async fn test_transform_strips_internal_fields() {
        let dp = manager();
        dp.add_entity("transform:a", EntitySource::new().value("$x"))
            .await
            .unwrap();

        let acc = dp
            .transform("transform:a", json!({"x": 1}), ResolveOptions::new().with_trace(true))
            .await
            .unwrap();
        assert_eq!(acc.value, json!(1));
        assert!(acc.context.is_none());
        assert!(acc.reducer.is_none());
        assert!(acc.euid.is_none());
    }

    #[tokio::test]
    async fn test_resolve_built_reducer() {
        let out = manager()
            .resolve(
                Reducer::list(vec![Reducer::path("a"), Reducer::function(|v, _acc| Ok(json!([v])))]),
                json!({"a": 7}),
            )
            .await
            .unwrap();
        assert_eq!(out, json!([7]));
    }

    #[tokio::test]
    async fn test_resolution_is_repeatable() {
        let dp = manager();
        dp.add_entity(
            "hash:sample",
            EntitySource::new().value("$a.b").compose(json!({"c": "$c"})),
        )
        .await
        .unwrap();

        let input = json!({"a": {"b": {"c": 5}}});
        let first = dp.resolve("hash:sample", input.clone()).await.unwrap();
        let second = dp.resolve("hash:sample", input).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_no_transport_fails_requests() {
        let dp = manager();
        dp.add_entity("request:a", EntitySource::new().url("http://localhost/a"))
            .await
            .unwrap();
        let err = dp.resolve("request:a", Value::Null).await.unwrap_err();
        assert_eq!(err.name(), "RequestError");
    }
}
