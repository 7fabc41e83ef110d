// SPDX-License-Identifier: MIT

//! Object template reducers

use super::{resolve, Reducer};
use crate::core::error::Result;
use crate::point::accumulator::Accumulator;
use crate::point::manager::DataPoint;
use futures::future::try_join_all;
use serde_json::{Map, Value};

/// Keys mapped to reducers. Every key is resolved against the same input
/// accumulator; results keep the declared key order.
#[derive(Debug, Clone)]
pub struct ObjectReducer {
    pub props: Vec<(String, Reducer)>,
}

impl ObjectReducer {
    pub fn new<K: Into<String>>(props: impl IntoIterator<Item = (K, Reducer)>) -> Self {
        Self {
            props: props.into_iter().map(|(k, r)| (k.into(), r)).collect(),
        }
    }

    pub fn parse(map: &Map<String, Value>) -> Result<Self> {
        let props = map
            .iter()
            .map(|(key, source)| Ok((key.clone(), Reducer::parse(source)?)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { props })
    }

    pub async fn resolve(&self, manager: &DataPoint, acc: Accumulator) -> Result<Accumulator> {
        let values = try_join_all(
            self.props
                .iter()
                .map(|(_, reducer)| resolve(manager, acc.clone(), reducer)),
        )
        .await?;

        let object: Map<String, Value> = self
            .props
            .iter()
            .zip(values)
            .map(|((key, _), result)| (key.clone(), result.value))
            .collect();

        Ok(Accumulator {
            value: Value::Object(object),
            ..acc
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::point::manager::{DataPoint, NoTransport};
    use serde_json::json;
    use std::sync::Arc;

    async fn resolve_template(source: Value, value: Value) -> Result<Value> {
        let manager = DataPoint::with_transport(Arc::new(NoTransport));
        let reducer = match Reducer::parse(&source)? {
            Reducer::Object(object) => object,
            other => panic!("Expected Object, got {:?}", other),
        };
        reducer
            .resolve(&manager, Accumulator::new(value))
            .await
            .map(|acc| acc.value)
    }

    #[tokio::test]
    async fn test_resolves_each_key_against_same_input() {
        let out = resolve_template(
            json!({"y": "$x.y", "z": {"a": "$a", "b": "$b"}}),
            json!({"a": "A", "b": "B", "x": {"y": "Y"}}),
        )
        .await
        .unwrap();
        assert_eq!(out, json!({"y": "Y", "z": {"a": "A", "b": "B"}}));
    }

    #[tokio::test]
    async fn test_lists_inside_keys_are_chained() {
        let out = resolve_template(
            json!({"x": ["$a", {"a": "$a"}], "y": [{"a": "$a"}, "$a"]}),
            json!({"a": {"a": 1, "b": 2}}),
        )
        .await
        .unwrap();
        assert_eq!(out, json!({"x": {"a": 1}, "y": {"a": 1, "b": 2}}));
    }

    #[tokio::test]
    async fn test_key_set_matches_template() {
        let out = resolve_template(json!({"c": "$missing", "a": "$a", "b": "$b"}), json!({"a": 1}))
            .await
            .unwrap();
        let keys: Vec<&String> = out.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["c", "a", "b"]);
    }

    #[tokio::test]
    async fn test_empty_template_resolves_to_empty_object() {
        let out = resolve_template(json!({}), json!({"a": 1})).await.unwrap();
        assert_eq!(out, json!({}));
    }

    #[tokio::test]
    async fn test_failing_key_fails_whole_object() {
        let manager = DataPoint::with_transport(Arc::new(NoTransport));
        let reducer = ObjectReducer::new(vec![
            ("ok", Reducer::path("$a")),
            (
                "bad",
                Reducer::function(|_v, _acc| Err("key failed".into())),
            ),
        ]);
        let err = reducer
            .resolve(&manager, Accumulator::new(json!({"a": 1})))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "key failed");
    }
}
