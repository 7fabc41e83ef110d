// SPDX-License-Identifier: MIT

//! Collection entities: transformations over arrays

use super::{create_optional, EntitySource};
use crate::core::error::{DataPointError, Result};
use crate::core::value::{inspect, type_of};
use crate::point::accumulator::Accumulator;
use crate::point::manager::DataPoint;
use crate::point::reducer::{helpers, resolve_optional, Reducer, ReducerInput};
use serde_json::Value;

#[derive(Debug, Clone, Default)]
pub struct CollectionDef {
    pub value: Option<Reducer>,
    pub compose: Option<Reducer>,
}

impl CollectionDef {
    pub fn create(source: &EntitySource) -> Result<Self> {
        let value = create_optional(&source.value)?;

        let mut modifiers = Vec::new();
        if let Some(map) = create_optional(&source.map)? {
            modifiers.push(helpers::map(map));
        }
        if let Some(filter) = create_optional(&source.filter)? {
            modifiers.push(helpers::filter(filter));
        }
        if let Some(find) = create_optional(&source.find)? {
            modifiers.push(helpers::find(find));
        }

        let compose = match &source.compose {
            Some(_) if !modifiers.is_empty() => {
                return Err(DataPointError::config(
                    "compose cannot be combined with map/filter/find",
                ))
            }
            Some(compose) => Some(create_compose(compose)?),
            None if modifiers.is_empty() => None,
            None => Some(Reducer::list(modifiers)),
        };

        Ok(Self { value, compose })
    }
}

/// `compose` is either a list of `{map|filter|find: reducer}` steps or
/// any other reducer.
fn create_compose(input: &ReducerInput) -> Result<Reducer> {
    if let ReducerInput::Source(Value::Array(steps)) = input {
        if !steps.is_empty() && steps.iter().all(is_modifier_step) {
            return steps
                .iter()
                .map(create_modifier_step)
                .collect::<Result<Vec<_>>>()
                .map(Reducer::list);
        }
    }
    input.create()
}

fn is_modifier_step(step: &Value) -> bool {
    match step.as_object() {
        Some(map) if map.len() == 1 => map
            .keys()
            .all(|k| matches!(k.as_str(), "map" | "filter" | "find")),
        _ => false,
    }
}

fn create_modifier_step(step: &Value) -> Result<Reducer> {
    let Some((name, source)) = step.as_object().and_then(|m| m.iter().next()) else {
        return Err(DataPointError::config("Empty compose step"));
    };
    let reducer = Reducer::parse(source)?;
    Ok(match name.as_str() {
        "map" => helpers::map(reducer),
        "filter" => helpers::filter(reducer),
        _ => helpers::find(reducer),
    })
}

fn validate_as_array(acc: &Accumulator) -> Result<()> {
    if acc.value.is_array() {
        return Ok(());
    }
    Err(DataPointError::TypeMismatch {
        entity_id: acc.entity().map(|e| e.id.clone()).unwrap_or_default(),
        expected: "arrays".to_string(),
        actual: type_of(&acc.value).to_string(),
        value: inspect(&acc.value),
    })
}

pub async fn resolve(
    manager: &DataPoint,
    acc: Accumulator,
    def: &CollectionDef,
) -> Result<Accumulator> {
    let acc = resolve_optional(manager, acc, def.value.as_ref()).await?;
    validate_as_array(&acc)?;
    resolve_optional(manager, acc, def.compose.as_ref()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::point::manager::NoTransport;
    use serde_json::json;
    use std::sync::Arc;

    async fn data_point(id: &str, source: EntitySource) -> DataPoint {
        let dp = DataPoint::with_transport(Arc::new(NoTransport));
        dp.add_entity(id, source).await.unwrap();
        dp
    }

    fn double() -> Reducer {
        Reducer::function(|v, _acc| Ok(json!(v.as_i64().unwrap_or(0) * 2)))
    }

    #[tokio::test]
    async fn test_map() {
        let dp = data_point("collection:double", EntitySource::new().map(double())).await;
        let out = dp.resolve("collection:double", json!([1, 2, 3])).await.unwrap();
        assert_eq!(out, json!([2, 4, 6]));
    }

    #[tokio::test]
    async fn test_value_then_map_filter_find() {
        let dp = data_point(
            "collection:first_big",
            EntitySource::new()
                .value("$items")
                .map(double())
                .filter(Reducer::function(|v, _acc| Ok(json!(v.as_i64().unwrap_or(0) > 2))))
                .find(Reducer::function(|v, _acc| Ok(json!(v.as_i64().unwrap_or(0) % 3 == 0)))),
        )
        .await;

        let out = dp
            .resolve("collection:first_big", json!({"items": [1, 2, 3, 4]}))
            .await
            .unwrap();
        assert_eq!(out, json!(6));
    }

    #[tokio::test]
    async fn test_compose_steps_run_in_declared_order() {
        let dp = data_point(
            "collection:names",
            EntitySource::new().compose(json!([
                {"filter": "$active"},
                {"map": "$name"}
            ])),
        )
        .await;

        let out = dp
            .resolve(
                "collection:names",
                json!([
                    {"name": "a", "active": true},
                    {"name": "b", "active": false},
                    {"name": "c", "active": true}
                ]),
            )
            .await
            .unwrap();
        assert_eq!(out, json!(["a", "c"]));
    }

    #[tokio::test]
    async fn test_only_resolves_arrays() {
        let dp = data_point("collection:a", EntitySource::new().map("$x")).await;
        let err = dp.resolve("collection:a", json!({"x": 1})).await.unwrap_err();
        match err.root() {
            DataPointError::TypeMismatch {
                entity_id,
                expected,
                ..
            } => {
                assert_eq!(entity_id, "collection:a");
                assert_eq!(expected, "arrays");
            }
            other => panic!("Expected TypeMismatch, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_element_errors_name_their_position() {
        let dp = data_point(
            "collection:strict",
            EntitySource::new().map(Reducer::function(|v, _acc| {
                if v.is_null() {
                    Err("null element".into())
                } else {
                    Ok(v)
                }
            })),
        )
        .await;

        let err = dp
            .resolve("collection:strict", json!([1, null]))
            .await
            .unwrap_err();
        assert_eq!(err.entity_id(), Some("collection:strict"));
        assert!(err.to_string().contains("map"));
        assert!(matches!(
            err,
            DataPointError::Entity { ref source, .. }
                if matches!(**source, DataPointError::Element { index: 1, .. })
        ));
    }

    #[test]
    fn test_compose_excludes_modifiers() {
        let source = EntitySource::new().compose(json!([{"map": "$a"}])).find("$b");
        assert!(matches!(
            CollectionDef::create(&source),
            Err(DataPointError::Config(_))
        ));
    }
}
