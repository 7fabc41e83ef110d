// SPDX-License-Identifier: MIT

//! Helper reducers
//!
//! Each helper wraps sub-reducers with a fixed aggregation contract. In
//! JSON/YAML sources a helper is an object with a single `$<name>` key,
//! e.g. `{"$map": "$name"}` or `{"$pick": ["a", "b"]}`.

use super::{resolve, Reducer};
use crate::core::error::{DataPointError, Result};
use crate::core::value::{inspect, is_falsy, is_truthy, type_of};
use crate::point::accumulator::Accumulator;
use crate::point::manager::DataPoint;
use futures::future::try_join_all;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Fallback used by `default`
#[derive(Clone)]
pub enum DefaultValue {
    Value(Value),
    Function(Arc<dyn Fn() -> Value + Send + Sync>),
}

impl std::fmt::Debug for DefaultValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DefaultValue::Value(v) => write!(f, "DefaultValue({})", v),
            DefaultValue::Function(_) => write!(f, "DefaultValue(<fn>)"),
        }
    }
}

#[derive(Debug, Clone)]
pub enum HelperReducer {
    /// Resolve per element, concurrently, keeping order
    Map(Reducer),
    /// Keep elements whose predicate resolves truthy
    Filter(Reducer),
    /// First element whose predicate resolves truthy, checked in order
    Find(Reducer),
    /// Merge the resolved object into the current object
    Assign(Reducer),
    /// Keep only the resolved list of keys
    Pick(Reducer),
    /// Drop the resolved list of keys
    Omit(Reducer),
    Constant(Value),
    Default(DefaultValue),
    /// Resolve every reducer against the same input, concurrently
    Parallel(Vec<Reducer>),
}

pub fn map(reducer: Reducer) -> Reducer {
    helper(HelperReducer::Map(reducer))
}

pub fn filter(reducer: Reducer) -> Reducer {
    helper(HelperReducer::Filter(reducer))
}

pub fn find(reducer: Reducer) -> Reducer {
    helper(HelperReducer::Find(reducer))
}

pub fn assign(reducer: Reducer) -> Reducer {
    helper(HelperReducer::Assign(reducer))
}

pub fn pick<S: Into<String>>(keys: impl IntoIterator<Item = S>) -> Reducer {
    helper(HelperReducer::Pick(key_list(keys)))
}

pub fn omit<S: Into<String>>(keys: impl IntoIterator<Item = S>) -> Reducer {
    helper(HelperReducer::Omit(key_list(keys)))
}

pub fn constant(value: Value) -> Reducer {
    helper(HelperReducer::Constant(value))
}

pub fn default(value: Value) -> Reducer {
    helper(HelperReducer::Default(DefaultValue::Value(value)))
}

pub fn default_with<F>(func: F) -> Reducer
where
    F: Fn() -> Value + Send + Sync + 'static,
{
    helper(HelperReducer::Default(DefaultValue::Function(Arc::new(func))))
}

pub fn parallel(reducers: Vec<Reducer>) -> Reducer {
    helper(HelperReducer::Parallel(reducers))
}

fn helper(helper: HelperReducer) -> Reducer {
    Reducer::Helper(Box::new(helper))
}

fn key_list<S: Into<String>>(keys: impl IntoIterator<Item = S>) -> Reducer {
    let keys: Vec<Value> = keys.into_iter().map(|k| Value::String(k.into())).collect();
    constant(Value::Array(keys))
}

/// A literal list of key names, or a reducer producing one
fn parse_keys(source: &Value) -> Result<Reducer> {
    match source {
        Value::Array(items) if items.iter().all(Value::is_string) => Ok(constant(source.clone())),
        other => Reducer::parse(other),
    }
}

impl HelperReducer {
    /// Recognize `{"$<helper>": source}`; any other object is not a helper
    pub fn parse(map: &Map<String, Value>) -> Result<Option<Self>> {
        if map.len() != 1 {
            return Ok(None);
        }
        let Some((key, source)) = map.iter().next() else {
            return Ok(None);
        };

        let helper = match key.as_str() {
            "$map" => HelperReducer::Map(Reducer::parse(source)?),
            "$filter" => HelperReducer::Filter(Reducer::parse(source)?),
            "$find" => HelperReducer::Find(Reducer::parse(source)?),
            "$assign" => HelperReducer::Assign(Reducer::parse(source)?),
            "$pick" => HelperReducer::Pick(parse_keys(source)?),
            "$omit" => HelperReducer::Omit(parse_keys(source)?),
            "$constant" => HelperReducer::Constant(source.clone()),
            "$default" => HelperReducer::Default(DefaultValue::Value(source.clone())),
            "$parallel" => match source {
                Value::Array(items) => HelperReducer::Parallel(
                    items.iter().map(Reducer::parse).collect::<Result<Vec<_>>>()?,
                ),
                other => {
                    return Err(DataPointError::config(format!(
                        "$parallel expects a list of reducers, got {}",
                        type_of(other)
                    )))
                }
            },
            other if other.starts_with('$') => {
                return Err(DataPointError::config(format!("Unknown helper '{}'", other)))
            }
            _ => return Ok(None),
        };

        Ok(Some(helper))
    }

    pub fn name(&self) -> &'static str {
        match self {
            HelperReducer::Map(_) => "map",
            HelperReducer::Filter(_) => "filter",
            HelperReducer::Find(_) => "find",
            HelperReducer::Assign(_) => "assign",
            HelperReducer::Pick(_) => "pick",
            HelperReducer::Omit(_) => "omit",
            HelperReducer::Constant(_) => "constant",
            HelperReducer::Default(_) => "default",
            HelperReducer::Parallel(_) => "parallel",
        }
    }

    pub async fn resolve(&self, manager: &DataPoint, acc: Accumulator) -> Result<Accumulator> {
        let value = match self {
            HelperReducer::Map(reducer) => {
                let items = self.expect_array(&acc.value)?;
                Value::Array(map_items(manager, &acc, items, reducer, self.name()).await?)
            }
            HelperReducer::Filter(reducer) => {
                let items = self.expect_array(&acc.value)?;
                let verdicts = map_items(manager, &acc, items, reducer, self.name()).await?;
                Value::Array(
                    items
                        .iter()
                        .zip(verdicts)
                        .filter(|(_, verdict)| is_truthy(verdict))
                        .map(|(item, _)| item.clone())
                        .collect(),
                )
            }
            HelperReducer::Find(reducer) => {
                let items = self.expect_array(&acc.value)?;
                let mut found = Value::Null;
                for (index, item) in items.iter().enumerate() {
                    let verdict = resolve(manager, acc.with_value(item.clone()), reducer)
                        .await
                        .map_err(|e| DataPointError::element(self.name(), index, e))?;
                    if is_truthy(&verdict.value) {
                        found = item.clone();
                        break;
                    }
                }
                found
            }
            HelperReducer::Assign(reducer) => {
                let mut target = self.expect_object(&acc.value)?.clone();
                let patch = resolve(manager, acc.clone(), reducer).await?;
                match patch.value {
                    Value::Object(patch) => target.extend(patch),
                    Value::Null => {}
                    other => return Err(self.type_error("object", &other)),
                }
                Value::Object(target)
            }
            HelperReducer::Pick(reducer) => {
                let source = self.expect_object(&acc.value)?;
                let keys = self.resolve_keys(manager, &acc, reducer).await?;
                Value::Object(
                    source
                        .iter()
                        .filter(|(k, _)| keys.contains(k))
                        .map(|(k, v)| (k.clone(), v.clone()))
                        .collect(),
                )
            }
            HelperReducer::Omit(reducer) => {
                let source = self.expect_object(&acc.value)?;
                let keys = self.resolve_keys(manager, &acc, reducer).await?;
                Value::Object(
                    source
                        .iter()
                        .filter(|(k, _)| !keys.contains(k))
                        .map(|(k, v)| (k.clone(), v.clone()))
                        .collect(),
                )
            }
            HelperReducer::Constant(value) => value.clone(),
            HelperReducer::Default(fallback) => {
                if !is_falsy(&acc.value) {
                    return Ok(acc);
                }
                match fallback {
                    DefaultValue::Value(v) => v.clone(),
                    DefaultValue::Function(f) => f(),
                }
            }
            HelperReducer::Parallel(reducers) => {
                let results =
                    try_join_all(reducers.iter().map(|r| resolve(manager, acc.clone(), r))).await?;
                Value::Array(results.into_iter().map(|a| a.value).collect())
            }
        };

        Ok(Accumulator { value, ..acc })
    }

    async fn resolve_keys(
        &self,
        manager: &DataPoint,
        acc: &Accumulator,
        reducer: &Reducer,
    ) -> Result<Vec<String>> {
        let keys = resolve(manager, acc.clone(), reducer).await?;
        match keys.value {
            Value::Array(items) => items
                .into_iter()
                .map(|k| match k {
                    Value::String(s) => Ok(s),
                    other => Err(self.type_error("string key", &other)),
                })
                .collect(),
            other => Err(self.type_error("array of keys", &other)),
        }
    }

    fn expect_array<'v>(&self, value: &'v Value) -> Result<&'v Vec<Value>> {
        value.as_array().ok_or_else(|| self.type_error("array", value))
    }

    fn expect_object<'v>(&self, value: &'v Value) -> Result<&'v Map<String, Value>> {
        value.as_object().ok_or_else(|| self.type_error("object", value))
    }

    fn type_error(&self, expected: &str, value: &Value) -> DataPointError {
        DataPointError::TypeCheck {
            expected: format!("{} (in {})", expected, self.name()),
            actual: type_of(value).to_string(),
            value: inspect(value),
        }
    }
}

/// Resolve a reducer for every element concurrently, preserving order.
/// Failures carry the element index and operation name.
async fn map_items(
    manager: &DataPoint,
    acc: &Accumulator,
    items: &[Value],
    reducer: &Reducer,
    operation: &str,
) -> Result<Vec<Value>> {
    let results = try_join_all(items.iter().enumerate().map(|(index, item)| {
        let item_acc = acc.with_value(item.clone());
        async move {
            resolve(manager, item_acc, reducer)
                .await
                .map(|a| a.value)
                .map_err(|e| DataPointError::element(operation, index, e))
        }
    }))
    .await?;
    Ok(results)
}
