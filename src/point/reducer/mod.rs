// SPDX-License-Identifier: MIT

//! Reducers: the unit of transformation
//!
//! A reducer is classified once, when it is created from a JSON/YAML
//! source or built from closures. Resolution is an exhaustive match over
//! the variants:
//! - `$a.b` path lookups
//! - functions (sync, async or continuation style)
//! - entity references such as `hash:person`, `?request:user[]`
//! - lists, applied left to right
//! - object templates, each key resolved against the same input
//! - helpers (`$map`, `$filter`, `$find`, ...)

mod entity_ref;
pub mod helpers;
mod object;
mod path;

pub use entity_ref::EntityReducer;
pub use helpers::{DefaultValue, HelperReducer};
pub use object::ObjectReducer;
pub use path::{PathReducer, PathScope};

use crate::core::error::{DataPointError, Result};
use crate::core::type_check::ValueType;
use crate::core::value::type_of;
use crate::point::accumulator::Accumulator;
use crate::point::entity;
use crate::point::function::{AsyncFn, CallbackFn, Next, ReducerFunction, SyncFn, TypeCheckFn};
use crate::point::manager::DataPoint;
use futures::future::BoxFuture;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;

/// A resolved-once, type-tagged reducer
#[derive(Debug, Clone)]
pub enum Reducer {
    Path(PathReducer),
    Function(FunctionReducer),
    Entity(EntityReducer),
    List(Vec<Reducer>),
    Object(ObjectReducer),
    Helper(Box<HelperReducer>),
}

/// A user function wrapped as a reducer
#[derive(Clone)]
pub struct FunctionReducer {
    pub name: String,
    pub func: Arc<dyn ReducerFunction>,
}

impl std::fmt::Debug for FunctionReducer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "FunctionReducer({})", self.name)
    }
}

impl Reducer {
    /// Create a reducer from its JSON source. Unrecognized shapes are
    /// configuration errors.
    pub fn parse(source: &Value) -> Result<Self> {
        match source {
            Value::String(s) if s.starts_with('$') => Ok(Reducer::Path(PathReducer::parse(s))),
            Value::String(s) => match EntityReducer::parse(s) {
                Some(reducer) => Ok(Reducer::Entity(reducer?)),
                None => Err(DataPointError::config(format!(
                    "'{}' is neither a path (missing '$' prefix) nor an entity reference",
                    s
                ))),
            },
            Value::Array(items) => items
                .iter()
                .map(Reducer::parse)
                .collect::<Result<Vec<_>>>()
                .map(Reducer::List),
            Value::Object(map) => {
                if let Some(helper) = HelperReducer::parse(map)? {
                    return Ok(Reducer::Helper(Box::new(helper)));
                }
                ObjectReducer::parse(map).map(Reducer::Object)
            }
            other => Err(DataPointError::config(format!(
                "Invalid reducer type {} ({}), wrap literals with $constant",
                type_of(other),
                other
            ))),
        }
    }

    /// Path lookup; the leading `$` is optional here
    pub fn path(path: &str) -> Self {
        if path.starts_with('$') {
            Reducer::Path(PathReducer::parse(path))
        } else {
            Reducer::Path(PathReducer::parse(&format!("${}", path)))
        }
    }

    /// Entity reference such as `hash:person[]`
    pub fn entity(reference: &str) -> Result<Self> {
        EntityReducer::parse(reference)
            .unwrap_or_else(|| {
                Err(DataPointError::config(format!(
                    "'{}' is not an entity reference",
                    reference
                )))
            })
            .map(Reducer::Entity)
    }

    pub fn list(reducers: Vec<Reducer>) -> Self {
        Reducer::List(reducers)
    }

    pub fn object<K: Into<String>>(props: impl IntoIterator<Item = (K, Reducer)>) -> Self {
        Reducer::Object(ObjectReducer::new(props))
    }

    pub fn constant(value: Value) -> Self {
        helpers::constant(value)
    }

    /// Synchronous function reducer
    pub fn function<F>(func: F) -> Self
    where
        F: Fn(Value, &Accumulator) -> Result<Value> + Send + Sync + 'static,
    {
        Self::from_function("function", SyncFn(func))
    }

    /// Async function reducer
    pub fn function_async<F, Fut>(func: F) -> Self
    where
        F: Fn(Value, Accumulator) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        Self::from_function("async function", AsyncFn::new(func))
    }

    /// Continuation-style reducer, completes when `next` is invoked
    pub fn callback<F>(func: F) -> Self
    where
        F: Fn(Value, Accumulator, Next) + Send + Sync + 'static,
    {
        Self::from_function("callback", CallbackFn(func))
    }

    /// Built-in validator that fails unless the value has the given type
    pub fn type_check(value_type: ValueType) -> Self {
        Self::from_function(&format!("is_{}", value_type), TypeCheckFn(value_type))
    }

    pub fn from_function(name: &str, func: impl ReducerFunction + 'static) -> Self {
        Reducer::Function(FunctionReducer {
            name: name.to_string(),
            func: Arc::new(func),
        })
    }
}

impl TryFrom<Value> for Reducer {
    type Error = DataPointError;

    fn try_from(source: Value) -> Result<Self> {
        Reducer::parse(&source)
    }
}

/// A reducer as written in an entity source: raw JSON that is validated
/// at registration, or an already built reducer.
#[derive(Debug, Clone)]
pub enum ReducerInput {
    Source(Value),
    Reducer(Reducer),
}

impl ReducerInput {
    pub fn create(&self) -> Result<Reducer> {
        match self {
            ReducerInput::Source(source) => Reducer::parse(source),
            ReducerInput::Reducer(reducer) => Ok(reducer.clone()),
        }
    }
}

impl From<Value> for ReducerInput {
    fn from(source: Value) -> Self {
        ReducerInput::Source(source)
    }
}

impl From<&str> for ReducerInput {
    fn from(source: &str) -> Self {
        ReducerInput::Source(Value::String(source.to_string()))
    }
}

impl From<String> for ReducerInput {
    fn from(source: String) -> Self {
        ReducerInput::Source(Value::String(source))
    }
}

impl From<Reducer> for ReducerInput {
    fn from(reducer: Reducer) -> Self {
        ReducerInput::Reducer(reducer)
    }
}

impl<'de> Deserialize<'de> for ReducerInput {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        Value::deserialize(deserializer).map(ReducerInput::Source)
    }
}

/// Resolve a reducer against an accumulator, producing a new accumulator
pub fn resolve<'a>(
    manager: &'a DataPoint,
    acc: Accumulator,
    reducer: &'a Reducer,
) -> BoxFuture<'a, Result<Accumulator>> {
    Box::pin(async move {
        match reducer {
            Reducer::Path(path) => {
                let value = path.resolve(&acc);
                Ok(Accumulator { value, ..acc })
            }
            Reducer::Function(function) => {
                let value = function.func.call(acc.value.clone(), &acc).await?;
                Ok(Accumulator { value, ..acc })
            }
            Reducer::Entity(entity_reducer) => {
                entity::resolve::resolve(manager, acc, entity_reducer).await
            }
            Reducer::List(reducers) => resolve_list(manager, acc, reducers).await,
            Reducer::Object(object) => object.resolve(manager, acc).await,
            Reducer::Helper(helper) => helper.resolve(manager, acc).await,
        }
    })
}

/// Absent reducers are the identity
pub async fn resolve_optional(
    manager: &DataPoint,
    acc: Accumulator,
    reducer: Option<&Reducer>,
) -> Result<Accumulator> {
    match reducer {
        Some(reducer) => resolve(manager, acc, reducer).await,
        None => Ok(acc),
    }
}

/// Sequential fold; an empty list resolves to `null`
async fn resolve_list(
    manager: &DataPoint,
    acc: Accumulator,
    reducers: &[Reducer],
) -> Result<Accumulator> {
    if reducers.is_empty() {
        return Ok(Accumulator {
            value: Value::Null,
            ..acc
        });
    }

    let mut acc = acc;
    for reducer in reducers {
        acc = resolve(manager, acc, reducer).await?;
    }
    Ok(acc)
}
