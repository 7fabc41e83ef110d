// SPDX-License-Identifier: MIT

//! The record threaded through every resolution step

use crate::point::entity::Entity;
use crate::point::reducer::EntityReducer;
use serde_json::{json, Map, Value};
use std::sync::Arc;

/// Value plus resolution metadata.
///
/// Resolvers never mutate an accumulator they were handed; every step
/// derives a new one through the `with_*` methods.
#[derive(Debug, Clone, Default)]
pub struct Accumulator {
    /// Current working value
    pub value: Value,
    /// Value captured when the current entity was entered
    pub initial_value: Value,
    /// Entity currently being resolved
    pub context: Option<Arc<Entity>>,
    /// Reference that led to the current entity
    pub reducer: Option<EntityReducer>,
    /// Shortcut to the current entity's params
    pub params: Value,
    /// Side channel carried across middleware boundaries
    pub locals: Map<String, Value>,
    /// Per-entity trace id, set when tracing
    pub euid: Option<String>,
    pub trace: bool,
}

/// Caller supplied options for a top-level resolve
#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    pub locals: Map<String, Value>,
    pub trace: bool,
}

impl ResolveOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_locals(mut self, locals: Map<String, Value>) -> Self {
        self.locals = locals;
        self
    }

    pub fn with_trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }
}

impl Accumulator {
    pub fn new(value: Value) -> Self {
        Self {
            initial_value: value.clone(),
            value,
            params: Value::Object(Map::new()),
            ..Default::default()
        }
    }

    pub fn with_options(value: Value, options: ResolveOptions) -> Self {
        Self {
            locals: options.locals,
            trace: options.trace,
            ..Self::new(value)
        }
    }

    /// Copy of this accumulator with a new value
    pub fn with_value(&self, value: Value) -> Self {
        Self {
            value,
            ..self.clone()
        }
    }

    /// Copy of this accumulator with a new value and locals
    pub fn with_value_and_locals(&self, value: Value, locals: Map<String, Value>) -> Self {
        Self {
            value,
            locals,
            ..self.clone()
        }
    }

    /// Bind an entity for the duration of its resolution
    pub fn enter(&self, entity: Arc<Entity>, reducer: EntityReducer) -> Self {
        Self {
            initial_value: self.value.clone(),
            params: Value::Object(entity.params.clone()),
            context: Some(entity),
            reducer: Some(reducer),
            ..self.clone()
        }
    }

    pub fn with_euid(&self, euid: String) -> Self {
        Self {
            euid: Some(euid),
            ..self.clone()
        }
    }

    /// The entity currently being resolved
    pub fn entity(&self) -> Option<&Entity> {
        self.context.as_deref()
    }

    /// Accumulator as seen from a `$..` path
    pub fn to_json(&self) -> Value {
        json!({
            "value": self.value,
            "initialValue": self.initial_value,
            "params": self.params,
            "locals": self.locals,
            "euid": self.euid,
            "trace": self.trace,
        })
    }

    /// Strip engine-internal fields before handing the accumulator to a caller
    pub fn stripped(mut self) -> Self {
        self.context = None;
        self.reducer = None;
        self.euid = None;
        self
    }
}
