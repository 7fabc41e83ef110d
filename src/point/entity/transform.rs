// SPDX-License-Identifier: MIT

//! Transform, entry, control and value entities

use super::{EntitySource, SelectCase};
use crate::core::error::{DataPointError, Result};
use crate::core::value::is_truthy;
use crate::point::accumulator::Accumulator;
use crate::point::manager::DataPoint;
use crate::point::reducer::{resolve, Reducer, ReducerInput};
use serde_json::Value;

/// `select` branches of a control entity
#[derive(Debug, Clone)]
pub struct ControlDef {
    pub cases: Vec<(Reducer, Reducer)>,
    pub default: Option<Reducer>,
}

impl ControlDef {
    pub fn create(id: &str, source: &EntitySource) -> Result<Self> {
        let select = source
            .select
            .as_ref()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                DataPointError::config(format!("{}: control entities need a select list", id))
            })?;

        let mut cases = Vec::new();
        let mut default = None;
        for (index, case) in select.iter().enumerate() {
            match case {
                SelectCase {
                    case: Some(when),
                    then: Some(then),
                    default: None,
                } => cases.push((when.create()?, then.create()?)),
                SelectCase {
                    case: None,
                    then: None,
                    default: Some(fallback),
                } if default.is_none() => default = Some(fallback.create()?),
                _ => {
                    return Err(DataPointError::config(format!(
                        "{}: select[{}] must be either {{case, do}} or a single {{default}}",
                        id, index
                    )))
                }
            }
        }

        Ok(Self { cases, default })
    }
}

/// Run the first branch whose `case` resolves truthy. Cases are checked in
/// order; with no match and no default the value passes through.
pub async fn resolve_control(
    manager: &DataPoint,
    acc: Accumulator,
    def: &ControlDef,
) -> Result<Accumulator> {
    for (when, then) in &def.cases {
        let verdict = resolve(manager, acc.clone(), when).await?;
        if is_truthy(&verdict.value) {
            return resolve(manager, acc, then).await;
        }
    }

    match &def.default {
        Some(fallback) => resolve(manager, acc, fallback).await,
        None => Ok(acc),
    }
}

/// A value entity's `value` must be literal JSON
pub fn literal_value(id: &str, source: &EntitySource) -> Result<Value> {
    match &source.value {
        Some(ReducerInput::Source(value)) => Ok(value.clone()),
        Some(ReducerInput::Reducer(_)) => Err(DataPointError::config(format!(
            "{}: value entities hold literal JSON, not reducers",
            id
        ))),
        None => Err(DataPointError::config(format!(
            "{}: value entities need a value",
            id
        ))),
    }
}
