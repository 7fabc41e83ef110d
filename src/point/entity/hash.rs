// SPDX-License-Identifier: MIT

//! Hash entities: transformations over plain objects

use super::{create_optional, EntitySource};
use crate::core::error::{DataPointError, Result};
use crate::core::value::{inspect, type_of};
use crate::point::accumulator::Accumulator;
use crate::point::manager::DataPoint;
use crate::point::reducer::{helpers, resolve_optional, Reducer};
use serde_json::Value;

#[derive(Debug, Clone, Default)]
pub struct HashDef {
    pub value: Option<Reducer>,
    pub compose: Option<Reducer>,
}

impl HashDef {
    /// Without an explicit `compose`, the key modifiers are chained in the
    /// order omitKeys, pickKeys, mapKeys, addValues, addKeys.
    pub fn create(source: &EntitySource) -> Result<Self> {
        let value = create_optional(&source.value)?;
        let compose = create_optional(&source.compose)?;

        let mut modifiers = Vec::new();
        if let Some(keys) = &source.omit_keys {
            modifiers.push(helpers::omit(keys.iter().cloned()));
        }
        if let Some(keys) = &source.pick_keys {
            modifiers.push(helpers::pick(keys.iter().cloned()));
        }
        if let Some(map_keys) = create_optional(&source.map_keys)? {
            modifiers.push(map_keys);
        }
        if let Some(values) = &source.add_values {
            modifiers.push(helpers::assign(helpers::constant(Value::Object(
                values.clone(),
            ))));
        }
        if let Some(add_keys) = create_optional(&source.add_keys)? {
            modifiers.push(helpers::assign(add_keys));
        }

        let compose = match (compose, modifiers.is_empty()) {
            (Some(_), false) => {
                return Err(DataPointError::config(
                    "compose cannot be combined with mapKeys/addKeys/addValues/pickKeys/omitKeys",
                ))
            }
            (Some(compose), true) => Some(compose),
            (None, false) => Some(Reducer::list(modifiers)),
            (None, true) => None,
        };

        Ok(Self { value, compose })
    }
}

fn validate_as_object(acc: &Accumulator) -> Result<()> {
    if acc.value.is_object() {
        return Ok(());
    }
    Err(DataPointError::TypeMismatch {
        entity_id: acc.entity().map(|e| e.id.clone()).unwrap_or_default(),
        expected: "plain objects".to_string(),
        actual: type_of(&acc.value).to_string(),
        value: inspect(&acc.value),
    })
}

pub async fn resolve(manager: &DataPoint, acc: Accumulator, def: &HashDef) -> Result<Accumulator> {
    validate_as_object(&acc)?;
    let acc = resolve_optional(manager, acc, def.value.as_ref()).await?;
    validate_as_object(&acc)?;
    resolve_optional(manager, acc, def.compose.as_ref()).await
}
