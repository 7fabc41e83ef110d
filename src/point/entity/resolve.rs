// SPDX-License-Identifier: MIT

//! Entity lifecycle
//!
//! Resolving an entity reference runs, in order:
//!
//! 1. input type check
//! 2. middleware `before`, then `<type>:before`
//! 3. the entity's own `before`
//! 4. the kind-specific resolver
//! 5. the entity's own `after`
//! 6. middleware `<type>:after`, then `after`
//! 7. output type check
//!
//! A middleware bypass jumps straight to the output type check. Any
//! failure is annotated with the entity id and handed to the entity's
//! `error` reducer when it has one.

use super::{collection, hash, request, transform, Entity, EntityKind};
use crate::core::error::{DataPointError, Result};
use crate::core::value::{inspect, is_falsy};
use crate::point::accumulator::Accumulator;
use crate::point::manager::DataPoint;
use crate::point::middleware::MiddlewareFlow;
use crate::point::reducer::{resolve_optional, EntityReducer};
use futures::future::try_join_all;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

/// Resolve an entity reference, fanning out over arrays for `[]` references
pub async fn resolve(
    manager: &DataPoint,
    acc: Accumulator,
    reducer: &EntityReducer,
) -> Result<Accumulator> {
    if reducer.has_empty_conditional && is_falsy(&acc.value) {
        return Ok(acc);
    }

    if !reducer.as_collection {
        return resolve_entity(manager, acc, reducer).await;
    }

    let Value::Array(items) = &acc.value else {
        return Ok(acc.with_value(Value::Null));
    };

    let values = try_join_all(items.iter().map(|item| {
        let item_acc = acc.with_value(item.clone());
        async move {
            if reducer.has_empty_conditional && is_falsy(&item_acc.value) {
                return Ok(item_acc.value);
            }
            resolve_entity(manager, item_acc, reducer)
                .await
                .map(|a| a.value)
        }
    }))
    .await?;

    Ok(acc.with_value(Value::Array(values)))
}

async fn resolve_entity(
    manager: &DataPoint,
    acc: Accumulator,
    reducer: &EntityReducer,
) -> Result<Accumulator> {
    let entity = manager
        .entities()
        .get(&reducer.id)
        .await
        .ok_or_else(|| DataPointError::EntityNotFound(reducer.id.clone()))?;

    let mut entered = acc.enter(entity.clone(), reducer.clone());
    let timer = if acc.trace || entity.traced() {
        entered = entered.with_euid(Uuid::new_v4().to_string());
        Some(Instant::now())
    } else {
        None
    };

    let result = match run_lifecycle(manager, &entity, entered.clone()).await {
        Ok(out) => Ok(out),
        Err(err) => recover(manager, &entity, &entered, err).await,
    };

    if let Some(started) = timer {
        log::info!(
            "⧖ {}({}) {:?}{}",
            entity.id,
            entered.euid.as_deref().unwrap_or_default(),
            started.elapsed(),
            if result.is_err() { " failed" } else { "" }
        );
    }

    // nothing but the value leaves the entity
    result.map(|out| acc.with_value(out.value))
}

async fn run_lifecycle(
    manager: &DataPoint,
    entity: &Arc<Entity>,
    acc: Accumulator,
) -> Result<Accumulator> {
    if let Some(input_type) = &entity.input_type {
        // validators only accept or reject; their result is discarded
        resolve_optional(manager, acc.clone(), Some(input_type)).await?;
    }

    let acc = match run_stages(manager, entity, acc).await? {
        MiddlewareFlow::Continue(acc) | MiddlewareFlow::Bypass(acc) => acc,
    };

    check_output(manager, entity, acc).await
}

/// Middleware, hooks and the main resolver. Stops at the first bypass.
async fn run_stages(
    manager: &DataPoint,
    entity: &Arc<Entity>,
    acc: Accumulator,
) -> Result<MiddlewareFlow> {
    let type_name = entity.entity_type.name();
    let middleware = manager.middleware();

    let mut acc = acc;
    for stage in ["before".to_string(), format!("{}:before", type_name)] {
        match middleware.run(&stage, acc).await? {
            MiddlewareFlow::Continue(next) => acc = next,
            bypass => return Ok(bypass),
        }
    }

    let acc = resolve_optional(manager, acc, entity.before.as_ref()).await?;
    let acc = resolve_kind(manager, entity, acc).await?;
    let mut acc = resolve_optional(manager, acc, entity.after.as_ref()).await?;

    for stage in [format!("{}:after", type_name), "after".to_string()] {
        match middleware.run(&stage, acc).await? {
            MiddlewareFlow::Continue(next) => acc = next,
            bypass => return Ok(bypass),
        }
    }

    Ok(MiddlewareFlow::Continue(acc))
}

async fn resolve_kind(
    manager: &DataPoint,
    entity: &Arc<Entity>,
    acc: Accumulator,
) -> Result<Accumulator> {
    match &entity.kind {
        EntityKind::Hash(def) => hash::resolve(manager, acc, def).await,
        EntityKind::Collection(def) => collection::resolve(manager, acc, def).await,
        EntityKind::Request(def) => request::resolve_request(manager, acc, def).await,
        EntityKind::Control(def) => transform::resolve_control(manager, acc, def).await,
        EntityKind::Transform(value) | EntityKind::Entry(value) => {
            resolve_optional(manager, acc, value.as_ref()).await
        }
        EntityKind::Value(value) => Ok(acc.with_value(value.clone())),
    }
}

async fn check_output(
    manager: &DataPoint,
    entity: &Arc<Entity>,
    acc: Accumulator,
) -> Result<Accumulator> {
    if let Some(output_type) = &entity.output_type {
        resolve_optional(manager, acc.clone(), Some(output_type)).await?;
    }
    Ok(acc)
}

/// Annotate the failure and let the entity's `error` reducer handle it
async fn recover(
    manager: &DataPoint,
    entity: &Arc<Entity>,
    entered: &Accumulator,
    err: DataPointError,
) -> Result<Accumulator> {
    let err = err.with_entity(&entity.id);
    let Some(handler) = &entity.error else {
        return Err(err);
    };

    log::warn!("{} recovering from error: {}", entity.id, err);
    let error_value = err.to_value();
    log::debug!("{} error value {}", entity.id, inspect(&error_value));

    let recovered = resolve_optional(manager, entered.with_value(error_value), Some(handler))
        .await
        .map_err(|e| e.with_entity(&entity.id))?;
    check_output(manager, entity, recovered)
        .await
        .map_err(|e| e.with_entity(&entity.id))
}
