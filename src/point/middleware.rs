// SPDX-License-Identifier: MIT

//! Middleware stacks
//!
//! Handlers are registered under a name such as `before`, `after`,
//! `hash:before` or `request:after` and run in registration order whenever
//! an entity passes that point of its lifecycle. A handler either hands the
//! accumulator to the next one or bypasses the rest of the lifecycle with a
//! final value.

use crate::core::error::Result;
use crate::point::accumulator::Accumulator;
use async_trait::async_trait;
use std::collections::HashMap;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Outcome of one middleware handler
#[derive(Debug, Clone)]
pub enum MiddlewareFlow {
    /// Keep going with this accumulator
    Continue(Accumulator),
    /// Skip everything up to the output type check, resolving to this value
    Bypass(Accumulator),
}

impl MiddlewareFlow {
    pub fn accumulator(&self) -> &Accumulator {
        match self {
            MiddlewareFlow::Continue(acc) | MiddlewareFlow::Bypass(acc) => acc,
        }
    }
}

#[async_trait]
pub trait Middleware: Send + Sync {
    async fn handle(&self, acc: Accumulator) -> Result<MiddlewareFlow>;
}

/// Async closure adapter
pub struct MiddlewareFn<F, Fut> {
    func: F,
    _future: PhantomData<fn() -> Fut>,
}

impl<F, Fut> MiddlewareFn<F, Fut> {
    pub fn new(func: F) -> Self {
        Self {
            func,
            _future: PhantomData,
        }
    }
}

#[async_trait]
impl<F, Fut> Middleware for MiddlewareFn<F, Fut>
where
    F: Fn(Accumulator) -> Fut + Send + Sync,
    Fut: Future<Output = Result<MiddlewareFlow>> + Send,
{
    async fn handle(&self, acc: Accumulator) -> Result<MiddlewareFlow> {
        (self.func)(acc).await
    }
}

#[derive(Clone, Default)]
pub struct MiddlewareRegistry {
    stacks: Arc<RwLock<HashMap<String, Vec<Arc<dyn Middleware>>>>>,
}

impl MiddlewareRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a handler to the named stack
    pub async fn register(&self, name: impl Into<String>, middleware: Arc<dyn Middleware>) {
        let mut stacks = self.stacks.write().await;
        stacks.entry(name.into()).or_default().push(middleware);
    }

    /// Append an async closure to the named stack
    pub async fn use_fn<F, Fut>(&self, name: impl Into<String>, func: F)
    where
        F: Fn(Accumulator) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<MiddlewareFlow>> + Send + 'static,
    {
        self.register(name, Arc::new(MiddlewareFn::new(func))).await
    }

    pub async fn clear(&self) {
        self.stacks.write().await.clear();
    }

    pub async fn len(&self, name: &str) -> usize {
        self.stacks.read().await.get(name).map_or(0, Vec::len)
    }

    /// Run the named stack. Handlers only change `value` and `locals`; the
    /// rest of the accumulator is owned by the engine.
    pub async fn run(&self, name: &str, acc: Accumulator) -> Result<MiddlewareFlow> {
        let stack = match self.stacks.read().await.get(name) {
            Some(stack) => stack.clone(),
            None => return Ok(MiddlewareFlow::Continue(acc)),
        };

        let mut acc = acc;
        for middleware in stack {
            let flow = middleware.handle(acc.clone()).await?;
            let (bypass, out) = match flow {
                MiddlewareFlow::Continue(out) => (false, out),
                MiddlewareFlow::Bypass(out) => (true, out),
            };
            acc = acc.with_value_and_locals(out.value, out.locals);
            if bypass {
                log::debug!("middleware '{}' bypassed resolution", name);
                return Ok(MiddlewareFlow::Bypass(acc));
            }
        }
        Ok(MiddlewareFlow::Continue(acc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::DataPointError;
    use serde_json::json;

    #[tokio::test]
    async fn test_empty_stack_continues() {
        let registry = MiddlewareRegistry::new();
        let flow = registry.run("before", Accumulator::new(json!(1))).await.unwrap();
        assert!(matches!(flow, MiddlewareFlow::Continue(ref acc) if acc.value == json!(1)));
    }

    #[tokio::test]
    async fn test_handlers_run_in_order() {
        let registry = MiddlewareRegistry::new();
        registry
            .use_fn("before", |acc: Accumulator| async move {
                let n = acc.value.as_i64().unwrap_or(0);
                Ok(MiddlewareFlow::Continue(acc.with_value(json!(n * 10))))
            })
            .await;
        registry
            .use_fn("before", |acc: Accumulator| async move {
                let n = acc.value.as_i64().unwrap_or(0);
                Ok(MiddlewareFlow::Continue(acc.with_value(json!(n + 1))))
            })
            .await;

        let flow = registry.run("before", Accumulator::new(json!(2))).await.unwrap();
        assert_eq!(flow.accumulator().value, json!(21));
        assert_eq!(registry.len("before").await, 2);
    }

    #[tokio::test]
    async fn test_bypass_stops_the_stack() {
        let registry = MiddlewareRegistry::new();
        registry
            .use_fn("hash:before", |acc: Accumulator| async move {
                Ok(MiddlewareFlow::Bypass(acc.with_value(json!("cached"))))
            })
            .await;
        registry
            .use_fn("hash:before", |_acc: Accumulator| async move {
                Err::<MiddlewareFlow, _>(DataPointError::reducer("never reached"))
            })
            .await;

        let flow = registry.run("hash:before", Accumulator::new(json!(1))).await.unwrap();
        assert!(matches!(flow, MiddlewareFlow::Bypass(ref acc) if acc.value == json!("cached")));
    }

    #[tokio::test]
    async fn test_only_value_and_locals_are_taken() {
        let registry = MiddlewareRegistry::new();
        registry
            .use_fn("after", |mut acc: Accumulator| async move {
                acc.locals.insert("seen".to_string(), json!(true));
                acc.trace = true;
                acc.initial_value = json!("tampered");
                Ok(MiddlewareFlow::Continue(acc))
            })
            .await;

        let flow = registry.run("after", Accumulator::new(json!(1))).await.unwrap();
        let acc = flow.accumulator();
        assert_eq!(acc.locals.get("seen"), Some(&json!(true)));
        assert!(!acc.trace);
        assert_eq!(acc.initial_value, json!(1));
    }

    #[tokio::test]
    async fn test_clear() {
        let registry = MiddlewareRegistry::new();
        registry
            .use_fn("before", |acc: Accumulator| async move { Ok(MiddlewareFlow::Continue(acc)) })
            .await;
        registry.clear().await;
        assert_eq!(registry.len("before").await, 0);
    }
}
