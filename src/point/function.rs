// SPDX-License-Identifier: MIT

//! Function reducers
//!
//! All user functions run through one contract, `ReducerFunction::call`,
//! which returns a value or fails. Plain closures, async closures and
//! continuation-style closures (`next(result)`) are adapted into it here.

use crate::core::error::{DataPointError, Result};
use crate::core::type_check::ValueType;
use crate::point::accumulator::Accumulator;
use async_trait::async_trait;
use serde_json::Value;
use std::future::Future;
use std::marker::PhantomData;
use tokio::sync::oneshot;

/// A user supplied transform over the current value
#[async_trait]
pub trait ReducerFunction: Send + Sync {
    async fn call(&self, value: Value, acc: &Accumulator) -> Result<Value>;
}

/// Synchronous closure `(value, acc) -> Result<value>`
pub struct SyncFn<F>(pub F);

#[async_trait]
impl<F> ReducerFunction for SyncFn<F>
where
    F: Fn(Value, &Accumulator) -> Result<Value> + Send + Sync,
{
    async fn call(&self, value: Value, acc: &Accumulator) -> Result<Value> {
        (self.0)(value, acc)
    }
}

/// Async closure `(value, acc) -> Future<Result<value>>`
pub struct AsyncFn<F, Fut> {
    func: F,
    _future: PhantomData<fn() -> Fut>,
}

impl<F, Fut> AsyncFn<F, Fut> {
    pub fn new(func: F) -> Self {
        Self {
            func,
            _future: PhantomData,
        }
    }
}

#[async_trait]
impl<F, Fut> ReducerFunction for AsyncFn<F, Fut>
where
    F: Fn(Value, Accumulator) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value>> + Send,
{
    async fn call(&self, value: Value, acc: &Accumulator) -> Result<Value> {
        (self.func)(value, acc.clone()).await
    }
}

/// Continuation handed to callback-style reducers
pub struct Next {
    sender: oneshot::Sender<Result<Value>>,
}

impl Next {
    /// Complete the reducer with a result
    pub fn done(self, result: Result<Value>) {
        // receiver is gone only when the resolution was abandoned
        let _ = self.sender.send(result);
    }

    pub fn ok(self, value: Value) {
        self.done(Ok(value))
    }

    pub fn err(self, error: impl Into<DataPointError>) {
        self.done(Err(error.into()))
    }
}

/// Callback closure `(value, acc, next)`; the reducer suspends until
/// `next` is invoked, possibly from another task.
pub struct CallbackFn<F>(pub F);

#[async_trait]
impl<F> ReducerFunction for CallbackFn<F>
where
    F: Fn(Value, Accumulator, Next) + Send + Sync,
{
    async fn call(&self, value: Value, acc: &Accumulator) -> Result<Value> {
        let (sender, receiver) = oneshot::channel();
        (self.0)(value, acc.clone(), Next { sender });
        receiver.await.map_err(|_| {
            DataPointError::reducer("callback reducer finished without calling next")
        })?
    }
}

/// Built-in validator reducer
pub struct TypeCheckFn(pub ValueType);

#[async_trait]
impl ReducerFunction for TypeCheckFn {
    async fn call(&self, value: Value, _acc: &Accumulator) -> Result<Value> {
        self.0.check(&value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_sync_fn() {
        let f = SyncFn(|v: Value, _acc: &Accumulator| -> Result<Value> {
            Ok(json!(v.as_i64().unwrap_or(0) + 1))
        });
        let out = f.call(json!(1), &Accumulator::new(json!(1))).await.unwrap();
        assert_eq!(out, json!(2));
    }

    #[tokio::test]
    async fn test_async_fn() {
        let f = AsyncFn::new(|v: Value, _acc: Accumulator| async move {
            tokio::task::yield_now().await;
            Ok::<_, DataPointError>(json!(format!("{} World", v.as_str().unwrap_or_default())))
        });
        let out = f
            .call(json!("Hello"), &Accumulator::new(json!("Hello")))
            .await
            .unwrap();
        assert_eq!(out, json!("Hello World"));
    }

    #[tokio::test]
    async fn test_callback_fn_from_spawned_task() {
        let f = CallbackFn(|v: Value, _acc: Accumulator, next: Next| {
            tokio::spawn(async move {
                next.ok(json!([v, "later"]));
            });
        });
        let out = f.call(json!("now"), &Accumulator::default()).await.unwrap();
        assert_eq!(out, json!(["now", "later"]));
    }

    #[tokio::test]
    async fn test_callback_fn_error() {
        let f = CallbackFn(|_v: Value, _acc: Accumulator, next: Next| next.err("nope"));
        let err = f.call(json!(1), &Accumulator::default()).await.unwrap_err();
        assert_eq!(err.to_string(), "nope");
    }

    #[tokio::test]
    async fn test_callback_fn_dropped_next() {
        let f = CallbackFn(|_v: Value, _acc: Accumulator, _next: Next| {});
        assert!(f.call(json!(1), &Accumulator::default()).await.is_err());
    }
}
