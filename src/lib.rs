// SPDX-License-Identifier: MIT

//! datapoint-rs: declarative data transformation
//!
//! Reducers describe how to turn one JSON value into another. Entities
//! are named, registered reducers with a lifecycle (type checks, hooks,
//! middleware, error recovery). A `DataPoint` manager holds the entities
//! and resolves reducers against input values.
//!
//! ```no_run
//! use datapoint_rs::{DataPoint, EntitySource};
//! use serde_json::json;
//!
//! # async fn run() -> datapoint_rs::Result<()> {
//! let dp = DataPoint::new()?;
//! dp.add_entity("hash:sample", EntitySource::new().value("$a.b").compose(json!({"c": "$c"})))
//!     .await?;
//! let out = dp.resolve("hash:sample", json!({"a": {"b": {"c": 5}}})).await?;
//! assert_eq!(out, json!({"c": 5}));
//! # Ok(())
//! # }
//! ```

pub mod core;
pub mod point;

pub use crate::core::error::{DataPointError, RequestError, Result};
pub use crate::core::transport::{RequestOptions, Transport, TransportResponse};
pub use crate::core::type_check::ValueType;
pub use crate::point::accumulator::{Accumulator, ResolveOptions};
pub use crate::point::entity::{EntitySource, EntityType, SelectCase};
pub use crate::point::manager::{DataPoint, NoTransport};
pub use crate::point::middleware::{Middleware, MiddlewareFlow};
pub use crate::point::reducer::{helpers, Reducer, ReducerInput};
