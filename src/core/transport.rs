// SPDX-License-Identifier: MIT

//! Transport seam used by request entities
//!
//! The engine assembles `RequestOptions` and hands them to a `Transport`;
//! it never talks to the network itself.

use crate::core::error::RequestError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Options describing a single outgoing request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestOptions {
    pub url: String,
    pub method: String,
    /// Query string parameters
    #[serde(alias = "qs")]
    pub query: Map<String, Value>,
    pub headers: Map<String, Value>,
    /// JSON body
    #[serde(alias = "json", skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            url: String::new(),
            method: "GET".to_string(),
            query: Map::new(),
            headers: Map::new(),
            body: None,
            timeout_ms: None,
        }
    }
}

impl RequestOptions {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }
}

/// Successful transport response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportResponse {
    pub status: u16,
    #[serde(default)]
    pub headers: Map<String, Value>,
    /// Parsed JSON body, or the raw text as a string when it is not JSON
    pub body: Value,
}

impl TransportResponse {
    pub fn ok(body: Value) -> Self {
        Self {
            status: 200,
            headers: Map::new(),
            body,
        }
    }
}

/// Dispatches request options and reports the response or a typed failure
#[async_trait]
pub trait Transport: Send + Sync {
    async fn dispatch(&self, options: &RequestOptions) -> Result<TransportResponse, RequestError>;
}

/// Render a query or header value the way it goes on the wire
pub fn wire_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_options_defaults() {
        let options: RequestOptions = serde_json::from_value(json!({"url": "http://x"})).unwrap();
        assert_eq!(options.method, "GET");
        assert!(options.query.is_empty());
        assert!(options.body.is_none());
    }

    #[test]
    fn test_options_accept_qs_alias() {
        let options: RequestOptions = serde_json::from_value(json!({
            "url": "http://x",
            "qs": {"search": "r2"},
            "json": {"a": 1}
        }))
        .unwrap();
        assert_eq!(options.query.get("search"), Some(&json!("r2")));
        assert_eq!(options.body, Some(json!({"a": 1})));
    }

    #[test]
    fn test_wire_string() {
        assert_eq!(wire_string(&json!("a")), "a");
        assert_eq!(wire_string(&json!(3)), "3");
        assert_eq!(wire_string(&json!(true)), "true");
        assert_eq!(wire_string(&Value::Null), "");
    }
}
