// SPDX-License-Identifier: MIT

//! Typed error handling for datapoint-rs
//!
//! Every failure surfaced by the engine is a `DataPointError`. Configuration
//! errors are raised while creating reducers and registering entities;
//! everything else is raised while resolving and travels back through the
//! entity lifecycle, where an entity `error` reducer may recover from it.

use serde_json::{json, Value};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DataPointError>;

/// Top-level error type for datapoint-rs
#[derive(Debug, Error)]
pub enum DataPointError {
    /// Malformed reducer or entity source, detected at creation time
    #[error("Configuration error: {0}")]
    Config(String),

    /// Entity id with an entity type the engine does not know
    #[error("Unknown entity type '{0}'")]
    UnknownEntityType(String),

    /// Entity reference that is not registered
    #[error("Entity '{0}' not found")]
    EntityNotFound(String),

    /// Input/output validator failure
    #[error("Entity type check failed! Expected type: {expected}, actual type: {actual}, input value: {value}")]
    TypeCheck {
        expected: String,
        actual: String,
        value: String,
    },

    /// Shape mismatch detected by an entity main resolver (hash, collection)
    #[error("{entity_id} received value = {value} of type {actual}, this entity only resolves {expected}")]
    TypeMismatch {
        entity_id: String,
        expected: String,
        actual: String,
        value: String,
    },

    /// Transport failure from a request entity
    #[error(transparent)]
    Request(#[from] RequestError),

    /// Error raised by a user supplied reducer function
    #[error("{0}")]
    Reducer(String),

    /// Per-element failure inside an array helper
    #[error("{operation} failed at index {index}: {source}")]
    Element {
        operation: String,
        index: usize,
        #[source]
        source: Box<DataPointError>,
    },

    /// Error annotated with the entity that failed to resolve it
    #[error("[{entity_id}] {source}")]
    Entity {
        entity_id: String,
        #[source]
        source: Box<DataPointError>,
    },

    /// I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP client errors
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Failure reported by a transport, carrying whatever the remote returned
#[derive(Debug, Clone, Error, PartialEq)]
#[error("Request failed{}: {message}", .status.map(|s| format!(" with status {}", s)).unwrap_or_default())]
pub struct RequestError {
    pub status: Option<u16>,
    pub body: Option<Value>,
    pub message: String,
}

impl RequestError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: None,
            body: None,
            message: message.into(),
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

impl DataPointError {
    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a reducer error
    pub fn reducer(message: impl Into<String>) -> Self {
        Self::Reducer(message.into())
    }

    /// Wrap an error raised while processing one element of an array
    pub fn element(operation: impl Into<String>, index: usize, source: DataPointError) -> Self {
        Self::Element {
            operation: operation.into(),
            index,
            source: Box::new(source),
        }
    }

    /// Attach the failing entity id. Annotating twice with the same id is a no-op.
    pub fn with_entity(self, entity_id: &str) -> Self {
        if let Self::Entity { entity_id: id, .. } = &self {
            if id == entity_id {
                return self;
            }
        }
        Self::Entity {
            entity_id: entity_id.to_string(),
            source: Box::new(self),
        }
    }

    /// Id of the innermost entity this error was annotated with
    pub fn entity_id(&self) -> Option<&str> {
        match self {
            Self::Entity { entity_id, source } => source.entity_id().or(Some(entity_id)),
            Self::Element { source, .. } => source.entity_id(),
            _ => None,
        }
    }

    /// The error with annotation layers peeled off
    pub fn root(&self) -> &DataPointError {
        match self {
            Self::Entity { source, .. } | Self::Element { source, .. } => source.root(),
            other => other,
        }
    }

    /// Short name of the error kind
    pub fn name(&self) -> &'static str {
        match self.root() {
            Self::Config(_) => "ConfigError",
            Self::UnknownEntityType(_) => "UnknownEntityType",
            Self::EntityNotFound(_) => "EntityNotFound",
            Self::TypeCheck { .. } => "TypeCheckError",
            Self::TypeMismatch { .. } => "TypeMismatch",
            Self::Request(_) => "RequestError",
            Self::Reducer(_) => "ReducerError",
            Self::Io(_) => "IoError",
            Self::Json(_) => "JsonError",
            Self::Yaml(_) => "YamlError",
            Self::Http(_) => "HttpError",
            Self::Element { .. } | Self::Entity { .. } => "Error",
        }
    }

    /// JSON view handed to entity `error` reducers as their value
    pub fn to_value(&self) -> Value {
        let mut out = json!({
            "name": self.name(),
            "message": self.to_string(),
        });
        if let Some(id) = self.entity_id() {
            out["entityId"] = json!(id);
        }
        if let Self::Request(req) = self.root() {
            if let Some(status) = req.status {
                out["status"] = json!(status);
            }
            if let Some(body) = &req.body {
                out["body"] = body.clone();
            }
        }
        out
    }
}

// Allow `?` on plain messages inside reducer functions
impl From<&str> for DataPointError {
    fn from(s: &str) -> Self {
        Self::Reducer(s.to_string())
    }
}

impl From<String> for DataPointError {
    fn from(s: String) -> Self {
        Self::Reducer(s)
    }
}

impl From<Box<dyn std::error::Error + Send + Sync>> for DataPointError {
    fn from(err: Box<dyn std::error::Error + Send + Sync>) -> Self {
        Self::Reducer(err.to_string())
    }
}
