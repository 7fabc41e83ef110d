// SPDX-License-Identifier: MIT

//! Entities: named, registered transformations
//!
//! An `EntitySource` is the raw definition (deserialized from YAML/JSON
//! or built in code). `Entity::create` validates it once, parses every
//! reducer it carries, and produces the immutable `Entity` stored in the
//! registry.

pub mod collection;
pub mod hash;
pub mod request;
pub mod resolve;
pub mod transform;

use crate::core::error::{DataPointError, Result};
use crate::core::type_check::ValueType;
use crate::point::reducer::{Reducer, ReducerInput};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub use collection::CollectionDef;
pub use hash::HashDef;
pub use request::{RequestOptionsSource, RequestDef};
pub use transform::ControlDef;

/// Kinds of entity the engine can resolve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Hash,
    Collection,
    Request,
    Transform,
    Control,
    Entry,
    Value,
}

impl EntityType {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "hash" => Some(Self::Hash),
            "collection" => Some(Self::Collection),
            "request" => Some(Self::Request),
            "transform" => Some(Self::Transform),
            "control" => Some(Self::Control),
            "entry" => Some(Self::Entry),
            "value" => Some(Self::Value),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Hash => "hash",
            Self::Collection => "collection",
            Self::Request => "request",
            Self::Transform => "transform",
            Self::Control => "control",
            Self::Entry => "entry",
            Self::Value => "value",
        }
    }

    /// Split `<type>:<name>` and validate the type
    pub fn from_id(id: &str) -> Result<Self> {
        let (type_name, name) = id.split_once(':').ok_or_else(|| {
            DataPointError::config(format!("Entity id '{}' must look like <type>:<name>", id))
        })?;
        if name.is_empty() {
            return Err(DataPointError::config(format!(
                "Entity id '{}' is missing a name",
                id
            )));
        }
        // `?`, `[]` and whitespace belong to reference syntax
        if name.contains(|c: char| c.is_whitespace() || matches!(c, '?' | '[' | ']')) {
            return Err(DataPointError::config(format!(
                "Entity id '{}' contains reference markers ('?', '[]' or whitespace)",
                id
            )));
        }
        Self::parse(type_name).ok_or_else(|| DataPointError::UnknownEntityType(type_name.into()))
    }

    /// Kind-specific fields this type accepts
    fn allowed_fields(&self) -> &'static [&'static str] {
        match self {
            Self::Hash => &[
                "value",
                "compose",
                "mapKeys",
                "addKeys",
                "addValues",
                "pickKeys",
                "omitKeys",
            ],
            Self::Collection => &["value", "compose", "map", "filter", "find"],
            Self::Request => &["value", "url", "options", "beforeRequest"],
            Self::Transform | Self::Entry | Self::Value => &["value"],
            Self::Control => &["select"],
        }
    }
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One branch of a control entity's `select`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SelectCase {
    pub case: Option<ReducerInput>,
    #[serde(rename = "do")]
    pub then: Option<ReducerInput>,
    pub default: Option<ReducerInput>,
}

impl SelectCase {
    pub fn when(case: impl Into<ReducerInput>, then: impl Into<ReducerInput>) -> Self {
        Self {
            case: Some(case.into()),
            then: Some(then.into()),
            default: None,
        }
    }

    pub fn otherwise(default: impl Into<ReducerInput>) -> Self {
        Self {
            default: Some(default.into()),
            ..Default::default()
        }
    }
}

/// Raw entity definition
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct EntitySource {
    pub value: Option<ReducerInput>,
    pub before: Option<ReducerInput>,
    pub after: Option<ReducerInput>,
    pub error: Option<ReducerInput>,
    pub input_type: Option<ReducerInput>,
    pub output_type: Option<ReducerInput>,
    #[serde(default)]
    pub params: Map<String, Value>,
    pub compose: Option<ReducerInput>,

    // hash
    pub map_keys: Option<ReducerInput>,
    pub add_keys: Option<ReducerInput>,
    pub add_values: Option<Map<String, Value>>,
    pub pick_keys: Option<Vec<String>>,
    pub omit_keys: Option<Vec<String>>,

    // collection
    pub map: Option<ReducerInput>,
    pub filter: Option<ReducerInput>,
    pub find: Option<ReducerInput>,

    // request
    pub url: Option<String>,
    pub options: Option<ReducerInput>,
    pub before_request: Option<ReducerInput>,

    // control
    pub select: Option<Vec<SelectCase>>,
}

impl EntitySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn value(mut self, reducer: impl Into<ReducerInput>) -> Self {
        self.value = Some(reducer.into());
        self
    }

    pub fn before(mut self, reducer: impl Into<ReducerInput>) -> Self {
        self.before = Some(reducer.into());
        self
    }

    pub fn after(mut self, reducer: impl Into<ReducerInput>) -> Self {
        self.after = Some(reducer.into());
        self
    }

    pub fn error(mut self, reducer: impl Into<ReducerInput>) -> Self {
        self.error = Some(reducer.into());
        self
    }

    pub fn input_type(mut self, reducer: impl Into<ReducerInput>) -> Self {
        self.input_type = Some(reducer.into());
        self
    }

    pub fn output_type(mut self, reducer: impl Into<ReducerInput>) -> Self {
        self.output_type = Some(reducer.into());
        self
    }

    pub fn params(mut self, params: Map<String, Value>) -> Self {
        self.params = params;
        self
    }

    pub fn compose(mut self, reducer: impl Into<ReducerInput>) -> Self {
        self.compose = Some(reducer.into());
        self
    }

    pub fn map_keys(mut self, reducer: impl Into<ReducerInput>) -> Self {
        self.map_keys = Some(reducer.into());
        self
    }

    pub fn add_keys(mut self, reducer: impl Into<ReducerInput>) -> Self {
        self.add_keys = Some(reducer.into());
        self
    }

    pub fn add_values(mut self, values: Map<String, Value>) -> Self {
        self.add_values = Some(values);
        self
    }

    pub fn pick_keys<S: Into<String>>(mut self, keys: impl IntoIterator<Item = S>) -> Self {
        self.pick_keys = Some(keys.into_iter().map(Into::into).collect());
        self
    }

    pub fn omit_keys<S: Into<String>>(mut self, keys: impl IntoIterator<Item = S>) -> Self {
        self.omit_keys = Some(keys.into_iter().map(Into::into).collect());
        self
    }

    pub fn map(mut self, reducer: impl Into<ReducerInput>) -> Self {
        self.map = Some(reducer.into());
        self
    }

    pub fn filter(mut self, reducer: impl Into<ReducerInput>) -> Self {
        self.filter = Some(reducer.into());
        self
    }

    pub fn find(mut self, reducer: impl Into<ReducerInput>) -> Self {
        self.find = Some(reducer.into());
        self
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn options(mut self, reducer: impl Into<ReducerInput>) -> Self {
        self.options = Some(reducer.into());
        self
    }

    pub fn before_request(mut self, reducer: impl Into<ReducerInput>) -> Self {
        self.before_request = Some(reducer.into());
        self
    }

    pub fn select(mut self, case: SelectCase) -> Self {
        self.select.get_or_insert_with(Vec::new).push(case);
        self
    }

    /// Names of the kind-specific fields that are set
    fn kind_fields(&self) -> Vec<&'static str> {
        let fields = [
            ("value", self.value.is_some()),
            ("compose", self.compose.is_some()),
            ("mapKeys", self.map_keys.is_some()),
            ("addKeys", self.add_keys.is_some()),
            ("addValues", self.add_values.is_some()),
            ("pickKeys", self.pick_keys.is_some()),
            ("omitKeys", self.omit_keys.is_some()),
            ("map", self.map.is_some()),
            ("filter", self.filter.is_some()),
            ("find", self.find.is_some()),
            ("url", self.url.is_some()),
            ("options", self.options.is_some()),
            ("beforeRequest", self.before_request.is_some()),
            ("select", self.select.is_some()),
        ];
        fields
            .into_iter()
            .filter(|(_, set)| *set)
            .map(|(name, _)| name)
            .collect()
    }
}

/// Kind-specific part of an entity
#[derive(Debug, Clone)]
pub enum EntityKind {
    Hash(HashDef),
    Collection(CollectionDef),
    Request(RequestDef),
    Transform(Option<Reducer>),
    Entry(Option<Reducer>),
    Control(ControlDef),
    Value(Value),
}

/// A validated, immutable entity definition
#[derive(Debug, Clone)]
pub struct Entity {
    pub id: String,
    pub entity_type: EntityType,
    pub before: Option<Reducer>,
    pub after: Option<Reducer>,
    pub error: Option<Reducer>,
    pub input_type: Option<Reducer>,
    pub output_type: Option<Reducer>,
    pub params: Map<String, Value>,
    pub kind: EntityKind,
}

impl Entity {
    /// Validate a raw source and build the entity registered under `id`
    pub fn create(id: &str, source: EntitySource) -> Result<Self> {
        Self::build(id, source).map_err(|e| match e {
            DataPointError::Config(msg) if !msg.starts_with(id) => {
                DataPointError::config(format!("{}: {}", id, msg))
            }
            other => other,
        })
    }

    fn build(id: &str, source: EntitySource) -> Result<Self> {
        let entity_type = EntityType::from_id(id)?;

        let allowed = entity_type.allowed_fields();
        if let Some(field) = source
            .kind_fields()
            .into_iter()
            .find(|f| !allowed.contains(f))
        {
            return Err(DataPointError::config(format!(
                "{}: '{}' is not supported by {} entities",
                id, field, entity_type
            )));
        }

        let kind = match entity_type {
            EntityType::Hash => EntityKind::Hash(HashDef::create(&source)?),
            EntityType::Collection => EntityKind::Collection(CollectionDef::create(&source)?),
            EntityType::Request => EntityKind::Request(RequestDef::create(id, &source)?),
            EntityType::Transform => EntityKind::Transform(create_optional(&source.value)?),
            EntityType::Entry => EntityKind::Entry(create_optional(&source.value)?),
            EntityType::Control => EntityKind::Control(ControlDef::create(id, &source)?),
            EntityType::Value => EntityKind::Value(transform::literal_value(id, &source)?),
        };

        Ok(Self {
            id: id.to_string(),
            entity_type,
            before: create_optional(&source.before)?,
            after: create_optional(&source.after)?,
            error: create_optional(&source.error)?,
            input_type: create_type_check(&source.input_type)?,
            output_type: create_type_check(&source.output_type)?,
            params: source.params,
            kind,
        })
    }

    /// `params.trace == true`
    pub fn traced(&self) -> bool {
        self.params.get("trace") == Some(&Value::Bool(true))
    }
}

pub(crate) fn create_optional(input: &Option<ReducerInput>) -> Result<Option<Reducer>> {
    input.as_ref().map(ReducerInput::create).transpose()
}

/// `inputType`/`outputType` accept a bare type name as shorthand
fn create_type_check(input: &Option<ReducerInput>) -> Result<Option<Reducer>> {
    if let Some(ReducerInput::Source(Value::String(name))) = input {
        if let Some(value_type) = ValueType::parse(name) {
            return Ok(Some(Reducer::type_check(value_type)));
        }
    }
    create_optional(input)
}
