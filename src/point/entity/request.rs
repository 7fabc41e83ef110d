// SPDX-License-Identifier: MIT

//! Request entities
//!
//! Builds `RequestOptions` from the entity definition and the current
//! accumulator, then hands them to the manager's `Transport`.
//!
//! `options` written as a plain object is a transform object: keys
//! starting with `$` hold reducers whose results are stored under the
//! unprefixed key, every other key is kept as literal JSON.
//!
//! ```yaml
//! request:searchPeople:
//!   url: https://swapi.co/api/people
//!   options:
//!     qs:
//!       $search: $personName
//! ```

use super::{create_optional, EntitySource};
use crate::core::error::{DataPointError, Result};
use crate::core::transport::{wire_string, RequestOptions};
use crate::core::value::lookup;
use crate::point::accumulator::Accumulator;
use crate::point::manager::DataPoint;
use crate::point::reducer::{resolve, resolve_optional, Reducer, ReducerInput};
use futures::future::{try_join_all, BoxFuture};
use serde_json::{Map, Value};

/// Literal JSON with reducers at some of its keys
#[derive(Debug, Clone)]
pub enum TemplateNode {
    Literal(Value),
    Reducer(Reducer),
    Object(Vec<(String, TemplateNode)>),
}

impl TemplateNode {
    pub fn parse(source: &Value) -> Result<Self> {
        let Value::Object(map) = source else {
            return Ok(TemplateNode::Literal(source.clone()));
        };

        let props = map
            .iter()
            .map(|(key, value)| match key.strip_prefix('$') {
                Some(name) => Ok((name.to_string(), TemplateNode::Reducer(Reducer::parse(value)?))),
                None => Ok((key.clone(), TemplateNode::parse(value)?)),
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(TemplateNode::Object(props))
    }

    pub fn resolve<'a>(
        &'a self,
        manager: &'a DataPoint,
        acc: &'a Accumulator,
    ) -> BoxFuture<'a, Result<Value>> {
        Box::pin(async move {
            match self {
                TemplateNode::Literal(value) => Ok(value.clone()),
                TemplateNode::Reducer(reducer) => {
                    resolve(manager, acc.clone(), reducer).await.map(|a| a.value)
                }
                TemplateNode::Object(props) => {
                    let values =
                        try_join_all(props.iter().map(|(_, node)| node.resolve(manager, acc)))
                            .await?;
                    Ok(Value::Object(
                        props
                            .iter()
                            .zip(values)
                            .map(|((key, _), value)| (key.clone(), value))
                            .collect(),
                    ))
                }
            }
        })
    }
}

/// How request options are produced
#[derive(Debug, Clone)]
pub enum RequestOptionsSource {
    Template(TemplateNode),
    Reducer(Reducer),
}

impl RequestOptionsSource {
    pub fn create(input: &ReducerInput) -> Result<Self> {
        match input {
            ReducerInput::Source(source @ Value::Object(_)) => {
                TemplateNode::parse(source).map(RequestOptionsSource::Template)
            }
            other => other.create().map(RequestOptionsSource::Reducer),
        }
    }

    async fn resolve(&self, manager: &DataPoint, acc: &Accumulator) -> Result<Value> {
        match self {
            RequestOptionsSource::Template(template) => template.resolve(manager, acc).await,
            RequestOptionsSource::Reducer(reducer) => {
                resolve(manager, acc.clone(), reducer).await.map(|a| a.value)
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct RequestDef {
    pub value: Option<Reducer>,
    /// URL template with `{value.x}`-style placeholders
    pub url: Option<String>,
    pub options: Option<RequestOptionsSource>,
    pub before_request: Option<Reducer>,
}

impl RequestDef {
    pub fn create(id: &str, source: &EntitySource) -> Result<Self> {
        if source.url.is_none() && source.options.is_none() {
            return Err(DataPointError::config(format!(
                "{}: request entities need a url or options",
                id
            )));
        }

        Ok(Self {
            value: create_optional(&source.value)?,
            url: source.url.clone(),
            options: source
                .options
                .as_ref()
                .map(RequestOptionsSource::create)
                .transpose()?,
            before_request: create_optional(&source.before_request)?,
        })
    }

    /// Assemble the options for one dispatch. An explicit `url` inside
    /// `options` wins over the entity's url template.
    pub async fn request_options(
        &self,
        manager: &DataPoint,
        acc: &Accumulator,
    ) -> Result<RequestOptions> {
        let mut options = match &self.options {
            Some(source) => match source.resolve(manager, acc).await? {
                Value::Object(map) => map,
                Value::Null => Map::new(),
                other => {
                    return Err(DataPointError::reducer(format!(
                        "request options must resolve to an object, got {}",
                        other
                    )))
                }
            },
            None => Map::new(),
        };

        if let Some(template) = &self.url {
            if !options.contains_key("url") {
                options.insert("url".to_string(), Value::String(interpolate(template, acc)));
            }
        }

        let mut options = Value::Object(options);
        if let Some(hook) = &self.before_request {
            options = resolve(manager, acc.with_value(options), hook).await?.value;
        }

        Ok(serde_json::from_value(options)?)
    }
}

/// Fill `{value.x}`, `{params.x}`, `{locals.x}` and `{initialValue.x}`
/// placeholders from the accumulator.
pub fn interpolate(template: &str, acc: &Accumulator) -> String {
    let scope = acc.to_json();
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        let Some(len) = rest[start..].find('}') else {
            break;
        };
        out.push_str(&rest[..start]);

        let path = rest[start + 1..start + len].trim();
        let value = lookup(path, &scope);
        if value.is_null() {
            log::warn!("url placeholder '{{{}}}' resolved to nothing", path);
        }
        out.push_str(&wire_string(&value));
        rest = &rest[start + len + 1..];
    }

    out.push_str(rest);
    out
}

pub async fn resolve_request(
    manager: &DataPoint,
    acc: Accumulator,
    def: &RequestDef,
) -> Result<Accumulator> {
    let acc = resolve_optional(manager, acc, def.value.as_ref()).await?;
    let options = def.request_options(manager, &acc).await?;

    log::debug!("{} {}", options.method, options.url);
    let response = manager.transport().dispatch(&options).await?;
    Ok(acc.with_value(response.body))
}
