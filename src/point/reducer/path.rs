// SPDX-License-Identifier: MIT

//! `$` path reducers

use crate::core::value::lookup;
use crate::point::accumulator::Accumulator;
use serde_json::Value;

/// What a path is looked up against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathScope {
    /// `$a.b` reads from the current value
    Value,
    /// `$..locals.a` reads from the accumulator itself
    Accumulator,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PathReducer {
    pub scope: PathScope,
    pub path: String,
}

impl PathReducer {
    /// Parse `$`, `$.`, `$a.b` or `$..a.b`
    pub fn parse(source: &str) -> Self {
        let rest = source.strip_prefix('$').unwrap_or(source);
        match rest.strip_prefix("..") {
            Some(path) => Self {
                scope: PathScope::Accumulator,
                path: path.to_string(),
            },
            None => Self {
                scope: PathScope::Value,
                path: rest.trim_start_matches('.').to_string(),
            },
        }
    }

    pub fn resolve(&self, acc: &Accumulator) -> Value {
        match self.scope {
            PathScope::Value => lookup(&self.path, &acc.value),
            PathScope::Accumulator => lookup(&self.path, &acc.to_json()),
        }
    }
}
