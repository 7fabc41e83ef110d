// SPDX-License-Identifier: MIT

pub mod accumulator;
pub mod entity;
pub mod function;
pub mod loader;
pub mod manager;
pub mod middleware;
pub mod reducer;
pub mod registry;
