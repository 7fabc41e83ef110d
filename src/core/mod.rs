// SPDX-License-Identifier: MIT

pub mod error;
pub mod http;
pub mod transport;
pub mod type_check;
pub mod value;
