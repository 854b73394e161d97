//! Infrastructure adapters for config, HTTP, schema validation, and highlighting.

pub mod config;
pub mod generation;
pub mod highlight;
pub mod logging;
pub mod schema;
