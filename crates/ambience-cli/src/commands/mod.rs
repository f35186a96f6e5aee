//! CLI command implementations.

pub mod info;
pub mod run;
pub mod validate;
