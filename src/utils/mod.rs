//! Helpers shared across layers.
//!
//! - [`code_generator`] - Short ID generation and validation
//! - [`url_validator`] - Original URL validation and short URL composition
//! - [`db_error`] - PostgreSQL error classification

pub mod code_generator;
pub mod db_error;
pub mod url_validator;
