//! # scribe-core
//!
//! Core types, traits, and validation rules for the scribe note service.
//!
//! This crate has no I/O of its own; storage, media and HTTP crates build on
//! the models and repository traits defined here.

pub mod defaults;
pub mod error;
pub mod logging;
pub mod models;
pub mod traits;
pub mod validation;

// Re-export commonly used types at crate root
pub use error::{Error, ErrorKind, Result};
pub use models::*;
pub use traits::*;
pub use validation::{FieldViolation, ValidationErrors};
