//! HTTP handlers, one module per resource.

pub mod form;
pub mod health;
pub mod notes;
pub mod users;
