//! HTTP handlers for generated CRUD endpoints and documentation.

pub mod docs;
pub mod entity;
