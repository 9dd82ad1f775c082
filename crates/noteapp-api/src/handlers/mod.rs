//! HTTP handlers for noteapp-api.

pub mod categories;
pub mod health;
pub mod notes;
