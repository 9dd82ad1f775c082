//! # noteapp-core
//!
//! Core types, traits, and abstractions for the noteapp service.
//!
//! This crate provides the note and category data structures, the
//! repository traits the storage backends implement, and the shared
//! error type.

pub mod error;
#[cfg(any(test, feature = "mock"))]
pub mod memory;
pub mod models;
pub mod traits;
pub mod uuid_utils;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
#[cfg(any(test, feature = "mock"))]
pub use memory::InMemoryStore;
pub use models::*;
pub use traits::*;
pub use uuid_utils::{is_v7, new_v7};
