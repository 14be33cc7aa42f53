//! bf-core: shared types, errors, and configuration.
//!
//! This crate is the foundational dependency for the other bf-* crates,
//! providing the unified error type, the catalog and chapter domain types,
//! and the application configuration.

pub mod catalog;
pub mod config;
pub mod error;
pub mod media;

// Re-export the most commonly used items at the crate root.
pub use catalog::{BookStatus, CatalogEntry};
pub use error::{Error, Result};
pub use media::Chapter;
