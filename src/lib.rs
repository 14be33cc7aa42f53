//! Bookforged - audiobook splitter for size-limited players
//!
//! This library crate exposes the core functionality for integration testing.

pub mod config;
pub mod libation;
pub mod library;
pub mod orchestrator;
pub mod signals;
