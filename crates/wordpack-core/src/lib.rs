//! wordpack-core - Core types and traits for the word pack catalog
//!
//! This crate provides the domain types, the storage and fetcher traits,
//! configuration and error handling shared by every other wordpack crate.

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::*;
pub use error::{CatalogError, Result};
pub use traits::*;
pub use types::*;
