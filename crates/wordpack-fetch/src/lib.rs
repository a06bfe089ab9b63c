//! wordpack-fetch - Remote word group fetchers
//!
//! This crate provides [`GroupFetcher`] implementations that retrieve the
//! raw, newline-separated text of one word group.
//!
//! - [`HttpGroupFetcher`]: GET `<base_url>/languages/<lang>/<group>`.
//! - [`DirGroupFetcher`]: reads the same layout from a local directory.
//! - [`StaticGroupFetcher`]: in-memory groups for tests and demos.

mod http;
mod local;

pub use http::HttpGroupFetcher;
pub use local::{DirGroupFetcher, StaticGroupFetcher};

// Re-export the GroupFetcher trait for convenience
pub use wordpack_core::GroupFetcher;
