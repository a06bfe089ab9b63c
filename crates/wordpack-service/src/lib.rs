//! wordpack-service - Pack population and word selection
//!
//! This crate drives lazy population of default word packs and answers
//! "give me one word from these packs" without the caller knowing whether
//! a network fetch is involved.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use wordpack_service::{PopulationService, SelectionService};
//!
//! let population = Arc::new(PopulationService::new(store.clone(), fetcher));
//! let selection = SelectionService::new(store, population);
//! if let Some(word) = selection.pick_word(&[pack_id]).await {
//!     println!("{}", word.word);
//! }
//! ```

mod population;
mod selection;
mod text;

pub use population::{PopulationService, PrefetchReport};
pub use selection::SelectionService;
pub use text::split_group_text;
