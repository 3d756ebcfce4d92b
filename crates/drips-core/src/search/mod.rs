//! Paginated text search.
//!
//! - `model`: value types (`SearchQuery`, `SearchResultItem`) and initials derivation
//! - `fetcher`: the `SearchFetcher` trait and cancellable fetch tasks

pub mod fetcher;
pub mod model;

pub use fetcher::{FetchHandle, FetchOutcome, SearchFetcher, spawn_fetch};
pub use model::{SearchQuery, SearchResultItem, initials};
