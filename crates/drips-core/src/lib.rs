//! Domain model and collaborator contracts for drips search sessions.
//!
//! Nothing in this crate talks to the network or draws pixels. It defines
//! the values a search session passes around, the error taxonomy, and the
//! traits the outer crates implement.

pub mod avatar;
pub mod config;
pub mod error;
pub mod observer;
pub mod search;

// Re-export common error types
pub use error::{DripsError, FetchError};
