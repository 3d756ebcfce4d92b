//! Search session application services.
//!
//! [`SearchSession`] ties the fetcher, the avatar pool and the avatar cache
//! together and reports to a [`drips_core::observer::SessionObserver`].

mod cache;
mod manager;
mod state;

pub use cache::AvatarCache;
pub use manager::{SearchSession, SearchSessionHandle};
pub use state::SessionState;
