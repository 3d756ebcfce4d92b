pub mod session;

pub use session::{AvatarCache, SearchSession, SearchSessionHandle, SessionState};
