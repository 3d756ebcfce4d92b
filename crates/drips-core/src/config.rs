//! Configuration model for drips.
//!
//! Every field has a default, so an empty `config.toml` is valid. Durations
//! are written in milliseconds.
//!
//! ```toml
//! [search]
//! endpoint = "https://en.wikipedia.org/w/api.php"
//! limit = 100
//! request_timeout_ms = 10000
//!
//! [session]
//! debounce_ms = 400
//! min_query_chars = 3
//! clear_avatar_cache_on_query_change = true
//!
//! [avatar]
//! workers = 4
//! cache_capacity = 256
//! badge_size = 64
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::avatar::BadgeSize;
use crate::error::{DripsError, Result};

pub const DEFAULT_ENDPOINT: &str = "https://en.wikipedia.org/w/api.php";
pub const DEFAULT_PAGE_LIMIT: usize = 100;

/// Largest `srlimit` the MediaWiki search API accepts.
pub const MAX_PAGE_LIMIT: usize = 500;

/// Smallest page size for which scrolling can pull in another page: the
/// next page is requested within the last `limit / 2` rows.
pub const MIN_PAGE_LIMIT: usize = 2;

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct DripsConfig {
    pub search: SearchConfig,
    pub session: SessionConfig,
    pub avatar: AvatarConfig,
}

impl DripsConfig {
    /// Rejects values the session cannot work with.
    ///
    /// `search.limit` must lie in `MIN_PAGE_LIMIT..=MAX_PAGE_LIMIT`.
    pub fn validate(&self) -> Result<()> {
        if self.search.endpoint.trim().is_empty() {
            return Err(DripsError::config("search.endpoint must not be empty"));
        }
        if !(MIN_PAGE_LIMIT..=MAX_PAGE_LIMIT).contains(&self.search.limit) {
            return Err(DripsError::config(format!(
                "search.limit must be between {} and {}, got {}",
                MIN_PAGE_LIMIT, MAX_PAGE_LIMIT, self.search.limit
            )));
        }
        if self.avatar.workers == 0 {
            return Err(DripsError::config("avatar.workers must be at least 1"));
        }
        if self.avatar.cache_capacity == 0 {
            return Err(DripsError::config("avatar.cache_capacity must be at least 1"));
        }
        if self.avatar.badge_size == 0 {
            return Err(DripsError::config("avatar.badge_size must be at least 1"));
        }
        Ok(())
    }
}

/// Remote search API settings.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SearchConfig {
    pub endpoint: String,

    /// Results per page (`srlimit`)
    pub limit: usize,

    /// Per-request transport timeout
    pub request_timeout_ms: u64,
}

impl SearchConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            limit: DEFAULT_PAGE_LIMIT,
            request_timeout_ms: 10_000,
        }
    }
}

/// Search session behaviour.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    /// Quiet period after the last keystroke before a search is issued
    pub debounce_ms: u64,

    /// Queries shorter than this (after trimming) are not sent
    pub min_query_chars: usize,

    pub clear_avatar_cache_on_query_change: bool,
}

impl SessionConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 400,
            min_query_chars: 3,
            clear_avatar_cache_on_query_change: true,
        }
    }
}

/// Avatar rendering and caching.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct AvatarConfig {
    /// Maximum number of badges rendered concurrently
    pub workers: usize,

    pub cache_capacity: usize,

    /// Side length of the square badge in pixels
    pub badge_size: u32,
}

impl AvatarConfig {
    pub fn badge_size(&self) -> BadgeSize {
        BadgeSize::square(self.badge_size)
    }
}

impl Default for AvatarConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            cache_capacity: 256,
            badge_size: 64,
        }
    }
}
