//! Avatar badge images and the renderer contract.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Pixel size of a rendered badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BadgeSize {
    pub width: u32,
    pub height: u32,
}

impl BadgeSize {
    pub const fn square(side: u32) -> Self {
        Self {
            width: side,
            height: side,
        }
    }
}

impl Default for BadgeSize {
    fn default() -> Self {
        Self::square(64)
    }
}

impl fmt::Display for BadgeSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// A rendered badge. Immutable once produced; clones share the bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct AvatarImage {
    initials: String,
    size: BadgeSize,
    media_type: &'static str,
    bytes: Arc<[u8]>,
}

impl AvatarImage {
    pub fn new(
        initials: impl Into<String>,
        size: BadgeSize,
        media_type: &'static str,
        bytes: impl Into<Arc<[u8]>>,
    ) -> Self {
        Self {
            initials: initials.into(),
            size,
            media_type,
            bytes: bytes.into(),
        }
    }

    /// The text drawn on the badge.
    pub fn initials(&self) -> &str {
        &self.initials
    }

    pub fn size(&self) -> BadgeSize {
        self.size
    }

    /// MIME type of `bytes`, e.g. `image/svg+xml`.
    pub fn media_type(&self) -> &'static str {
        self.media_type
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// True when both images share the same byte buffer.
    pub fn shares_bytes_with(&self, other: &AvatarImage) -> bool {
        Arc::ptr_eq(&self.bytes, &other.bytes)
    }
}

impl fmt::Debug for AvatarImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AvatarImage")
            .field("initials", &self.initials)
            .field("size", &self.size)
            .field("media_type", &self.media_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Draws `text` centred on a filled circular badge.
///
/// Implementations must be pure and deterministic: the same text and size
/// always produce the same image, which is what makes badges safe to memoize.
pub trait BadgeRenderer: Send + Sync {
    fn render(&self, text: &str, size: BadgeSize) -> AvatarImage;
}
