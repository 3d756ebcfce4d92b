use std::num::NonZeroUsize;
use std::sync::{Mutex, PoisonError};

use drips_core::avatar::AvatarImage;
use lru::LruCache;

/// Bounded in-memory memo of rendered badges, keyed by initials.
///
/// Evicts the least recently used entry once `capacity` is reached. Safe to
/// share between the session task and pool workers.
pub struct AvatarCache {
    entries: Mutex<LruCache<String, AvatarImage>>,
}

impl AvatarCache {
    /// Creates an empty cache. A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Gets a cached badge and marks it as recently used.
    pub fn get(&self, key: &str) -> Option<AvatarImage> {
        self.lock().get(key).cloned()
    }

    /// Stores a badge, replacing any previous one under the same key.
    pub fn put(&self, key: impl Into<String>, image: AvatarImage) {
        self.lock().put(key.into(), image);
    }

    /// Clears all cached badges.
    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.lock().cap().get()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LruCache<String, AvatarImage>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drips_core::avatar::BadgeSize;

    fn badge(text: &str) -> AvatarImage {
        AvatarImage::new(text, BadgeSize::default(), "text/plain", text.as_bytes().to_vec())
    }

    #[test]
    fn test_get_after_put_returns_same_image() {
        let cache = AvatarCache::new(4);
        let image = badge("MT");
        cache.put("MT", image.clone());

        let cached = cache.get("MT").expect("Should be cached");
        assert_eq!(cached, image);
        assert!(cached.shares_bytes_with(&image));
    }

    #[test]
    fn test_missing_key() {
        let cache = AvatarCache::new(4);
        assert!(cache.get("ZZ").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_put_replaces_existing_entry() {
        let cache = AvatarCache::new(4);
        cache.put("A", badge("first"));
        cache.put("A", badge("second"));

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("A").unwrap().bytes(), b"second");
    }

    #[test]
    fn test_evicts_least_recently_used() {
        let cache = AvatarCache::new(2);
        cache.put("A", badge("A"));
        cache.put("B", badge("B"));

        // Touch A so B becomes the eviction candidate
        assert!(cache.get("A").is_some());
        cache.put("C", badge("C"));

        assert_eq!(cache.len(), 2);
        assert!(cache.get("A").is_some());
        assert!(cache.get("B").is_none());
        assert!(cache.get("C").is_some());
    }

    #[test]
    fn test_clear() {
        let cache = AvatarCache::new(8);
        cache.put("A", badge("A"));
        cache.put("B", badge("B"));
        cache.clear();

        assert!(cache.is_empty());
        assert_eq!(cache.capacity(), 8);
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let cache = AvatarCache::new(0);
        cache.put("A", badge("A"));
        assert_eq!(cache.capacity(), 1);
        assert!(cache.get("A").is_some());
    }
}
