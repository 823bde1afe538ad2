use std::num::NonZeroUsize;

use lru::LruCache;

/// Pixel dimensions of a decoded sprite image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageInfo {
    pub width: u32,
    pub height: u32,
}

/// Load state of one image slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageState {
    Pending,
    Ready(ImageInfo),
    Failed(String),
}

/// Sprite image cache owned by the compositor's caller.
///
/// The cache never loads anything itself. Drawables ask for an image with
/// [`ImageCache::require`]; unseen keys are queued, the host drains the queue
/// with [`ImageCache::take_requests`] and reports each outcome through
/// [`ImageCache::complete`], which is the only writer of a slot.
#[derive(Debug)]
pub struct ImageCache {
    slots: LruCache<String, ImageState>,
    requests: Vec<String>,
}

impl ImageCache {
    /// Bounded cache; the least recently drawn image is dropped first.
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            slots: LruCache::new(capacity),
            requests: Vec::new(),
        }
    }

    /// Cache that never evicts.
    pub fn unbounded() -> Self {
        Self {
            slots: LruCache::unbounded(),
            requests: Vec::new(),
        }
    }

    /// Image info if loaded. Unknown keys are queued for loading.
    pub fn require(&mut self, key: &str) -> Option<ImageInfo> {
        match self.slots.get(key) {
            Some(ImageState::Ready(info)) => Some(*info),
            Some(_) => None,
            None => {
                self.make_room();
                self.slots.push(key.to_owned(), ImageState::Pending);
                self.requests.push(key.to_owned());
                tracing::debug!(key, "image requested");
                None
            }
        }
    }

    /// Drain keys that need a load started.
    pub fn take_requests(&mut self) -> Vec<String> {
        std::mem::take(&mut self.requests)
    }

    /// Record the outcome of a load. Completions for keys that are not
    /// pending are ignored.
    pub fn complete(&mut self, key: &str, result: Result<ImageInfo, String>) {
        match self.slots.peek_mut(key) {
            Some(slot) if *slot == ImageState::Pending => {
                *slot = match result {
                    Ok(info) => ImageState::Ready(info),
                    Err(reason) => {
                        tracing::warn!(key, %reason, "image load failed");
                        ImageState::Failed(reason)
                    }
                };
            }
            _ => tracing::debug!(key, "ignoring completion for image that is not pending"),
        }
    }

    /// Evict the least recently used settled image. Pending loads are
    /// never evicted, or they would be requested again every frame; when
    /// every slot is pending the bound grows instead.
    fn make_room(&mut self) {
        if self.slots.len() < self.slots.cap().get() {
            return;
        }
        let victim = self
            .slots
            .iter()
            .rev()
            .find(|(_, state)| **state != ImageState::Pending)
            .map(|(key, _)| key.clone());
        match victim {
            Some(key) => {
                self.slots.pop(&key);
                tracing::debug!(%key, "image evicted");
            }
            None => {
                let grown = self.slots.cap().saturating_add(1);
                tracing::warn!(capacity = grown.get(), "all cached images are loading, growing image cache");
                self.slots.resize(grown);
            }
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.cap().get()
    }

    pub fn state(&self, key: &str) -> Option<&ImageState> {
        self.slots.peek(key)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl Default for ImageCache {
    fn default() -> Self {
        Self::new(NonZeroUsize::new(512).unwrap_or(NonZeroUsize::MIN))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INFO: ImageInfo = ImageInfo {
        width: 16,
        height: 16,
    };

    #[test]
    fn require_queues_once() {
        let mut cache = ImageCache::default();
        assert_eq!(cache.require("tree.png"), None);
        assert_eq!(cache.require("tree.png"), None);
        assert_eq!(cache.take_requests(), vec!["tree.png".to_string()]);
        assert!(cache.take_requests().is_empty());
    }

    #[test]
    fn completion_makes_image_ready() {
        let mut cache = ImageCache::default();
        cache.require("tree.png");
        cache.complete("tree.png", Ok(INFO));
        assert_eq!(cache.require("tree.png"), Some(INFO));
    }

    #[test]
    fn failed_image_stays_skipped() {
        let mut cache = ImageCache::default();
        cache.require("rock.png");
        cache.complete("rock.png", Err("404".into()));
        assert_eq!(cache.require("rock.png"), None);
        assert!(cache.take_requests().len() == 1);
        assert!(matches!(cache.state("rock.png"), Some(ImageState::Failed(_))));
    }

    #[test]
    fn unexpected_completion_ignored() {
        let mut cache = ImageCache::default();
        cache.complete("ghost.png", Ok(INFO));
        assert!(cache.is_empty());

        cache.require("a.png");
        cache.complete("a.png", Ok(INFO));
        cache.complete("a.png", Err("late".into()));
        assert_eq!(cache.state("a.png"), Some(&ImageState::Ready(INFO)));
    }

    #[test]
    fn bounded_cache_evicts_least_recent() {
        let mut cache = ImageCache::new(NonZeroUsize::new(2).unwrap());
        cache.require("a");
        cache.require("b");
        cache.complete("a", Ok(INFO));
        cache.complete("b", Ok(INFO));
        cache.require("a");
        cache.require("c");
        assert!(cache.state("a").is_some());
        assert!(cache.state("b").is_none());
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn pending_images_are_not_evicted() {
        let mut cache = ImageCache::new(NonZeroUsize::new(2).unwrap());
        cache.require("a");
        cache.complete("a", Ok(INFO));
        cache.require("b");
        cache.require("c");
        // the settled image made room, the pending one stayed
        assert!(cache.state("a").is_none());
        assert_eq!(cache.state("b"), Some(&ImageState::Pending));

        cache.require("d");
        assert_eq!(cache.capacity(), 3);
        assert_eq!(cache.take_requests(), vec!["a", "b", "c", "d"]);
        for _ in 0..3 {
            for key in ["b", "c", "d"] {
                cache.require(key);
            }
        }
        assert!(cache.take_requests().is_empty());
    }
}
