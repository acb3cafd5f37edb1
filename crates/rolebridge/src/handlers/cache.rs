//! Bounded cache of recently seen guild messages, kept so a deletion can be
//! reported with the message's content.

use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use lru::LruCache;
use rolebridge_types::PlatformUserId;

/// What the mod log needs to know about a message
#[derive(Debug, Clone, PartialEq)]
pub struct MessageRecord {
    pub author_id: PlatformUserId,
    pub author_name: String,
    pub author_avatar: Option<String>,
    pub channel_id: u64,
    pub content: String,
    pub attachments: Vec<String>,
    /// RFC 3339 creation time.
    pub timestamp: Option<String>,
}

/// Recent messages keyed by message id. The least recently stored entry is
/// evicted once `capacity` is reached; entries older than `max_age` are not
/// returned.
pub struct MessageCache {
    max_age: Duration,
    entries: Mutex<LruCache<u64, (Instant, MessageRecord)>>,
}

impl MessageCache {
    pub const DEFAULT_CAPACITY: usize = 10_000;
    pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(72 * 60 * 60);

    pub fn new(capacity: usize, max_age: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            max_age,
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn insert(&self, message_id: u64, record: MessageRecord) {
        self.lock().put(message_id, (Instant::now(), record));
    }

    /// Remove and return the record for `message_id`, if still fresh.
    pub fn take(&self, message_id: u64) -> Option<MessageRecord> {
        let (seen, record) = self.lock().pop(&message_id)?;
        (seen.elapsed() <= self.max_age).then_some(record)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LruCache<u64, (Instant, MessageRecord)>> {
        // A panic while holding the lock leaves the cache consistent.
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for MessageCache {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY, Self::DEFAULT_MAX_AGE)
    }
}
