//! Response cache keyed by request digest.
//!
//! A retried request carries byte-identical ciphertext, so its response can
//! be replayed without decrypting again. Entries expire a fixed time after
//! their last access.

use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use brit_lib::protocol::EncryptedMatcherResponse;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// SHA-256 of an encrypted request payload.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestDigest([u8; 32]);

impl RequestDigest {
    pub fn of(payload: &[u8]) -> Self {
        Self(Sha256::digest(payload).into())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for RequestDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RequestDigest({})", hex::encode(&self.0[..8]))
    }
}

/// Cache settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Idle time after which an entry is dropped.
    pub ttl_secs: u64,
    /// Upper bound on stored responses. Zero disables caching.
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 60,
            max_entries: 10_000,
        }
    }
}

impl CacheConfig {
    pub fn disabled() -> Self {
        Self {
            ttl_secs: 0,
            max_entries: 0,
        }
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

/// Storage for encrypted responses, injected into the service.
pub trait ResponseCache: Send + Sync {
    fn get(&self, digest: &RequestDigest) -> Option<EncryptedMatcherResponse>;

    fn put(&self, digest: RequestDigest, response: EncryptedMatcherResponse);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn clear(&self);
}

struct Entry {
    response: EncryptedMatcherResponse,
    last_access: Instant,
}

/// In-memory cache with expire-after-access semantics.
///
/// When full, expired entries are purged first and then the least recently
/// used entry is evicted.
pub struct TtlResponseCache {
    config: CacheConfig,
    entries: Mutex<HashMap<RequestDigest, Entry>>,
}

impl TtlResponseCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub(crate) fn get_at(&self, digest: &RequestDigest, now: Instant) -> Option<EncryptedMatcherResponse> {
        let mut entries = self.entries.lock().ok()?;
        let ttl = self.config.ttl();
        match entries.get_mut(digest) {
            Some(entry) if now.duration_since(entry.last_access) <= ttl => {
                entry.last_access = now;
                Some(entry.response.clone())
            }
            Some(_) => {
                entries.remove(digest);
                None
            }
            None => None,
        }
    }

    pub(crate) fn put_at(&self, digest: RequestDigest, response: EncryptedMatcherResponse, now: Instant) {
        if self.config.max_entries == 0 {
            return;
        }
        let Ok(mut entries) = self.entries.lock() else {
            return;
        };

        if entries.len() >= self.config.max_entries && !entries.contains_key(&digest) {
            let ttl = self.config.ttl();
            entries.retain(|_, entry| now.duration_since(entry.last_access) <= ttl);
            if entries.len() >= self.config.max_entries {
                let oldest = entries
                    .iter()
                    .min_by_key(|(_, entry)| entry.last_access)
                    .map(|(digest, _)| *digest);
                if let Some(oldest) = oldest {
                    entries.remove(&oldest);
                }
            }
        }

        entries.insert(
            digest,
            Entry {
                response,
                last_access: now,
            },
        );
    }
}

impl Default for TtlResponseCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

impl fmt::Debug for TtlResponseCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TtlResponseCache")
            .field("config", &self.config)
            .field("len", &self.len())
            .finish()
    }
}

impl ResponseCache for TtlResponseCache {
    fn get(&self, digest: &RequestDigest) -> Option<EncryptedMatcherResponse> {
        self.get_at(digest, Instant::now())
    }

    fn put(&self, digest: RequestDigest, response: EncryptedMatcherResponse) {
        self.put_at(digest, response, Instant::now())
    }

    fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(byte: u8) -> EncryptedMatcherResponse {
        EncryptedMatcherResponse::new(vec![byte; 48])
    }

    #[test]
    fn test_digest_is_sha256() {
        let digest = RequestDigest::of(b"abc");
        assert_eq!(
            hex::encode(digest.as_bytes()),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_hit_and_miss() {
        let cache = TtlResponseCache::default();
        let digest = RequestDigest::of(b"request");
        assert!(cache.get(&digest).is_none());

        cache.put(digest, response(1));
        assert_eq!(cache.get(&digest), Some(response(1)));
        assert!(cache.get(&RequestDigest::of(b"other")).is_none());
    }

    #[test]
    fn test_expire_after_access() {
        let cache = TtlResponseCache::new(CacheConfig {
            ttl_secs: 60,
            max_entries: 10,
        });
        let digest = RequestDigest::of(b"request");
        let start = Instant::now();
        cache.put_at(digest, response(1), start);

        // Each read pushes expiry out again.
        assert!(cache.get_at(&digest, start + Duration::from_secs(50)).is_some());
        assert!(cache.get_at(&digest, start + Duration::from_secs(100)).is_some());
        assert!(cache.get_at(&digest, start + Duration::from_secs(161)).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_capacity_evicts_least_recently_used() {
        let cache = TtlResponseCache::new(CacheConfig {
            ttl_secs: 600,
            max_entries: 2,
        });
        let (a, b, c) = (RequestDigest::of(b"a"), RequestDigest::of(b"b"), RequestDigest::of(b"c"));
        let start = Instant::now();
        cache.put_at(a, response(1), start);
        cache.put_at(b, response(2), start + Duration::from_secs(1));
        cache.get_at(&a, start + Duration::from_secs(2));
        cache.put_at(c, response(3), start + Duration::from_secs(3));

        assert_eq!(cache.len(), 2);
        assert!(cache.get_at(&b, start + Duration::from_secs(4)).is_none());
        assert!(cache.get_at(&a, start + Duration::from_secs(4)).is_some());
        assert!(cache.get_at(&c, start + Duration::from_secs(4)).is_some());
    }

    #[test]
    fn test_disabled_cache_stores_nothing() {
        let cache = TtlResponseCache::new(CacheConfig::disabled());
        let digest = RequestDigest::of(b"request");
        cache.put(digest, response(1));
        assert!(cache.get(&digest).is_none());
        assert!(cache.is_empty());
    }
}
