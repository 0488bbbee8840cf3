//! Response cache.
//!
//! # Design
//! The dispatcher only reads and writes through `ResponseCache`; eviction and
//! capacity belong to the implementation. `MemoryCache` bounds itself by the
//! approximate byte size of its entries and lets mini-moka evict.
//!
//! Entries are keyed by method, URL and request headers. The body is not part
//! of the key, so two POSTs to the same URL with the same headers share an
//! entry. The per-request multipart boundary is dropped from `Content-Type`
//! so multipart requests follow the same rule.

use mini_moka::sync::Cache;

use crate::http::{HttpMethod, HttpRequest, HttpResponse};

pub const DEFAULT_MEMORY_CAPACITY: u64 = 4 * 1024 * 1024;
pub const DEFAULT_DISK_CAPACITY: u64 = 20 * 1024 * 1024;

/// Identity of a request for caching purposes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    method: HttpMethod,
    url: String,
    /// Lower-cased names, sorted.
    headers: Vec<(String, String)>,
}

impl CacheKey {
    pub fn from_request(request: &HttpRequest) -> Self {
        let mut headers: Vec<(String, String)> = request
            .headers
            .iter()
            .map(|(k, v)| {
                let name = k.to_ascii_lowercase();
                let value = key_value(&name, v);
                (name, value)
            })
            .collect();
        headers.sort();
        Self {
            method: request.method,
            url: request.url.clone(),
            headers,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn weight(&self) -> usize {
        self.url.len()
            + self
                .headers
                .iter()
                .map(|(k, v)| k.len() + v.len())
                .sum::<usize>()
    }
}

/// Header value as it enters the key. A multipart `Content-Type` loses its
/// parameters, since the boundary is random per request.
fn key_value(name: &str, value: &str) -> String {
    if name == "content-type" {
        if let Some((media_type, _)) = value.split_once(';') {
            let media_type = media_type.trim();
            if media_type.to_ascii_lowercase().starts_with("multipart/") {
                return media_type.to_string();
            }
        }
    }
    value.to_string()
}

/// A stored response: status, headers and raw body bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl CachedResponse {
    fn weight(&self) -> usize {
        self.body.len()
            + self
                .headers
                .iter()
                .map(|(k, v)| k.len() + v.len())
                .sum::<usize>()
    }
}

impl From<&HttpResponse> for CachedResponse {
    fn from(response: &HttpResponse) -> Self {
        Self {
            status: response.status,
            headers: response.headers.clone(),
            body: response.body.clone(),
        }
    }
}

/// Store consulted before and updated after every network call.
///
/// Implementations must be internally synchronized.
pub trait ResponseCache: Send + Sync {
    fn lookup(&self, key: &CacheKey) -> Option<CachedResponse>;

    fn store(&self, key: CacheKey, response: CachedResponse);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// Upper bound on the approximate bytes held in memory.
    pub memory_capacity: u64,
    /// Capacity for hosts that back the cache with disk storage.
    /// `MemoryCache` does not use it.
    pub disk_capacity: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            memory_capacity: DEFAULT_MEMORY_CAPACITY,
            disk_capacity: DEFAULT_DISK_CAPACITY,
        }
    }
}

/// In-memory cache weighted by entry size.
#[derive(Clone)]
pub struct MemoryCache {
    entries: Cache<CacheKey, CachedResponse>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::with_config(CacheConfig::default())
    }

    pub fn with_config(config: CacheConfig) -> Self {
        let entries = Cache::builder()
            .max_capacity(config.memory_capacity)
            .weigher(|key: &CacheKey, value: &CachedResponse| {
                (key.weight() + value.weight()).min(u32::MAX as usize) as u32
            })
            .build();
        Self { entries }
    }

    pub fn entry_count(&self) -> u64 {
        self.entries.entry_count()
    }

    pub fn clear(&self) {
        self.entries.invalidate_all();
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseCache for MemoryCache {
    fn lookup(&self, key: &CacheKey) -> Option<CachedResponse> {
        self.entries.get(key)
    }

    fn store(&self, key: CacheKey, response: CachedResponse) {
        self.entries.insert(key, response);
    }
}

/// A cache that never holds anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCache;

impl ResponseCache for NoCache {
    fn lookup(&self, _key: &CacheKey) -> Option<CachedResponse> {
        None
    }

    fn store(&self, _key: CacheKey, _response: CachedResponse) {}
}
