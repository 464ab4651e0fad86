//! In-memory reference implementation of [`ShortLivedCache`].
//!
//! Suitable for tests and single-process deployments; hosts with a real
//! cache tier implement the trait themselves.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde_json::Value;
use tracing::trace;

use crate::sinks::ShortLivedCache;

/// Map-backed cache with lazy expiry: entries past their deadline are
/// treated as absent and swept on the next write.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: HashMap<String, (Value, Instant)>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .values()
            .filter(|(_, deadline)| *deadline > now)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ShortLivedCache for MemoryCache {
    fn put(&mut self, key: &str, value: Value, ttl: Duration) {
        let now = Instant::now();
        self.entries.retain(|_, (_, deadline)| *deadline > now);
        trace!(key, ttl_secs = ttl.as_secs(), "cache put");
        self.entries.insert(key.to_string(), (value, now + ttl));
    }

    fn get(&self, key: &str) -> Option<Value> {
        let (value, deadline) = self.entries.get(key)?;
        if *deadline <= Instant::now() {
            return None;
        }
        Some(value.clone())
    }

    fn delete(&mut self, key: &str) {
        self.entries.remove(key);
    }
}
