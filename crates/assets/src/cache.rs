use std::collections::HashMap;

use sc3_engine::Domain;

/// Least-recently-used cache of media bytes with a total byte budget.
#[derive(Debug)]
pub(crate) struct ByteCache {
    entries: HashMap<String, CachedBytes>,
    usage_counter: u64,
    current_bytes: usize,
    max_bytes: usize,
}

#[derive(Debug)]
struct CachedBytes {
    data: Domain,
    last_used: u64,
}

impl ByteCache {
    pub(crate) fn new(max_bytes: usize) -> Self {
        Self {
            entries: HashMap::new(),
            usage_counter: 0,
            current_bytes: 0,
            max_bytes,
        }
    }

    pub(crate) fn get(&mut self, key: &str) -> Option<Domain> {
        self.usage_counter = self.usage_counter.wrapping_add(1);
        self.entries.get_mut(key).map(|entry| {
            entry.last_used = self.usage_counter;
            entry.data.clone()
        })
    }

    /// Stores `data`, evicting the least recently used entries to stay within
    /// budget. Entries larger than the whole budget are not kept.
    pub(crate) fn insert(&mut self, key: String, data: Domain) {
        let bytes = data.len();
        if bytes > self.max_bytes {
            tracing::debug!(%key, bytes, budget = self.max_bytes, "not caching oversized media");
            return;
        }

        self.usage_counter = self.usage_counter.wrapping_add(1);

        if let Some(old) = self.entries.remove(&key) {
            self.current_bytes = self.current_bytes.saturating_sub(old.data.len());
        }

        while self.current_bytes + bytes > self.max_bytes {
            let Some((evict_key, evict_bytes)) = self
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_used)
                .map(|(k, entry)| (k.clone(), entry.data.len()))
            else {
                break;
            };
            self.entries.remove(&evict_key);
            self.current_bytes = self.current_bytes.saturating_sub(evict_bytes);
        }

        self.entries.insert(
            key,
            CachedBytes {
                data,
                last_used: self.usage_counter,
            },
        );
        self.current_bytes = self.current_bytes.saturating_add(bytes);
    }

    pub(crate) fn current_bytes(&self) -> usize {
        self.current_bytes
    }
}
