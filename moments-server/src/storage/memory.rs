//! In-memory object store backend for tests.

use std::sync::atomic::{AtomicUsize, Ordering};

use dashmap::DashMap;

pub struct MemoryObjectStore {
    objects: DashMap<String, Vec<u8>>,
    puts: AtomicUsize,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self {
            objects: DashMap::new(),
            puts: AtomicUsize::new(0),
        }
    }

    pub fn put(&self, key: &str, bytes: &[u8]) {
        self.objects.insert(key.to_string(), bytes.to_vec());
        self.puts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.get(key).map(|b| b.clone())
    }

    pub fn delete(&self, key: &str) {
        self.objects.remove(key);
    }

    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::Relaxed)
    }
}

impl Default for MemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}
