//! Bounded newest-first cache for mirrored collections

use fleetdeck_shared::{Alert, TelemetryReading};

/// A row type that can live in a mirror cache.
///
/// The key identifies which cached entry a feed event targets: alerts key
/// by row id, telemetry keys by drone so the latest reading per drone
/// wins.
pub trait FeedRow: Clone + Send + Sync + 'static {
    fn key(&self) -> &str;
}

impl FeedRow for Alert {
    fn key(&self) -> &str {
        &self.id
    }
}

impl FeedRow for TelemetryReading {
    fn key(&self) -> &str {
        &self.drone_id
    }
}

/// Fixed-capacity cache ordered newest first.
///
/// Events are applied in the order received; the cache never reorders or
/// coalesces them.
#[derive(Debug)]
pub struct BoundedCache<T> {
    rows: Vec<T>,
    capacity: usize,
}

impl<T: FeedRow> BoundedCache<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            rows: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Replace the contents with bulk-read rows, already newest first.
    /// A key may appear in several fetched rows (telemetry tables keep
    /// history); only its newest occurrence is admitted, so the cache
    /// opens holding one entry per key.
    pub fn seed(&mut self, rows: Vec<T>) {
        self.rows.clear();
        for row in rows {
            if self.position_of(row.key()).is_none() {
                self.rows.push(row);
            }
        }
        self.rows.truncate(self.capacity);
    }

    /// Apply an insert event: prepend and truncate to capacity. If the
    /// key is already cached the existing entry is replaced in place
    /// instead, so a newer reading supersedes rather than duplicates.
    pub fn apply_insert(&mut self, row: T) {
        if let Some(existing) = self.position_of(row.key()) {
            self.rows[existing] = row;
            return;
        }

        self.rows.insert(0, row);
        self.rows.truncate(self.capacity);
    }

    /// Apply an update event: replace the entry with the matching key,
    /// preserving its position. Returns false when the key is not cached,
    /// which callers treat as a no-op.
    pub fn apply_update(&mut self, row: T) -> bool {
        match self.position_of(row.key()) {
            Some(index) => {
                self.rows[index] = row;
                true
            }
            None => false,
        }
    }

    pub fn rows(&self) -> &[T] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn position_of(&self, key: &str) -> Option<usize> {
        self.rows.iter().position(|r| r.key() == key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Entry {
        key: String,
        value: u32,
    }

    impl Entry {
        fn new(key: &str, value: u32) -> Self {
            Self {
                key: key.to_string(),
                value,
            }
        }
    }

    impl FeedRow for Entry {
        fn key(&self) -> &str {
            &self.key
        }
    }

    #[test]
    fn test_insert_prepends_newest_first() {
        let mut cache = BoundedCache::new(10);
        cache.apply_insert(Entry::new("a", 1));
        cache.apply_insert(Entry::new("b", 2));
        cache.apply_insert(Entry::new("c", 3));

        let keys: Vec<_> = cache.rows().iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, vec!["c", "b", "a"]);
    }

    #[test]
    fn test_overflow_evicts_oldest() {
        let mut cache = BoundedCache::new(10);
        for i in 0..25 {
            cache.apply_insert(Entry::new(&format!("k{i}"), i));
        }

        assert_eq!(cache.len(), 10);
        assert_eq!(cache.rows()[0].key, "k24");
        assert_eq!(cache.rows()[9].key, "k15");
    }

    #[test]
    fn test_insert_with_known_key_replaces_in_place() {
        let mut cache = BoundedCache::new(10);
        cache.apply_insert(Entry::new("a", 1));
        cache.apply_insert(Entry::new("b", 2));
        cache.apply_insert(Entry::new("a", 9));

        assert_eq!(cache.len(), 2);
        // "a" keeps its slot rather than jumping to the front
        assert_eq!(cache.rows()[0], Entry::new("b", 2));
        assert_eq!(cache.rows()[1], Entry::new("a", 9));
    }

    #[test]
    fn test_update_preserves_position() {
        let mut cache = BoundedCache::new(10);
        for key in ["a", "b", "c"] {
            cache.apply_insert(Entry::new(key, 0));
        }

        assert!(cache.apply_update(Entry::new("b", 42)));
        let keys: Vec<_> = cache.rows().iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, vec!["c", "b", "a"]);
        assert_eq!(cache.rows()[1].value, 42);
    }

    #[test]
    fn test_update_unknown_key_is_noop() {
        let mut cache = BoundedCache::new(10);
        cache.apply_insert(Entry::new("a", 1));

        assert!(!cache.apply_update(Entry::new("zz", 7)));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.rows()[0].value, 1);
    }

    #[test]
    fn test_seed_keeps_only_newest_row_per_key() {
        let mut cache = BoundedCache::new(10);
        // Newest first, with history for "a" behind its latest value
        cache.seed(vec![
            Entry::new("a", 500),
            Entry::new("b", 450),
            Entry::new("a", 400),
            Entry::new("a", 300),
            Entry::new("b", 250),
        ]);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.rows()[0], Entry::new("a", 500));
        assert_eq!(cache.rows()[1], Entry::new("b", 450));

        // A later update still lands on the retained entry
        assert!(cache.apply_update(Entry::new("a", 600)));
        assert_eq!(cache.rows()[0], Entry::new("a", 600));
    }

    #[test]
    fn test_seed_truncates_to_capacity() {
        let mut cache = BoundedCache::new(3);
        cache.seed((0..8).map(|i| Entry::new(&format!("k{i}"), i)).collect());
        assert_eq!(cache.len(), 3);
        assert_eq!(cache.rows()[0].key, "k0");
        assert!(!cache.is_empty());
    }
}
