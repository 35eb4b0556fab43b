//! Concurrent lexicon cache mapping normalized surface forms to entry ids.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Affix-marker characters. Stripped from every key so that a marked
/// prefix/suffix form (e.g. `～的`) and its bare form share one slot.
const AFFIX_MARKERS: [char; 2] = ['~', '～'];

#[derive(Default)]
struct Inner {
    /// Normalized surface form → deduplicated, non-empty id set.
    mapping: HashMap<String, Vec<String>>,
    /// Maximum key length in characters. Monotonic under `upsert`; `remove`
    /// never recomputes it, so it may overestimate until the next reload.
    max_len: usize,
}

impl Inner {
    fn insert(&mut self, form: &str, id: &str) {
        let key = normalize(form);
        let ids = self.mapping.entry(key.clone()).or_default();
        if !ids.iter().any(|existing| existing == id) {
            ids.push(id.to_string());
        }
        let key_len = key.chars().count();
        if key_len > self.max_len {
            self.max_len = key_len;
        }
    }
}

/// Strip affix markers from a surface form.
pub fn normalize(form: &str) -> String {
    form.chars().filter(|c| !AFFIX_MARKERS.contains(c)).collect()
}

/// Thread-safe dictionary cache backing the segmenter.
///
/// Holds only the surface-form → id-set projection of the dictionary; full
/// sense data stays in storage and is hydrated per request. One instance is
/// constructed at startup and shared behind an `Arc`; there is no ambient
/// global. Many readers may probe concurrently while writers are serialized.
#[derive(Default)]
pub struct LexiconCache {
    inner: RwLock<Inner>,
}

impl LexiconCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Atomically replace the whole mapping from a full snapshot of
    /// `(surface form, entry id)` pairs and recompute the maximum key length.
    ///
    /// The exclusive section spans the entire rebuild, so readers observe
    /// either the old mapping or the new one, never a partial state.
    pub fn reload<I>(&self, snapshot: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut inner = self.write();
        inner.mapping.clear();
        inner.max_len = 0;
        for (form, id) in snapshot {
            inner.insert(&form, &id);
        }
    }

    /// Idempotently add `id` under the normalized form, extending the
    /// maximum key length if the key is the longest seen so far.
    pub fn upsert(&self, form: &str, id: &str) {
        self.write().insert(form, id);
    }

    /// Remove one id reference; the key itself is dropped once its set
    /// empties. The maximum key length is left untouched. Removing an
    /// absent key or id is a no-op.
    pub fn remove(&self, form: &str, id: &str) {
        let key = normalize(form);
        let mut inner = self.write();
        if let Some(ids) = inner.mapping.get_mut(&key) {
            ids.retain(|existing| existing != id);
            if ids.is_empty() {
                inner.mapping.remove(&key);
            }
        }
    }

    /// Point read returning a snapshot of the id set for the normalized key.
    pub fn lookup(&self, key: &str) -> Option<Vec<String>> {
        self.read().mapping.get(&normalize(key)).cloned()
    }

    /// Upper bound, in characters, for the segmenter's match-length search.
    pub fn max_key_len(&self) -> usize {
        self.read().max_len
    }

    /// Number of distinct keys currently present.
    pub fn len(&self) -> usize {
        self.read().mapping.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upsert_is_idempotent() {
        let cache = LexiconCache::new();
        cache.upsert("猫", "id_1");
        cache.upsert("猫", "id_1");
        assert_eq!(cache.lookup("猫"), Some(vec!["id_1".to_string()]));
    }

    #[test]
    fn upsert_accumulates_distinct_ids() {
        let cache = LexiconCache::new();
        cache.upsert("的", "id_1");
        cache.upsert("的", "id_2");
        assert_eq!(
            cache.lookup("的"),
            Some(vec!["id_1".to_string(), "id_2".to_string()])
        );
    }

    #[test]
    fn remove_sole_member_drops_the_key() {
        let cache = LexiconCache::new();
        cache.upsert("猫", "id_1");
        cache.remove("猫", "id_1");
        assert_eq!(cache.lookup("猫"), None);
    }

    #[test]
    fn remove_keeps_other_ids() {
        let cache = LexiconCache::new();
        cache.upsert("的", "id_1");
        cache.upsert("的", "id_2");
        cache.remove("的", "id_1");
        assert_eq!(cache.lookup("的"), Some(vec!["id_2".to_string()]));
    }

    #[test]
    fn remove_of_absent_key_or_id_is_noop() {
        let cache = LexiconCache::new();
        cache.upsert("猫", "id_1");
        cache.remove("犬", "id_1");
        cache.remove("猫", "id_9");
        assert_eq!(cache.lookup("猫"), Some(vec!["id_1".to_string()]));
    }

    #[test]
    fn affix_marker_forms_collide_with_bare_forms() {
        let cache = LexiconCache::new();
        cache.upsert("～的", "id_1");
        cache.upsert("的", "id_2");
        assert_eq!(
            cache.lookup("的"),
            Some(vec!["id_1".to_string(), "id_2".to_string()])
        );
        // Lookup normalizes too, so the marked form resolves the same slot.
        assert_eq!(cache.lookup("~的"), cache.lookup("的"));
    }

    #[test]
    fn max_key_len_counts_characters_and_grows_monotonically() {
        let cache = LexiconCache::new();
        cache.upsert("猫", "id_1");
        assert_eq!(cache.max_key_len(), 1);
        cache.upsert("猫が好き", "id_2");
        assert_eq!(cache.max_key_len(), 4);
        cache.upsert("犬", "id_3");
        assert_eq!(cache.max_key_len(), 4);
    }

    #[test]
    fn remove_never_shrinks_max_key_len() {
        let cache = LexiconCache::new();
        cache.upsert("猫", "id_1");
        cache.upsert("図書館員", "id_2");
        cache.remove("図書館員", "id_2");
        assert_eq!(cache.lookup("図書館員"), None);
        assert_eq!(cache.max_key_len(), 4);
    }

    #[test]
    fn reload_replaces_everything_and_recomputes_max_len() {
        let cache = LexiconCache::new();
        cache.upsert("図書館員", "id_1");
        cache.reload(vec![
            ("猫".to_string(), "id_2".to_string()),
            ("犬が".to_string(), "id_3".to_string()),
        ]);
        assert_eq!(cache.lookup("図書館員"), None);
        assert_eq!(cache.lookup("猫"), Some(vec!["id_2".to_string()]));
        assert_eq!(cache.max_key_len(), 2);
        assert_eq!(cache.len(), 2);
    }
}
