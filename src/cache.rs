//! Result caching with LRU eviction, keyed by corpus and filter scheme

use crate::history::CorpusId;
use crate::query::FilterScheme;
use crate::search::MatchGroup;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

const FALLBACK_CAPACITY: NonZeroUsize = match NonZeroUsize::new(256) {
    Some(n) => n,
    None => unreachable!(),
};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ResultKey {
    corpus: CorpusId,
    scheme: FilterScheme,
}

/// Computed results are immutable snapshots, so a hit can be handed out as
/// a shared `Arc` without copying.
pub struct ResultCache {
    cache: Mutex<LruCache<ResultKey, Arc<Vec<MatchGroup>>>>,
}

impl ResultCache {
    pub fn new(capacity: usize) -> Self {
        let cache = LruCache::new(NonZeroUsize::new(capacity).unwrap_or(FALLBACK_CAPACITY));
        Self {
            cache: Mutex::new(cache),
        }
    }

    /// Cached results for (corpus, scheme), computing and storing them on a
    /// miss.
    pub fn get_or_compute<F>(&self, corpus: CorpusId, scheme: &FilterScheme, compute: F) -> Arc<Vec<MatchGroup>>
    where
        F: FnOnce() -> Vec<MatchGroup>,
    {
        let key = ResultKey {
            corpus,
            scheme: scheme.clone(),
        };
        {
            let mut cache = self.lock();
            if let Some(results) = cache.get(&key) {
                tracing::debug!(corpus = corpus.0, "result cache hit");
                return Arc::clone(results);
            }
        }

        let results = Arc::new(compute());
        {
            let mut cache = self.lock();
            cache.put(key, Arc::clone(&results));
        }
        results
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    /// (entries, capacity)
    pub fn stats(&self) -> (usize, usize) {
        let cache = self.lock();
        (cache.len(), cache.cap().get())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LruCache<ResultKey, Arc<Vec<MatchGroup>>>> {
        // Poisoning is ignored: entries are only ever inserted whole.
        self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::Match;
    use std::cell::Cell;

    #[test]
    fn test_hit_skips_compute() {
        let cache = ResultCache::new(4);
        let scheme = FilterScheme::new().with_lemma("run");
        let calls = Cell::new(0);
        let compute = || {
            calls.set(calls.get() + 1);
            vec![vec![Match {
                anchor_index: 0,
                tokens: Vec::new(),
            }]]
        };

        let first = cache.get_or_compute(CorpusId(1), &scheme, compute);
        let second = cache.get_or_compute(CorpusId(1), &scheme, || unreachable!());
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(calls.get(), 1);

        cache.get_or_compute(CorpusId(2), &scheme, Vec::new);
        assert_eq!(calls.get(), 1);
        assert_eq!(cache.stats(), (2, 4));
    }

    #[test]
    fn test_eviction_and_zero_capacity() {
        let cache = ResultCache::new(1);
        let a = FilterScheme::new().with_lemma("a");
        let b = FilterScheme::new().with_lemma("b");
        cache.get_or_compute(CorpusId(0), &a, Vec::new);
        cache.get_or_compute(CorpusId(0), &b, Vec::new);
        assert_eq!(cache.stats(), (1, 1));
        let recomputed = Cell::new(false);
        cache.get_or_compute(CorpusId(0), &a, || {
            recomputed.set(true);
            Vec::new()
        });
        assert!(recomputed.get());

        cache.clear();
        assert_eq!(cache.stats().0, 0);
        assert_eq!(ResultCache::new(0).stats().1, 256);
    }
}
