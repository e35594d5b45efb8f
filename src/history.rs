//! Query history: loaded corpora, the schemes run against each, and the
//! not-yet-committed list for the active corpus

use crate::corpus::Corpus;
use crate::query::FilterScheme;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// Store-assigned handle of a registered corpus, in load order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CorpusId(pub usize);

/// One (corpus, scheme) pair from the history, in the order it was run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub corpus: CorpusId,
    pub scheme: FilterScheme,
}

#[derive(Debug, Default)]
pub struct HistoryStore {
    corpora: Vec<Arc<Corpus>>,
    by_source: HashMap<String, CorpusId>,
    committed: HashMap<CorpusId, Vec<FilterScheme>>,
    current: Vec<FilterScheme>,
    active: Option<CorpusId>,
}

impl HistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a freshly built corpus and make it active. The outgoing
    /// active corpus gets its current list committed first.
    pub fn register(&mut self, corpus: Corpus) -> CorpusId {
        let id = CorpusId(self.corpora.len());
        let source_id = corpus.source_id().to_string();
        self.corpora.push(Arc::new(corpus));

        if let Some(previous) = self.by_source.insert(source_id.clone(), id) {
            info!("Reloaded {} (previous corpus #{})", source_id, previous.0);
        }
        self.switch_to(id);
        id
    }

    /// Make the latest corpus of `source_id` active again.
    pub fn activate(&mut self, source_id: &str) -> Option<CorpusId> {
        let id = *self.by_source.get(source_id)?;
        self.switch_to(id);
        Some(id)
    }

    fn switch_to(&mut self, id: CorpusId) {
        if self.active == Some(id) {
            return;
        }
        self.flush();
        self.active = Some(id);
        info!("Active corpus is now #{}", id.0);
    }

    /// Commit the current list into the active corpus's permanent history.
    pub fn flush(&mut self) {
        let Some(active) = self.active else {
            self.current.clear();
            return;
        };
        if self.current.is_empty() {
            return;
        }
        self.committed
            .entry(active)
            .or_default()
            .extend(std::mem::take(&mut self.current));
    }

    /// Record a scheme run against the active corpus. Without an active
    /// corpus nothing was run, so nothing is recorded.
    pub fn record(&mut self, scheme: FilterScheme) -> bool {
        if self.active.is_none() {
            return false;
        }
        self.current.push(scheme);
        true
    }

    pub fn active(&self) -> Option<CorpusId> {
        self.active
    }

    pub fn active_corpus(&self) -> Option<Arc<Corpus>> {
        self.active.and_then(|id| self.corpus(id))
    }

    pub fn corpus(&self, id: CorpusId) -> Option<Arc<Corpus>> {
        self.corpora.get(id.0).cloned()
    }

    /// Every corpus ever registered, in load order.
    pub fn corpora(&self) -> Vec<(CorpusId, Arc<Corpus>)> {
        self.corpora
            .iter()
            .enumerate()
            .map(|(i, c)| (CorpusId(i), Arc::clone(c)))
            .collect()
    }

    /// Distinct source ids in first-load order.
    pub fn sources(&self) -> Vec<String> {
        let mut seen = Vec::new();
        for corpus in &self.corpora {
            let source = corpus.source_id();
            if !seen.iter().any(|s: &String| s == source) {
                seen.push(source.to_string());
            }
        }
        seen
    }

    /// Committed schemes of a corpus.
    pub fn committed(&self, id: CorpusId) -> Vec<FilterScheme> {
        self.committed.get(&id).cloned().unwrap_or_default()
    }

    /// Schemes run against the active corpus since it became active.
    pub fn current(&self) -> Vec<FilterScheme> {
        self.current.clone()
    }

    /// Everything run against a corpus: committed, then current if active.
    pub fn queries(&self, id: CorpusId) -> Vec<FilterScheme> {
        let mut all = self.committed(id);
        if self.active == Some(id) {
            all.extend(self.current.iter().cloned());
        }
        all
    }

    /// History shown for a corpus: schemes run against earlier corpora of the
    /// same source, then its own.
    pub fn display_history(&self, id: CorpusId) -> Vec<HistoryEntry> {
        let Some(corpus) = self.corpus(id) else {
            return Vec::new();
        };
        self.corpora
            .iter()
            .enumerate()
            .take(id.0 + 1)
            .filter(|(_, c)| c.source_id() == corpus.source_id())
            .flat_map(|(i, _)| {
                let owner = CorpusId(i);
                self.queries(owner)
                    .into_iter()
                    .map(move |scheme| HistoryEntry { corpus: owner, scheme })
            })
            .collect()
    }

    /// Every (corpus, scheme) pair in load order, then run order.
    pub fn entries(&self) -> Vec<HistoryEntry> {
        (0..self.corpora.len())
            .map(CorpusId)
            .flat_map(|id| {
                self.queries(id)
                    .into_iter()
                    .map(move |scheme| HistoryEntry { corpus: id, scheme })
            })
            .collect()
    }
}
