//! Session: the single owner of history, engine, cache and collaborators

use crate::annotate::{Annotator, TaggedTextAnnotator, WhitespaceAnnotator};
use crate::cache::ResultCache;
use crate::config::{AnnotatorKind, Config, ExportFormat};
use crate::corpus::Corpus;
use crate::error::KonkordError;
use crate::export::ExportCollection;
use crate::history::{CorpusId, HistoryEntry, HistoryStore};
use crate::query::FilterScheme;
use crate::recent::RecentSources;
use crate::search::{MatchGroup, SearchEngine};
use crate::source::{DispatchFetcher, SourceFetcher};
use crate::tokens::TokenField;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

const SUGGESTION_LIMIT: usize = 20;

pub fn annotator_for(kind: AnnotatorKind) -> Arc<dyn Annotator> {
    match kind {
        AnnotatorKind::Tagged => Arc::new(TaggedTextAnnotator),
        AnnotatorKind::Whitespace => Arc::new(WhitespaceAnnotator),
    }
}

/// Fetch and annotate one source. Holds no reference to the session, so it
/// can run on a blocking worker while the session stays with its caller.
pub struct LoadJob {
    identifier: String,
    fetcher: Arc<dyn SourceFetcher>,
    annotator: Arc<dyn Annotator>,
}

impl LoadJob {
    pub fn run(self) -> Result<Corpus, KonkordError> {
        let built = self
            .fetcher
            .fetch(&self.identifier)
            .and_then(|text| self.annotator.annotate(&text));
        match built {
            Ok(sentences) => Ok(Corpus::new(self.identifier, sentences)),
            Err(e) => {
                warn!("Failed to load {}: {}", self.identifier, e);
                Err(e)
            }
        }
    }
}

pub struct Session {
    config: Config,
    store: HistoryStore,
    engine: SearchEngine,
    cache: ResultCache,
    fetcher: Arc<dyn SourceFetcher>,
    annotator: Arc<dyn Annotator>,
    recent: Option<RecentSources>,
}

impl Session {
    /// Session with the dispatching fetcher, the configured annotator and
    /// the recent-sources list in the settings database.
    pub fn new(config: Config) -> Result<Self, KonkordError> {
        let fetcher: Arc<dyn SourceFetcher> = Arc::new(DispatchFetcher::new()?);
        let annotator = annotator_for(config.annotator);
        let recent = RecentSources::open(config.settings_db_path(), config.recent_sources_limit)?;
        Ok(Self::with_collaborators(config, fetcher, annotator).with_recent(recent))
    }

    /// Session without a recent-sources list.
    pub fn with_collaborators(
        config: Config,
        fetcher: Arc<dyn SourceFetcher>,
        annotator: Arc<dyn Annotator>,
    ) -> Self {
        Self {
            engine: SearchEngine::new(config.search_options()),
            cache: ResultCache::new(config.result_cache_capacity),
            config,
            store: HistoryStore::new(),
            fetcher,
            annotator,
            recent: None,
        }
    }

    pub fn with_recent(mut self, recent: RecentSources) -> Self {
        self.recent = Some(recent);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &HistoryStore {
        &self.store
    }

    /// Write the effective configuration to the data directory.
    pub fn save_config(&self) -> Result<PathBuf, KonkordError> {
        self.config.save()
    }

    /// (entries, capacity) of the result cache.
    pub fn cache_stats(&self) -> (usize, usize) {
        self.cache.stats()
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    pub fn load_job(&self, identifier: &str) -> LoadJob {
        LoadJob {
            identifier: identifier.trim().to_string(),
            fetcher: Arc::clone(&self.fetcher),
            annotator: Arc::clone(&self.annotator),
        }
    }

    /// Register a corpus built by a [`LoadJob`] and make it active.
    pub fn install(&mut self, corpus: Corpus) -> CorpusId {
        let source_id = corpus.source_id().to_string();
        info!(
            sentences = corpus.sentence_count(),
            tokens = corpus.token_count(),
            "Loaded {}",
            source_id
        );
        let id = self.store.register(corpus);
        if let Some(recent) = &self.recent {
            if let Err(e) = recent.add(&source_id) {
                warn!("Failed to record recent source {}: {}", source_id, e);
            }
        }
        id
    }

    /// Fetch, annotate and register in one blocking call. A failure leaves
    /// the history exactly as it was.
    pub fn load(&mut self, identifier: &str) -> Result<CorpusId, KonkordError> {
        let corpus = self.load_job(identifier).run()?;
        Ok(self.install(corpus))
    }

    pub fn activate(&mut self, source_id: &str) -> Result<CorpusId, KonkordError> {
        self.store
            .activate(source_id.trim())
            .ok_or_else(|| KonkordError::NotFound(format!("No corpus loaded from {}", source_id)))
    }

    pub fn active_corpus(&self) -> Option<Arc<Corpus>> {
        self.store.active_corpus()
    }

    fn results(&self, id: CorpusId, corpus: &Corpus, scheme: &FilterScheme) -> Arc<Vec<MatchGroup>> {
        self.cache
            .get_or_compute(id, scheme, || self.engine.filter(Some(corpus), scheme))
    }

    /// Run a scheme against the active corpus and record it. Without an
    /// active corpus the result is empty and nothing is recorded.
    pub fn run(&mut self, scheme: FilterScheme) -> Arc<Vec<MatchGroup>> {
        let (Some(id), Some(corpus)) = (self.store.active(), self.store.active_corpus()) else {
            debug!(scheme = %scheme, "no active corpus");
            return Arc::new(Vec::new());
        };
        let results = self.results(id, &corpus, &scheme);
        self.store.record(scheme);
        results
    }

    /// Re-run a history entry against its own corpus. History is not
    /// touched.
    pub fn replay(&self, entry: &HistoryEntry) -> Result<Arc<Vec<MatchGroup>>, KonkordError> {
        let corpus = self
            .store
            .corpus(entry.corpus)
            .ok_or_else(|| KonkordError::NotFound(format!("corpus #{}", entry.corpus.0)))?;
        Ok(self.results(entry.corpus, &corpus, &entry.scheme))
    }

    /// Replay a rendered scheme. Malformed text is refused.
    pub fn replay_text(&self, corpus: CorpusId, text: &str) -> Result<Arc<Vec<MatchGroup>>, KonkordError> {
        let scheme = FilterScheme::parse(text)?;
        self.replay(&HistoryEntry { corpus, scheme })
    }

    /// History shown for the active corpus, including what was run against
    /// earlier corpora of the same source.
    pub fn history(&self) -> Vec<HistoryEntry> {
        self.store
            .active()
            .map(|id| self.store.display_history(id))
            .unwrap_or_default()
    }

    pub fn replay_index(&self, index: usize) -> Result<(HistoryEntry, Arc<Vec<MatchGroup>>), KonkordError> {
        let entry = self
            .history()
            .into_iter()
            .nth(index)
            .ok_or_else(|| KonkordError::NotFound(format!("history entry {}", index)))?;
        let results = self.replay(&entry)?;
        Ok((entry, results))
    }

    pub fn sources(&self) -> Vec<String> {
        self.store.sources()
    }

    pub fn suggest(&self, field: TokenField, input: &str) -> Vec<String> {
        self.active_corpus()
            .map(|c| c.suggest(field, input, SUGGESTION_LIMIT))
            .unwrap_or_default()
    }

    pub fn recent_sources(&self, input: &str) -> Result<Vec<String>, KonkordError> {
        match &self.recent {
            Some(recent) => recent.suggest(input),
            None => Ok(Vec::new()),
        }
    }

    /// Commit the current list, then recompute every (corpus, scheme) pair
    /// ever run.
    pub fn export_collection(&mut self) -> ExportCollection {
        self.store.flush();
        let mut collection = ExportCollection::new();
        for entry in self.store.entries() {
            let Some(corpus) = self.store.corpus(entry.corpus) else {
                continue;
            };
            let results = self.results(entry.corpus, &corpus, &entry.scheme);
            collection.push_results(&corpus, &entry.scheme, &results);
        }
        collection
    }

    pub fn export(&mut self, path: &Path, format: Option<ExportFormat>) -> Result<usize, KonkordError> {
        let collection = self.export_collection();
        collection.write_to(path, format.unwrap_or(self.config.export_format))?;
        Ok(collection.len())
    }

    /// Every registered corpus in load order, whole.
    pub fn corpora_collection(&self) -> ExportCollection {
        let mut collection = ExportCollection::new();
        for (_, corpus) in self.store.corpora() {
            collection.push_corpus(&corpus);
        }
        collection
    }

    pub fn export_corpora(&self, path: &Path, format: Option<ExportFormat>) -> Result<usize, KonkordError> {
        let collection = self.corpora_collection();
        collection.write_to(path, format.unwrap_or(self.config.export_format))?;
        Ok(collection.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    struct MapFetcher(HashMap<&'static str, &'static str>);

    impl SourceFetcher for MapFetcher {
        fn fetch(&self, identifier: &str) -> Result<String, KonkordError> {
            self.0
                .get(identifier)
                .map(|s| s.to_string())
                .ok_or_else(|| KonkordError::Fetch(identifier.to_string()))
        }
    }

    fn session() -> Session {
        let fetcher = MapFetcher(HashMap::from([
            ("/a", "The/DT/the dog/NN/dog runs/VBZ/run\nDogs/NNS/dog bark/VBP/bark"),
            ("/b", "A/DT/a cat/NN/cat sleeps/VBZ/sleep"),
            ("/bad", "not tagged"),
        ]));
        let config = Config {
            data_dir: std::env::temp_dir(),
            ..Config::default()
        };
        Session::with_collaborators(config, Arc::new(fetcher), Arc::new(TaggedTextAnnotator))
    }

    #[test]
    fn test_run_without_corpus_is_empty_and_unrecorded() {
        let mut session = session();
        assert!(session.run(FilterScheme::new().with_lemma("dog")).is_empty());
        assert!(session.history().is_empty());
        assert!(session.store().entries().is_empty());
    }

    #[test]
    fn test_failed_load_keeps_history() {
        let mut session = session();
        let a = session.load("/a").unwrap();
        session.run(FilterScheme::new().with_lemma("dog"));

        assert!(matches!(session.load("/bad"), Err(KonkordError::Annotation(_))));
        assert!(matches!(session.load("/missing"), Err(KonkordError::Fetch(_))));
        assert_eq!(session.store().active(), Some(a));
        assert_eq!(session.store().current().len(), 1);
        assert_eq!(session.store().corpora().len(), 1);
    }

    #[test]
    fn test_replay_does_not_record() {
        let mut session = session();
        session.load("/a").unwrap();
        let first = session.run(FilterScheme::new().with_lemma("dog"));
        assert_eq!(first.len(), 2);

        let (entry, replayed) = session.replay_index(0).unwrap();
        assert!(Arc::ptr_eq(&first, &replayed));
        assert_eq!(entry.scheme.lemma, "dog");
        assert_eq!(session.history().len(), 1);
        assert!(session.replay_index(1).is_err());

        let rendered = entry.scheme.render();
        assert_eq!(session.replay_text(entry.corpus, &rendered).unwrap().len(), 2);
        assert!(matches!(
            session.replay_text(entry.corpus, "WF=\"dog\""),
            Err(KonkordError::InvalidQuery(_))
        ));
        assert_eq!(session.history().len(), 1);
    }

    #[test]
    fn test_activate_and_suggest() {
        let mut session = session();
        let a = session.load("/a").unwrap();
        session.load("/b").unwrap();
        assert_eq!(session.suggest(TokenField::Lemma, "s"), vec!["sleep"]);

        assert_eq!(session.activate(" /a ").unwrap(), a);
        assert_eq!(session.suggest(TokenField::Form, "d"), vec!["dog"]);
        assert!(matches!(session.activate("/zzz"), Err(KonkordError::NotFound(_))));
        assert_eq!(session.sources(), vec!["/a".to_string(), "/b".to_string()]);
        assert!(session.recent_sources("").unwrap().is_empty());
    }

    #[test]
    fn test_export_collection_walks_all_corpora() {
        let mut session = session();
        session.load("/a").unwrap();
        session.run(FilterScheme::new().with_lemma("dog"));
        session.run(FilterScheme::new().with_lemma("nothing"));
        session.load("/b").unwrap();
        session.run(FilterScheme::new().with_pos("NN").with_neighbors(1, 1));

        let collection = session.export_collection();
        let urls: Vec<_> = collection
            .documents
            .iter()
            .map(|d| d.metadata.url.as_str())
            .collect();
        assert_eq!(urls, vec!["/a", "/b"]);
        assert!(session.store().current().is_empty());

        assert_eq!(session.corpora_collection().len(), 2);
    }
}
