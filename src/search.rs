//! Search engine: identity scans, neighbour windows and the filter pipeline
//!
//! Everything here is a pure read of a [`Corpus`]; results come back in
//! corpus order without deduplication.

use crate::corpus::{Corpus, TokenPosition};
use crate::query::{FilterScheme, RangeMode};
use crate::tokens::{Token, TokenField};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One reported occurrence.
///
/// Whole-sentence matches carry the full sentence with `anchor_index` at the
/// hit. Neighbour matches carry the window and `anchor_index` is always the
/// requested left size, even when the window was clipped at the start.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Match {
    pub anchor_index: usize,
    pub tokens: Vec<Token>,
}

impl Match {
    /// Token at `anchor_index`, if the window reaches that far.
    pub fn anchor(&self) -> Option<&Token> {
        self.tokens.get(self.anchor_index)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// Matches produced for one surviving token.
pub type MatchGroup = Vec<Match>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchOptions {
    /// Neighbour windows run across sentence breaks. When off, windows are
    /// clipped to the hit's own sentence.
    pub cross_sentence_windows: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            cross_sentence_windows: true,
        }
    }
}

/// Flattened token view with each sentence's `[start, end)` offsets.
struct FlatView<'a> {
    tokens: Vec<&'a Token>,
    bounds: Vec<(usize, usize)>,
}

impl<'a> FlatView<'a> {
    fn new(corpus: &'a Corpus) -> Self {
        Self {
            tokens: corpus.flattened(),
            bounds: corpus.sentence_bounds(),
        }
    }

    fn sentence_bounds(&self, sentence: usize) -> (usize, usize) {
        self.bounds[sentence]
    }
}

#[derive(Debug, Clone, Default)]
pub struct SearchEngine {
    options: SearchOptions,
}

impl SearchEngine {
    pub fn new(options: SearchOptions) -> Self {
        Self { options }
    }

    /// Whole-sentence matches for every token whose lemma equals the
    /// target's, ignoring case.
    pub fn find(&self, corpus: &Corpus, target: &Token) -> Vec<Match> {
        self.find_by(corpus, target, TokenField::Lemma, false)
    }

    pub fn find_case_sensitive(&self, corpus: &Corpus, target: &Token) -> Vec<Match> {
        self.find_by(corpus, target, TokenField::Lemma, true)
    }

    /// Whole-sentence matches for every token equal to `target` under
    /// `field`.
    pub fn find_by(
        &self,
        corpus: &Corpus,
        target: &Token,
        field: TokenField,
        case_sensitive: bool,
    ) -> Vec<Match> {
        corpus
            .positions()
            .filter(|(_, token)| field.same(token, target, case_sensitive))
            .filter_map(|(pos, _)| sentence_match(corpus, pos))
            .collect()
    }

    pub fn find_with_neighbors(
        &self,
        corpus: &Corpus,
        target: &Token,
        left: usize,
        right: usize,
    ) -> Vec<Match> {
        self.find_with_neighbors_by(corpus, target, TokenField::Lemma, false, left, right)
    }

    pub fn find_with_neighbors_case_sensitive(
        &self,
        corpus: &Corpus,
        target: &Token,
        left: usize,
        right: usize,
    ) -> Vec<Match> {
        self.find_with_neighbors_by(corpus, target, TokenField::Lemma, true, left, right)
    }

    /// Window matches for every token equal to `target` under `field`.
    pub fn find_with_neighbors_by(
        &self,
        corpus: &Corpus,
        target: &Token,
        field: TokenField,
        case_sensitive: bool,
        left: usize,
        right: usize,
    ) -> Vec<Match> {
        let view = FlatView::new(corpus);
        corpus
            .positions()
            .filter(|(_, token)| field.same(token, target, case_sensitive))
            .map(|(pos, _)| self.window_match(&view, pos, left, right))
            .collect()
    }

    /// Stages one and two: positions that satisfy the scheme's field
    /// constraints. The primary key is the first set field in precedence
    /// order (word-form, lemma, POS); the next set field, if any, narrows.
    pub fn select(&self, corpus: &Corpus, scheme: &FilterScheme) -> Vec<TokenPosition> {
        let constraints = scheme.constraints();
        let Some((&(primary, value), rest)) = constraints.split_first() else {
            return Vec::new();
        };
        let narrowing = rest.first().copied();
        let case_sensitive = scheme.case_sensitive;

        corpus
            .positions()
            .filter(|(_, token)| primary.matches(token, value, case_sensitive))
            .filter(|(_, token)| {
                narrowing.map_or(true, |(field, value)| field.matches(token, value, case_sensitive))
            })
            .map(|(pos, _)| pos)
            .collect()
    }

    /// Full pipeline. One group per surviving token in corpus order; no
    /// corpus or no field constraint gives an empty result.
    pub fn filter(&self, corpus: Option<&Corpus>, scheme: &FilterScheme) -> Vec<MatchGroup> {
        let Some(corpus) = corpus else {
            debug!("filter called without a corpus");
            return Vec::new();
        };

        let survivors = self.select(corpus, scheme);
        if survivors.is_empty() {
            return Vec::new();
        }

        let view = FlatView::new(corpus);
        let groups: Vec<MatchGroup> = survivors
            .into_iter()
            .map(|pos| self.context(&view, corpus, pos, scheme.range))
            .filter(|group| !group.is_empty())
            .collect();

        debug!(
            scheme = %scheme,
            groups = groups.len(),
            "filter finished for {}",
            corpus.source_id()
        );
        groups
    }

    /// Stage three for one survivor.
    fn context(
        &self,
        view: &FlatView<'_>,
        corpus: &Corpus,
        pos: TokenPosition,
        range: RangeMode,
    ) -> MatchGroup {
        match range {
            RangeMode::WholeSentence => sentence_match(corpus, pos).into_iter().collect(),
            RangeMode::Neighbors { left, right } => {
                vec![self.window_match(view, pos, left, right)]
            }
            RangeMode::Invalid => Vec::new(),
        }
    }

    fn window_match(
        &self,
        view: &FlatView<'_>,
        pos: TokenPosition,
        left: usize,
        right: usize,
    ) -> Match {
        let bounded = !self.options.cross_sentence_windows;
        let (lo, hi) = if bounded {
            view.sentence_bounds(pos.sentence)
        } else {
            (0, view.tokens.len())
        };
        let start = pos.offset.saturating_sub(left).max(lo);
        let end = pos.offset.saturating_add(right).saturating_add(1).min(hi);

        // Flattened windows keep `left` even when clipped at the corpus
        // start; sentence-bounded windows point at the hit.
        let anchor_index = if bounded { pos.offset - start } else { left };
        Match {
            anchor_index,
            tokens: view.tokens[start..end].iter().map(|t| (*t).clone()).collect(),
        }
    }
}

fn sentence_match(corpus: &Corpus, pos: TokenPosition) -> Option<Match> {
    corpus.sentence(pos.sentence).map(|sentence| Match {
        anchor_index: pos.index,
        tokens: sentence.to_vec(),
    })
}
