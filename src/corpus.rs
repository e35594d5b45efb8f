//! Annotated corpus: ordered sentences of tokens from one loaded source

use crate::tokens::{Sentence, Token, TokenField};
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;

/// Location of a token: sentence index, index inside the sentence, and the
/// offset in the flattened token sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TokenPosition {
    pub sentence: usize,
    pub index: usize,
    pub offset: usize,
}

/// Corpus built once per load. Reloading a source builds a new value; an
/// existing corpus is never mutated.
#[derive(Debug, Clone)]
pub struct Corpus {
    source_id: String,
    created_at: DateTime<Utc>,
    sentences: Vec<Sentence>,
}

impl Corpus {
    pub fn new(source_id: impl Into<String>, sentences: Vec<Sentence>) -> Self {
        Self::with_timestamp(source_id, sentences, Utc::now())
    }

    pub fn with_timestamp(
        source_id: impl Into<String>,
        sentences: Vec<Sentence>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            created_at,
            sentences,
        }
    }

    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn sentences(&self) -> &[Sentence] {
        &self.sentences
    }

    pub fn sentence(&self, idx: usize) -> Option<&[Token]> {
        self.sentences.get(idx).map(|s| s.as_slice())
    }

    pub fn sentence_count(&self) -> usize {
        self.sentences.len()
    }

    pub fn token_count(&self) -> usize {
        self.sentences.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.token_count() == 0
    }

    /// Every token in corpus order, ignoring sentence breaks.
    pub fn tokens(&self) -> impl Iterator<Item = &Token> {
        self.sentences.iter().flatten()
    }

    pub fn flattened(&self) -> Vec<&Token> {
        self.tokens().collect()
    }

    /// Every token with its position, in corpus order.
    pub fn positions(&self) -> impl Iterator<Item = (TokenPosition, &Token)> {
        let mut offset = 0usize;
        self.sentences
            .iter()
            .enumerate()
            .flat_map(|(s, sentence)| sentence.iter().enumerate().map(move |(i, t)| (s, i, t)))
            .map(move |(sentence, index, token)| {
                let pos = TokenPosition {
                    sentence,
                    index,
                    offset,
                };
                offset += 1;
                (pos, token)
            })
    }

    /// Flat offset range `[start, end)` of every sentence.
    pub fn sentence_bounds(&self) -> Vec<(usize, usize)> {
        let mut start = 0;
        self.sentences
            .iter()
            .map(|s| {
                let bounds = (start, start + s.len());
                start += s.len();
                bounds
            })
            .collect()
    }

    /// Distinct values of a field, sorted.
    pub fn vocabulary(&self, field: TokenField) -> Vec<String> {
        self.tokens()
            .map(|t| field.get_value(t))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    /// Field values for completing `input`: prefix matches first, then
    /// values that merely contain it.
    pub fn suggest(&self, field: TokenField, input: &str, limit: usize) -> Vec<String> {
        let vocabulary = self.vocabulary(field);
        let mut ranked = rank_suggestions(vocabulary.iter().map(String::as_str), input);
        ranked.truncate(limit);
        ranked
    }
}

/// Order candidates for an input: starts-with before contains, otherwise
/// keeping the incoming order. An empty input keeps every candidate.
pub fn rank_suggestions<'a>(candidates: impl IntoIterator<Item = &'a str>, input: &str) -> Vec<String> {
    let input = input.trim();
    let mut starts_with = Vec::new();
    let mut contains = Vec::new();

    for item in candidates {
        if input.is_empty() || item.starts_with(input) {
            starts_with.push(item.to_string());
        } else if item.contains(input) {
            contains.push(item.to_string());
        }
    }

    starts_with.extend(contains);
    starts_with
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Corpus {
        Corpus::new(
            "/tmp/sample.txt",
            vec![
                vec![
                    Token::new("The", "DT", "the"),
                    Token::new("dog", "NN", "dog"),
                    Token::new("runs", "VBZ", "run"),
                ],
                vec![Token::new("Dogs", "NNS", "dog"), Token::new("bark", "VBP", "bark")],
            ],
        )
    }

    #[test]
    fn test_counts() {
        let corpus = sample();
        assert_eq!(corpus.sentence_count(), 2);
        assert_eq!(corpus.token_count(), 5);
        assert!(!corpus.is_empty());
        assert!(Corpus::new("empty", vec![vec![]]).is_empty());
    }

    #[test]
    fn test_positions_track_flat_offsets() {
        let corpus = sample();
        let positions: Vec<_> = corpus.positions().map(|(p, _)| (p.sentence, p.index, p.offset)).collect();
        assert_eq!(positions, vec![(0, 0, 0), (0, 1, 1), (0, 2, 2), (1, 0, 3), (1, 1, 4)]);
        assert_eq!(corpus.sentence_bounds(), vec![(0, 3), (3, 5)]);
    }

    #[test]
    fn test_vocabulary_and_suggestions() {
        let corpus = sample();
        assert_eq!(corpus.vocabulary(TokenField::Lemma), vec!["bark", "dog", "run", "the"]);
        assert_eq!(corpus.suggest(TokenField::Form, "D", 10), vec!["Dogs"]);
        assert_eq!(corpus.suggest(TokenField::Lemma, "r", 10), vec!["run", "bark"]);
        assert_eq!(corpus.suggest(TokenField::Pos, "", 2), vec!["DT", "NN"]);
    }
}
