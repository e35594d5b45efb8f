//! Annotators: raw text in, sentences of annotated tokens out

use crate::error::KonkordError;
use crate::tokens::{Sentence, Token};

/// Sentence splitting, tokenization, tagging and lemmatization. A failure
/// rejects the whole text; no partial output is accepted.
pub trait Annotator: Send + Sync {
    fn annotate(&self, text: &str) -> Result<Vec<Sentence>, KonkordError>;
}

/// Reads text that is already annotated: one sentence per non-empty line,
/// tokens separated by whitespace, each written `form/pos/lemma`. Only the
/// last two slashes separate fields, so a form may itself contain `/`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TaggedTextAnnotator;

impl TaggedTextAnnotator {
    fn parse_token(raw: &str, line: usize) -> Result<Token, KonkordError> {
        let mut parts = raw.rsplitn(3, '/');
        let lemma = parts.next().unwrap_or_default();
        let pos = parts.next();
        let form = parts.next();

        match (form, pos) {
            (Some(form), Some(pos)) if !form.is_empty() && !pos.is_empty() && !lemma.is_empty() => {
                Ok(Token::new(form, pos, lemma))
            }
            _ => Err(KonkordError::Annotation(format!(
                "line {}: '{}' is not form/pos/lemma",
                line, raw
            ))),
        }
    }
}

impl Annotator for TaggedTextAnnotator {
    fn annotate(&self, text: &str) -> Result<Vec<Sentence>, KonkordError> {
        text.lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(n, line)| {
                line.split_whitespace()
                    .map(|raw| Self::parse_token(raw, n + 1))
                    .collect::<Result<Sentence, _>>()
            })
            .collect()
    }
}

/// Fallback for plain text: sentences end at `.`, `!` or `?`, words are
/// split on whitespace with surrounding punctuation as separate tokens.
/// Words get POS `X` and their lowercased form as lemma; punctuation gets
/// POS `.` and itself as lemma.
#[derive(Debug, Clone, Copy, Default)]
pub struct WhitespaceAnnotator;

const SENTENCE_END: [char; 3] = ['.', '!', '?'];

impl WhitespaceAnnotator {
    fn split_word(word: &str, out: &mut Vec<String>) {
        let core_start = word
            .char_indices()
            .find(|(_, c)| !c.is_ascii_punctuation())
            .map(|(i, _)| i);
        let Some(core_start) = core_start else {
            out.extend(word.chars().map(String::from));
            return;
        };
        let core_end = word
            .char_indices()
            .rev()
            .find(|(_, c)| !c.is_ascii_punctuation())
            .map(|(i, c)| i + c.len_utf8())
            .unwrap_or(word.len());

        out.extend(word[..core_start].chars().map(String::from));
        out.push(word[core_start..core_end].to_string());
        out.extend(word[core_end..].chars().map(String::from));
    }
}

impl Annotator for WhitespaceAnnotator {
    fn annotate(&self, text: &str) -> Result<Vec<Sentence>, KonkordError> {
        let mut pieces = Vec::new();
        for word in text.split_whitespace() {
            Self::split_word(word, &mut pieces);
        }

        let mut sentences = Vec::new();
        let mut sentence: Sentence = Vec::new();
        for piece in pieces {
            let is_punct = piece.chars().all(|c| c.is_ascii_punctuation());
            let ends = piece.len() == 1 && piece.starts_with(&SENTENCE_END[..]);
            let token = if is_punct {
                Token::new(piece.clone(), ".", piece)
            } else {
                Token::new(piece.clone(), "X", piece.to_lowercase())
            };
            sentence.push(token);
            if ends {
                sentences.push(std::mem::take(&mut sentence));
            }
        }
        if !sentence.is_empty() {
            sentences.push(sentence);
        }
        Ok(sentences)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn render(sentences: &[Sentence]) -> Vec<Vec<String>> {
        sentences
            .iter()
            .map(|s| s.iter().map(|t| t.to_string()).collect())
            .collect()
    }

    #[test]
    fn test_tagged_text() {
        let text = "The/DT/the dog/NN/dog runs/VBZ/run ././.\n\n  and/CC/and/or ½/CD/½ \n";
        let sentences = TaggedTextAnnotator.annotate(text).unwrap();
        assert_eq!(
            render(&sentences),
            vec![
                vec!["The/DT/the", "dog/NN/dog", "runs/VBZ/run", "././."],
                vec!["and/CC/and/or", "½/CD/½"],
            ]
        );
        assert_eq!(sentences[1][0].form, "and/CC");
        assert_eq!(sentences[1][0].pos, "and");
    }

    #[test]
    fn test_tagged_text_rejects_malformed_tokens() {
        for text in ["dog/NN", "dog", "/NN/dog", "dog//dog", "dog/NN/"] {
            let err = TaggedTextAnnotator.annotate(text).unwrap_err();
            assert!(matches!(err, KonkordError::Annotation(_)), "{text}");
        }
    }

    #[test]
    fn test_whitespace_annotator() {
        let sentences = WhitespaceAnnotator
            .annotate("The dog runs. \"Really?\" Yes")
            .unwrap();
        assert_eq!(
            render(&sentences),
            vec![
                vec!["The/X/the", "dog/X/dog", "runs/X/runs", "././."],
                vec!["\"/./\"", "Really/X/really", "?/./?"],
                vec!["\"/./\"", "Yes/X/yes"],
            ]
        );
    }

    #[test]
    fn test_empty_text() {
        assert!(TaggedTextAnnotator.annotate("\n \n").unwrap().is_empty());
        assert!(WhitespaceAnnotator.annotate("   ").unwrap().is_empty());
    }
}
