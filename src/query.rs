//! Filter schemes: what to match and how much context to report
//!
//! A scheme renders to one canonical line, e.g.
//! `WF="run",Lemma="",POS="NN",of_neighbour="2:3",case-sensitive`, which is
//! what history lists show and what export files store.

use crate::error::KonkordError;
use crate::tokens::TokenField;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RangeMode {
    #[default]
    WholeSentence,
    Neighbors {
        left: usize,
        right: usize,
    },
    Invalid,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct FilterScheme {
    pub case_sensitive: bool,
    pub range: RangeMode,
    pub word_form: String,
    pub pos: String,
    pub lemma: String,
}

impl FilterScheme {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_word_form(mut self, value: impl Into<String>) -> Self {
        self.word_form = value.into();
        self
    }

    pub fn with_pos(mut self, value: impl Into<String>) -> Self {
        self.pos = value.into();
        self
    }

    pub fn with_lemma(mut self, value: impl Into<String>) -> Self {
        self.lemma = value.into();
        self
    }

    pub fn with_range(mut self, range: RangeMode) -> Self {
        self.range = range;
        self
    }

    pub fn with_neighbors(self, left: usize, right: usize) -> Self {
        self.with_range(RangeMode::Neighbors { left, right })
    }

    pub fn case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    pub fn value(&self, field: TokenField) -> &str {
        match field {
            TokenField::Form => &self.word_form,
            TokenField::Pos => &self.pos,
            TokenField::Lemma => &self.lemma,
        }
    }

    /// Set constraints in precedence order: word-form, lemma, POS.
    pub fn constraints(&self) -> Vec<(TokenField, &str)> {
        [TokenField::Form, TokenField::Lemma, TokenField::Pos]
            .into_iter()
            .map(|field| (field, self.value(field)))
            .filter(|(_, value)| !value.is_empty())
            .collect()
    }

    pub fn has_constraint(&self) -> bool {
        !self.constraints().is_empty()
    }

    /// Canonical single-line form.
    pub fn render(&self) -> String {
        let mut out = format!(
            "WF=\"{}\",Lemma=\"{}\",POS=\"{}\"",
            escape(&self.word_form),
            escape(&self.lemma),
            escape(&self.pos)
        );
        match self.range {
            RangeMode::WholeSentence => out.push_str(",whole_sentence"),
            RangeMode::Neighbors { left, right } => {
                out.push_str(&format!(",of_neighbour=\"{}:{}\"", left, right))
            }
            RangeMode::Invalid => {}
        }
        if self.case_sensitive {
            out.push_str(",case-sensitive");
        }
        out
    }

    /// Parse the canonical form. A missing range token means whole sentence;
    /// anything else that does not fit the form is rejected.
    pub fn parse(text: &str) -> Result<Self, KonkordError> {
        let items = split_items(text.trim())?;

        let mut word_form = None;
        let mut lemma = None;
        let mut pos = None;
        let mut range = None;
        let mut case_sensitive = false;

        for item in items {
            match item {
                Item::Flag(flag) => match flag.as_str() {
                    "whole_sentence" => set_once(&mut range, RangeMode::WholeSentence, "range")?,
                    "case-sensitive" if !case_sensitive => case_sensitive = true,
                    "case-sensitive" => return Err(invalid("duplicate case-sensitive flag")),
                    other => return Err(invalid(format!("unknown token '{}'", other))),
                },
                Item::Pair(key, value) => match key.as_str() {
                    "WF" => set_once(&mut word_form, value, "WF")?,
                    "Lemma" => set_once(&mut lemma, value, "Lemma")?,
                    "POS" => set_once(&mut pos, value, "POS")?,
                    "of_neighbour" => set_once(&mut range, parse_window(&value)?, "range")?,
                    other => return Err(invalid(format!("unknown key '{}'", other))),
                },
            }
        }

        Ok(Self {
            case_sensitive,
            range: range.unwrap_or_default(),
            word_form: word_form.ok_or_else(|| invalid("missing WF"))?,
            pos: pos.ok_or_else(|| invalid("missing POS"))?,
            lemma: lemma.ok_or_else(|| invalid("missing Lemma"))?,
        })
    }
}

impl fmt::Display for FilterScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl FromStr for FilterScheme {
    type Err = KonkordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FilterScheme::parse(s)
    }
}

fn invalid(msg: impl Into<String>) -> KonkordError {
    KonkordError::InvalidQuery(msg.into())
}

fn set_once<T>(slot: &mut Option<T>, value: T, name: &str) -> Result<(), KonkordError> {
    if slot.is_some() {
        return Err(invalid(format!("duplicate {}", name)));
    }
    *slot = Some(value);
    Ok(())
}

fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

fn parse_window(value: &str) -> Result<RangeMode, KonkordError> {
    let (left, right) = value
        .split_once(':')
        .ok_or_else(|| invalid(format!("bad neighbour window '{}'", value)))?;
    let left = left
        .parse::<usize>()
        .map_err(|_| invalid(format!("bad left window size '{}'", left)))?;
    let right = right
        .parse::<usize>()
        .map_err(|_| invalid(format!("bad right window size '{}'", right)))?;
    Ok(RangeMode::Neighbors { left, right })
}

enum Item {
    Flag(String),
    Pair(String, String),
}

/// Split `key="value",flag,...` into items, honouring backslash escapes
/// inside quoted values.
fn split_items(text: &str) -> Result<Vec<Item>, KonkordError> {
    let mut items = Vec::new();
    let mut chars = text.chars().peekable();

    while chars.peek().is_some() {
        let mut key = String::new();
        while let Some(&c) = chars.peek() {
            if c == '=' || c == ',' {
                break;
            }
            key.push(c);
            chars.next();
        }

        match chars.next() {
            None | Some(',') => {
                if key.is_empty() {
                    return Err(invalid("empty item"));
                }
                let at_end = chars.peek().is_none();
                items.push(Item::Flag(key));
                if at_end && text.ends_with(',') {
                    return Err(invalid("trailing comma"));
                }
            }
            Some(_) => {
                if chars.next() != Some('"') {
                    return Err(invalid(format!("value of '{}' must be quoted", key)));
                }
                let mut value = String::new();
                let mut closed = false;
                while let Some(c) = chars.next() {
                    match c {
                        '\\' => match chars.next() {
                            Some(escaped) => value.push(escaped),
                            None => break,
                        },
                        '"' => {
                            closed = true;
                            break;
                        }
                        c => value.push(c),
                    }
                }
                if !closed {
                    return Err(invalid(format!("unterminated value for '{}'", key)));
                }
                items.push(Item::Pair(key, value));
                match chars.next() {
                    None => {}
                    Some(',') if chars.peek().is_some() => {}
                    Some(',') => return Err(invalid("trailing comma")),
                    Some(c) => return Err(invalid(format!("unexpected '{}' after value", c))),
                }
            }
        }
    }

    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn test_render() {
        let scheme = FilterScheme::new()
            .with_word_form("run")
            .with_pos("NN")
            .with_neighbors(2, 3)
            .case_sensitive(true);
        assert_eq!(
            scheme.render(),
            r#"WF="run",Lemma="",POS="NN",of_neighbour="2:3",case-sensitive"#
        );
        assert_eq!(
            FilterScheme::new().with_lemma("be").render(),
            r#"WF="",Lemma="be",POS="",whole_sentence"#
        );
    }

    #[test]
    fn test_parse_round_trip_with_escapes() {
        let scheme = FilterScheme::new()
            .with_word_form(r#"say "hi", \ok"#)
            .with_lemma("a=b")
            .with_neighbors(0, 4);
        let parsed = FilterScheme::parse(&scheme.render()).unwrap();
        assert_eq!(parsed, scheme);
    }

    #[test]
    fn test_missing_range_defaults_to_whole_sentence() {
        let parsed = FilterScheme::parse(r#"WF="x",Lemma="",POS="""#).unwrap();
        assert_eq!(parsed.range, RangeMode::WholeSentence);

        let invalid = FilterScheme::new().with_word_form("x").with_range(RangeMode::Invalid);
        let reparsed = FilterScheme::parse(&invalid.render()).unwrap();
        assert_eq!(reparsed.range, RangeMode::WholeSentence);
    }

    #[test]
    fn test_fields_in_any_order() {
        let parsed = FilterScheme::parse(r#"POS="NN",case-sensitive,Lemma="",WF="Java""#).unwrap();
        assert_eq!(parsed.word_form, "Java");
        assert_eq!(parsed.pos, "NN");
        assert!(parsed.case_sensitive);
    }

    #[test]
    fn test_malformed_input_is_rejected() {
        let bad = [
            "",
            r#"WF="x",Lemma="""#,
            r#"WF="x",Lemma="",POS="",WF="y""#,
            r#"WF="x,Lemma="",POS="""#,
            r#"WF=x,Lemma="",POS="""#,
            r#"WF="x",Lemma="",POS="",of_neighbour="2""#,
            r#"WF="x",Lemma="",POS="",of_neighbour="a:1""#,
            r#"WF="x",Lemma="",POS="",whole_sentence,of_neighbour="1:1""#,
            r#"WF="x",Lemma="",POS="",bogus"#,
            r#"WF="x",Lemma="",POS="","#,
            r#"WF="x"junk,Lemma="",POS="""#,
        ];
        for text in bad {
            assert!(
                matches!(FilterScheme::parse(text), Err(KonkordError::InvalidQuery(_))),
                "accepted: {text}"
            );
        }
    }

    #[test]
    fn test_constraint_precedence_order() {
        let scheme = FilterScheme::new().with_pos("NN").with_lemma("run").with_word_form("runs");
        let fields: Vec<_> = scheme.constraints().into_iter().map(|(f, _)| f).collect();
        assert_eq!(fields, vec![TokenField::Form, TokenField::Lemma, TokenField::Pos]);
        assert!(!FilterScheme::new().has_constraint());
    }

    fn range_strategy() -> impl Strategy<Value = RangeMode> {
        prop_oneof![
            Just(RangeMode::WholeSentence),
            (0usize..50, 0usize..50).prop_map(|(left, right)| RangeMode::Neighbors { left, right }),
        ]
    }

    proptest! {
        #[test]
        fn parse_inverts_render(
            word_form in r#"[a-zA-Z"\\,=: ]{0,8}"#,
            lemma in r#"[a-zA-Z"\\,=: ]{0,8}"#,
            pos in "[A-Z$]{0,4}",
            range in range_strategy(),
            case_sensitive in any::<bool>(),
        ) {
            let scheme = FilterScheme { case_sensitive, range, word_form, pos, lemma };
            prop_assert_eq!(FilterScheme::parse(&scheme.render()).unwrap(), scheme);
        }
    }
}
