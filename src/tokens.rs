//! Token types and field matching

use serde::{Deserialize, Serialize};
use std::fmt;

/// One word occurrence as produced by the annotator.
///
/// No `PartialEq`: identity goes through [`same_form`] or [`same_lemma`] with
/// an explicit case mode, and POS never takes part in it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    pub form: String,
    pub pos: String,
    pub lemma: String,
}

impl Token {
    pub fn new(form: impl Into<String>, pos: impl Into<String>, lemma: impl Into<String>) -> Self {
        Self {
            form: form.into(),
            pos: pos.into(),
            lemma: lemma.into(),
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.form, self.pos, self.lemma)
    }
}

pub type Sentence = Vec<Token>;

/// Compare two field values, optionally ignoring case.
pub fn text_eq(a: &str, b: &str, case_sensitive: bool) -> bool {
    if case_sensitive {
        return a == b;
    }
    if a.is_ascii() && b.is_ascii() {
        return a.eq_ignore_ascii_case(b);
    }
    a.to_lowercase() == b.to_lowercase()
}

pub fn same_form(a: &Token, b: &Token, case_sensitive: bool) -> bool {
    text_eq(&a.form, &b.form, case_sensitive)
}

pub fn same_lemma(a: &Token, b: &Token, case_sensitive: bool) -> bool {
    text_eq(&a.lemma, &b.lemma, case_sensitive)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenField {
    Form,
    Pos,
    Lemma,
}

impl TokenField {
    /// Field predicate. POS tags are a closed vocabulary and always compare
    /// exactly, whatever `case_sensitive` says.
    pub fn matches(&self, token: &Token, value: &str, case_sensitive: bool) -> bool {
        match self {
            TokenField::Form => text_eq(&token.form, value, case_sensitive),
            TokenField::Lemma => text_eq(&token.lemma, value, case_sensitive),
            TokenField::Pos => token.pos == value,
        }
    }

    pub fn get_value<'a>(&self, token: &'a Token) -> &'a str {
        match self {
            TokenField::Form => &token.form,
            TokenField::Pos => &token.pos,
            TokenField::Lemma => &token.lemma,
        }
    }

    /// Identity of two tokens under this field.
    pub fn same(&self, a: &Token, b: &Token, case_sensitive: bool) -> bool {
        self.matches(a, self.get_value(b), case_sensitive)
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "form" | "wf" | "word" => Some(TokenField::Form),
            "pos" => Some(TokenField::Pos),
            "lemma" => Some(TokenField::Lemma),
            _ => None,
        }
    }
}
