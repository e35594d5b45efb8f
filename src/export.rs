//! Export of query results and whole corpora as XML or JSON
//!
//! Both formats share one logical schema:
//! `corpus-collection > document{id} > metadata{url, date, filter-scheme} >
//! sentences > sentence > token{form, pos, lemma}`. In query-result exports
//! the anchor token of every match carries `matched="true"`.

use crate::config::ExportFormat;
use crate::corpus::Corpus;
use crate::error::KonkordError;
use crate::query::FilterScheme;
use crate::search::MatchGroup;
use crate::tokens::Token;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;
use tracing::info;

const ROOT: &str = "corpus-collection";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportToken {
    pub form: String,
    pub pos: String,
    pub lemma: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub matched: bool,
}

impl ExportToken {
    fn from_token(token: &Token, matched: bool) -> Self {
        Self {
            form: token.form.clone(),
            pos: token.pos.clone(),
            lemma: token.lemma.clone(),
            matched,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportMetadata {
    pub url: String,
    /// ISO-8601 creation time of the corpus.
    pub date: String,
    #[serde(rename = "filter-scheme", skip_serializing_if = "Option::is_none")]
    pub filter_scheme: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportDocument {
    /// Zero-based position in the collection.
    pub id: usize,
    pub metadata: ExportMetadata,
    pub sentences: Vec<Vec<ExportToken>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportCollection {
    pub documents: Vec<ExportDocument>,
}

fn metadata(corpus: &Corpus, scheme: Option<&FilterScheme>) -> ExportMetadata {
    ExportMetadata {
        url: corpus.source_id().to_string(),
        date: corpus.created_at().to_rfc3339(),
        filter_scheme: scheme.map(FilterScheme::render),
    }
}

impl ExportCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    fn next_id(&self) -> usize {
        self.documents.len()
    }

    /// Add the results of one query. Every match becomes a sentence with
    /// its anchor marked. A query without matches adds nothing.
    pub fn push_results(&mut self, corpus: &Corpus, scheme: &FilterScheme, groups: &[MatchGroup]) {
        let sentences: Vec<Vec<ExportToken>> = groups
            .iter()
            .flatten()
            .map(|m| {
                m.tokens
                    .iter()
                    .enumerate()
                    .map(|(i, t)| ExportToken::from_token(t, i == m.anchor_index))
                    .collect()
            })
            .collect();
        if sentences.is_empty() {
            return;
        }
        self.documents.push(ExportDocument {
            id: self.next_id(),
            metadata: metadata(corpus, Some(scheme)),
            sentences,
        });
    }

    /// Add a whole corpus, without filter scheme or matched markers.
    pub fn push_corpus(&mut self, corpus: &Corpus) {
        let sentences = corpus
            .sentences()
            .iter()
            .map(|s| s.iter().map(|t| ExportToken::from_token(t, false)).collect())
            .collect();
        self.documents.push(ExportDocument {
            id: self.next_id(),
            metadata: metadata(corpus, None),
            sentences,
        });
    }

    pub fn to_json(&self) -> Result<String, KonkordError> {
        serde_json::to_string_pretty(self).map_err(|e| KonkordError::Export(e.to_string()))
    }

    pub fn to_xml(&self) -> Result<String, KonkordError> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(xml_error)?;
        start(&mut writer, BytesStart::new(ROOT))?;

        for doc in &self.documents {
            let id = doc.id.to_string();
            start(&mut writer, BytesStart::new("document").with_attributes([("id", id.as_str())]))?;

            start(&mut writer, BytesStart::new("metadata"))?;
            text_element(&mut writer, "url", &doc.metadata.url)?;
            text_element(&mut writer, "date", &doc.metadata.date)?;
            if let Some(scheme) = &doc.metadata.filter_scheme {
                text_element(&mut writer, "filter-scheme", scheme)?;
            }
            end(&mut writer, "metadata")?;

            start(&mut writer, BytesStart::new("sentences"))?;
            for sentence in &doc.sentences {
                start(&mut writer, BytesStart::new("sentence"))?;
                for token in sentence {
                    let mut elem = BytesStart::new("token");
                    if token.matched {
                        elem.push_attribute(("matched", "true"));
                    }
                    start(&mut writer, elem)?;
                    text_element(&mut writer, "form", &token.form)?;
                    text_element(&mut writer, "pos", &token.pos)?;
                    text_element(&mut writer, "lemma", &token.lemma)?;
                    end(&mut writer, "token")?;
                }
                end(&mut writer, "sentence")?;
            }
            end(&mut writer, "sentences")?;

            end(&mut writer, "document")?;
        }

        end(&mut writer, ROOT)?;
        String::from_utf8(writer.into_inner()).map_err(|e| KonkordError::Export(e.to_string()))
    }

    pub fn render(&self, format: ExportFormat) -> Result<String, KonkordError> {
        match format {
            ExportFormat::Xml => self.to_xml(),
            ExportFormat::Json => self.to_json(),
        }
    }

    /// Write to `path`, replacing any existing file.
    pub fn write_to(&self, path: &Path, format: ExportFormat) -> Result<(), KonkordError> {
        let body = self.render(format)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = std::fs::File::create(path)
            .map_err(|e| KonkordError::Export(format!("Failed to create {:?}: {}", path, e)))?;
        file.write_all(body.as_bytes())?;
        info!(documents = self.documents.len(), ?format, "Exported to {:?}", path);
        Ok(())
    }
}

fn xml_error(e: impl std::fmt::Display) -> KonkordError {
    KonkordError::Export(format!("XML write failed: {}", e))
}

fn start(writer: &mut Writer<Vec<u8>>, elem: BytesStart<'_>) -> Result<(), KonkordError> {
    writer.write_event(Event::Start(elem)).map_err(xml_error)
}

fn end(writer: &mut Writer<Vec<u8>>, name: &str) -> Result<(), KonkordError> {
    writer.write_event(Event::End(BytesEnd::new(name))).map_err(xml_error)
}

fn text_element(writer: &mut Writer<Vec<u8>>, name: &str, text: &str) -> Result<(), KonkordError> {
    start(writer, BytesStart::new(name))?;
    writer
        .write_event(Event::Text(BytesText::new(text)))
        .map_err(xml_error)?;
    end(writer, name)
}
