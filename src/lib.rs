//! Konkord - annotated corpus exploration
//!
//! Library behind the console: token matching, the filter pipeline,
//! replayable query history and export.

// Token types come first; everything else matches on them
pub mod tokens;
pub mod corpus;
pub mod query;
pub mod search;
pub mod cache;
pub mod history;
pub mod error;
pub mod config;
pub mod source;
pub mod annotate;
pub mod recent;
pub mod export;
pub mod session;
pub mod commands;

pub use annotate::{Annotator, TaggedTextAnnotator, WhitespaceAnnotator};
pub use cache::ResultCache;
pub use config::{get_data_dir, AnnotatorKind, Config, ExportFormat};
pub use corpus::{Corpus, TokenPosition};
pub use error::KonkordError;
pub use export::{ExportCollection, ExportDocument, ExportMetadata, ExportToken};
pub use history::{CorpusId, HistoryEntry, HistoryStore};
pub use query::{FilterScheme, RangeMode};
pub use recent::{RecentSource, RecentSources};
pub use search::{Match, MatchGroup, SearchEngine, SearchOptions};
pub use session::{LoadJob, Session};
pub use source::{DispatchFetcher, FileFetcher, HttpFetcher, SourceFetcher, SourceKind};
pub use tokens::{Sentence, Token, TokenField};
