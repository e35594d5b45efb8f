//! Source identifiers and the fetchers that turn them into raw text

use crate::error::KonkordError;
use regex_lite::Regex;
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;
use tracing::debug;

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// `http://`, `https://` or `ftp://` URL.
    Remote,
    /// Absolute path, or one explicitly relative to the working directory.
    Local,
    /// Looks like a host name but has no scheme.
    MissingScheme,
    Unknown,
}

fn remote_policy() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(http|https|ftp)://.+$").expect("valid regex"))
}

fn local_policy() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(/|\./|\.\./).*$").expect("valid regex"))
}

fn host_shaped() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([a-zA-Z0-9-]+\.)+[a-zA-Z]{2,}(/.*)?$").expect("valid regex"))
}

impl SourceKind {
    pub fn classify(identifier: &str) -> Self {
        let identifier = identifier.trim();
        if remote_policy().is_match(identifier) {
            SourceKind::Remote
        } else if local_policy().is_match(identifier) {
            SourceKind::Local
        } else if host_shaped().is_match(identifier) {
            SourceKind::MissingScheme
        } else {
            SourceKind::Unknown
        }
    }
}

/// Turns a source identifier into raw text.
pub trait SourceFetcher: Send + Sync {
    fn fetch(&self, identifier: &str) -> Result<String, KonkordError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FileFetcher;

impl SourceFetcher for FileFetcher {
    fn fetch(&self, identifier: &str) -> Result<String, KonkordError> {
        let path = Path::new(identifier.trim());
        std::fs::read_to_string(path)
            .map_err(|e| KonkordError::Fetch(format!("Failed to read file {:?}: {}", path, e)))
    }
}

pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, KonkordError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .user_agent(concat!("konkord/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| KonkordError::Fetch(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

impl SourceFetcher for HttpFetcher {
    fn fetch(&self, identifier: &str) -> Result<String, KonkordError> {
        let url = identifier.trim();
        if url.starts_with("ftp://") {
            return Err(KonkordError::Fetch(format!("Unsupported scheme: {}", url)));
        }

        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| KonkordError::Fetch(format!("Failed to fetch {}: {}", url, e)))?;

        if !response.status().is_success() {
            return Err(KonkordError::Fetch(format!(
                "Failed to fetch {}: HTTP {}",
                url,
                response.status()
            )));
        }

        response
            .text()
            .map_err(|e| KonkordError::Fetch(format!("Failed to read body of {}: {}", url, e)))
    }
}

/// Picks the file or HTTP fetcher from the identifier's shape.
pub struct DispatchFetcher {
    local: Box<dyn SourceFetcher>,
    remote: Box<dyn SourceFetcher>,
}

impl DispatchFetcher {
    pub fn new() -> Result<Self, KonkordError> {
        Ok(Self::with_fetchers(Box::new(FileFetcher), Box::new(HttpFetcher::new()?)))
    }

    pub fn with_fetchers(local: Box<dyn SourceFetcher>, remote: Box<dyn SourceFetcher>) -> Self {
        Self { local, remote }
    }
}

impl SourceFetcher for DispatchFetcher {
    fn fetch(&self, identifier: &str) -> Result<String, KonkordError> {
        let kind = SourceKind::classify(identifier);
        debug!(?kind, "fetching {}", identifier);
        match kind {
            SourceKind::Remote => self.remote.fetch(identifier),
            SourceKind::Local => self.local.fetch(identifier),
            SourceKind::MissingScheme => Err(KonkordError::InvalidSource(format!(
                "'{}' looks like a URL. Are you missing the url scheme?",
                identifier
            ))),
            SourceKind::Unknown => Err(KonkordError::InvalidSource(format!(
                "'{}' is neither a URL nor an absolute or ./-relative path",
                identifier
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    struct Fixed(&'static str);

    impl SourceFetcher for Fixed {
        fn fetch(&self, _identifier: &str) -> Result<String, KonkordError> {
            Ok(self.0.to_string())
        }
    }

    #[test]
    fn test_classify() {
        assert_eq!(SourceKind::classify("https://en.wikipedia.org/wiki/Java"), SourceKind::Remote);
        assert_eq!(SourceKind::classify("ftp://host/file"), SourceKind::Remote);
        assert_eq!(SourceKind::classify("/home/u/corpus.txt"), SourceKind::Local);
        assert_eq!(SourceKind::classify("./corpus.txt"), SourceKind::Local);
        assert_eq!(SourceKind::classify("en.wikipedia.org/wiki/Java"), SourceKind::MissingScheme);
        assert_eq!(SourceKind::classify("corpus"), SourceKind::Unknown);
        assert_eq!(SourceKind::classify("https://"), SourceKind::Unknown);
    }

    #[test]
    fn test_dispatch() {
        let fetcher = DispatchFetcher::with_fetchers(Box::new(Fixed("local")), Box::new(Fixed("remote")));
        assert_eq!(fetcher.fetch("/a/b").unwrap(), "local");
        assert_eq!(fetcher.fetch("http://example.org").unwrap(), "remote");
        assert!(matches!(
            fetcher.fetch("example.org/page"),
            Err(KonkordError::InvalidSource(_))
        ));
        assert!(matches!(fetcher.fetch("nope"), Err(KonkordError::InvalidSource(_))));
    }

    #[test]
    fn test_file_fetcher() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "The/DT/the dog/NN/dog").unwrap();
        let text = FileFetcher.fetch(file.path().to_str().unwrap()).unwrap();
        assert_eq!(text, "The/DT/the dog/NN/dog");
        assert!(matches!(
            FileFetcher.fetch("/definitely/not/here.txt"),
            Err(KonkordError::Fetch(_))
        ));
    }
}
