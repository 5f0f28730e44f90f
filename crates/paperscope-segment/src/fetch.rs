//! arXiv PDF fetching and scoped temporary artifacts.

use std::io::Write;
use std::path::Path;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use tempfile::NamedTempFile;
use tracing::{debug, instrument};

use paperscope_core::defaults::{ARXIV_PDF_BASE, FETCH_TIMEOUT_SECS};
use paperscope_core::{DocumentSource, Error, Result};

/// New-style (`2401.01234v2`) and old-style (`hep-th/9901001`) identifiers.
const ARXIV_ID_PATTERN: &str =
    r"^(?:\d{4}\.\d{4,5}|[a-z]+(?:-[a-z]+)*(?:\.[A-Z]{2})?/\d{7})(?:v\d+)?$";

/// Reject anything that is not an arXiv identifier.
///
/// The identifier ends up in a URL and a file name, so this runs before
/// either is built.
pub fn validate_arxiv_id(id: &str) -> Result<()> {
    let pattern = Regex::new(ARXIV_ID_PATTERN)
        .map_err(|e| Error::Internal(format!("Invalid arXiv id pattern: {}", e)))?;
    if pattern.is_match(id) {
        Ok(())
    } else {
        Err(Error::InvalidInput(format!("Invalid arXiv id: {}", id)))
    }
}

/// Downloads paper PDFs from arXiv (or a mirror with the same layout).
pub struct ArxivSource {
    client: Client,
    base_url: String,
}

impl ArxivSource {
    pub fn new(base_url: impl Into<String>, timeout_secs: u64) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Create from `ARXIV_PDF_BASE` and `ARXIV_TIMEOUT_SECS`.
    pub fn from_env() -> Self {
        let base_url =
            std::env::var("ARXIV_PDF_BASE").unwrap_or_else(|_| ARXIV_PDF_BASE.to_string());
        let timeout_secs = std::env::var("ARXIV_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(FETCH_TIMEOUT_SECS);
        Self::new(base_url, timeout_secs)
    }

    pub fn pdf_url(&self, arxiv_id: &str) -> String {
        format!("{}/{}.pdf", self.base_url, arxiv_id)
    }
}

#[async_trait]
impl DocumentSource for ArxivSource {
    #[instrument(skip(self), fields(subsystem = "segment", component = "arxiv_source", op = "fetch"))]
    async fn fetch(&self, locator: &str) -> Result<Vec<u8>> {
        let start = Instant::now();
        let url = self.pdf_url(locator);

        let response = self.client.get(&url).send().await.map_err(|e| {
            if e.is_timeout() {
                Error::Timeout(format!("Fetching {} timed out", url))
            } else {
                Error::Fetch(format!("Failed to fetch {}: {}", url, e))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Fetch(format!("{} returned HTTP {}", url, status)));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Fetch(format!("Failed to read body of {}: {}", url, e)))?;

        if bytes.len() < 4 || &bytes[0..4] != b"%PDF" {
            return Err(Error::Fetch(format!(
                "{} did not return a PDF (missing %PDF header)",
                url
            )));
        }

        debug!(
            bytes = bytes.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "PDF fetched"
        );
        Ok(bytes.to_vec())
    }
}

/// Document bytes materialised on disk for the lifetime of the value.
///
/// The file is removed when the artifact is dropped, on success and error
/// paths alike.
pub struct TempArtifact {
    file: NamedTempFile,
}

impl TempArtifact {
    /// Write `bytes` to a fresh file in `dir`, or the system temp dir.
    pub fn write(dir: Option<&Path>, bytes: &[u8]) -> Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("paperscope-").suffix(".pdf");
        let mut file = match dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        }
        .map_err(|e| Error::Internal(format!("Failed to create temp file: {}", e)))?;

        file.write_all(bytes)
            .and_then(|_| file.flush())
            .map_err(|e| Error::Internal(format!("Failed to write temp file: {}", e)))?;

        Ok(Self { file })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_validate_arxiv_id() {
        for ok in ["2401.01234", "2401.01234v3", "0704.0001", "hep-th/9901001", "math.GT/0309136v2"] {
            assert!(validate_arxiv_id(ok).is_ok(), "{}", ok);
        }
        for bad in ["", "../etc/passwd", "2401.01234.pdf", "abc", "2401.012", "2401.01234 "] {
            assert!(
                matches!(validate_arxiv_id(bad), Err(Error::InvalidInput(_))),
                "{}",
                bad
            );
        }
    }

    #[test]
    fn test_pdf_url() {
        let source = ArxivSource::new("https://arxiv.org/pdf/", 5);
        assert_eq!(source.pdf_url("2401.01234"), "https://arxiv.org/pdf/2401.01234.pdf");
    }

    #[test]
    fn test_temp_artifact_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = TempArtifact::write(Some(dir.path()), b"%PDF-1.7 body").unwrap();
        let path = artifact.path().to_path_buf();
        assert!(path.starts_with(dir.path()));
        assert_eq!(std::fs::read(&path).unwrap(), b"%PDF-1.7 body");
        drop(artifact);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_fetch_returns_pdf_bytes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/pdf/2401.01234.pdf"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"%PDF-1.5 data".to_vec()))
            .mount(&server)
            .await;

        let source = ArxivSource::new(format!("{}/pdf", server.uri()), 5);
        let bytes = source.fetch("2401.01234").await.unwrap();
        assert_eq!(bytes, b"%PDF-1.5 data");
    }

    #[tokio::test]
    async fn test_fetch_maps_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let source = ArxivSource::new(server.uri(), 5);
        let err = source.fetch("2401.99999").await.unwrap_err();
        assert!(matches!(err, Error::Fetch(_)));
    }

    #[tokio::test]
    async fn test_fetch_rejects_non_pdf_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>captcha</html>"))
            .mount(&server)
            .await;

        let source = ArxivSource::new(server.uri(), 5);
        let err = source.fetch("2401.01234").await.unwrap_err();
        assert!(matches!(err, Error::Fetch(_)));
    }
}
