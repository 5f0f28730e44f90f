//! Stand-in loader when the crate is built without the `pdfium` feature.

use std::path::{Path, PathBuf};

use paperscope_core::{Error, Result};

use crate::page::{DocumentLoader, PageSnapshot, SnapshotOptions};

/// Loader that rejects every document: PDF support was not compiled in.
#[derive(Debug, Clone, Default)]
pub struct PdfiumLoader;

impl PdfiumLoader {
    pub fn new() -> Self {
        Self
    }

    pub fn with_library_dir(self, _dir: impl Into<PathBuf>) -> Self {
        self
    }

    pub fn from_env() -> Self {
        Self::new()
    }
}

impl DocumentLoader for PdfiumLoader {
    fn snapshot(&self, _path: &Path, _options: &SnapshotOptions) -> Result<Vec<PageSnapshot>> {
        Err(Error::Document(
            "PDF support requires building with the `pdfium` feature".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stub_reports_missing_feature() {
        let err = PdfiumLoader::from_env()
            .snapshot(Path::new("paper.pdf"), &SnapshotOptions::default())
            .unwrap_err();
        assert!(matches!(err, Error::Document(_)));
        assert_eq!(err.kind(), "document");
    }
}
