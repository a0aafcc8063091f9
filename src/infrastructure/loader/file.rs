use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::instrument;

use crate::domain::{ports::DocumentLoader, Document, DomainError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileKind {
    Pdf,
    Text,
    Markdown,
}

impl FileKind {
    fn detect(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "pdf" => Some(Self::Pdf),
            "txt" => Some(Self::Text),
            "md" | "markdown" => Some(Self::Markdown),
            _ => None,
        }
    }

    fn content_type(self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Text => "text/plain",
            Self::Markdown => "text/markdown",
        }
    }
}

/// Reads a single file into a [`Document`], choosing the reader by extension.
#[derive(Debug, Default, Clone)]
pub struct FileLoader;

impl FileLoader {
    pub fn new() -> Self {
        Self
    }

    async fn extract_pdf(path: &Path) -> Result<String, DomainError> {
        let owned: PathBuf = path.to_path_buf();
        tokio::task::spawn_blocking(move || pdf_extract::extract_text(&owned))
            .await
            .map_err(|e| DomainError::internal(format!("PDF extraction task failed: {e}")))?
            .map_err(|e| {
                DomainError::validation(format!(
                    "Failed to extract text from {}: {e}",
                    path.display()
                ))
            })
    }
}

#[async_trait]
impl DocumentLoader for FileLoader {
    #[instrument(skip(self, path), fields(path = %path.display()))]
    async fn load(&self, path: &Path) -> Result<Document, DomainError> {
        let kind = FileKind::detect(path).ok_or_else(|| {
            DomainError::validation(format!("Unsupported file type: {}", path.display()))
        })?;

        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| DomainError::io(path, e))?;

        let text = match kind {
            FileKind::Pdf => Self::extract_pdf(path).await?,
            FileKind::Text | FileKind::Markdown => tokio::fs::read_to_string(path)
                .await
                .map_err(|e| DomainError::io(path, e))?,
        };

        tracing::debug!(bytes = metadata.len(), chars = text.len(), "document loaded");

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        Ok(Document::new(name, text)
            .with_content_type(kind.content_type())
            .with_metadata(serde_json::json!({
                "file_path": path.display().to_string(),
                "size": metadata.len(),
            })))
    }
}
