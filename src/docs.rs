//! Long-form documents (about, help) kept as Markdown per locale.

use crate::error::Result;
use crate::i18n::Language;
use std::path::{Path, PathBuf};

/// Markdown documents laid out as `<root>/<locale>/<doc_id>.md`.
#[derive(Debug, Clone)]
pub struct DocumentStore {
    root: PathBuf,
}

impl DocumentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path(&self, language: &Language, doc_id: &str) -> PathBuf {
        self.root.join(language.code()).join(format!("{}.md", doc_id))
    }

    /// The document for the exact locale, else for the territory-trimmed locale.
    pub async fn read(&self, language: &Language, doc_id: &str) -> Result<Option<String>> {
        if let Some(text) = read_optional(&self.path(language, doc_id)).await? {
            return Ok(Some(text));
        }
        if language.has_territory() {
            return read_optional(&self.path(&language.trim_territory(), doc_id)).await;
        }
        Ok(None)
    }

    /// The authored default-language document, whose text is the cache key for its translations.
    pub async fn read_default(&self, doc_id: &str) -> Result<Option<String>> {
        self.read(&Language::default_language(), doc_id).await
    }
}

async fn read_optional(path: &Path) -> Result<Option<String>> {
    match tokio::fs::read_to_string(path).await {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}
