//! Translation result record.

use crate::i18n::Language;
use std::fmt;

/// One text rendered from a source language into a target language.
#[derive(Debug, Clone, PartialEq)]
pub struct Translation {
    source: Language,
    target: Language,
    original_text: String,
    text: String,
}

impl Translation {
    pub fn new(
        source: Language,
        target: Language,
        original_text: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            source,
            target,
            original_text: original_text.into(),
            text: text.into(),
        }
    }

    /// A translation that leaves the text untouched.
    pub fn identity(source: Language, target: Language, text: impl Into<String>) -> Self {
        let text = text.into();
        Self::new(source, target, text.clone(), text)
    }

    pub fn source(&self) -> &Language {
        &self.source
    }

    pub fn target(&self) -> &Language {
        &self.target
    }

    /// Text that was translated; this is the cache key.
    pub fn original_text(&self) -> &str {
        &self.original_text
    }

    /// Translated text.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn into_text(self) -> String {
        self.text
    }

    /// Re-key the translation under the exact string the live application shows,
    /// e.g. `set_language` after translating the display form `set language`.
    pub fn rekey(mut self, original_text: impl Into<String>) -> Self {
        self.original_text = original_text.into();
        self
    }

    /// Post-process the translated text (slugify, truncate).
    pub fn map_text(mut self, f: impl FnOnce(&str) -> String) -> Self {
        self.text = f(&self.text);
        self
    }
}

impl fmt::Display for Translation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}
