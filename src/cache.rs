//! Disk-persisted translation cache.
//!
//! The table maps a language code to a map of default-language text to its
//! translation. It lives on disk as a single JSON object and is only held in
//! memory between `load()` and `save()`.

use crate::error::{L10nError, Result};
use crate::i18n::{Language, Translation};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, warn};

type Table = HashMap<String, HashMap<String, String>>;

/// Translation cache backed by a JSON file.
pub struct TranslationCache {
    path: PathBuf,
    table: Mutex<Option<Table>>,
}

impl TranslationCache {
    /// A cache bound to `path`. Nothing is read until `load()`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            table: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn is_loaded(&self) -> bool {
        self.table.lock().await.is_some()
    }

    /// Read the table from disk unless it is already in memory.
    ///
    /// A missing or malformed file yields an empty table. Entries stored since
    /// the last `save()` are kept.
    pub async fn load(&self) -> Result<()> {
        let mut guard = self.table.lock().await;
        if guard.is_none() {
            let table = read_table(&self.path).await?;
            debug!(
                "Loaded translation cache from {} ({} languages)",
                self.path.display(),
                table.len()
            );
            *guard = Some(table);
        }
        Ok(())
    }

    /// Whether a translation of `text` is stored for `language`.
    ///
    /// The exact code is checked first, then the territory-trimmed code.
    pub async fn has(&self, text: &str, language: &Language) -> Result<bool> {
        let guard = self.table.lock().await;
        let table = guard.as_ref().ok_or(L10nError::CacheNotLoaded)?;
        Ok(lookup(table, text, language).is_some())
    }

    /// The stored translation of `text` for `language`, with the same lookup as `has`.
    pub async fn get(&self, text: &str, language: &Language) -> Result<Translation> {
        let guard = self.table.lock().await;
        let table = guard.as_ref().ok_or(L10nError::CacheNotLoaded)?;

        match lookup(table, text, language) {
            Some(translated) => Ok(Translation::new(
                Language::default_language(),
                language.clone(),
                text,
                translated,
            )),
            None => Err(L10nError::CacheMiss {
                language: language.code().to_string(),
                text: text.to_string(),
            }),
        }
    }

    /// Like `get`, but loads the table first if needed and reports a miss as `None`.
    pub async fn lookup(&self, text: &str, language: &Language) -> Result<Option<Translation>> {
        let mut guard = self.table.lock().await;
        let table = loaded(&mut guard, &self.path).await?;

        Ok(lookup(table, text, language).map(|translated| {
            Translation::new(
                Language::default_language(),
                language.clone(),
                text,
                translated.as_str(),
            )
        }))
    }

    /// Store a translation keyed by its original text and exact target code,
    /// replacing any previous value. Loads the table first if needed.
    pub async fn set(&self, translation: &Translation) -> Result<()> {
        let mut guard = self.table.lock().await;
        let table = loaded(&mut guard, &self.path).await?;

        table
            .entry(translation.target().code().to_string())
            .or_default()
            .insert(
                translation.original_text().to_string(),
                translation.text().to_string(),
            );
        Ok(())
    }

    /// Delete the entry for `text` under the exact code only.
    ///
    /// Returns whether an entry existed.
    pub async fn remove(&self, text: &str, language: &Language) -> Result<bool> {
        let mut guard = self.table.lock().await;
        let table = guard.as_mut().ok_or(L10nError::CacheNotLoaded)?;

        let removed = table
            .get_mut(language.code())
            .map(|bucket| bucket.remove(text).is_some())
            .unwrap_or(false);
        Ok(removed)
    }

    /// Write the table to disk and drop it from memory.
    ///
    /// Does nothing if the cache is not loaded. Saves are serialized by the table lock,
    /// so a save never observes a half-written table.
    pub async fn save(&self) -> Result<()> {
        let mut guard = self.table.lock().await;
        let Some(table) = guard.as_ref() else {
            return Ok(());
        };

        let json = serde_json::to_string_pretty(table)?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        tokio::fs::write(&self.path, json).await?;

        debug!(
            "Saved translation cache to {} ({} languages)",
            self.path.display(),
            table.len()
        );
        *guard = None;
        Ok(())
    }
}

async fn loaded<'g>(table: &'g mut Option<Table>, path: &Path) -> Result<&'g mut Table> {
    if table.is_none() {
        *table = Some(read_table(path).await?);
    }
    table.as_mut().ok_or(L10nError::CacheNotLoaded)
}

fn lookup<'t>(table: &'t Table, text: &str, language: &Language) -> Option<&'t String> {
    let entry = |code: &str| table.get(code).and_then(|bucket| bucket.get(text));

    entry(language.code()).or_else(|| {
        if language.has_territory() {
            entry(language.trim_territory().code())
        } else {
            None
        }
    })
}

async fn read_table(path: &Path) -> Result<Table> {
    let contents = match tokio::fs::read_to_string(path).await {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Table::new()),
        Err(e) => return Err(e.into()),
    };

    match serde_json::from_str(&contents) {
        Ok(table) => Ok(table),
        Err(e) => {
            warn!(
                "Translation cache at {} is malformed, starting empty: {}",
                path.display(),
                e
            );
            Ok(Table::new())
        }
    }
}
