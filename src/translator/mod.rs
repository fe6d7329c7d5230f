//! Translation backends.
//!
//! - `PrimaryTranslator`: cloud API, batched, fast, rate-limited
//! - `FallbackTranslator`: local engine, one request per text, always available
//! - `ResilientTranslator`: routes rate-limited work from the first to the second
//!
//! Callers hold an `Arc<dyn Translator>` built by [`build_translator`].

mod cloud;
mod local;
mod resilient;

pub use cloud::PrimaryTranslator;
pub use local::FallbackTranslator;
pub use resilient::ResilientTranslator;

use crate::config::Config;
use crate::error::{L10nError, Result};
use crate::i18n::{Language, Translation};
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Texts the default `translate_texts` has in flight at once.
pub const MAX_CONCURRENT_TEXTS: usize = 8;

/// Lazily produced translations, in completion order.
pub type TranslationStream<'a> = BoxStream<'a, Result<Translation>>;

/// A translation backend.
#[async_trait]
pub trait Translator: Send + Sync {
    /// Human-readable backend name.
    fn name(&self) -> &str;

    /// Languages this backend can translate from and to.
    fn supported_languages(&self) -> HashSet<Language>;

    fn is_language_supported(&self, language: &Language) -> bool {
        self.supported_languages().contains(language)
    }

    /// Translate one text.
    ///
    /// Fails with `UnsupportedLanguage` if either language is outside the supported set.
    async fn translate(
        &self,
        text: &str,
        target: &Language,
        source: &Language,
    ) -> Result<Translation>;

    /// Translate one text into many languages, one target after another.
    fn translate_targets<'a>(
        &'a self,
        text: &'a str,
        targets: Vec<Language>,
        source: Language,
    ) -> TranslationStream<'a> {
        stream::iter(targets)
            .then(move |target| {
                let source = source.clone();
                async move { self.translate(text, &target, &source).await }
            })
            .boxed()
    }

    /// Translate many texts into one language.
    ///
    /// Results arrive in completion order; correlate them by `original_text`.
    /// At most [`MAX_CONCURRENT_TEXTS`] requests run at once.
    fn translate_texts<'a>(
        &'a self,
        texts: Vec<String>,
        target: Language,
        source: Language,
    ) -> TranslationStream<'a> {
        stream::iter(texts)
            .map(move |text| {
                let target = target.clone();
                let source = source.clone();
                async move { self.translate(&text, &target, &source).await }
            })
            .buffer_unordered(MAX_CONCURRENT_TEXTS)
            .boxed()
    }
}

/// Fail with `UnsupportedLanguage` unless `translator` serves `language`.
pub(crate) fn ensure_supported<T: Translator + ?Sized>(
    translator: &T,
    language: &Language,
) -> Result<()> {
    if translator.is_language_supported(language) {
        Ok(())
    } else {
        Err(L10nError::UnsupportedLanguage {
            language: language.code().to_string(),
            translator: translator.name().to_string(),
        })
    }
}

/// Whether a backend has to be asked at all.
pub(crate) fn needs_translation(text: &str, target: &Language, source: &Language) -> bool {
    source != target && !text.trim().is_empty()
}

/// Connect both backends and compose them.
pub async fn build_translator(config: &Config) -> Result<Arc<dyn Translator>> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .map_err(|source| L10nError::Http {
            backend: "HTTP client".to_string(),
            source,
        })?;

    let primary = PrimaryTranslator::connect(
        client.clone(),
        &config.google_translate_api_url,
        &config.google_translate_api_key,
    )
    .await?;

    let fallback = FallbackTranslator::connect(
        client,
        &config.libretranslate_url,
        config.libretranslate_api_key.clone(),
    )
    .await?;

    let translator = ResilientTranslator::new(primary, fallback);
    info!(
        "{} ready with {} supported languages",
        translator.name(),
        translator.supported_languages().len()
    );

    Ok(Arc::new(translator))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Upper-cases text; supports en, fr, de.
    struct ShoutTranslator {
        calls: AtomicUsize,
        running: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl Translator for ShoutTranslator {
        fn name(&self) -> &str {
            "shout"
        }

        fn supported_languages(&self) -> HashSet<Language> {
            ["en", "fr", "de"]
                .into_iter()
                .map(|code| Language::new(code).unwrap())
                .collect()
        }

        async fn translate(
            &self,
            text: &str,
            target: &Language,
            source: &Language,
        ) -> Result<Translation> {
            ensure_supported(self, target)?;
            ensure_supported(self, source)?;
            self.calls.fetch_add(1, Ordering::SeqCst);
            let running = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(running, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(2)).await;
            self.running.fetch_sub(1, Ordering::SeqCst);
            Ok(Translation::new(
                source.clone(),
                target.clone(),
                text,
                format!("{}:{}", target, text.to_uppercase()),
            ))
        }
    }

    fn shout() -> ShoutTranslator {
        ShoutTranslator {
            calls: AtomicUsize::new(0),
            running: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    #[tokio::test]
    async fn test_default_translate_targets_fans_out() {
        let translator = shout();
        let targets = vec![Language::new("fr").unwrap(), Language::new("de").unwrap()];

        let results: Vec<_> = translator
            .translate_targets("hi", targets, Language::default_language())
            .collect()
            .await;

        let texts: Vec<String> = results
            .into_iter()
            .map(|r| r.unwrap().into_text())
            .collect();
        assert_eq!(texts, vec!["fr:HI", "de:HI"]);
        assert_eq!(translator.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_default_translate_texts_covers_every_text() {
        let translator = shout();
        let texts = vec!["a".to_string(), "b".to_string(), "c".to_string()];

        let mut originals: Vec<String> = translator
            .translate_texts(texts, Language::new("fr").unwrap(), Language::default_language())
            .map(|r| r.unwrap().original_text().to_string())
            .collect()
            .await;
        originals.sort();

        assert_eq!(originals, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_default_translate_texts_bounds_concurrency() {
        let translator = shout();
        let texts: Vec<String> = (0..100).map(|i| format!("text {}", i)).collect();

        let results: Vec<_> = translator
            .translate_texts(texts, Language::new("de").unwrap(), Language::default_language())
            .collect()
            .await;

        assert_eq!(results.len(), 100);
        assert!(results.iter().all(|r| r.is_ok()));
        assert_eq!(translator.calls.load(Ordering::SeqCst), 100);
        assert!(translator.peak.load(Ordering::SeqCst) <= MAX_CONCURRENT_TEXTS);
        assert!(translator.peak.load(Ordering::SeqCst) > 1);
    }

    #[tokio::test]
    async fn test_unsupported_language_error() {
        let translator = shout();
        let result = translator
            .translate("hi", &Language::new("ja").unwrap(), &Language::default_language())
            .await;

        match result {
            Err(L10nError::UnsupportedLanguage { language, translator }) => {
                assert_eq!(language, "ja");
                assert_eq!(translator, "shout");
            }
            other => panic!("Expected UnsupportedLanguage, got {:?}", other),
        }
    }

    #[test]
    fn test_default_is_language_supported_ignores_territory() {
        let translator = shout();
        assert!(translator.is_language_supported(&Language::new("fr-CA").unwrap()));
        assert!(!translator.is_language_supported(&Language::new("ko").unwrap()));
    }

    #[test]
    fn test_needs_translation() {
        let en = Language::default_language();
        let fr = Language::new("fr").unwrap();

        assert!(needs_translation("Hello", &fr, &en));
        assert!(!needs_translation("Hello", &en, &en));
        assert!(!needs_translation("Hello", &Language::new("en-GB").unwrap(), &en));
        assert!(!needs_translation("   ", &fr, &en));
    }
}
