use crate::error::Result;
use crate::i18n::{Counter, Language, Translation, TranslationMetrics};
use crate::translator::{ensure_supported, TranslationStream, Translator};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use tracing::warn;

/// Composes a rate-limited primary backend with an always-available fallback.
///
/// Only languages both backends serve are supported, so rerouting can never
/// hit an unsupported language.
pub struct ResilientTranslator<P, F> {
    primary: P,
    fallback: F,
    name: String,
    languages: HashSet<Language>,
}

impl<P: Translator, F: Translator> ResilientTranslator<P, F> {
    pub fn new(primary: P, fallback: F) -> Self {
        let name = format!("{} (fallback: {})", primary.name(), fallback.name());
        let fallback_languages = fallback.supported_languages();
        let languages = primary
            .supported_languages()
            .into_iter()
            .filter(|language| fallback_languages.contains(language))
            .collect();

        Self {
            primary,
            fallback,
            name,
            languages,
        }
    }

    pub fn primary(&self) -> &P {
        &self.primary
    }

    pub fn fallback(&self) -> &F {
        &self.fallback
    }

    fn ensure_both_supported(&self, target: &Language, source: &Language) -> Result<()> {
        ensure_supported(self, target)?;
        ensure_supported(self, source)
    }
}

#[async_trait]
impl<P: Translator, F: Translator> Translator for ResilientTranslator<P, F> {
    fn name(&self) -> &str {
        &self.name
    }

    fn supported_languages(&self) -> HashSet<Language> {
        self.languages.clone()
    }

    fn is_language_supported(&self, language: &Language) -> bool {
        self.languages.contains(language)
    }

    async fn translate(
        &self,
        text: &str,
        target: &Language,
        source: &Language,
    ) -> Result<Translation> {
        self.ensure_both_supported(target, source)?;

        match self.primary.translate(text, target, source).await {
            Err(e) if e.is_rate_limited() => {
                warn!("{}; using {} for {}", e, self.fallback.name(), target);
                TranslationMetrics::global().record(Counter::Fallback);
                self.fallback.translate(text, target, source).await
            }
            result => result,
        }
    }

    /// Texts the primary answered are kept; the rest move to the fallback once
    /// the primary reports a rate limit.
    fn translate_texts<'a>(
        &'a self,
        texts: Vec<String>,
        target: Language,
        source: Language,
    ) -> TranslationStream<'a> {
        if let Err(e) = self.ensure_both_supported(&target, &source) {
            return stream::iter(vec![Err(e)]).boxed();
        }

        let rerouted = async move {
            let mut pending = texts.clone();
            let mut answered = Vec::with_capacity(texts.len());
            let mut rate_limited = false;

            let mut primary = self
                .primary
                .translate_texts(texts, target.clone(), source.clone());
            while let Some(result) = primary.next().await {
                match result {
                    Ok(translation) => {
                        if let Some(index) = pending
                            .iter()
                            .position(|text| text == translation.original_text())
                        {
                            pending.remove(index);
                        }
                        answered.push(Ok(translation));
                    }
                    Err(e) if e.is_rate_limited() => {
                        warn!(
                            "{}; using {} for {} remaining texts to {}",
                            e,
                            self.fallback.name(),
                            pending.len(),
                            target
                        );
                        rate_limited = true;
                        break;
                    }
                    Err(e) => answered.push(Err(e)),
                }
            }
            drop(primary);

            let remainder = if rate_limited && !pending.is_empty() {
                TranslationMetrics::global().record(Counter::Fallback);
                // Unanswered texts, failed ones included, get their result from the fallback
                answered.retain(|result| result.is_ok());
                self.fallback.translate_texts(pending, target, source)
            } else {
                stream::empty().boxed()
            };

            stream::iter(answered).chain(remainder)
        };

        stream::once(rerouted).flatten().boxed()
    }
}
