use crate::error::{L10nError, Result};
use crate::i18n::{Counter, Language, Translation, TranslationMetrics};
use crate::retry::{retry_transient, RetryConfig};
use crate::translator::{ensure_supported, needs_translation, TranslationStream, Translator};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

const BACKEND: &str = "Google Translate";

/// Cloud Translation v2 request body
#[derive(Debug, Serialize)]
struct TranslateRequest<'a> {
    q: &'a [String],
    source: &'a str,
    target: &'a str,
    format: &'static str,
}

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    data: TranslateData,
}

#[derive(Debug, Deserialize)]
struct TranslateData {
    translations: Vec<TranslatedText>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TranslatedText {
    translated_text: String,
}

#[derive(Debug, Deserialize)]
struct LanguagesResponse {
    data: LanguagesData,
}

#[derive(Debug, Deserialize)]
struct LanguagesData {
    languages: Vec<LanguageEntry>,
}

#[derive(Debug, Deserialize)]
struct LanguageEntry {
    language: String,
}

/// Cloud translation API: one request per batch, subject to quota.
pub struct PrimaryTranslator {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    languages: HashSet<Language>,
    /// Codes exactly as the API lists them, lower-cased
    codes: HashSet<String>,
    retry: RetryConfig,
}

impl PrimaryTranslator {
    /// Fetch the supported languages and build the translator.
    pub async fn connect(client: reqwest::Client, api_url: &str, api_key: &str) -> Result<Self> {
        let url = format!("{}/languages", api_url.trim_end_matches('/'));
        let retry = RetryConfig::cloud_api();

        let codes = retry_transient(
            &retry,
            "Fetching Google Translate languages",
            || fetch_languages(&client, &url, api_key),
        )
        .await?;

        Ok(Self::with_languages(client, api_url, api_key, codes))
    }

    /// Build the translator from a known language list.
    pub fn with_languages<I, S>(client: reqwest::Client, api_url: &str, api_key: &str, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut languages = HashSet::new();
        let mut known = HashSet::new();

        for code in codes {
            let code = code.as_ref();
            match Language::new(code) {
                Ok(language) => {
                    known.insert(code.to_ascii_lowercase());
                    languages.insert(language);
                }
                Err(_) => debug!("Skipping unparseable {} language code '{}'", BACKEND, code),
            }
        }

        Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            languages,
            codes: known,
            retry: RetryConfig::cloud_api(),
        }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// The exact code when the API lists it, otherwise the bare language subtag.
    fn wire_code(&self, language: &Language) -> String {
        if self.codes.contains(&language.code().to_ascii_lowercase()) {
            language.code().to_string()
        } else {
            language.trim_territory().code().to_string()
        }
    }

    /// Translate all texts with a single request.
    ///
    /// The result is in input order. Blank texts are passed through without being sent.
    pub async fn translate_batch(
        &self,
        texts: &[String],
        target: &Language,
        source: &Language,
    ) -> Result<Vec<Translation>> {
        ensure_supported(self, target)?;
        ensure_supported(self, source)?;

        let pending: Vec<String> = texts
            .iter()
            .filter(|text| needs_translation(text, target, source))
            .cloned()
            .collect();

        let translated: Vec<String> = if pending.is_empty() {
            Vec::new()
        } else {
            let source_code = self.wire_code(source);
            let target_code = self.wire_code(target);
            let (pending, source_code, target_code) = (&pending, &source_code, &target_code);

            retry_transient(
                &self.retry,
                &format!("{} batch of {} to {}", BACKEND, pending.len(), target),
                move || self.request_batch(pending, source_code, target_code),
            )
            .await?
        };
        let mut translated = translated.into_iter();

        Ok(texts
            .iter()
            .map(|text| {
                let result = if needs_translation(text, target, source) {
                    translated.next().unwrap_or_else(|| text.clone())
                } else {
                    text.clone()
                };
                Translation::new(source.clone(), target.clone(), text.clone(), result)
            })
            .collect())
    }

    async fn request_batch(&self, texts: &[String], source: &str, target: &str) -> Result<Vec<String>> {
        TranslationMetrics::global().record(Counter::BackendCall);

        let result = self.send_batch(texts, source, target).await;
        if result.is_err() {
            TranslationMetrics::global().record(Counter::BackendFailure);
        }
        result
    }

    async fn send_batch(&self, texts: &[String], source: &str, target: &str) -> Result<Vec<String>> {
        let response = self
            .client
            .post(&self.api_url)
            .query(&[("key", self.api_key.as_str())])
            .json(&TranslateRequest {
                q: texts,
                source,
                target,
                format: "text",
            })
            .send()
            .await
            .map_err(|source| L10nError::Http {
                backend: BACKEND.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|e| format!("<failed to read body: {}>", e));
            return Err(status_error(status.as_u16(), body));
        }

        let parsed: TranslateResponse = response.json().await.map_err(|e| {
            L10nError::InvalidResponse {
                backend: BACKEND.to_string(),
                message: e.to_string(),
            }
        })?;

        if parsed.data.translations.len() != texts.len() {
            return Err(L10nError::InvalidResponse {
                backend: BACKEND.to_string(),
                message: format!(
                    "expected {} translations, got {}",
                    texts.len(),
                    parsed.data.translations.len()
                ),
            });
        }

        Ok(parsed
            .data
            .translations
            .into_iter()
            .map(|t| t.translated_text)
            .collect())
    }
}

async fn fetch_languages(client: &reqwest::Client, url: &str, api_key: &str) -> Result<Vec<String>> {
    let response = client
        .get(url)
        .query(&[("key", api_key)])
        .send()
        .await
        .map_err(|source| L10nError::Http {
            backend: BACKEND.to_string(),
            source,
        })?;

    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|e| format!("<failed to read body: {}>", e));
        return Err(status_error(status.as_u16(), body));
    }

    let parsed: LanguagesResponse = response.json().await.map_err(|e| L10nError::InvalidResponse {
        backend: BACKEND.to_string(),
        message: e.to_string(),
    })?;

    Ok(parsed.data.languages.into_iter().map(|l| l.language).collect())
}

/// 429, or 403 carrying a quota reason, is the rate-limit signal.
fn status_error(status: u16, body: String) -> L10nError {
    let quota_exceeded = status == 403 && body.to_ascii_lowercase().contains("ratelimitexceeded");
    if status == 429 || quota_exceeded {
        L10nError::RateLimited {
            backend: BACKEND.to_string(),
        }
    } else {
        L10nError::Api {
            backend: BACKEND.to_string(),
            status,
            body,
        }
    }
}

#[async_trait]
impl Translator for PrimaryTranslator {
    fn name(&self) -> &str {
        BACKEND
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
        self.translate_batch(&[text.to_string()], target, source)
            .await?
            .pop()
            .ok_or_else(|| L10nError::InvalidResponse {
                backend: BACKEND.to_string(),
                message: "empty batch result".to_string(),
            })
    }

    /// One batched request for all texts.
    fn translate_texts<'a>(
        &'a self,
        texts: Vec<String>,
        target: Language,
        source: Language,
    ) -> TranslationStream<'a> {
        stream::once(async move { self.translate_batch(&texts, &target, &source).await })
            .flat_map(|result| match result {
                Ok(translations) => stream::iter(translations.into_iter().map(Ok).collect::<Vec<_>>()),
                Err(e) => stream::iter(vec![Err(e)]),
            })
            .boxed()
    }
}
