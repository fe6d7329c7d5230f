use crate::error::{L10nError, Result};
use crate::i18n::{Counter, Language, Translation, TranslationMetrics};
use crate::retry::{retry_transient, RetryConfig};
use crate::translator::{ensure_supported, needs_translation, Translator};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::debug;

const BACKEND: &str = "LibreTranslate";

/// Engine codes that differ from the locale tags we use.
const CODE_ALIASES: &[(&str, &str)] = &[("zh", "zh-CN"), ("zt", "zh-TW")];

#[derive(Debug, Serialize)]
struct TranslateRequest<'a> {
    q: &'a str,
    source: &'a str,
    target: &'a str,
    format: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    api_key: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TranslateResponse {
    translated_text: String,
}

#[derive(Debug, Deserialize)]
struct LanguageEntry {
    code: String,
}

/// Self-hosted translation engine: slower, one request per text, never rate limited.
pub struct FallbackTranslator {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    languages: HashSet<Language>,
    /// Locale tag (lower-cased) to engine code
    codes: HashMap<String, String>,
    retry: RetryConfig,
}

impl FallbackTranslator {
    /// Fetch the engine's language list and build the translator.
    pub async fn connect(
        client: reqwest::Client,
        base_url: &str,
        api_key: Option<String>,
    ) -> Result<Self> {
        let url = format!("{}/languages", base_url.trim_end_matches('/'));
        let retry = RetryConfig::local_engine();

        let codes = retry_transient(
            &retry,
            "Fetching LibreTranslate languages",
            || fetch_languages(&client, &url),
        )
        .await?;

        Ok(Self::with_languages(client, base_url, api_key, codes))
    }

    /// Build the translator from engine codes (e.g., "en", "zh", "zt").
    pub fn with_languages<I, S>(
        client: reqwest::Client,
        base_url: &str,
        api_key: Option<String>,
        codes: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut languages = HashSet::new();
        let mut known = HashMap::new();

        for engine_code in codes {
            let engine_code = engine_code.as_ref();
            let tag = CODE_ALIASES
                .iter()
                .find(|(alias, _)| alias.eq_ignore_ascii_case(engine_code))
                .map(|(_, tag)| *tag)
                .unwrap_or(engine_code);

            match Language::new(tag) {
                Ok(language) => {
                    known.insert(tag.to_ascii_lowercase(), engine_code.to_string());
                    languages.insert(language);
                }
                Err(_) => debug!("Skipping unparseable {} language code '{}'", BACKEND, engine_code),
            }
        }

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            languages,
            codes: known,
            retry: RetryConfig::local_engine(),
        }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Engine code for the exact tag, then for the bare subtag.
    fn wire_code(&self, language: &Language) -> String {
        let trimmed = language.trim_territory();
        self.codes
            .get(&language.code().to_ascii_lowercase())
            .or_else(|| self.codes.get(trimmed.code()))
            .cloned()
            .unwrap_or_else(|| trimmed.code().to_string())
    }

    async fn request(&self, text: &str, source: &str, target: &str) -> Result<String> {
        TranslationMetrics::global().record(Counter::BackendCall);

        let result = self.send(text, source, target).await;
        if result.is_err() {
            TranslationMetrics::global().record(Counter::BackendFailure);
        }
        result
    }

    async fn send(&self, text: &str, source: &str, target: &str) -> Result<String> {
        let response = self
            .client
            .post(format!("{}/translate", self.base_url))
            .json(&TranslateRequest {
                q: text,
                source,
                target,
                format: "text",
                api_key: self.api_key.as_deref(),
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
            return Err(L10nError::Api {
                backend: BACKEND.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        let parsed: TranslateResponse =
            response.json().await.map_err(|e| L10nError::InvalidResponse {
                backend: BACKEND.to_string(),
                message: e.to_string(),
            })?;

        Ok(parsed.translated_text)
    }
}

async fn fetch_languages(client: &reqwest::Client, url: &str) -> Result<Vec<String>> {
    let response = client.get(url).send().await.map_err(|source| L10nError::Http {
        backend: BACKEND.to_string(),
        source,
    })?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(L10nError::Api {
            backend: BACKEND.to_string(),
            status: status.as_u16(),
            body,
        });
    }

    let entries: Vec<LanguageEntry> =
        response.json().await.map_err(|e| L10nError::InvalidResponse {
            backend: BACKEND.to_string(),
            message: e.to_string(),
        })?;

    Ok(entries.into_iter().map(|entry| entry.code).collect())
}

#[async_trait]
impl Translator for FallbackTranslator {
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
        ensure_supported(self, target)?;
        ensure_supported(self, source)?;

        if !needs_translation(text, target, source) {
            return Ok(Translation::identity(source.clone(), target.clone(), text));
        }

        let source_code = self.wire_code(source);
        let target_code = self.wire_code(target);
        let (source_code, target_code) = (&source_code, &target_code);

        let translated = retry_transient(
            &self.retry,
            &format!("{} to {}", BACKEND, target),
            move || self.request(text, source_code, target_code),
        )
        .await?;

        Ok(Translation::new(source.clone(), target.clone(), text, translated))
    }
}
