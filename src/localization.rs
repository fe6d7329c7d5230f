//! Message resolution for one locale.
//!
//! A `Localization` resolves message ids from Fluent resources along a
//! fallback chain, and can translate the default-language text of a message
//! through the cache and translator when no authored text exists.

use crate::cache::TranslationCache;
use crate::error::{L10nError, Result};
use crate::i18n::{Counter, Language, Translation, TranslationMetrics};
use crate::translator::Translator;
use fluent_bundle::concurrent::FluentBundle;
use fluent_bundle::{FluentArgs, FluentResource};
use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Resource loaded into every Localization.
pub const SHARED_RESOURCE: &str = "shared.ftl";

/// Fluent resources on disk, one directory per locale code.
#[derive(Debug, Clone)]
pub struct ResourceStore {
    root: PathBuf,
}

impl ResourceStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether authored resources exist for the exact or territory-trimmed locale.
    pub fn has(&self, language: &Language) -> bool {
        self.has_exact(language) || self.has_exact(&language.trim_territory())
    }

    /// Whether a resource directory exists for exactly this locale code.
    pub fn has_exact(&self, language: &Language) -> bool {
        self.root.join(language.code()).is_dir()
    }

    /// Contents of `<root>/<code>/<resource_id>`, or `None` if the file does not exist.
    pub fn read(&self, language: &Language, resource_id: &str) -> Result<Option<String>> {
        let path = self.root.join(language.code()).join(resource_id);
        match std::fs::read_to_string(&path) {
            Ok(source) => Ok(Some(source)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// Shared services every Localization needs.
#[derive(Clone)]
pub struct Localizer {
    store: Arc<ResourceStore>,
    translator: Arc<dyn Translator>,
    cache: Arc<TranslationCache>,
    in_flight: Arc<InFlight>,
}

impl Localizer {
    pub fn new(
        store: ResourceStore,
        translator: Arc<dyn Translator>,
        cache: Arc<TranslationCache>,
    ) -> Self {
        Self {
            store: Arc::new(store),
            translator,
            cache,
            in_flight: Arc::new(InFlight::default()),
        }
    }

    pub fn store(&self) -> &ResourceStore {
        &self.store
    }

    pub fn translator(&self) -> &Arc<dyn Translator> {
        &self.translator
    }

    pub fn cache(&self) -> &Arc<TranslationCache> {
        &self.cache
    }

    /// Whether authored resources exist for `language`.
    pub fn has(&self, language: &Language) -> bool {
        self.store.has(language)
    }

    /// A Localization for `language` over the given resources.
    pub fn localization<S: AsRef<str>>(&self, language: &Language, resource_ids: &[S]) -> Localization {
        self.localization_with_fallbacks(language, resource_ids, &[])
    }

    /// A Localization that consults `fallbacks` right after the exact locale.
    pub fn localization_with_fallbacks<S: AsRef<str>>(
        &self,
        language: &Language,
        resource_ids: &[S],
        fallbacks: &[Language],
    ) -> Localization {
        Localization::new(self.clone(), language.clone(), resource_ids, fallbacks)
    }

    /// Translate arbitrary text from the default language. Not cached.
    pub async fn translate(&self, text: &str, target: &Language) -> Result<Translation> {
        self.translator
            .translate(text, target, &Language::default_language())
            .await
    }
}

type TranslationKey = (String, String);

/// One lock per (language code, text) currently being translated on demand.
#[derive(Default)]
struct InFlight {
    slots: Mutex<HashMap<TranslationKey, Arc<Mutex<()>>>>,
}

impl InFlight {
    async fn claim(&self, key: &TranslationKey) -> Arc<Mutex<()>> {
        self.slots.lock().await.entry(key.clone()).or_default().clone()
    }

    /// Forget the slot once no other caller is waiting on it.
    async fn release(&self, key: &TranslationKey, slot: Arc<Mutex<()>>) {
        let mut slots = self.slots.lock().await;
        // one reference in the map, one here
        if Arc::strong_count(&slot) == 2 {
            slots.remove(key);
        }
    }
}

/// Build `FluentArgs` from string extras (e.g., `{"name": "SoruSora"}`).
pub fn fluent_args(extras: &HashMap<String, String>) -> FluentArgs<'_> {
    let mut args = FluentArgs::new();
    for (key, value) in extras {
        args.set(key.as_str(), value.as_str());
    }
    args
}

/// Message resolver for one locale.
pub struct Localization {
    localizer: Localizer,
    language: Language,
    resource_ids: Vec<String>,
    chain: Vec<Language>,
    bundles: Vec<FluentBundle<FluentResource>>,
    /// Default-language resources for text to translate; `None` for the default language itself
    defaults: Option<FluentBundle<FluentResource>>,
}

impl Localization {
    fn new<S: AsRef<str>>(
        localizer: Localizer,
        language: Language,
        resource_ids: &[S],
        fallbacks: &[Language],
    ) -> Self {
        let resource_ids: Vec<String> = resource_ids
            .iter()
            .map(|id| id.as_ref().to_string())
            .collect();
        let chain = fallback_chain(&language, fallbacks, localizer.translator.as_ref());

        let bundles = chain
            .iter()
            .filter_map(|locale| build_bundle(&localizer.store, locale, &resource_ids))
            .collect();
        let defaults = if language.is_default() {
            None
        } else {
            build_bundle(&localizer.store, &Language::default_language(), &resource_ids)
        };

        Self {
            localizer,
            language,
            resource_ids,
            chain,
            bundles,
            defaults,
        }
    }

    pub fn language(&self) -> &Language {
        &self.language
    }

    /// Locales consulted by `format_value`, in order.
    pub fn chain(&self) -> &[Language] {
        &self.chain
    }

    pub fn resource_ids(&self) -> &[String] {
        &self.resource_ids
    }

    /// Whether any bundle in the chain defines `msg_id`.
    pub fn has_message(&self, msg_id: &str) -> bool {
        self.bundles.iter().any(|bundle| bundle.has_message(msg_id))
    }

    /// Resolve `msg_id` from authored resources only.
    ///
    /// # Returns
    /// * `Ok(text)` from the first locale in the chain that defines the message
    /// * `Err(L10nError::MessageNotFound)` if none does
    pub fn format_value(&self, msg_id: &str, args: Option<&FluentArgs>) -> Result<String> {
        self.format_from(&self.bundles, msg_id, args)
            .ok_or_else(|| self.message_not_found(msg_id, &self.language))
    }

    /// Resolve `msg_id` from the default-language resources loaded with this Localization.
    fn format_default(&self, msg_id: &str, args: Option<&FluentArgs>) -> Result<String> {
        self.format_from(self.defaults.iter(), msg_id, args)
            .ok_or_else(|| self.message_not_found(msg_id, &Language::default_language()))
    }

    fn format_from<'b>(
        &self,
        bundles: impl IntoIterator<Item = &'b FluentBundle<FluentResource>>,
        msg_id: &str,
        args: Option<&FluentArgs>,
    ) -> Option<String> {
        for bundle in bundles {
            let Some(pattern) = bundle.get_message(msg_id).and_then(|message| message.value()) else {
                continue;
            };

            let mut errors = Vec::new();
            let value = bundle.format_pattern(pattern, args, &mut errors);
            if !errors.is_empty() {
                warn!(
                    "Formatting errors for message '{}' in {}: {:?}",
                    msg_id, self.language, errors
                );
            }
            return Some(value.into_owned());
        }
        None
    }

    fn message_not_found(&self, msg_id: &str, locale: &Language) -> L10nError {
        L10nError::MessageNotFound {
            id: msg_id.to_string(),
            locale: locale.code().to_string(),
            resources: self.resource_ids.clone(),
        }
    }

    /// Resolve `msg_id`, translating its default-language text when no authored text exists.
    ///
    /// Fails only if the default language does not define `msg_id` either.
    /// A translation is fetched at most once per text and language; later calls
    /// are answered by the cache. If translating fails, the default-language
    /// text is returned.
    pub fn format_value_or_translate(
        &self,
        msg_id: &str,
        args: Option<&FluentArgs>,
    ) -> impl Future<Output = Result<String>> + '_ {
        let resolved = match self.format_value(msg_id, args) {
            Ok(text) => Ok(Resolved::Authored(text)),
            Err(e) if e.is_message_not_found() && self.language.is_default() => Err(e),
            Err(e) if e.is_message_not_found() => self.format_default(msg_id, args).map(Resolved::Default),
            Err(e) => Err(e),
        };

        async move {
            match resolved? {
                Resolved::Authored(text) => Ok(text),
                Resolved::Default(text) => match self.translate_cached(&text).await {
                    Ok(translated) => Ok(translated),
                    Err(e) => {
                        warn!(
                            "Failed to translate '{}' to {}, using default text: {}",
                            text, self.language, e
                        );
                        Ok(text)
                    }
                },
            }
        }
    }

    async fn translate_cached(&self, text: &str) -> Result<String> {
        let key = (self.language.code().to_string(), text.to_string());
        let in_flight = &self.localizer.in_flight;

        let slot = in_flight.claim(&key).await;
        let result = {
            let _translating = slot.lock().await;
            self.lookup_or_translate(text).await
        };
        in_flight.release(&key, slot).await;
        result
    }

    /// Must run while holding the slot for `(self.language, text)`.
    async fn lookup_or_translate(&self, text: &str) -> Result<String> {
        let cache = &self.localizer.cache;
        let metrics = TranslationMetrics::global();

        if let Some(cached) = cache.lookup(text, &self.language).await? {
            metrics.record(Counter::CacheHit);
            return Ok(cached.into_text());
        }
        metrics.record(Counter::CacheMiss);

        debug!("Translating '{}' to {} on demand", text, self.language);
        let translation = self.localizer.translate(text, &self.language).await?;
        cache.set(&translation).await?;
        cache.save().await?;

        Ok(translation.into_text())
    }
}

enum Resolved {
    Authored(String),
    Default(String),
}

/// Exact locale, caller fallbacks, trimmed locale, then the default language
/// when the translator cannot serve this one.
fn fallback_chain(language: &Language, fallbacks: &[Language], translator: &dyn Translator) -> Vec<Language> {
    let mut candidates = vec![language.clone()];
    candidates.extend(fallbacks.iter().cloned());
    if language.has_territory() {
        candidates.push(language.trim_territory());
    }
    if !translator.is_language_supported(language) {
        candidates.push(Language::default_language());
    }

    let mut chain: Vec<Language> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        if !chain.iter().any(|seen| seen.code() == candidate.code()) {
            chain.push(candidate);
        }
    }
    chain
}

fn build_bundle(
    store: &ResourceStore,
    language: &Language,
    resource_ids: &[String],
) -> Option<FluentBundle<FluentResource>> {
    let mut bundle = FluentBundle::new_concurrent(vec![language.identifier().clone()]);
    bundle.set_use_isolating(false);
    let mut loaded = 0;

    let resources = std::iter::once(SHARED_RESOURCE).chain(resource_ids.iter().map(String::as_str));
    for resource_id in resources {
        let source = match store.read(language, resource_id) {
            Ok(Some(source)) => source,
            Ok(None) => continue,
            Err(e) => {
                warn!("Failed to read {}/{}: {}", language, resource_id, e);
                continue;
            }
        };

        let resource = match FluentResource::try_new(source) {
            Ok(resource) => resource,
            Err((resource, errors)) => {
                warn!(
                    "Syntax errors in {}/{}, using the entries that parsed: {:?}",
                    language, resource_id, errors
                );
                resource
            }
        };

        if let Err(errors) = bundle.add_resource(resource) {
            warn!("Conflicting messages in {}/{}: {:?}", language, resource_id, errors);
        }
        loaded += 1;
    }

    if loaded == 0 {
        None
    } else {
        debug!("Loaded {} resources for {}", loaded, language);
        Some(bundle)
    }
}
