//! Startup warm-up of the translation cache for the whole command surface.
//!
//! # Flow
//!
//! 1. Split the platform locales into localized (authored resources exist)
//!    and non-localized ones
//! 2. Localized: resolve every surface string from that locale's own resources
//! 3. Non-localized: translate the strings the cache lacks, one batch per locale
//! 4. Write every result into the cache and save it once
//!
//! Afterwards [`CommandTranslator::translate`] answers the platform's
//! translation callback from the cache alone.

use crate::command::{surface_texts, AppCommand, CommandRegistry, ContextMenu, SurfaceText, TextKind};
use crate::docs::DocumentStore;
use crate::error::{L10nError, Result};
use crate::i18n::{
    command_description, command_name, truncate, Counter, Language, LanguageRegistry,
    Translation, TranslationMetrics, COMMAND_NAME_LIMIT,
};
use crate::localization::{fluent_args, Localizer};
use crate::translator::Translator;
use futures::StreamExt;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Default bound on concurrently processed locales
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Outcome of [`CommandTranslator::load`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct LoadReport {
    /// Locales resolved from authored resources
    pub localized: Vec<String>,

    /// Locales filled by a translator
    pub translated: Vec<String>,

    /// Locales neither authored nor servable by the translator
    pub skipped: Vec<String>,

    /// Locales whose work failed, fully or partly
    pub failed: Vec<String>,

    /// Cache entries written
    pub entries: usize,
}

/// Locales split by how their strings are produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocalePartition {
    pub localized: Vec<Language>,
    pub non_localized: Vec<Language>,
    pub skipped: Vec<Language>,
}

struct LocaleOutcome {
    language: Language,
    localized: bool,
    translations: Vec<Translation>,
    failures: usize,
}

/// Pre-populates the cache for every locale and serves the platform's translation callback.
pub struct CommandTranslator {
    localizer: Localizer,
    docs: DocumentStore,
    registry: Arc<dyn CommandRegistry>,
    concurrency: usize,
}

impl CommandTranslator {
    pub fn new(localizer: Localizer, docs: DocumentStore, registry: Arc<dyn CommandRegistry>) -> Self {
        Self {
            localizer,
            docs,
            registry,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Split `locales` into localized, non-localized and unservable ones.
    ///
    /// Locales of the default language need no work and are left out.
    /// Partitioning is by exact code, so `zh-CN` and `zh-TW` stay separate.
    pub fn partition(&self, locales: &[Language]) -> LocalePartition {
        let mut partition = LocalePartition::default();
        let translator = self.localizer.translator();

        for language in locales {
            if language.is_default() {
                continue;
            }

            if self.localizer.has(language) {
                partition.localized.push(language.clone());
            } else if translator.is_language_supported(language) {
                partition.non_localized.push(language.clone());
            } else {
                warn!(
                    "No resources for {} and {} cannot translate it, skipping",
                    language,
                    translator.name()
                );
                partition.skipped.push(language.clone());
            }
        }

        partition
    }

    /// Warm up the cache for every locale the platform may request.
    pub async fn load(&self) -> Result<LoadReport> {
        self.load_locales(&LanguageRegistry::get().platform_locales())
            .await
    }

    /// Warm up the cache for `locales`.
    ///
    /// Locales are processed concurrently, at most `concurrency` at a time, and
    /// their results are written in completion order. The cache is saved once,
    /// after every locale has finished.
    pub async fn load_locales(&self, locales: &[Language]) -> Result<LoadReport> {
        let partition = self.partition(locales);
        let commands = Arc::new(self.registry.commands());
        let context_menus = Arc::new(self.registry.context_menus());
        let documents = self.default_documents().await?;

        let mut surface = surface_texts(&commands, &context_menus);
        surface.extend(documents.values().map(|text| SurfaceText {
            text: text.clone(),
            kind: TextKind::Document,
        }));

        info!(
            "Warming translation cache: {} localized, {} to translate, {} skipped, {} strings",
            partition.localized.len(),
            partition.non_localized.len(),
            partition.skipped.len(),
            surface.len()
        );

        let cache = self.localizer.cache().clone();
        let permits = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks: JoinSet<Result<LocaleOutcome>> = JoinSet::new();

        for language in partition.non_localized.iter().cloned() {
            let mut pending = Vec::new();
            for entry in &surface {
                if cache.lookup(&entry.text, &language).await?.is_none() {
                    pending.push(entry.clone());
                }
            }
            if pending.is_empty() {
                debug!("{} is already cached", language);
                continue;
            }

            let translator = self.localizer.translator().clone();
            let permits = permits.clone();
            tasks.spawn(async move {
                let _permit = permits
                    .acquire_owned()
                    .await
                    .map_err(|e| L10nError::Task(e.to_string()))?;
                let (translations, failures) =
                    translate_locale(translator.as_ref(), &language, pending).await;
                Ok(LocaleOutcome {
                    language,
                    localized: false,
                    translations,
                    failures,
                })
            });
        }

        for language in partition.localized.iter().cloned() {
            let localizer = self.localizer.clone();
            let docs = self.docs.clone();
            let documents = documents.clone();
            let commands = commands.clone();
            let context_menus = context_menus.clone();
            let permits = permits.clone();

            tasks.spawn(async move {
                let _permit = permits
                    .acquire_owned()
                    .await
                    .map_err(|e| L10nError::Task(e.to_string()))?;

                let mut translations =
                    localize_documents(&docs, &language, &documents).await?;

                let blocking_language = language.clone();
                let (localized, failures) = tokio::task::spawn_blocking(move || {
                    localize_commands(&localizer, &blocking_language, &commands, &context_menus)
                })
                .await
                .map_err(|e| L10nError::Task(e.to_string()))?;
                translations.extend(localized);

                Ok(LocaleOutcome {
                    language,
                    localized: true,
                    translations,
                    failures,
                })
            });
        }

        let mut report = LoadReport {
            skipped: partition.skipped.iter().map(|l| l.code().to_string()).collect(),
            ..LoadReport::default()
        };

        while let Some(joined) = tasks.join_next().await {
            let outcome = match joined {
                Ok(Ok(outcome)) => outcome,
                Ok(Err(e)) => {
                    warn!("Locale warm-up failed: {}", e);
                    continue;
                }
                Err(e) => {
                    warn!("Locale warm-up task panicked or was cancelled: {}", e);
                    continue;
                }
            };

            for translation in &outcome.translations {
                cache.set(translation).await?;
            }
            report.entries += outcome.translations.len();

            let code = outcome.language.code().to_string();
            if outcome.failures > 0 {
                warn!("{}: {} strings could not be produced", code, outcome.failures);
                report.failed.push(code.clone());
            }
            info!(
                "{} {}: {} entries",
                if outcome.localized { "Localized" } else { "Translated" },
                code,
                outcome.translations.len()
            );
            if outcome.localized {
                report.localized.push(code);
            } else {
                report.translated.push(code);
            }
        }

        cache.save().await?;
        info!(
            "Translation cache warmed: {} entries written to {}",
            report.entries,
            cache.path().display()
        );

        Ok(report)
    }

    /// The platform's translation callback.
    ///
    /// Returns the cached rendering of `message` for `locale`, or `None` when there
    /// is none; the platform then shows the default-language text. Never calls a
    /// translator.
    pub async fn translate(&self, message: &str, locale: &Language) -> Option<String> {
        if locale.is_default() {
            return Some(message.to_string());
        }

        let metrics = TranslationMetrics::global();
        match self.localizer.cache().lookup(message, locale).await {
            Ok(Some(translation)) => {
                metrics.record(Counter::CacheHit);
                Some(translation.into_text())
            }
            Ok(None) => {
                metrics.record(Counter::CacheMiss);
                warn!("Translation of text '{}' not found for locale '{}'", message, locale);
                None
            }
            Err(e) => {
                warn!("Failed to read translation cache for '{}': {}", locale, e);
                None
            }
        }
    }

    /// Default-language text of every document, keyed by document id.
    async fn default_documents(&self) -> Result<HashMap<String, String>> {
        let mut documents = HashMap::new();
        for doc_id in self.registry.documents() {
            match self.docs.read_default(&doc_id).await? {
                Some(text) => {
                    documents.insert(doc_id, text);
                }
                None => warn!("Document '{}' has no default-language text, skipping", doc_id),
            }
        }
        Ok(documents)
    }
}

/// Translate one locale's pending strings in a single batch.
///
/// Names are sent with underscores as spaces and keyed back to the original name.
async fn translate_locale(
    translator: &dyn Translator,
    language: &Language,
    pending: Vec<SurfaceText>,
) -> (Vec<Translation>, usize) {
    // Several originals may share one wire text ("set_language" and "set language")
    let mut originals: HashMap<String, Vec<SurfaceText>> = HashMap::new();
    for entry in pending {
        let wire = match entry.kind {
            TextKind::Name => entry.text.replace('_', " "),
            _ => entry.text.clone(),
        };
        originals.entry(wire).or_default().push(entry);
    }

    let wire_texts: Vec<String> = originals.keys().cloned().collect();
    let mut results = translator.translate_texts(
        wire_texts,
        language.clone(),
        Language::default_language(),
    );

    let mut translations = Vec::new();
    let mut failures = 0;
    while let Some(result) = results.next().await {
        match result {
            Ok(translation) => {
                let Some(entries) = originals.remove(translation.original_text()) else {
                    continue;
                };
                for entry in entries {
                    let kind = entry.kind;
                    translations.push(
                        translation
                            .clone()
                            .rekey(entry.text)
                            .map_text(|text| shape(text, kind)),
                    );
                }
            }
            Err(e) => {
                warn!("Failed to translate a string to {}: {}", language, e);
                failures += 1;
            }
        }
    }

    (translations, failures)
}

/// Fit a translated or authored string to where it is shown.
fn shape(text: &str, kind: TextKind) -> String {
    match kind {
        TextKind::Name => command_name(text),
        TextKind::Description | TextKind::Label => command_description(text),
        TextKind::ContextMenuName => truncate(text, COMMAND_NAME_LIMIT),
        TextKind::Document => text.to_string(),
    }
}

/// Authored documents of a localized locale, keyed by their default-language text.
async fn localize_documents(
    docs: &DocumentStore,
    language: &Language,
    documents: &HashMap<String, String>,
) -> Result<Vec<Translation>> {
    let mut translations = Vec::new();
    for (doc_id, default_text) in documents {
        match docs.read(language, doc_id).await? {
            Some(text) => translations.push(Translation::new(
                Language::default_language(),
                language.clone(),
                default_text.as_str(),
                text,
            )),
            None => warn!("Document '{}' is not authored for {}", doc_id, language),
        }
    }
    Ok(translations)
}

/// Resolve every command and context-menu string of a localized locale from its resources.
///
/// Returns the translations and the number of message ids that were missing.
fn localize_commands(
    localizer: &Localizer,
    language: &Language,
    commands: &[AppCommand],
    context_menus: &[ContextMenu],
) -> (Vec<Translation>, usize) {
    let mut translations = Vec::new();
    let mut missing = 0;

    for command in commands {
        let localization = localizer.localization(language, &[command.resource_id()]);
        let args = fluent_args(&command.extras);

        let format = |msg_id: &str| localization.format_value(msg_id, Some(&args));
        let mut record = |original: &str, resolved: Result<String>, kind: TextKind| match resolved {
            Ok(text) => translations.push(Translation::new(
                Language::default_language(),
                language.clone(),
                original,
                shape(&text, kind),
            )),
            Err(e) => {
                warn!("{}", e);
                missing += 1;
            }
        };

        record(&command.name, format(&command.name_id()), TextKind::Name);
        record(
            &command.description,
            format(&command.description_id()),
            TextKind::Description,
        );
        if command.is_group {
            continue;
        }

        for parameter in &command.parameters {
            record(
                &parameter.name,
                format(&command.parameter_name_id(parameter)),
                TextKind::Name,
            );
            record(
                &parameter.description,
                format(&command.parameter_description_id(parameter)),
                TextKind::Description,
            );

            for choice in &parameter.choices {
                let resolved = if choice.is_numeric() {
                    Ok(choice.value.clone())
                } else {
                    format(&choice.value)
                };
                record(&choice.name, resolved, TextKind::Label);
            }
        }
    }

    for context_menu in context_menus {
        let localization = localizer.localization(language, &[context_menu.resource_id()]);
        let args = fluent_args(&context_menu.extras);

        match localization.format_value(&context_menu.name_id(), Some(&args)) {
            Ok(text) => translations.push(Translation::new(
                Language::default_language(),
                language.clone(),
                context_menu.name.as_str(),
                shape(&text, TextKind::ContextMenuName),
            )),
            Err(e) => {
                warn!("{}", e);
                missing += 1;
            }
        }
    }

    (translations, missing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::TranslationCache;
    use crate::command::{Choice, Parameter, StaticRegistry};
    use crate::localization::ResourceStore;
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::path::Path;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Renders `<target>:<text>` and records every batch it receives.
    struct RecordingTranslator {
        batches: Mutex<Vec<(String, Vec<String>)>>,
    }

    #[async_trait]
    impl Translator for RecordingTranslator {
        fn name(&self) -> &str {
            "recording"
        }

        fn supported_languages(&self) -> HashSet<Language> {
            ["en", "de", "pt", "fr", "zh"]
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
            Ok(Translation::new(
                source.clone(),
                target.clone(),
                text,
                format!("{}:{}", target, text),
            ))
        }

        fn translate_texts<'a>(
            &'a self,
            texts: Vec<String>,
            target: Language,
            source: Language,
        ) -> crate::translator::TranslationStream<'a> {
            self.batches
                .lock()
                .unwrap()
                .push((target.code().to_string(), texts.clone()));
            futures::stream::iter(texts)
                .then(move |text| {
                    let target = target.clone();
                    let source = source.clone();
                    async move { self.translate(&text, &target, &source).await }
                })
                .boxed()
        }
    }

    fn write(root: &Path, path: &str, contents: &str) {
        let path = root.join(path);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }

    fn lang(code: &str) -> Language {
        Language::new(code).unwrap()
    }

    fn registry() -> StaticRegistry {
        StaticRegistry {
            commands: vec![
                AppCommand {
                    name: "ping".to_string(),
                    description: "Ping the bot".to_string(),
                    root_name: None,
                    is_group: false,
                    parameters: Vec::new(),
                    extras: HashMap::new(),
                },
                AppCommand {
                    name: "set_language".to_string(),
                    description: "Set the language of { $bot }".to_string(),
                    root_name: Some("channel".to_string()),
                    is_group: false,
                    parameters: vec![Parameter {
                        name: "language".to_string(),
                        description: "Language to use".to_string(),
                        choices: vec![
                            Choice {
                                name: "English".to_string(),
                                value: "english".to_string(),
                            },
                            Choice {
                                name: "5".to_string(),
                                value: "5".to_string(),
                            },
                        ],
                    }],
                    extras: HashMap::from([("bot".to_string(), "SoruSora".to_string())]),
                },
            ],
            context_menus: vec![ContextMenu {
                name: "Translate Message".to_string(),
                extras: HashMap::new(),
            }],
            documents: vec!["about".to_string()],
        }
    }

    struct Fixture {
        _dir: TempDir,
        translator: Arc<RecordingTranslator>,
        commands: CommandTranslator,
    }

    fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let locales = dir.path().join("locales");
        let docs = dir.path().join("docs");

        write(&locales, "en/commands/ping.ftl", "ping-name = ping\nping-description = Ping the bot\n");
        write(
            &locales,
            "de/commands/ping.ftl",
            "ping-name = Ping Test\nping-description = Den Bot anpingen\n",
        );
        write(
            &locales,
            "de/commands/channel.ftl",
            "set-language-name = Sprache Setzen\n\
             set-language-description = Sprache von { $bot } setzen\n\
             set-language-language-name = sprache\n\
             set-language-language-description = Zu verwendende Sprache\n\
             english = Englisch\n",
        );
        write(
            &locales,
            "de/context_menus/translate_message.ftl",
            "translate-message-name = Nachricht übersetzen\n",
        );
        write(&docs, "en/about.md", "# About");
        write(&docs, "de/about.md", "# Über");

        let translator = Arc::new(RecordingTranslator {
            batches: Mutex::new(Vec::new()),
        });
        let cache = Arc::new(TranslationCache::new(dir.path().join("cache/translations.json")));
        let localizer = Localizer::new(ResourceStore::new(locales), translator.clone(), cache);
        let commands = CommandTranslator::new(localizer, DocumentStore::new(docs), Arc::new(registry()))
            .with_concurrency(2);

        Fixture {
            _dir: dir,
            translator,
            commands,
        }
    }

    async fn cached(fixture: &Fixture, text: &str, code: &str) -> Option<String> {
        fixture
            .commands
            .localizer
            .cache()
            .lookup(text, &lang(code))
            .await
            .unwrap()
            .map(Translation::into_text)
    }

    // ==================== Partition Tests ====================

    #[test]
    fn test_partition() {
        let f = fixture();
        let partition = f.commands.partition(&[
            lang("en-US"),
            lang("de"),
            lang("pt-BR"),
            lang("ja"),
            lang("zh-CN"),
            lang("zh-TW"),
        ]);

        assert_eq!(partition.localized, vec![lang("de")]);
        let codes: Vec<&str> = partition.non_localized.iter().map(Language::code).collect();
        assert_eq!(codes, vec!["pt-BR", "zh-CN", "zh-TW"]);
        assert_eq!(partition.skipped, vec![lang("ja")]);
    }

    // ==================== Load Tests ====================

    #[tokio::test]
    async fn test_load_localizes_and_translates() {
        let f = fixture();
        let report = f.commands.load_locales(&[lang("de"), lang("pt")]).await.unwrap();

        assert_eq!(report.localized, vec!["de"]);
        assert_eq!(report.translated, vec!["pt"]);
        assert!(report.failed.is_empty());

        // Localized: authored text, names slugified
        assert_eq!(cached(&f, "ping", "de").await.as_deref(), Some("ping_test"));
        assert_eq!(cached(&f, "set_language", "de").await.as_deref(), Some("sprache_setzen"));
        assert_eq!(
            cached(&f, "Set the language of { $bot }", "de").await.as_deref(),
            Some("Sprache von SoruSora setzen")
        );
        assert_eq!(cached(&f, "English", "de").await.as_deref(), Some("Englisch"));
        assert_eq!(cached(&f, "5", "de").await.as_deref(), Some("5"));
        assert_eq!(
            cached(&f, "Translate Message", "de").await.as_deref(),
            Some("Nachricht übersetzen")
        );
        assert_eq!(cached(&f, "# About", "de").await.as_deref(), Some("# Über"));

        // Translated: backend output, names keyed by the original and slugified
        assert_eq!(cached(&f, "ping", "pt").await.as_deref(), Some("ptping"));
        assert_eq!(cached(&f, "set_language", "pt").await.as_deref(), Some("ptset_language"));
        assert_eq!(cached(&f, "Ping the bot", "pt").await.as_deref(), Some("pt:Ping the bot"));
        assert_eq!(cached(&f, "# About", "pt").await.as_deref(), Some("pt:# About"));
    }

    #[tokio::test]
    async fn test_load_sends_one_batch_per_locale() {
        let f = fixture();
        f.commands.load_locales(&[lang("pt"), lang("fr")]).await.unwrap();

        let batches = f.translator.batches.lock().unwrap();
        assert_eq!(batches.len(), 2);
        let pt = batches.iter().find(|(code, _)| code == "pt").unwrap();
        assert!(pt.1.contains(&"set language".to_string()));
        assert!(!pt.1.contains(&"5".to_string()));
    }

    #[tokio::test]
    async fn test_load_skips_cached_strings() {
        let f = fixture();
        f.commands.load_locales(&[lang("pt")]).await.unwrap();
        let report = f.commands.load_locales(&[lang("pt")]).await.unwrap();

        assert_eq!(f.translator.batches.lock().unwrap().len(), 1);
        assert_eq!(report.entries, 0);
    }

    #[tokio::test]
    async fn test_load_persists_cache() {
        let f = fixture();
        f.commands.load_locales(&[lang("pt")]).await.unwrap();

        let cache = f.commands.localizer.cache();
        assert!(!cache.is_loaded().await);
        assert!(cache.path().exists());
    }

    #[tokio::test]
    async fn test_missing_message_is_counted() {
        let f = fixture();
        write(
            f.commands.localizer.store().root(),
            "fr/commands/ping.ftl",
            "ping-name = ping\n",
        );

        let report = f.commands.load_locales(&[lang("fr")]).await.unwrap();

        assert_eq!(report.localized, vec!["fr"]);
        assert_eq!(report.failed, vec!["fr"]);
        assert_eq!(cached(&f, "ping", "fr").await.as_deref(), Some("ping"));
    }

    // ==================== Hook Tests ====================

    #[tokio::test]
    async fn test_translate_hook() {
        let f = fixture();
        f.commands.load_locales(&[lang("de")]).await.unwrap();

        assert_eq!(
            f.commands.translate("Ping the bot", &lang("de")).await.as_deref(),
            Some("Den Bot anpingen")
        );
        assert_eq!(
            f.commands.translate("Ping the bot", &lang("en-GB")).await.as_deref(),
            Some("Ping the bot")
        );
        assert!(f.commands.translate("Unknown", &lang("de")).await.is_none());
    }

    // ==================== Shape Tests ====================

    #[test]
    fn test_shape_limits() {
        let long = "word ".repeat(40);

        assert!(shape(&long, TextKind::Name).chars().count() <= COMMAND_NAME_LIMIT);
        assert_eq!(shape(&long, TextKind::Description).chars().count(), 100);
        assert_eq!(shape(&long, TextKind::ContextMenuName).chars().count(), COMMAND_NAME_LIMIT);
        assert_eq!(shape(&long, TextKind::Document), long);
    }
}
