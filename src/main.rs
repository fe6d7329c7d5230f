use anyhow::{Context, Result};
use sorusora_l10n::cache::TranslationCache;
use sorusora_l10n::command::StaticRegistry;
use sorusora_l10n::command_translator::CommandTranslator;
use sorusora_l10n::config::Config;
use sorusora_l10n::docs::DocumentStore;
use sorusora_l10n::i18n::TranslationMetrics;
use sorusora_l10n::localization::{Localizer, ResourceStore};
use sorusora_l10n::translator::build_translator;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (ignored in production)
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("sorusora_l10n=info".parse()?),
        )
        .init();

    info!("Starting translation cache warm-up");

    let config = Config::from_env()?;

    let translator = build_translator(&config)
        .await
        .context("Failed to connect translation backends")?;

    let cache = Arc::new(TranslationCache::new(&config.cache_path));
    cache
        .load()
        .await
        .with_context(|| format!("Failed to load {}", config.cache_path.display()))?;

    let registry = StaticRegistry::from_path(&config.commands_manifest)
        .await
        .with_context(|| format!("Failed to read {}", config.commands_manifest.display()))?;
    info!(
        "Loaded {} commands and {} context menus from {}",
        registry.commands.len(),
        registry.context_menus.len(),
        config.commands_manifest.display()
    );

    let localizer = Localizer::new(ResourceStore::new(&config.locales_dir), translator, cache);
    let commands = CommandTranslator::new(
        localizer,
        DocumentStore::new(&config.docs_dir),
        Arc::new(registry),
    )
    .with_concurrency(config.translation_concurrency);

    let report = commands.load().await?;
    info!(
        "Localized {} locales, translated {}, skipped {}, failed {} ({} entries)",
        report.localized.len(),
        report.translated.len(),
        report.skipped.len(),
        report.failed.len(),
        report.entries
    );

    let metrics = TranslationMetrics::global().report();
    info!("Translation metrics: {}", serde_json::to_string(&metrics)?);

    Ok(())
}
