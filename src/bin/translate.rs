//! Translate arbitrary text through the composite translator
//!
//! Usage:
//!   cargo run --bin translate -- <locale> <text...>
//!   cargo run --bin translate -- pt-BR "Check the latency"
//!
//! Required environment variables:
//! - GOOGLE_TRANSLATE_API_KEY
//!
//! Optional:
//! - GOOGLE_TRANSLATE_API_URL
//! - LIBRETRANSLATE_URL (defaults to http://localhost:5000)
//! - LIBRETRANSLATE_API_KEY

use anyhow::{bail, Context, Result};
use sorusora_l10n::config::Config;
use sorusora_l10n::i18n::Language;
use sorusora_l10n::translator::{build_translator, Translator};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("sorusora_l10n=warn".parse()?),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let Some(locale) = args.next() else {
        bail!("Usage: translate <locale> <text...>");
    };
    let text = args.collect::<Vec<_>>().join(" ");
    if text.trim().is_empty() {
        bail!("Usage: translate <locale> <text...>");
    }

    let target = Language::new(&locale).with_context(|| format!("Invalid locale '{}'", locale))?;
    let config = Config::from_env()?;
    let translator = build_translator(&config).await?;

    if !translator.is_language_supported(&target) {
        bail!("{} ({}) is not supported by {}", target.name(), target, translator.name());
    }

    let translation = translator
        .translate(&text, &target, &Language::default_language())
        .await?;
    info!("Translated to {} with {}", target.name(), translator.name());

    println!("{}", translation.text());
    Ok(())
}
