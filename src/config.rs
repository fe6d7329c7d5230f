use anyhow::{Context, Result};
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
    // Resources
    pub locales_dir: PathBuf,
    pub docs_dir: PathBuf,
    pub cache_path: PathBuf,
    pub commands_manifest: PathBuf,

    // Google Cloud Translation (primary backend)
    pub google_translate_api_key: String,
    pub google_translate_api_url: String,

    // LibreTranslate (fallback backend)
    pub libretranslate_url: String,
    pub libretranslate_api_key: Option<String>,

    // Bulk translation
    pub translation_concurrency: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            // Resources
            locales_dir: std::env::var("LOCALES_DIR")
                .unwrap_or_else(|_| "locales".to_string())
                .into(),
            docs_dir: std::env::var("DOCS_DIR")
                .unwrap_or_else(|_| "docs".to_string())
                .into(),
            cache_path: std::env::var("CACHE_PATH")
                .unwrap_or_else(|_| "cache/translations.json".to_string())
                .into(),
            commands_manifest: std::env::var("COMMANDS_MANIFEST")
                .unwrap_or_else(|_| "commands.json".to_string())
                .into(),

            // Google Cloud Translation
            google_translate_api_key: std::env::var("GOOGLE_TRANSLATE_API_KEY")
                .context("GOOGLE_TRANSLATE_API_KEY not set")?,
            google_translate_api_url: std::env::var("GOOGLE_TRANSLATE_API_URL").unwrap_or_else(
                |_| "https://translation.googleapis.com/language/translate/v2".to_string(),
            ),

            // LibreTranslate
            libretranslate_url: std::env::var("LIBRETRANSLATE_URL")
                .unwrap_or_else(|_| "http://localhost:5000".to_string()),
            libretranslate_api_key: std::env::var("LIBRETRANSLATE_API_KEY")
                .ok()
                .filter(|key| !key.is_empty()),

            // Bulk translation
            translation_concurrency: std::env::var("TRANSLATION_CONCURRENCY")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|n: &usize| *n > 0)
                .unwrap_or(4),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: [&str; 9] = [
        "LOCALES_DIR",
        "DOCS_DIR",
        "CACHE_PATH",
        "COMMANDS_MANIFEST",
        "GOOGLE_TRANSLATE_API_KEY",
        "GOOGLE_TRANSLATE_API_URL",
        "LIBRETRANSLATE_URL",
        "LIBRETRANSLATE_API_KEY",
        "TRANSLATION_CONCURRENCY",
    ];

    fn clear_env() {
        for var in VARS {
            std::env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_from_env_defaults() {
        clear_env();
        std::env::set_var("GOOGLE_TRANSLATE_API_KEY", "test-key");

        let config = Config::from_env().expect("Should load config");

        assert_eq!(config.locales_dir, PathBuf::from("locales"));
        assert_eq!(config.docs_dir, PathBuf::from("docs"));
        assert_eq!(config.cache_path, PathBuf::from("cache/translations.json"));
        assert_eq!(config.google_translate_api_key, "test-key");
        assert!(config
            .google_translate_api_url
            .starts_with("https://translation.googleapis.com"));
        assert_eq!(config.libretranslate_url, "http://localhost:5000");
        assert_eq!(config.libretranslate_api_key, None);
        assert_eq!(config.translation_concurrency, 4);

        clear_env();
    }

    #[test]
    #[serial]
    fn test_from_env_missing_api_key() {
        clear_env();

        let result = Config::from_env();
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("GOOGLE_TRANSLATE_API_KEY"));
    }

    #[test]
    #[serial]
    fn test_from_env_overrides() {
        clear_env();
        std::env::set_var("GOOGLE_TRANSLATE_API_KEY", "test-key");
        std::env::set_var("LOCALES_DIR", "/srv/bot/locales");
        std::env::set_var("LIBRETRANSLATE_API_KEY", "local-key");
        std::env::set_var("TRANSLATION_CONCURRENCY", "16");

        let config = Config::from_env().expect("Should load config");

        assert_eq!(config.locales_dir, PathBuf::from("/srv/bot/locales"));
        assert_eq!(config.libretranslate_api_key.as_deref(), Some("local-key"));
        assert_eq!(config.translation_concurrency, 16);

        clear_env();
    }

    #[test]
    #[serial]
    fn test_from_env_rejects_zero_concurrency() {
        clear_env();
        std::env::set_var("GOOGLE_TRANSLATE_API_KEY", "test-key");
        std::env::set_var("TRANSLATION_CONCURRENCY", "0");

        let config = Config::from_env().expect("Should load config");
        assert_eq!(config.translation_concurrency, 4);

        clear_env();
    }
}
