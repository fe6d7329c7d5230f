//! Language registry: names of known languages and the locales the chat platform sends.
//!
//! Uses a singleton pattern with `OnceLock` to ensure thread-safe
//! initialization and access.

use crate::i18n::Language;
use std::sync::OnceLock;

/// Metadata for a known language or locale.
#[derive(Debug, Clone)]
pub struct LanguageConfig {
    /// Locale tag (e.g., "en", "pt-BR")
    pub code: &'static str,

    /// English name of the language (e.g., "Portuguese (Brazil)")
    pub name: &'static str,

    /// Native name of the language (e.g., "Português do Brasil")
    pub native_name: &'static str,

    /// Whether the chat platform can send this exact locale with an interaction
    pub platform_locale: bool,
}

/// Global language registry singleton.
pub struct LanguageRegistry {
    languages: Vec<LanguageConfig>,
}

/// Global registry instance (initialized lazily)
static REGISTRY: OnceLock<LanguageRegistry> = OnceLock::new();

impl LanguageRegistry {
    /// Get the global language registry instance.
    pub fn get() -> &'static LanguageRegistry {
        REGISTRY.get_or_init(|| LanguageRegistry {
            languages: default_languages(),
        })
    }

    /// Get a language configuration by its exact code (case-insensitive).
    pub fn get_by_code(&self, code: &str) -> Option<&LanguageConfig> {
        self.languages
            .iter()
            .find(|lang| lang.code.eq_ignore_ascii_case(code))
    }

    /// Get all known languages.
    pub fn list_all(&self) -> Vec<&LanguageConfig> {
        self.languages.iter().collect()
    }

    /// English name for a language: exact tag first, then its bare language subtag.
    pub fn english_name(&self, language: &Language) -> Option<&'static str> {
        self.get_by_code(language.code())
            .or_else(|| self.get_by_code(language.subtag()))
            .map(|lang| lang.name)
    }

    /// Every locale the platform may request, in registry order.
    pub fn platform_locales(&self) -> Vec<Language> {
        self.languages
            .iter()
            .filter(|lang| lang.platform_locale)
            .filter_map(|lang| Language::new(lang.code).ok())
            .collect()
    }
}

macro_rules! language {
    ($code:expr, $name:expr, $native:expr, platform) => {
        LanguageConfig {
            code: $code,
            name: $name,
            native_name: $native,
            platform_locale: true,
        }
    };
    ($code:expr, $name:expr, $native:expr) => {
        LanguageConfig {
            code: $code,
            name: $name,
            native_name: $native,
            platform_locale: false,
        }
    };
}

/// Known languages. Entries marked `platform` are the locales the chat platform defines.
fn default_languages() -> Vec<LanguageConfig> {
    vec![
        language!("id", "Indonesian", "Bahasa Indonesia", platform),
        language!("da", "Danish", "Dansk", platform),
        language!("de", "German", "Deutsch", platform),
        language!("en", "English", "English"),
        language!("en-GB", "English (UK)", "English, UK", platform),
        language!("en-US", "English (US)", "English, US", platform),
        language!("es", "Spanish", "Español"),
        language!("es-ES", "Spanish (Spain)", "Español", platform),
        language!("es-419", "Spanish (Latin America)", "Español, LATAM", platform),
        language!("fr", "French", "Français", platform),
        language!("hr", "Croatian", "Hrvatski", platform),
        language!("it", "Italian", "Italiano", platform),
        language!("lt", "Lithuanian", "Lietuviškai", platform),
        language!("hu", "Hungarian", "Magyar", platform),
        language!("nl", "Dutch", "Nederlands", platform),
        language!("no", "Norwegian", "Norsk", platform),
        language!("pl", "Polish", "Polski", platform),
        language!("pt", "Portuguese", "Português"),
        language!("pt-BR", "Portuguese (Brazil)", "Português do Brasil", platform),
        language!("ro", "Romanian", "Română", platform),
        language!("fi", "Finnish", "Suomi", platform),
        language!("sv", "Swedish", "Svenska"),
        language!("sv-SE", "Swedish (Sweden)", "Svenska", platform),
        language!("vi", "Vietnamese", "Tiếng Việt", platform),
        language!("tr", "Turkish", "Türkçe", platform),
        language!("cs", "Czech", "Čeština", platform),
        language!("el", "Greek", "Ελληνικά", platform),
        language!("bg", "Bulgarian", "български", platform),
        language!("ru", "Russian", "Pусский", platform),
        language!("uk", "Ukrainian", "Українська", platform),
        language!("hi", "Hindi", "हिन्दी", platform),
        language!("th", "Thai", "ไทย", platform),
        language!("zh", "Chinese", "中文"),
        language!("zh-CN", "Chinese (Simplified)", "中文", platform),
        language!("ja", "Japanese", "日本語", platform),
        language!("zh-TW", "Chinese (Traditional)", "繁體中文", platform),
        language!("ko", "Korean", "한국어", platform),
        language!("ar", "Arabic", "العربية"),
        language!("he", "Hebrew", "עברית"),
        language!("fa", "Persian", "فارسی"),
        language!("ms", "Malay", "Bahasa Melayu"),
        language!("ca", "Catalan", "Català"),
        language!("sk", "Slovak", "Slovenčina"),
    ]
}
