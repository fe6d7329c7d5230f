//! Language type: a parsed locale tag whose identity is its language subtag.
//!
//! Platform locales such as `en-US` and `en-GB` both denote English; two
//! `Language`s compare (and hash) equal whenever their language subtags match.
//! The raw tag is kept as supplied because it is what gets persisted as a key.

use crate::error::{L10nError, Result};
use crate::i18n::LanguageRegistry;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use unic_langid::{langid, LanguageIdentifier};

/// A validated language.
#[derive(Debug, Clone)]
pub struct Language {
    /// Locale tag as supplied (e.g., "en", "zh-CN", "es-419")
    code: String,

    /// Parsed BCP-47 identifier
    id: LanguageIdentifier,
}

impl Language {
    /// Parse a locale tag.
    ///
    /// # Returns
    /// * `Ok(Language)` if the tag is a well-formed locale with a language subtag
    /// * `Err(L10nError::InvalidLocale)` otherwise
    ///
    /// # Example
    /// ```
    /// use sorusora_l10n::i18n::Language;
    ///
    /// let language = Language::new("pt-BR").unwrap();
    /// assert_eq!(language.trim_territory().code(), "pt");
    /// ```
    pub fn new(code: impl AsRef<str>) -> Result<Language> {
        let code = code.as_ref().trim();
        let id: LanguageIdentifier = code
            .parse()
            .map_err(|_| L10nError::InvalidLocale(code.to_string()))?;

        // "und" parses but names no language
        if code.is_empty() || id.language.is_empty() {
            return Err(L10nError::InvalidLocale(code.to_string()));
        }

        Ok(Language {
            code: code.to_string(),
            id,
        })
    }

    /// The language every message is authored in and translated from.
    pub fn default_language() -> Language {
        Language {
            code: "en".to_string(),
            id: langid!("en"),
        }
    }

    /// Locale tag as supplied.
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Parsed identifier, as consumed by Fluent bundles.
    pub fn identifier(&self) -> &LanguageIdentifier {
        &self.id
    }

    /// The bare language subtag (e.g., "zh" for "zh-TW").
    pub fn subtag(&self) -> &str {
        self.id.language.as_str()
    }

    /// English name of the language, or the code when the registry does not know it.
    pub fn name(&self) -> &str {
        match LanguageRegistry::get().english_name(self) {
            Some(name) => name,
            None => &self.code,
        }
    }

    /// Whether the tag carries anything beyond the language subtag.
    pub fn has_territory(&self) -> bool {
        self.code.contains(|c| c == '-' || c == '_')
    }

    /// A new Language holding only the language subtag, used as a fallback key.
    pub fn trim_territory(&self) -> Language {
        let id = LanguageIdentifier::from_parts(self.id.language, None, None, &[]);
        Language {
            code: id.to_string(),
            id,
        }
    }

    /// Whether this is the default language.
    pub fn is_default(&self) -> bool {
        *self == Language::default_language()
    }
}

impl PartialEq for Language {
    fn eq(&self, other: &Self) -> bool {
        self.id.language == other.id.language
    }
}

impl Eq for Language {}

impl Hash for Language {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.language.hash(state);
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.code)
    }
}

impl FromStr for Language {
    type Err = L10nError;

    fn from_str(s: &str) -> Result<Self> {
        Language::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;
    use std::collections::HashSet;

    fn hash_of(language: &Language) -> u64 {
        let mut hasher = DefaultHasher::new();
        language.hash(&mut hasher);
        hasher.finish()
    }

    // ==================== Parsing Tests ====================

    #[test]
    fn test_new_keeps_raw_code() {
        let language = Language::new("zh-CN").expect("Should parse");
        assert_eq!(language.code(), "zh-CN");
        assert_eq!(language.subtag(), "zh");
    }

    #[test]
    fn test_new_accepts_numeric_region() {
        let language = Language::new("es-419").expect("Should parse");
        assert!(language.has_territory());
        assert_eq!(language.trim_territory().code(), "es");
    }

    #[test]
    fn test_new_invalid() {
        for code in ["", "   ", "not a locale", "x", "und", "en--US"] {
            let result = Language::new(code);
            assert!(
                matches!(result, Err(L10nError::InvalidLocale(_))),
                "'{}' should be rejected",
                code
            );
        }
    }

    #[test]
    fn test_from_str() {
        let language: Language = "ko".parse().expect("Should parse");
        assert_eq!(language.code(), "ko");
    }

    // ==================== Equality Tests ====================

    #[test]
    fn test_territory_insensitive_equality() {
        let us = Language::new("en-US").unwrap();
        let gb = Language::new("en-GB").unwrap();
        let fr = Language::new("fr").unwrap();

        assert_eq!(us, gb);
        assert_eq!(hash_of(&us), hash_of(&gb));
        assert_ne!(us, fr);
    }

    #[test]
    fn test_set_membership_ignores_territory() {
        let set: HashSet<Language> = [Language::new("pt").unwrap()].into_iter().collect();
        assert!(set.contains(&Language::new("pt-BR").unwrap()));
        assert!(!set.contains(&Language::new("es").unwrap()));
    }

    // ==================== Territory Tests ====================

    #[test]
    fn test_has_territory() {
        assert!(Language::new("en-US").unwrap().has_territory());
        assert!(!Language::new("en").unwrap().has_territory());
    }

    #[test]
    fn test_trim_territory() {
        let trimmed = Language::new("sv-SE").unwrap().trim_territory();
        assert_eq!(trimmed.code(), "sv");
        assert!(!trimmed.has_territory());
    }

    #[test]
    fn test_trim_territory_without_territory_is_same_code() {
        let language = Language::new("ja").unwrap();
        assert_eq!(language.trim_territory().code(), "ja");
    }

    // ==================== Name Tests ====================

    #[test]
    fn test_name_known() {
        assert_eq!(Language::new("de").unwrap().name(), "German");
        assert_eq!(
            Language::new("zh-TW").unwrap().name(),
            "Chinese (Traditional)"
        );
    }

    #[test]
    fn test_name_falls_back_to_language_subtag() {
        assert_eq!(Language::new("de-AT").unwrap().name(), "German");
    }

    #[test]
    fn test_name_unknown_is_code() {
        assert_eq!(Language::new("tlh").unwrap().name(), "tlh");
    }

    // ==================== Default Language Tests ====================

    #[test]
    fn test_default_language() {
        let default = Language::default_language();
        assert_eq!(default.code(), "en");
        assert!(default.is_default());
        assert!(Language::new("en-US").unwrap().is_default());
        assert!(!Language::new("fr").unwrap().is_default());
    }

    #[test]
    fn test_display_is_code() {
        assert_eq!(Language::new("pt-BR").unwrap().to_string(), "pt-BR");
    }
}
