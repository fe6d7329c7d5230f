//! Language and translation value types.
//!
//! # Architecture
//!
//! - `language`: `Language`, a locale tag compared by its language subtag
//! - `registry`: names of known languages and the locales the platform sends
//! - `translation`: `Translation`, the result record every backend produces
//! - `slug`: identifier rules for command names and descriptions
//! - `metrics`: cache and backend counters
//!
//! # Example
//!
//! ```rust
//! use sorusora_l10n::i18n::{Language, Translation};
//!
//! let french = Language::new("fr-CA").unwrap();
//! let translation = Translation::new(Language::default_language(), french, "Hello", "Bonjour");
//! assert_eq!(translation.target().trim_territory().code(), "fr");
//! ```

mod language;
mod metrics;
mod registry;
mod slug;
mod translation;

pub use language::Language;
pub use metrics::{Counter, MetricsReport, TranslationMetrics};
pub use registry::{LanguageConfig, LanguageRegistry};
pub use slug::{
    command_description, command_name, slugify, truncate, COMMAND_DESCRIPTION_LIMIT,
    COMMAND_NAME_LIMIT,
};
pub use translation::Translation;
