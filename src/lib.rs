//! Translation and localization engine of the SoruSora chat bot.
//!
//! - [`translator`]: cloud and local translation backends behind one trait
//! - [`cache`]: disk-persisted memo of every translated string
//! - [`localization`]: Fluent resources with locale fallback and on-demand translation
//! - [`command_translator`]: startup warm-up of the cache for the command surface

pub mod cache;
pub mod command;
pub mod command_translator;
pub mod config;
pub mod docs;
pub mod error;
pub mod i18n;
pub mod localization;
pub mod retry;
pub mod translator;
