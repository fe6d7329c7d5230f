//! Identifier rules imposed by the chat platform on command surfaces.

/// Maximum length of a command, parameter or context-menu name
pub const COMMAND_NAME_LIMIT: usize = 32;

/// Maximum length of a command, parameter or choice description
pub const COMMAND_DESCRIPTION_LIMIT: usize = 100;

/// Turn authored or translated display text into a command identifier.
///
/// Keeps alphanumeric characters only, lower-cases them and joins the
/// remaining words with `_`.
///
/// # Example
/// ```
/// use sorusora_l10n::i18n::slugify;
///
/// assert_eq!(slugify("Set Language!"), "set_language");
/// assert_eq!(slugify("  Über  Straße "), "über_straße");
/// ```
pub fn slugify(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            word.chars()
                .flat_map(char::to_lowercase)
                .filter(|c| c.is_alphanumeric())
                .collect::<String>()
        })
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

/// Cut `text` to at most `limit` characters (not bytes).
pub fn truncate(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}

/// A slugified name within the platform's name limit.
pub fn command_name(text: &str) -> String {
    truncate(&slugify(text), COMMAND_NAME_LIMIT)
}

/// A description within the platform's description limit.
pub fn command_description(text: &str) -> String {
    truncate(text, COMMAND_DESCRIPTION_LIMIT)
}
