//! The application's command surface, as seen by the localization engine.
//!
//! Every literal string a user can see on a command (names, descriptions,
//! parameter names, choice labels, context-menu names) is a cache key; the
//! message ids used to localize them are derived from the command names.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// A slash command or subcommand.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppCommand {
    pub name: String,
    pub description: String,

    /// Name of the top-level command when this is a subcommand
    #[serde(default)]
    pub root_name: Option<String>,

    /// Groups only carry a name and a description
    #[serde(default)]
    pub is_group: bool,

    #[serde(default)]
    pub parameters: Vec<Parameter>,

    /// Interpolation arguments for the command's messages (e.g., the bot's display name)
    #[serde(default)]
    pub extras: HashMap<String, String>,
}

impl AppCommand {
    /// Resource holding this command's messages: `commands/<root command>.ftl`.
    pub fn resource_id(&self) -> String {
        let root = self.root_name.as_deref().unwrap_or(&self.name);
        format!("commands/{}.ftl", root)
    }

    /// Message id prefix, e.g. `set-language` for `set_language`.
    pub fn message_prefix(&self) -> String {
        self.name.replace('_', "-")
    }

    pub fn name_id(&self) -> String {
        format!("{}-name", self.message_prefix())
    }

    pub fn description_id(&self) -> String {
        format!("{}-description", self.message_prefix())
    }

    pub fn parameter_name_id(&self, parameter: &Parameter) -> String {
        format!("{}-{}-name", self.message_prefix(), parameter.message_prefix())
    }

    pub fn parameter_description_id(&self, parameter: &Parameter) -> String {
        format!("{}-{}-description", self.message_prefix(), parameter.message_prefix())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub description: String,

    #[serde(default)]
    pub choices: Vec<Choice>,
}

impl Parameter {
    pub fn message_prefix(&self) -> String {
        self.name.replace('_', "-")
    }
}

/// A fixed choice of a parameter: the label users see and the value sent back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Choice {
    pub name: String,
    pub value: String,
}

impl Choice {
    /// Numeric labels are shown as their value and never translated.
    pub fn is_numeric(&self) -> bool {
        !self.name.is_empty() && self.name.chars().all(char::is_numeric)
    }
}

/// A message or user context-menu entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextMenu {
    pub name: String,

    #[serde(default)]
    pub extras: HashMap<String, String>,
}

impl ContextMenu {
    /// `context_menus/<lower_snake name>.ftl`
    pub fn resource_id(&self) -> String {
        format!("context_menus/{}.ftl", self.name.to_lowercase().replace(' ', "_"))
    }

    /// `<lower-kebab name>-name`
    pub fn name_id(&self) -> String {
        format!("{}-name", self.name.to_lowercase().replace(' ', "-"))
    }
}

/// Where a surface string is shown, which decides how its translation is shaped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextKind {
    /// Command or parameter name: slugified, at most 32 characters
    Name,
    /// Command or parameter description: at most 100 characters
    Description,
    /// Choice label: at most 100 characters
    Label,
    /// Context-menu name: kept as display text, at most 32 characters
    ContextMenuName,
    /// Long-form document: kept whole
    Document,
}

/// One distinct user-visible string of the command surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurfaceText {
    pub text: String,
    pub kind: TextKind,
}

/// Every distinct user-visible string of the given commands and context menus.
///
/// Groups contribute their name and description only. Numeric choice labels
/// are left out. A string used in several places is listed once, with the
/// kind of its first use.
pub fn surface_texts(commands: &[AppCommand], context_menus: &[ContextMenu]) -> Vec<SurfaceText> {
    let mut seen = HashSet::new();
    let mut texts = Vec::new();
    let mut push = |text: &str, kind: TextKind| {
        if !text.trim().is_empty() && seen.insert(text.to_string()) {
            texts.push(SurfaceText {
                text: text.to_string(),
                kind,
            });
        }
    };

    for command in commands {
        push(&command.name, TextKind::Name);
        push(&command.description, TextKind::Description);
        if command.is_group {
            continue;
        }

        for parameter in &command.parameters {
            push(&parameter.name, TextKind::Name);
            push(&parameter.description, TextKind::Description);
            for choice in parameter.choices.iter().filter(|c| !c.is_numeric()) {
                push(&choice.name, TextKind::Label);
            }
        }
    }

    for context_menu in context_menus {
        push(&context_menu.name, TextKind::ContextMenuName);
    }

    texts
}

/// Source of the command surface.
pub trait CommandRegistry: Send + Sync {
    fn commands(&self) -> Vec<AppCommand>;

    fn context_menus(&self) -> Vec<ContextMenu>;

    /// Ids of long-form documents (e.g., "about", "help/ping").
    fn documents(&self) -> Vec<String>;
}

/// A command surface described by a JSON manifest.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StaticRegistry {
    #[serde(default)]
    pub commands: Vec<AppCommand>,

    #[serde(default)]
    pub context_menus: Vec<ContextMenu>,

    #[serde(default)]
    pub documents: Vec<String>,
}

impl StaticRegistry {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let json = tokio::fs::read_to_string(path).await?;
        Self::from_json(&json)
    }
}

impl CommandRegistry for StaticRegistry {
    fn commands(&self) -> Vec<AppCommand> {
        self.commands.clone()
    }

    fn context_menus(&self) -> Vec<ContextMenu> {
        self.context_menus.clone()
    }

    fn documents(&self) -> Vec<String> {
        self.documents.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"{
        "commands": [
            {
                "name": "ping",
                "description": "Check the latency"
            },
            {
                "name": "channel",
                "description": "Channel settings",
                "is_group": true
            },
            {
                "name": "set_language",
                "description": "Set the channel language",
                "root_name": "channel",
                "parameters": [
                    {
                        "name": "language",
                        "description": "The language to use",
                        "choices": [
                            { "name": "English", "value": "english" },
                            { "name": "10", "value": "10" }
                        ]
                    }
                ],
                "extras": { "bot": "SoruSora" }
            }
        ],
        "context_menus": [{ "name": "Translate Message" }],
        "documents": ["about", "help/ping"]
    }"#;

    fn registry() -> StaticRegistry {
        StaticRegistry::from_json(MANIFEST).expect("Manifest should parse")
    }

    // ==================== Manifest Tests ====================

    #[test]
    fn test_manifest_parses_with_defaults() {
        let registry = registry();

        assert_eq!(registry.commands().len(), 3);
        assert!(registry.commands()[0].parameters.is_empty());
        assert!(registry.commands()[1].is_group);
        assert_eq!(registry.commands()[2].extras["bot"], "SoruSora");
        assert_eq!(registry.documents(), vec!["about", "help/ping"]);
    }

    #[test]
    fn test_empty_manifest() {
        let registry = StaticRegistry::from_json("{}").unwrap();
        assert!(registry.commands().is_empty());
        assert!(registry.context_menus().is_empty());
    }

    #[test]
    fn test_invalid_manifest() {
        assert!(StaticRegistry::from_json("[]").is_err());
    }

    // ==================== Message Id Tests ====================

    #[test]
    fn test_command_message_ids() {
        let commands = registry().commands();
        let command = &commands[2];
        let parameter = &command.parameters[0];

        assert_eq!(command.resource_id(), "commands/channel.ftl");
        assert_eq!(command.name_id(), "set-language-name");
        assert_eq!(command.description_id(), "set-language-description");
        assert_eq!(command.parameter_name_id(parameter), "set-language-language-name");
        assert_eq!(
            command.parameter_description_id(parameter),
            "set-language-language-description"
        );
    }

    #[test]
    fn test_top_level_command_resource() {
        let registry = registry();
        assert_eq!(registry.commands()[0].resource_id(), "commands/ping.ftl");
    }

    #[test]
    fn test_context_menu_ids() {
        let menu = ContextMenu {
            name: "Translate Message".to_string(),
            extras: HashMap::new(),
        };

        assert_eq!(menu.resource_id(), "context_menus/translate_message.ftl");
        assert_eq!(menu.name_id(), "translate-message-name");
    }

    #[test]
    fn test_choice_is_numeric() {
        let numeric = Choice {
            name: "10".to_string(),
            value: "10".to_string(),
        };
        let label = Choice {
            name: "English".to_string(),
            value: "english".to_string(),
        };

        assert!(numeric.is_numeric());
        assert!(!label.is_numeric());
    }

    // ==================== Surface Tests ====================

    #[test]
    fn test_surface_texts_walks_everything_once() {
        let registry = registry();
        let texts = surface_texts(&registry.commands(), &registry.context_menus());

        let names: Vec<&str> = texts.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "ping",
                "Check the latency",
                "channel",
                "Channel settings",
                "set_language",
                "Set the channel language",
                "language",
                "The language to use",
                "English",
                "Translate Message",
            ]
        );
        assert_eq!(texts[4].kind, TextKind::Name);
        assert_eq!(texts[8].kind, TextKind::Label);
        assert_eq!(texts[9].kind, TextKind::ContextMenuName);
    }

    #[test]
    fn test_surface_texts_skips_group_parameters() {
        let group = AppCommand {
            name: "chat".to_string(),
            description: "Chat".to_string(),
            root_name: None,
            is_group: true,
            parameters: vec![Parameter {
                name: "hidden".to_string(),
                description: "Never shown".to_string(),
                choices: Vec::new(),
            }],
            extras: HashMap::new(),
        };

        let texts = surface_texts(&[group], &[]);
        assert_eq!(texts.len(), 2);
    }
}
