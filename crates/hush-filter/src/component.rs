//! # Text Components and Chat Decoration
//!
//! Chat payloads carry rich text as JSON components. Two shapes matter to
//! the engine:
//!
//! - `{"text": "..."}`: literal text
//! - `{"translate": "key", "with": [...]}`: a translation key applied to
//!   argument components
//!
//! Either may carry `extra` children and style keys, and a bare string is
//! also a component.
//!
//! A signed chat message does not carry its final display text. It carries
//! the raw body plus a [`ChatDecoration`] (the bound chat type) which the
//! client applies to produce, for example, `<Steve> hello`. When the engine
//! turns a signed message into an unsigned broadcast it must apply that
//! decoration itself, because broadcasts are displayed verbatim.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Formats for the decoration keys used by vanilla chat types.
const TRANSLATIONS: &[(&str, &str)] = &[
    ("chat.type.text", "<%s> %s"),
    ("chat.type.emote", "* %s %s"),
    ("chat.type.announcement", "[%s] %s"),
    ("chat.type.admin", "[%s: %s]"),
    ("chat.type.team.text", "%s <%s> %s"),
    ("chat.type.team.sent", "-> %s <%s> %s"),
    ("commands.message.display.incoming", "%s whispers to you: %s"),
    ("commands.message.display.outgoing", "You whisper to %s: %s"),
];

/// A rich-text component.
///
/// Decoding is lossless: `extra` children are kept, and any key the engine
/// does not interpret (`color`, `bold`, `clickEvent`, ...) is carried in
/// `style` and written back unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Component {
    /// A bare JSON string.
    Plain(String),
    /// Literal text.
    Text(TextComponent),
    /// Translation key with arguments.
    Translatable(TranslatableComponent),
}

/// `{"text": ...}` with its siblings and style.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextComponent {
    /// The text.
    pub text: String,
    /// Child components rendered after `text`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra: Vec<Component>,
    /// Every other key, untouched.
    #[serde(flatten)]
    pub style: Map<String, Value>,
}

/// `{"translate": ..., "with": [...]}` with its siblings and style.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslatableComponent {
    /// Translation key.
    pub translate: String,
    /// Arguments substituted into the format, in order.
    #[serde(default, rename = "with", skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<Component>,
    /// Child components rendered after the formatted key.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra: Vec<Component>,
    /// Every other key, untouched.
    #[serde(flatten)]
    pub style: Map<String, Value>,
}

impl Component {
    /// A literal text component.
    pub fn literal(text: impl Into<String>) -> Self {
        Self::Text(TextComponent {
            text: text.into(),
            extra: Vec::new(),
            style: Map::new(),
        })
    }

    /// A translatable component.
    pub fn translatable(key: impl Into<String>, args: Vec<Component>) -> Self {
        Self::Translatable(TranslatableComponent {
            translate: key.into(),
            args,
            extra: Vec::new(),
            style: Map::new(),
        })
    }

    /// Renders the component to plain text, children included.
    ///
    /// Known decoration keys use their vanilla format. Unknown keys render
    /// as the key followed by the rendered arguments.
    #[must_use]
    pub fn to_plain(&self) -> String {
        match self {
            Self::Plain(text) => text.clone(),
            Self::Text(component) => {
                let mut out = component.text.clone();
                push_children(&mut out, &component.extra);
                out
            }
            Self::Translatable(component) => {
                let rendered: Vec<String> = component.args.iter().map(Self::to_plain).collect();
                let translate = component.translate.as_str();
                let mut out = match TRANSLATIONS.iter().find(|(key, _)| *key == translate) {
                    Some((_, format)) => substitute(format, &rendered),
                    None if rendered.is_empty() => translate.to_string(),
                    None => format!("{} {}", translate, rendered.join(" ")),
                };
                push_children(&mut out, &component.extra);
                out
            }
        }
    }
}

fn push_children(out: &mut String, children: &[Component]) {
    for child in children {
        out.push_str(&child.to_plain());
    }
}

/// Replaces each `%s` in order; missing arguments render as empty.
fn substitute(format: &str, args: &[String]) -> String {
    let mut out = String::with_capacity(format.len() + args.iter().map(String::len).sum::<usize>());
    let mut args = args.iter();
    let mut pieces = format.split("%s").peekable();
    while let Some(piece) = pieces.next() {
        out.push_str(piece);
        if pieces.peek().is_some() {
            if let Some(arg) = args.next() {
                out.push_str(arg);
            }
        }
    }
    out
}

/// One slot of a decoration's parameter list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecorationParameter {
    /// The sender's display name.
    Sender,
    /// The recipient's display name (direct messages, team chat).
    Target,
    /// The message content.
    Content,
}

/// The decoration a signed chat message declares for itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatDecoration {
    /// Translation key of the decoration format.
    pub translation_key: String,
    /// Arguments fed to the format, in order.
    #[serde(default = "default_parameters")]
    pub parameters: Vec<DecorationParameter>,
    /// Sender display name.
    pub sender: Component,
    /// Target display name, when the chat type has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<Component>,
}

fn default_parameters() -> Vec<DecorationParameter> {
    vec![DecorationParameter::Sender, DecorationParameter::Content]
}

impl ChatDecoration {
    /// Plain `chat.type.text` decoration: `<sender> content`.
    pub fn text(sender: impl Into<String>) -> Self {
        Self {
            translation_key: "chat.type.text".to_string(),
            parameters: default_parameters(),
            sender: Component::literal(sender),
            target: None,
        }
    }

    /// Applies the decoration to `content`.
    #[must_use]
    pub fn decorate(&self, content: Component) -> Component {
        let args = self
            .parameters
            .iter()
            .map(|parameter| match parameter {
                DecorationParameter::Sender => self.sender.clone(),
                DecorationParameter::Target => self
                    .target
                    .clone()
                    .unwrap_or_else(|| Component::literal("")),
                DecorationParameter::Content => content.clone(),
            })
            .collect();
        Component::translatable(self.translation_key.clone(), args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_text_decoration_renders_vanilla_format() {
        let decorated = ChatDecoration::text("Steve").decorate(Component::literal("hello"));
        assert_eq!(decorated.to_plain(), "<Steve> hello");
    }

    #[test]
    fn test_target_parameter() {
        let decoration = ChatDecoration {
            translation_key: "commands.message.display.incoming".to_string(),
            parameters: vec![DecorationParameter::Sender, DecorationParameter::Content],
            sender: Component::literal("Alex"),
            target: Some(Component::literal("Steve")),
        };
        assert_eq!(
            decoration.decorate(Component::literal("hi")).to_plain(),
            "Alex whispers to you: hi"
        );

        let team = ChatDecoration {
            translation_key: "chat.type.team.sent".to_string(),
            parameters: vec![
                DecorationParameter::Target,
                DecorationParameter::Sender,
                DecorationParameter::Content,
            ],
            sender: Component::literal("Alex"),
            target: None,
        };
        assert_eq!(
            team.decorate(Component::literal("go")).to_plain(),
            "->  <Alex> go"
        );
    }

    #[test]
    fn test_unknown_key_falls_back_to_key_and_args() {
        let component = Component::translatable("custom.format", vec![Component::literal("x")]);
        assert_eq!(component.to_plain(), "custom.format x");
        assert_eq!(Component::translatable("bare", vec![]).to_plain(), "bare");
    }

    #[test]
    fn test_component_json_shapes() {
        let literal: Component = serde_json::from_value(json!({ "text": "hi" })).unwrap();
        assert_eq!(literal, Component::literal("hi"));

        let translated: Component = serde_json::from_value(json!({
            "translate": "chat.type.text",
            "with": [{ "text": "Steve" }, { "text": "hi" }]
        }))
        .unwrap();
        assert_eq!(translated.to_plain(), "<Steve> hi");

        let encoded = serde_json::to_value(Component::translatable("k", vec![])).unwrap();
        assert_eq!(encoded, json!({ "translate": "k" }));
    }

    #[test]
    fn test_extra_children_and_style_survive() {
        let value = json!({
            "text": "",
            "color": "red",
            "extra": [{ "text": "hel", "bold": true }, "lo"]
        });
        let component: Component = serde_json::from_value(value.clone()).unwrap();
        assert_eq!(component.to_plain(), "hello");
        assert_eq!(serde_json::to_value(&component).unwrap(), value);
    }

    #[test]
    fn test_bare_string_arguments() {
        let component: Component = serde_json::from_value(json!({
            "translate": "chat.type.text",
            "with": ["Steve", { "text": "hi", "italic": true }]
        }))
        .unwrap();
        assert_eq!(component.to_plain(), "<Steve> hi");
    }

    #[test]
    fn test_decoration_defaults_parameters() {
        let decoration: ChatDecoration = serde_json::from_value(json!({
            "translation_key": "chat.type.emote",
            "sender": { "text": "Steve" }
        }))
        .unwrap();
        assert_eq!(
            decoration.decorate(Component::literal("waves")).to_plain(),
            "* Steve waves"
        );
    }
}
