//! Outbound message content relayed into guild channels

use serde::{Deserialize, Serialize};

/// Embed field
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub inline: bool,
}

/// Embed author
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbedAuthor {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
}

/// Embed footer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbedFooter {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
}

/// Message embed
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Embed {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default)]
    pub fields: Vec<EmbedField>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<EmbedAuthor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub footer: Option<EmbedFooter>,
    /// ISO 8601 timestamp string
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

/// A message to post into a guild channel
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct OutboundMessage {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub tts: bool,
    #[serde(default)]
    pub embeds: Vec<Embed>,
}

impl OutboundMessage {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }

    pub fn with_embed(mut self, embed: Embed) -> Self {
        self.embeds.push(embed);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.content.trim().is_empty() && self.embeds.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_message_deserializes() {
        let msg: OutboundMessage = serde_json::from_str(r#"{"content":"hello"}"#).unwrap();
        assert_eq!(msg.content, "hello");
        assert!(!msg.tts);
        assert!(msg.embeds.is_empty());
    }

    #[test]
    fn test_embed_optional_fields_omitted() {
        let embed = Embed {
            title: Some("Title".to_string()),
            fields: vec![EmbedField {
                name: "Field".to_string(),
                value: "Value".to_string(),
                inline: false,
            }],
            color: Some(0xFF0000),
            ..Default::default()
        };
        let json = serde_json::to_string(&embed).unwrap();
        assert!(json.contains("\"title\":\"Title\""));
        assert!(!json.contains("description"));
        assert!(!json.contains("footer"));
    }

    #[test]
    fn test_is_empty() {
        assert!(OutboundMessage::text("   ").is_empty());
        assert!(!OutboundMessage::text("hi").is_empty());
        assert!(!OutboundMessage::default().with_embed(Embed::default()).is_empty());
    }
}
