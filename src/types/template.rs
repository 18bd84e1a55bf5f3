//! Template, block and recipient types

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::RenderError;
use crate::services::renderer::extract_placeholders;

/// Reserved recipient row key holding the destination address.
pub const EMAIL_KEY: &str = "email";

/// Kind of content block; decides the wrapping HTML element.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BlockType {
    Text,
    Heading,
    Button,
    /// Any block type this worker does not know about. Rendered like `Text`.
    #[serde(other)]
    Unknown,
}

impl BlockType {
    pub fn html_tag(&self) -> &'static str {
        match self {
            Self::Heading => "h2",
            Self::Button => "button",
            Self::Text | Self::Unknown => "p",
        }
    }
}

/// The seven style attributes every block carries.
///
/// Missing keys in stored JSON are filled with the creation defaults, so a
/// deserialized block always has all seven populated. An explicitly empty
/// value is kept as-is and falls back to a CSS default at render time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct BlockStyles {
    pub text_align: String,
    pub font_size: String,
    pub color: String,
    pub background_color: String,
    pub font_weight: String,
    pub font_style: String,
    pub text_decoration: String,
}

impl Default for BlockStyles {
    fn default() -> Self {
        Self {
            text_align: "left".to_string(),
            font_size: "16px".to_string(),
            color: "#000000".to_string(),
            background_color: "transparent".to_string(),
            font_weight: "normal".to_string(),
            font_style: "normal".to_string(),
            text_decoration: "none".to_string(),
        }
    }
}

/// One styled content unit of a template
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub id: String,
    #[serde(rename = "type")]
    pub block_type: BlockType,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub styles: BlockStyles,
}

impl Block {
    /// New block with a fresh id and default styles.
    pub fn new(block_type: BlockType, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            block_type,
            content: content.into(),
            styles: BlockStyles::default(),
        }
    }
}

/// A template ready for rendering
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub id: Uuid,
    pub name: String,
    pub blocks: Vec<Block>,
    pub placeholders: Vec<String>,
}

/// Template as persisted by the template store.
///
/// `blocks` is kept as raw JSON until it is rendered; see [`StoredTemplate::into_template`].
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct StoredTemplate {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub blocks: serde_json::Value,
    pub placeholders: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StoredTemplate {
    /// Parse the stored block list. Anything that is not an ordered
    /// sequence of well-formed blocks is a `MalformedTemplate`.
    pub fn into_template(self) -> Result<Template, RenderError> {
        let blocks: Vec<Block> = serde_json::from_value(self.blocks).map_err(|e| {
            RenderError::MalformedTemplate {
                id: self.id,
                reason: e.to_string(),
            }
        })?;

        Ok(Template {
            id: self.id,
            name: self.name,
            blocks,
            placeholders: self.placeholders,
        })
    }
}

/// Input for `TemplateStore::save_template`
#[derive(Debug, Clone, PartialEq)]
pub struct NewTemplate {
    pub owner_id: Uuid,
    pub name: String,
    pub blocks: Vec<Block>,
    pub placeholders: Vec<String>,
}

impl NewTemplate {
    /// Snapshot `blocks` for saving. Placeholders are derived here, once;
    /// a blank or missing name becomes a timestamp-derived one.
    pub fn new(owner_id: Uuid, name: Option<String>, blocks: Vec<Block>, now: DateTime<Utc>) -> Self {
        let name = match name {
            Some(n) if !n.trim().is_empty() => n.trim().to_string(),
            _ => default_template_name(now),
        };
        let placeholders = extract_placeholders(&blocks);

        Self {
            owner_id,
            name,
            blocks,
            placeholders,
        }
    }
}

pub fn default_template_name(now: DateTime<Utc>) -> String {
    format!("Template {}", now.format("%Y-%m-%d %H:%M:%S"))
}

/// Missing-placeholder behaviour
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum FallbackPolicy {
    /// Leave `{{key}}` visible so unfilled fields show up in the editor.
    #[default]
    Preview,
    /// Remove the token; outgoing mail never shows raw braces.
    Send,
}

/// One recipient's placeholder values, plus the reserved `email` key
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct RecipientRow(HashMap<String, String>);

impl RecipientRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Destination address, if the row has a non-blank one.
    pub fn email(&self) -> Option<&str> {
        self.get(EMAIL_KEY).map(str::trim).filter(|e| !e.is_empty())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RecipientRow {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_block_type_tags() {
        assert_eq!(BlockType::Heading.html_tag(), "h2");
        assert_eq!(BlockType::Button.html_tag(), "button");
        assert_eq!(BlockType::Text.html_tag(), "p");
        assert_eq!(BlockType::Unknown.html_tag(), "p");
    }

    #[test]
    fn test_unknown_block_type_deserializes() {
        let block: Block = serde_json::from_value(serde_json::json!({
            "id": "b1",
            "type": "divider",
            "content": "---"
        }))
        .unwrap();
        assert_eq!(block.block_type, BlockType::Unknown);
        assert_eq!(block.styles, BlockStyles::default());
    }

    #[test]
    fn test_partial_styles_filled_with_defaults() {
        let block: Block = serde_json::from_value(serde_json::json!({
            "id": "b1",
            "type": "heading",
            "content": "Hi",
            "styles": { "color": "#ff0000", "fontWeight": "bold" }
        }))
        .unwrap();
        assert_eq!(block.styles.color, "#ff0000");
        assert_eq!(block.styles.font_weight, "bold");
        assert_eq!(block.styles.text_align, "left");
        assert_eq!(block.styles.text_decoration, "none");
    }

    #[test]
    fn test_styles_serialize_camel_case() {
        let json = serde_json::to_value(BlockStyles::default()).unwrap();
        assert_eq!(json["backgroundColor"], "transparent");
        assert_eq!(json["textAlign"], "left");
    }

    #[test]
    fn test_stored_template_with_bad_blocks_is_malformed() {
        let stored = StoredTemplate {
            id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            name: "Broken".to_string(),
            blocks: serde_json::json!({ "not": "a list" }),
            placeholders: vec![],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let err = stored.into_template().unwrap_err();
        assert!(matches!(err, RenderError::MalformedTemplate { .. }));
    }

    #[test]
    fn test_new_template_defaults_name_and_extracts_placeholders() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap();
        let blocks = vec![
            Block::new(BlockType::Text, "Hi {{name}}"),
            Block::new(BlockType::Text, "From {{ company }}"),
        ];
        let new = NewTemplate::new(Uuid::nil(), Some("   ".to_string()), blocks, now);
        assert_eq!(new.name, "Template 2024-03-01 09:30:00");
        assert_eq!(new.placeholders, vec!["name", "company"]);
    }

    #[test]
    fn test_recipient_row_email_ignores_blank() {
        let row: RecipientRow = [("email", "  ")].into_iter().collect();
        assert_eq!(row.email(), None);

        let row: RecipientRow = [("email", " a@x.com ")].into_iter().collect();
        assert_eq!(row.email(), Some("a@x.com"));
    }
}
