//! Offline rendering for the `render` command

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::services::recipients::parse_recipients_csv;
use crate::services::renderer;
use crate::services::template_store::{InMemoryTemplateStore, TemplateStore};
use crate::types::{Block, FallbackPolicy, NewTemplate, RecipientRow};

/// Either a bare block list or an exported template object.
#[derive(Deserialize)]
#[serde(untagged)]
enum TemplateFile {
    Blocks(Vec<Block>),
    Template {
        #[serde(default)]
        name: Option<String>,
        blocks: Vec<Block>,
    },
}

/// Render `template_json` once per CSV row (or once with an empty row).
pub async fn render_documents(
    template_json: &str,
    rows_csv: Option<&str>,
    policy: FallbackPolicy,
) -> Result<Vec<String>> {
    let file: TemplateFile = serde_json::from_str(template_json).context("Invalid template JSON")?;
    let (name, blocks) = match file {
        TemplateFile::Blocks(blocks) => (None, blocks),
        TemplateFile::Template { name, blocks } => (name, blocks),
    };

    let store = InMemoryTemplateStore::new();
    let id = store
        .save_template(NewTemplate::new(Uuid::nil(), name, blocks, Utc::now()))
        .await?;
    let template = store
        .get_template(id)
        .await?
        .context("Template vanished from in-memory store")?
        .into_template()?;

    let rows = match rows_csv {
        Some(csv) => parse_recipients_csv(csv)?,
        None => vec![RecipientRow::new()],
    };

    Ok(rows
        .iter()
        .map(|row| renderer::render_template(&template, row, policy))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLOCKS: &str = r#"[
        {"id": "1", "type": "heading", "content": "Hi {{name}}"},
        {"id": "2", "type": "text", "content": "{{note}}", "styles": {"color": ""}}
    ]"#;

    #[tokio::test]
    async fn renders_one_document_per_row() {
        let docs = render_documents(BLOCKS, Some("email,name\na@x.com,A\nb@x.com,B\n"), FallbackPolicy::Send)
            .await
            .unwrap();
        assert_eq!(docs.len(), 2);
        assert!(docs[0].contains("Hi A</h2>"));
        assert!(docs[1].contains("Hi B</h2>"));
        assert!(docs[0].contains("color: inherit"));
    }

    #[tokio::test]
    async fn preview_without_rows_shows_tokens() {
        let docs = render_documents(BLOCKS, None, FallbackPolicy::Preview).await.unwrap();
        assert_eq!(docs.len(), 1);
        assert!(docs[0].contains("Hi {{name}}"));
        assert!(docs[0].contains("{{note}}"));
    }

    #[tokio::test]
    async fn accepts_template_object() {
        let json = format!(r#"{{"name": "Welcome", "blocks": {}}}"#, BLOCKS);
        let docs = render_documents(&json, None, FallbackPolicy::Send).await.unwrap();
        assert!(docs[0].starts_with("<h2 "));
    }

    #[tokio::test]
    async fn rejects_malformed_json() {
        assert!(render_documents(r#"{"blocks": 3}"#, None, FallbackPolicy::Send).await.is_err());
    }
}
