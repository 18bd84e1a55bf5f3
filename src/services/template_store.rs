//! Template storage abstraction.
//!
//! `TemplateStore` is read by the mailing service and written by the
//! template handlers. `PgTemplateStore` is the production store,
//! `InMemoryTemplateStore` backs tests and the offline `render` command.

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::queries;
use crate::types::{NewTemplate, StoredTemplate};

#[async_trait]
pub trait TemplateStore: Send + Sync {
    /// `Ok(None)` when no template has this id.
    async fn get_template(&self, id: Uuid) -> Result<Option<StoredTemplate>>;

    async fn save_template(&self, template: NewTemplate) -> Result<Uuid>;

    async fn list_templates(&self, owner_id: Uuid) -> Result<Vec<StoredTemplate>>;
}

// =============================================================================
// PostgreSQL
// =============================================================================

#[derive(Clone)]
pub struct PgTemplateStore {
    pool: PgPool,
}

impl PgTemplateStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TemplateStore for PgTemplateStore {
    async fn get_template(&self, id: Uuid) -> Result<Option<StoredTemplate>> {
        queries::template::get_template(&self.pool, id).await
    }

    async fn save_template(&self, template: NewTemplate) -> Result<Uuid> {
        queries::template::create_template(&self.pool, &template).await
    }

    async fn list_templates(&self, owner_id: Uuid) -> Result<Vec<StoredTemplate>> {
        queries::template::list_templates(&self.pool, owner_id).await
    }
}

// =============================================================================
// In-memory
// =============================================================================

#[derive(Default)]
pub struct InMemoryTemplateStore {
    templates: Mutex<HashMap<Uuid, StoredTemplate>>,
}

impl InMemoryTemplateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a row as-is, bypassing `save_template`. Lets tests plant
    /// templates with arbitrary (even malformed) block JSON.
    pub fn insert_raw(&self, template: StoredTemplate) {
        self.templates.lock().insert(template.id, template);
    }

    pub fn len(&self) -> usize {
        self.templates.lock().len()
    }
}

#[async_trait]
impl TemplateStore for InMemoryTemplateStore {
    async fn get_template(&self, id: Uuid) -> Result<Option<StoredTemplate>> {
        Ok(self.templates.lock().get(&id).cloned())
    }

    async fn save_template(&self, template: NewTemplate) -> Result<Uuid> {
        let id = Uuid::new_v4();
        let now = Utc::now();
        let stored = StoredTemplate {
            id,
            owner_id: template.owner_id,
            name: template.name,
            blocks: serde_json::to_value(&template.blocks)?,
            placeholders: template.placeholders,
            created_at: now,
            updated_at: now,
        };
        self.templates.lock().insert(id, stored);
        Ok(id)
    }

    async fn list_templates(&self, owner_id: Uuid) -> Result<Vec<StoredTemplate>> {
        let mut templates: Vec<StoredTemplate> = self
            .templates
            .lock()
            .values()
            .filter(|t| t.owner_id == owner_id)
            .cloned()
            .collect();
        templates.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(templates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Block, BlockType};

    fn new_template(owner_id: Uuid, name: &str) -> NewTemplate {
        NewTemplate::new(
            owner_id,
            Some(name.to_string()),
            vec![Block::new(BlockType::Text, "Hi {{name}}")],
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn test_save_then_get_round_trips_blocks() {
        let store = InMemoryTemplateStore::new();
        let owner = Uuid::new_v4();
        let new = new_template(owner, "Welcome");
        let blocks = new.blocks.clone();

        let id = store.save_template(new).await.unwrap();
        let stored = store.get_template(id).await.unwrap().unwrap();
        assert_eq!(stored.name, "Welcome");
        assert_eq!(stored.placeholders, vec!["name"]);

        let template = stored.into_template().unwrap();
        assert_eq!(template.blocks, blocks);
    }

    #[tokio::test]
    async fn test_get_unknown_is_none() {
        let store = InMemoryTemplateStore::new();
        assert!(store.get_template(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_filters_by_owner() {
        let store = InMemoryTemplateStore::new();
        let owner = Uuid::new_v4();
        store.save_template(new_template(owner, "One")).await.unwrap();
        store.save_template(new_template(owner, "Two")).await.unwrap();
        store.save_template(new_template(Uuid::new_v4(), "Other")).await.unwrap();

        let listed = store.list_templates(owner).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed.iter().all(|t| t.owner_id == owner));
        assert_eq!(store.len(), 3);
    }
}
