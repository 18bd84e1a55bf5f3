//! Template database queries

use anyhow::Result;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::types::{NewTemplate, StoredTemplate};

/// Insert a template snapshot, returning its new id
pub async fn create_template(pool: &PgPool, template: &NewTemplate) -> Result<Uuid> {
    let id: Uuid = sqlx::query_scalar(
        r#"
        INSERT INTO templates (id, owner_id, name, blocks, placeholders, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, NOW(), NOW())
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(template.owner_id)
    .bind(&template.name)
    .bind(Json(&template.blocks))
    .bind(&template.placeholders)
    .fetch_one(pool)
    .await?;

    Ok(id)
}

/// Get a template by ID
pub async fn get_template(pool: &PgPool, id: Uuid) -> Result<Option<StoredTemplate>> {
    let template = sqlx::query_as::<_, StoredTemplate>(
        r#"
        SELECT id, owner_id, name, blocks, placeholders, created_at, updated_at
        FROM templates
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(template)
}

/// List an owner's templates, newest first
pub async fn list_templates(pool: &PgPool, owner_id: Uuid) -> Result<Vec<StoredTemplate>> {
    let templates = sqlx::query_as::<_, StoredTemplate>(
        r#"
        SELECT id, owner_id, name, blocks, placeholders, created_at, updated_at
        FROM templates
        WHERE owner_id = $1
        ORDER BY created_at DESC
        "#,
    )
    .bind(owner_id)
    .fetch_all(pool)
    .await?;

    Ok(templates)
}
