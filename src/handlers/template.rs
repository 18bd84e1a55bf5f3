//! Template message handlers

use std::sync::Arc;

use anyhow::Result;
use async_nats::{Client, Subscriber};
use chrono::Utc;
use tracing::{error, info};

use super::{require_user, serve};
use crate::error::RenderError;
use crate::services::mailing::MailingService;
use crate::services::template_store::TemplateStore;
use crate::types::{
    EmptyPayload, ErrorResponse, GetTemplateRequest, ListTemplatesResponse, NewTemplate,
    PreviewRequest, PreviewResponse, Request, SaveTemplateRequest, SaveTemplateResponse,
    StoredTemplate,
};

fn render_error(request_id: uuid::Uuid, e: RenderError) -> ErrorResponse {
    if let RenderError::Store(ref inner) = e {
        error!("Template store error: {}", inner);
    }
    ErrorResponse::new(request_id, e.code(), e.to_string())
}

/// Save a snapshot of the editor's blocks as a new template
pub async fn save(
    mailing: &MailingService,
    request: Request<SaveTemplateRequest>,
) -> std::result::Result<SaveTemplateResponse, ErrorResponse> {
    let owner_id = require_user(&request)?;
    let new = NewTemplate::new(owner_id, request.payload.name, request.payload.blocks, Utc::now());
    let name = new.name.clone();
    let placeholders = new.placeholders.clone();

    match mailing.store().save_template(new).await {
        Ok(id) => {
            info!(%id, %owner_id, placeholders = placeholders.len(), "Template saved");
            Ok(SaveTemplateResponse {
                id,
                name,
                placeholders,
            })
        }
        Err(e) => {
            error!("Failed to save template: {}", e);
            Err(ErrorResponse::new(request.id, "DATABASE_ERROR", e.to_string()))
        }
    }
}

pub async fn get(
    mailing: &MailingService,
    request: Request<GetTemplateRequest>,
) -> std::result::Result<StoredTemplate, ErrorResponse> {
    require_user(&request)?;
    let id = request.payload.id;

    match mailing.store().get_template(id).await {
        Ok(Some(template)) => Ok(template),
        Ok(None) => Err(render_error(request.id, RenderError::TemplateNotFound(id))),
        Err(e) => Err(render_error(request.id, RenderError::Store(e))),
    }
}

pub async fn list(
    mailing: &MailingService,
    request: Request<EmptyPayload>,
) -> std::result::Result<ListTemplatesResponse, ErrorResponse> {
    let owner_id = require_user(&request)?;

    match mailing.store().list_templates(owner_id).await {
        Ok(templates) => Ok(ListTemplatesResponse {
            total: templates.len(),
            templates,
        }),
        Err(e) => Err(render_error(request.id, RenderError::Store(e))),
    }
}

pub async fn preview(
    mailing: &MailingService,
    request: Request<PreviewRequest>,
) -> std::result::Result<PreviewResponse, ErrorResponse> {
    require_user(&request)?;
    let payload = request.payload;

    mailing
        .preview(payload.template_id, &payload.row, payload.policy)
        .await
        .map(|html| PreviewResponse { html })
        .map_err(|e| render_error(request.id, e))
}

/// Handle template.save messages
pub async fn handle_save(client: Client, subscriber: Subscriber, mailing: Arc<MailingService>) -> Result<()> {
    serve(client, subscriber, super::SUBJECT_TEMPLATE_SAVE, move |request| {
        let mailing = Arc::clone(&mailing);
        async move { save(&mailing, request).await }
    })
    .await
}

/// Handle template.get messages
pub async fn handle_get(client: Client, subscriber: Subscriber, mailing: Arc<MailingService>) -> Result<()> {
    serve(client, subscriber, super::SUBJECT_TEMPLATE_GET, move |request| {
        let mailing = Arc::clone(&mailing);
        async move { get(&mailing, request).await }
    })
    .await
}

/// Handle template.list messages
pub async fn handle_list(client: Client, subscriber: Subscriber, mailing: Arc<MailingService>) -> Result<()> {
    serve(client, subscriber, super::SUBJECT_TEMPLATE_LIST, move |request| {
        let mailing = Arc::clone(&mailing);
        async move { list(&mailing, request).await }
    })
    .await
}

/// Handle template.preview messages
pub async fn handle_preview(client: Client, subscriber: Subscriber, mailing: Arc<MailingService>) -> Result<()> {
    serve(client, subscriber, super::SUBJECT_TEMPLATE_PREVIEW, move |request| {
        let mailing = Arc::clone(&mailing);
        async move { preview(&mailing, request).await }
    })
    .await
}
