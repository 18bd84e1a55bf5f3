//! NATS message handlers

pub mod mail;
pub mod ping;
pub mod template;

use std::future::Future;
use std::sync::Arc;

use anyhow::Result;
use async_nats::{Client, Subscriber};
use futures::StreamExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::select;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::services::mailing::MailingService;
use crate::types::{ErrorResponse, Request, SuccessResponse};

pub const SUBJECT_PING: &str = "mailassist.ping";
pub const SUBJECT_TEMPLATE_SAVE: &str = "mailassist.template.save";
pub const SUBJECT_TEMPLATE_GET: &str = "mailassist.template.get";
pub const SUBJECT_TEMPLATE_LIST: &str = "mailassist.template.list";
pub const SUBJECT_TEMPLATE_PREVIEW: &str = "mailassist.template.preview";
pub const SUBJECT_MAIL_SEND: &str = "mailassist.mail.send";

/// The gateway must have attached the caller's id.
pub(crate) fn require_user<T>(request: &Request<T>) -> std::result::Result<Uuid, ErrorResponse> {
    request
        .user_id
        .ok_or_else(|| ErrorResponse::new(request.id, "UNAUTHORIZED", "user_id required"))
}

/// Request/reply loop shared by every subject: parse the envelope, run
/// `process`, publish either a success or an error envelope.
pub(crate) async fn serve<P, R, F, Fut>(
    client: Client,
    mut subscriber: Subscriber,
    subject: &'static str,
    process: F,
) -> Result<()>
where
    P: DeserializeOwned,
    R: Serialize,
    F: Fn(Request<P>) -> Fut,
    Fut: Future<Output = std::result::Result<R, ErrorResponse>>,
{
    while let Some(msg) = subscriber.next().await {
        debug!(subject, "Received message");

        let reply = match msg.reply {
            Some(ref reply) => reply.clone(),
            None => {
                warn!(subject, "Message without reply subject");
                continue;
            }
        };

        let request: Request<P> = match serde_json::from_slice(&msg.payload) {
            Ok(req) => req,
            Err(e) => {
                error!(subject, "Failed to parse request: {}", e);
                let error = ErrorResponse::new(Uuid::nil(), "INVALID_REQUEST", e.to_string());
                let _ = client
                    .publish(reply, serde_json::to_vec(&error)?.into())
                    .await;
                continue;
            }
        };

        let request_id = request.id;
        let bytes = match process(request).await {
            Ok(payload) => serde_json::to_vec(&SuccessResponse::new(request_id, payload))?,
            Err(error) => {
                debug!(subject, code = %error.error.code, "Request failed");
                serde_json::to_vec(&error)?
            }
        };

        if let Err(e) = client.publish(reply, bytes.into()).await {
            error!(subject, "Failed to publish reply: {}", e);
        }
    }

    Ok(())
}

/// Start all message handlers
pub async fn start_handlers(client: Client, mailing: Arc<MailingService>) -> Result<()> {
    info!("Starting message handlers...");

    let ping_sub = client.subscribe(SUBJECT_PING).await?;
    let template_save_sub = client.subscribe(SUBJECT_TEMPLATE_SAVE).await?;
    let template_get_sub = client.subscribe(SUBJECT_TEMPLATE_GET).await?;
    let template_list_sub = client.subscribe(SUBJECT_TEMPLATE_LIST).await?;
    let template_preview_sub = client.subscribe(SUBJECT_TEMPLATE_PREVIEW).await?;
    let mail_send_sub = client.subscribe(SUBJECT_MAIL_SEND).await?;

    info!("Subscribed to NATS subjects");

    let ping_handle = tokio::spawn(ping::handle_ping(client.clone(), ping_sub));
    let template_save_handle = tokio::spawn(template::handle_save(
        client.clone(),
        template_save_sub,
        Arc::clone(&mailing),
    ));
    let template_get_handle = tokio::spawn(template::handle_get(
        client.clone(),
        template_get_sub,
        Arc::clone(&mailing),
    ));
    let template_list_handle = tokio::spawn(template::handle_list(
        client.clone(),
        template_list_sub,
        Arc::clone(&mailing),
    ));
    let template_preview_handle = tokio::spawn(template::handle_preview(
        client.clone(),
        template_preview_sub,
        Arc::clone(&mailing),
    ));
    let mail_send_handle = tokio::spawn(mail::handle_send(client.clone(), mail_send_sub, mailing));

    info!("All handlers started");

    select! {
        result = ping_handle => {
            error!("Ping handler finished: {:?}", result);
        }
        result = template_save_handle => {
            error!("Template save handler finished: {:?}", result);
        }
        result = template_get_handle => {
            error!("Template get handler finished: {:?}", result);
        }
        result = template_list_handle => {
            error!("Template list handler finished: {:?}", result);
        }
        result = template_preview_handle => {
            error!("Template preview handler finished: {:?}", result);
        }
        result = mail_send_handle => {
            error!("Mail send handler finished: {:?}", result);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EmptyPayload;

    #[test]
    fn test_require_user() {
        let mut request = Request::for_user(Uuid::new_v4(), EmptyPayload {});
        assert!(require_user(&request).is_ok());

        request.user_id = None;
        let err = require_user(&request).unwrap_err();
        assert_eq!(err.error.code, "UNAUTHORIZED");
        assert_eq!(err.id, request.id);
    }

    #[test]
    fn test_subjects_share_prefix() {
        for subject in [
            SUBJECT_PING,
            SUBJECT_TEMPLATE_SAVE,
            SUBJECT_TEMPLATE_GET,
            SUBJECT_TEMPLATE_LIST,
            SUBJECT_TEMPLATE_PREVIEW,
            SUBJECT_MAIL_SEND,
        ] {
            assert!(subject.starts_with("mailassist."));
        }
    }
}
