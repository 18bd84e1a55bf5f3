//! Mail sending handler

use std::sync::Arc;

use anyhow::Result;
use async_nats::{Client, Subscriber};
use tracing::{error, info};

use super::{require_user, serve};
use crate::error::MailingError;
use crate::services::mailing::MailingService;
use crate::services::recipients::parse_recipients_csv;
use crate::types::{BatchSendReport, ErrorResponse, Request, SendMailRequest};

/// Render a saved template for every recipient and send it
pub async fn send(
    mailing: &MailingService,
    request: Request<SendMailRequest>,
) -> std::result::Result<BatchSendReport, ErrorResponse> {
    let owner_id = require_user(&request)?;
    let payload = request.payload;

    let rows = match (payload.rows.is_empty(), payload.recipients_csv.as_deref()) {
        (true, Some(csv)) => parse_recipients_csv(csv)
            .map_err(|e| ErrorResponse::new(request.id, "INVALID_REQUEST", format!("{:#}", e)))?,
        _ => payload.rows,
    };

    info!(
        %owner_id,
        template_id = %payload.template_id,
        recipients = rows.len(),
        "Sending template batch"
    );

    mailing
        .send_batch(owner_id, payload.template_id, &payload.subject, &rows)
        .await
        .map_err(|e| {
            if let MailingError::Credits(ref inner) = e {
                error!("Credit deduction failed: {}", inner);
            }
            ErrorResponse::new(request.id, e.code(), e.to_string())
        })
}

/// Handle mail.send messages
pub async fn handle_send(client: Client, subscriber: Subscriber, mailing: Arc<MailingService>) -> Result<()> {
    serve(client, subscriber, super::SUBJECT_MAIL_SEND, move |request| {
        let mailing = Arc::clone(&mailing);
        async move { send(&mailing, request).await }
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    use crate::handlers::template::tests::{mailing, saved_template};
    use crate::types::RecipientRow;

    #[tokio::test]
    async fn send_accepts_uploaded_csv() {
        let mailing = mailing();
        let owner = Uuid::new_v4();
        let id = saved_template(&mailing, owner, "Hi {{name}}").await;

        let request = Request::for_user(
            owner,
            SendMailRequest {
                template_id: id,
                subject: "Hello".into(),
                rows: vec![],
                recipients_csv: Some("email,name\na@x.com,A\nb@x.com,B\n".into()),
            },
        );
        let report = send(&mailing, request).await.unwrap();
        assert_eq!(report.sent, 2);
        assert_eq!(report.results[1].email.as_deref(), Some("b@x.com"));
    }

    #[tokio::test]
    async fn send_to_unknown_template_fails_whole_request() {
        let mailing = mailing();
        let row: RecipientRow = [("email", "a@x.com")].into_iter().collect();
        let request = Request::for_user(
            Uuid::new_v4(),
            SendMailRequest {
                template_id: Uuid::new_v4(),
                subject: "Hello".into(),
                rows: vec![row],
                recipients_csv: None,
            },
        );
        let err = send(&mailing, request).await.unwrap_err();
        assert_eq!(err.error.code, "TEMPLATE_NOT_FOUND");
    }

    #[tokio::test]
    async fn send_with_no_recipients_is_rejected() {
        let mailing = mailing();
        let owner = Uuid::new_v4();
        let id = saved_template(&mailing, owner, "Hi").await;
        let request = Request::for_user(
            owner,
            SendMailRequest {
                template_id: id,
                subject: "Hello".into(),
                rows: vec![],
                recipients_csv: None,
            },
        );
        let err = send(&mailing, request).await.unwrap_err();
        assert_eq!(err.error.code, "EMPTY_BATCH");
    }
}
