//! Template-to-inbox orchestration.
//!
//! A send request runs in this order:
//!   1. rate limit check for the owner
//!   2. one template fetch (a missing or malformed template stops everything)
//!   3. one rendered document per row, send-time fallback
//!   4. one credit deduction covering every deliverable row
//!   5. delivery in chunks of `max_batch_size`
//!
//! The report keeps row order so failures can be traced to their recipient.

use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{MailingError, RenderError};
use crate::services::credits::CreditLedger;
use crate::services::email_sender::{EmailMessage, EmailSender};
use crate::services::rate_limiter::SendRateLimiter;
use crate::services::renderer;
use crate::services::template_store::TemplateStore;
use crate::types::{
    BatchSendReport, FallbackPolicy, RecipientOutcome, RecipientRow, Template,
};

/// Sender identity and chunking
#[derive(Debug, Clone)]
pub struct MailingConfig {
    pub from: String,
    pub max_batch_size: usize,
}

pub struct MailingService {
    store: Arc<dyn TemplateStore>,
    sender: Arc<dyn EmailSender>,
    credits: Arc<dyn CreditLedger>,
    limiter: Arc<SendRateLimiter>,
    config: MailingConfig,
}

impl MailingService {
    pub fn new(
        store: Arc<dyn TemplateStore>,
        sender: Arc<dyn EmailSender>,
        credits: Arc<dyn CreditLedger>,
        limiter: Arc<SendRateLimiter>,
        config: MailingConfig,
    ) -> Self {
        Self {
            store,
            sender,
            credits,
            limiter,
            config,
        }
    }

    pub fn store(&self) -> &Arc<dyn TemplateStore> {
        &self.store
    }

    /// Fetch and parse a template
    pub async fn load_template(&self, template_id: Uuid) -> Result<Template, RenderError> {
        let stored = self
            .store
            .get_template(template_id)
            .await?
            .ok_or(RenderError::TemplateNotFound(template_id))?;
        stored.into_template()
    }

    /// Render a single row, normally with the preview fallback
    pub async fn preview(
        &self,
        template_id: Uuid,
        row: &RecipientRow,
        policy: FallbackPolicy,
    ) -> Result<String, RenderError> {
        let template = self.load_template(template_id).await?;
        Ok(renderer::render_template(&template, row, policy))
    }

    /// Fetch once, render every row. All-or-nothing on the fetch.
    pub async fn render_batch(
        &self,
        template_id: Uuid,
        rows: &[RecipientRow],
    ) -> Result<Vec<String>, RenderError> {
        let template = self.load_template(template_id).await?;
        Ok(renderer::render_batch(&template, rows))
    }

    pub async fn send_batch(
        &self,
        owner_id: Uuid,
        template_id: Uuid,
        subject: &str,
        rows: &[RecipientRow],
    ) -> Result<BatchSendReport, MailingError> {
        if rows.is_empty() {
            return Err(MailingError::EmptyBatch);
        }
        if !self.limiter.check_and_record(owner_id) {
            warn!(%owner_id, "Send rate limit exceeded");
            return Err(MailingError::RateLimited);
        }

        let template = self.load_template(template_id).await?;
        let documents = renderer::render_batch(&template, rows);

        let mut results: Vec<RecipientOutcome> = Vec::with_capacity(rows.len());
        let mut pending: Vec<(usize, EmailMessage)> = Vec::new();
        for (index, (row, html)) in rows.iter().zip(documents).enumerate() {
            let email = row.email().map(str::to_string);
            match &email {
                Some(address) => pending.push((
                    index,
                    EmailMessage {
                        from: self.config.from.clone(),
                        to: vec![address.clone()],
                        subject: renderer::substitute(subject, row, FallbackPolicy::Send),
                        html,
                    },
                )),
                None => debug!(index, "Row has no recipient address"),
            }
            let placeholder = match email {
                Some(_) => "not sent",
                None => "missing recipient address",
            };
            results.push(RecipientOutcome::failed(index, email, placeholder));
        }

        if !pending.is_empty() {
            let required = pending.len() as i64;
            match self.credits.deduct(owner_id, required).await {
                Ok(true) => debug!(%owner_id, required, "Credits deducted"),
                Ok(false) => return Err(MailingError::InsufficientCredits { required }),
                Err(e) => return Err(MailingError::Credits(e)),
            }
        }

        for chunk in pending.chunks(self.config.max_batch_size.max(1)) {
            let (indices, messages): (Vec<usize>, Vec<EmailMessage>) = chunk.iter().cloned().unzip();

            match self.sender.send_batch(messages).await {
                Ok(outcomes) if outcomes.len() == indices.len() => {
                    for (index, outcome) in indices.into_iter().zip(outcomes) {
                        let email = results[index].email.take();
                        results[index] = match outcome {
                            Ok(receipt) => RecipientOutcome::sent(index, email, receipt.id),
                            Err(error) => RecipientOutcome::failed(index, email, error),
                        };
                    }
                }
                Ok(outcomes) => {
                    warn!(
                        expected = indices.len(),
                        got = outcomes.len(),
                        "Mail sender returned a mismatched batch result"
                    );
                    for index in indices {
                        let email = results[index].email.take();
                        results[index] =
                            RecipientOutcome::failed(index, email, "unattributable batch result");
                    }
                }
                Err(e) => {
                    warn!(error = %e, size = indices.len(), "Mail sender batch failed");
                    for index in indices {
                        let email = results[index].email.take();
                        results[index] = RecipientOutcome::failed(index, email, e.to_string());
                    }
                }
            }
        }

        let report = BatchSendReport::new(template_id, results);
        info!(
            %owner_id,
            %template_id,
            sent = report.sent,
            failed = report.failed,
            "Batch send finished"
        );
        Ok(report)
    }
}

// =============================================================================
// Tests
// =============================================================================
