//! Transactional email sending abstraction.
//!
//! `EmailSender` is the core trait. Use `ResendEmailSender` in production,
//! `LogEmailSender` when no API key is configured (logs to tracing), and
//! `FakeEmailSender` in tests.
//!
//! The trait is object-safe so callers can hold `Arc<dyn EmailSender>`.

use std::collections::HashSet;

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

const RESEND_API_URL: &str = "https://api.resend.com";

// =============================================================================
// Core trait
// =============================================================================

/// A rendered email message ready to send.
#[derive(Debug, Clone, Serialize)]
pub struct EmailMessage {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub html: String,
}

/// Provider acknowledgment for one accepted message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeliveryReceipt {
    pub id: String,
}

/// Outcome of one message inside a batch.
pub type SendOutcome = std::result::Result<DeliveryReceipt, String>;

/// Abstraction over an email transport.
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, msg: EmailMessage) -> Result<DeliveryReceipt>;

    /// Send several messages. `result[i]` is the outcome of `msgs[i]`.
    ///
    /// An `Err` means the whole call failed and nothing can be attributed.
    async fn send_batch(&self, msgs: Vec<EmailMessage>) -> Result<Vec<SendOutcome>> {
        let mut outcomes = Vec::with_capacity(msgs.len());
        for msg in msgs {
            outcomes.push(self.send(msg).await.map_err(|e| e.to_string()));
        }
        Ok(outcomes)
    }
}

// =============================================================================
// LogEmailSender - writes to tracing (dev / staging)
// =============================================================================

pub struct LogEmailSender;

#[async_trait]
impl EmailSender for LogEmailSender {
    async fn send(&self, msg: EmailMessage) -> Result<DeliveryReceipt> {
        let id = format!("log-{}", Uuid::new_v4());
        info!(
            id = %id,
            to = ?msg.to,
            subject = %msg.subject,
            "[LogEmailSender] Would send email\n---HTML---\n{}",
            msg.html,
        );
        Ok(DeliveryReceipt { id })
    }
}

// =============================================================================
// FakeEmailSender - captures sent messages in a Vec (tests)
// =============================================================================

/// Collects sent messages in memory for assertion in tests.
/// Addresses registered with `fail_for` are rejected individually.
#[derive(Default)]
pub struct FakeEmailSender {
    pub sent: Mutex<Vec<EmailMessage>>,
    failing: Mutex<HashSet<String>>,
    batch_calls: Mutex<Vec<usize>>,
    unavailable: Mutex<bool>,
}

impl FakeEmailSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_for(&self, address: &str) {
        self.failing.lock().insert(address.to_string());
    }

    /// Make every subsequent call fail as a whole.
    pub fn set_unavailable(&self, unavailable: bool) {
        *self.unavailable.lock() = unavailable;
    }

    pub fn sent_messages(&self) -> Vec<EmailMessage> {
        self.sent.lock().clone()
    }

    pub fn last_message(&self) -> Option<EmailMessage> {
        self.sent.lock().last().cloned()
    }

    /// Sizes of the `send_batch` calls received, in call order.
    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batch_calls.lock().clone()
    }

    fn accept(&self, msg: EmailMessage) -> SendOutcome {
        let failing = self.failing.lock();
        if let Some(addr) = msg.to.iter().find(|a| failing.contains(*a)) {
            return Err(format!("rejected recipient {}", addr));
        }
        let mut sent = self.sent.lock();
        sent.push(msg);
        Ok(DeliveryReceipt {
            id: format!("fake-{}", sent.len()),
        })
    }
}

#[async_trait]
impl EmailSender for FakeEmailSender {
    async fn send(&self, msg: EmailMessage) -> Result<DeliveryReceipt> {
        if *self.unavailable.lock() {
            anyhow::bail!("fake transport unavailable");
        }
        self.accept(msg).map_err(anyhow::Error::msg)
    }

    async fn send_batch(&self, msgs: Vec<EmailMessage>) -> Result<Vec<SendOutcome>> {
        self.batch_calls.lock().push(msgs.len());
        if *self.unavailable.lock() {
            anyhow::bail!("fake transport unavailable");
        }
        Ok(msgs.into_iter().map(|m| self.accept(m)).collect())
    }
}

// =============================================================================
// ResendEmailSender - live Resend.com API
// =============================================================================

#[derive(Debug, Deserialize)]
struct ResendBatchResponse {
    data: Vec<DeliveryReceipt>,
}

pub struct ResendEmailSender {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl ResendEmailSender {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: RESEND_API_URL.to_string(),
        }
    }

    async fn post<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<reqwest::Response> {
        let response = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("Resend API error {}: {}", status, body));
        }

        Ok(response)
    }
}

#[async_trait]
impl EmailSender for ResendEmailSender {
    async fn send(&self, msg: EmailMessage) -> Result<DeliveryReceipt> {
        let receipt: DeliveryReceipt = self.post("/emails", &msg).await?.json().await?;
        info!(id = %receipt.id, to = ?msg.to, subject = %msg.subject, "Email sent via Resend");
        Ok(receipt)
    }

    async fn send_batch(&self, msgs: Vec<EmailMessage>) -> Result<Vec<SendOutcome>> {
        if msgs.is_empty() {
            return Ok(vec![]);
        }

        let response: ResendBatchResponse = self.post("/emails/batch", &msgs).await?.json().await?;
        if response.data.len() != msgs.len() {
            anyhow::bail!(
                "Resend batch returned {} ids for {} messages",
                response.data.len(),
                msgs.len()
            );
        }

        debug!(count = msgs.len(), "Email batch sent via Resend");
        Ok(response.data.into_iter().map(Ok).collect())
    }
}

// =============================================================================
// Tests
// =============================================================================
