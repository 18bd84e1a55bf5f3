//! Template and mail request/response payloads

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::template::{Block, FallbackPolicy, RecipientRow, StoredTemplate};

/// Save template request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveTemplateRequest {
    #[serde(default)]
    pub name: Option<String>,
    pub blocks: Vec<Block>,
}

/// Save template response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveTemplateResponse {
    pub id: Uuid,
    pub name: String,
    pub placeholders: Vec<String>,
}

/// Get template request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetTemplateRequest {
    pub id: Uuid,
}

/// List templates response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListTemplatesResponse {
    pub templates: Vec<StoredTemplate>,
    pub total: usize,
}

/// Preview request: one row, preview fallback unless asked otherwise
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewRequest {
    pub template_id: Uuid,
    #[serde(default)]
    pub row: RecipientRow,
    #[serde(default)]
    pub policy: FallbackPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewResponse {
    pub html: String,
}

/// Send request. Recipients come either as rows or as an uploaded CSV.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMailRequest {
    pub template_id: Uuid,
    pub subject: String,
    #[serde(default)]
    pub rows: Vec<RecipientRow>,
    #[serde(default)]
    pub recipients_csv: Option<String>,
}

/// Per-recipient delivery result
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DeliveryStatus {
    Sent { id: String },
    Failed { error: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RecipientOutcome {
    /// Position of the row in the request
    pub index: usize,
    pub email: Option<String>,
    #[serde(flatten)]
    pub status: DeliveryStatus,
}

impl RecipientOutcome {
    pub fn sent(index: usize, email: Option<String>, id: String) -> Self {
        Self {
            index,
            email,
            status: DeliveryStatus::Sent { id },
        }
    }

    pub fn failed(index: usize, email: Option<String>, error: impl Into<String>) -> Self {
        Self {
            index,
            email,
            status: DeliveryStatus::Failed {
                error: error.into(),
            },
        }
    }

    pub fn is_sent(&self) -> bool {
        matches!(self.status, DeliveryStatus::Sent { .. })
    }
}

/// Batch send report; `results[i]` belongs to row `i`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSendReport {
    pub template_id: Uuid,
    pub sent: usize,
    pub failed: usize,
    pub results: Vec<RecipientOutcome>,
}

impl BatchSendReport {
    pub fn new(template_id: Uuid, results: Vec<RecipientOutcome>) -> Self {
        let sent = results.iter().filter(|r| r.is_sent()).count();
        Self {
            template_id,
            sent,
            failed: results.len() - sent,
            results,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_serializes_flat_status() {
        let json = serde_json::to_value(RecipientOutcome::sent(2, Some("a@x.com".into()), "re_1".into())).unwrap();
        assert_eq!(json["index"], 2);
        assert_eq!(json["status"], "sent");
        assert_eq!(json["id"], "re_1");

        let json = serde_json::to_value(RecipientOutcome::failed(0, None, "boom")).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["error"], "boom");
    }

    #[test]
    fn test_report_counts() {
        let report = BatchSendReport::new(
            Uuid::nil(),
            vec![
                RecipientOutcome::sent(0, None, "1".into()),
                RecipientOutcome::failed(1, None, "x"),
                RecipientOutcome::sent(2, None, "2".into()),
            ],
        );
        assert_eq!(report.sent, 2);
        assert_eq!(report.failed, 1);
    }

    #[test]
    fn test_send_request_defaults() {
        let req: SendMailRequest = serde_json::from_value(serde_json::json!({
            "templateId": Uuid::nil(),
            "subject": "Hi"
        }))
        .unwrap();
        assert!(req.rows.is_empty());
        assert!(req.recipients_csv.is_none());
    }

    #[test]
    fn test_preview_request_defaults_to_preview_policy() {
        let req: PreviewRequest = serde_json::from_value(serde_json::json!({
            "templateId": Uuid::nil(),
            "row": { "name": "Ann" }
        }))
        .unwrap();
        assert_eq!(req.policy, FallbackPolicy::Preview);
        assert_eq!(req.row.get("name"), Some("Ann"));
    }
}
