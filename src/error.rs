//! Domain error types

use thiserror::Error;
use uuid::Uuid;

/// Failures that stop a render before any output is produced.
///
/// Substitution and style serialization never fail; only getting hold of a
/// usable template can.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("template {0} not found")]
    TemplateNotFound(Uuid),

    #[error("template {id} is malformed: {reason}")]
    MalformedTemplate { id: Uuid, reason: String },

    #[error("template store error: {0}")]
    Store(#[from] anyhow::Error),
}

impl RenderError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::TemplateNotFound(_) => "TEMPLATE_NOT_FOUND",
            Self::MalformedTemplate { .. } => "MALFORMED_TEMPLATE",
            Self::Store(_) => "DATABASE_ERROR",
        }
    }
}

/// Rejections of a whole send request.
///
/// Per-recipient delivery failures are not errors here; they are reported
/// in the batch report.
#[derive(Debug, Error)]
pub enum MailingError {
    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("no recipients supplied")]
    EmptyBatch,

    #[error("send rate limit exceeded, try again later")]
    RateLimited,

    #[error("insufficient credits: {required} required")]
    InsufficientCredits { required: i64 },

    #[error("credit deduction failed: {0}")]
    Credits(anyhow::Error),
}

impl MailingError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Render(e) => e.code(),
            Self::EmptyBatch => "EMPTY_BATCH",
            Self::RateLimited => "RATE_LIMITED",
            Self::InsufficientCredits { .. } => "INSUFFICIENT_CREDITS",
            Self::Credits(_) => "DATABASE_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(RenderError::TemplateNotFound(Uuid::nil()).code(), "TEMPLATE_NOT_FOUND");
        assert_eq!(
            MailingError::from(RenderError::MalformedTemplate {
                id: Uuid::nil(),
                reason: "x".into()
            })
            .code(),
            "MALFORMED_TEMPLATE"
        );
        assert_eq!(MailingError::RateLimited.code(), "RATE_LIMITED");
    }

    #[test]
    fn test_not_found_message_names_template() {
        let id = Uuid::new_v4();
        assert!(RenderError::TemplateNotFound(id).to_string().contains(&id.to_string()));
    }
}
