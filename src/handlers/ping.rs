//! Ping handler for health checks

use anyhow::Result;
use async_nats::{Client, Subscriber};
use serde::{Deserialize, Serialize};

use super::serve;
use crate::types::{ErrorResponse, Request};

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct PingRequest {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PongResponse {
    pub message: String,
    pub service: String,
    pub version: String,
}

pub fn pong(request: Request<PingRequest>) -> PongResponse {
    PongResponse {
        message: request
            .payload
            .message
            .map(|m| format!("Pong: {}", m))
            .unwrap_or_else(|| "Pong".to_string()),
        service: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    }
}

/// Handle ping messages
pub async fn handle_ping(client: Client, subscriber: Subscriber) -> Result<()> {
    serve(client, subscriber, super::SUBJECT_PING, |request| async move {
        Ok::<_, ErrorResponse>(pong(request))
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_pong_echoes_message() {
        let response = pong(Request::for_user(
            Uuid::nil(),
            PingRequest {
                message: Some("hello".into()),
            },
        ));
        assert_eq!(response.message, "Pong: hello");
        assert_eq!(response.service, "mail-assist-worker");
    }

    #[test]
    fn test_pong_default_message() {
        let response = pong(Request::for_user(Uuid::nil(), PingRequest::default()));
        assert_eq!(response.message, "Pong");
    }
}
