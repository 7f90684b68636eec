use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::error::ChatError;

/// Version of the `/chat` request/response contract this client speaks.
pub const PROTOCOL_VERSION: &str = "v1";

pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";

#[derive(Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    response: String,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: String,
}

/// Something that can deliver one user message and return the reply.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send(&self, text: &str) -> Result<String, ChatError>;
}

#[derive(Clone, Debug)]
pub struct ChatClient {
    client: Client,
    base_url: String,
}

impl ChatClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn endpoint(&self) -> String {
        format!("{}/chat", self.base_url)
    }

    /// POST `text` to `<base_url>/chat` and return the reply.
    ///
    /// Empty or whitespace-only text is rejected before any request is made.
    pub async fn send(&self, text: &str) -> Result<String, ChatError> {
        if text.trim().is_empty() {
            return Err(ChatError::EmptyInput);
        }

        let url = self.endpoint();
        tracing::debug!(%url, chars = text.chars().count(), "sending chat message");

        let response = self
            .client
            .post(&url)
            .json(&ChatRequest { message: text })
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        tracing::debug!(
            %url,
            status = status.as_u16(),
            bytes = body.len(),
            "chat response received"
        );

        parse_reply(status, &body)
    }
}

#[async_trait]
impl ChatTransport for ChatClient {
    async fn send(&self, text: &str) -> Result<String, ChatError> {
        ChatClient::send(self, text).await
    }
}

fn parse_reply(status: StatusCode, body: &str) -> Result<String, ChatError> {
    if status == StatusCode::OK {
        return serde_json::from_str::<ChatResponse>(body)
            .map(|r| r.response)
            .map_err(|e| ChatError::Transport(format!("malformed reply: {}", e)));
    }

    match serde_json::from_str::<ErrorResponse>(body) {
        Ok(err) => Err(ChatError::Server {
            status: status.as_u16(),
            message: err.error,
        }),
        Err(_) => Err(ChatError::Transport(format!(
            "unexpected status {} without error payload",
            status
        ))),
    }
}
