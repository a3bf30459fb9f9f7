//! HTTP chat server adapter

use std::time::Duration as StdDuration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::application::ports::{ChatError, ChatService};
use crate::domain::chat::{ChatDetail, ChatId, ChatReply, ChatSummary, TranscribeReply};
use crate::domain::recording::AudioBlob;

/// Multipart field carrying the recording
const AUDIO_FIELD: &str = "audio";

/// Multipart field carrying the conversation id
const CHAT_ID_FIELD: &str = "chatId";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
    #[serde(rename = "chatId", skip_serializing_if = "Option::is_none")]
    chat_id: Option<ChatId>,
}

#[derive(Debug, Deserialize)]
struct ChatsResponse {
    #[serde(default)]
    chats: Vec<ChatSummary>,
}

/// Chat server client
pub struct HttpChatClient {
    base_url: String,
    client: reqwest::Client,
}

impl HttpChatClient {
    /// Create a client for the server at `base_url`
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, reqwest::Client::new())
    }

    /// Create a client whose requests give up after `timeout`
    pub fn with_timeout(
        base_url: impl Into<String>,
        timeout: StdDuration,
    ) -> Result<Self, ChatError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ChatError::Transport(e.to_string()))?;
        Ok(Self::with_client(base_url, client))
    }

    /// Create a client over an existing reqwest client
    pub fn with_client(base_url: impl Into<String>, client: reqwest::Client) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url, client }
    }

    /// Get the server base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn send_error(err: reqwest::Error) -> ChatError {
        if err.is_timeout() {
            ChatError::Timeout
        } else {
            ChatError::Transport(err.to_string())
        }
    }

    /// Decode a JSON body, surfacing server-reported errors first
    async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, ChatError> {
        let status = response.status();
        let body = response.text().await.map_err(Self::send_error)?;
        let value: Option<serde_json::Value> = serde_json::from_str(&body).ok();

        if let Some(message) = value
            .as_ref()
            .and_then(|v| v.get("error"))
            .and_then(|e| e.as_str())
        {
            warn!(status = status.as_u16(), error = message, "Server reported an error");
            return Err(ChatError::Api(message.to_string()));
        }

        if !status.is_success() {
            return Err(ChatError::Server {
                status: status.as_u16(),
                message: if body.trim().is_empty() {
                    status.canonical_reason().unwrap_or("Unknown error").to_string()
                } else {
                    body
                },
            });
        }

        let value = value.ok_or_else(|| ChatError::Parse("response is not JSON".into()))?;
        serde_json::from_value(value).map_err(|e| ChatError::Parse(e.to_string()))
    }
}

#[async_trait]
impl ChatService for HttpChatClient {
    async fn transcribe(
        &self,
        audio: &AudioBlob,
        chat_id: Option<ChatId>,
    ) -> Result<TranscribeReply, ChatError> {
        let part = Part::bytes(audio.data().to_vec())
            .file_name(audio.file_name())
            .mime_str(audio.format().container_mime())
            .map_err(|e| ChatError::Transport(e.to_string()))?;

        let mut form = Form::new();
        if let Some(id) = chat_id {
            form = form.text(CHAT_ID_FIELD, id.to_string());
        }
        form = form.part(AUDIO_FIELD, part);

        debug!(
            size = audio.size_bytes(),
            file = %audio.file_name(),
            chat = ?chat_id,
            "POST /transcribe"
        );
        let response = self
            .client
            .post(self.url("/transcribe"))
            .multipart(form)
            .send()
            .await
            .map_err(Self::send_error)?;

        Self::read_json(response).await
    }

    async fn send_message(
        &self,
        message: &str,
        chat_id: Option<ChatId>,
    ) -> Result<ChatReply, ChatError> {
        debug!(chat = ?chat_id, "POST /chat");
        let response = self
            .client
            .post(self.url("/chat"))
            .json(&ChatRequest { message, chat_id })
            .send()
            .await
            .map_err(Self::send_error)?;

        Self::read_json(response).await
    }

    async fn list_chats(&self) -> Result<Vec<ChatSummary>, ChatError> {
        debug!("GET /chats");
        let response = self
            .client
            .get(self.url("/chats"))
            .send()
            .await
            .map_err(Self::send_error)?;

        let body: ChatsResponse = Self::read_json(response).await?;
        Ok(body.chats)
    }

    async fn get_chat(&self, id: ChatId) -> Result<ChatDetail, ChatError> {
        debug!(chat = %id, "GET /chats/{{id}}");
        let response = self
            .client
            .get(self.url(&format!("/chats/{}", id)))
            .send()
            .await
            .map_err(Self::send_error)?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(ChatError::NotFound(id));
        }
        Self::read_json(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let client = HttpChatClient::new("http://localhost:5000/");
        assert_eq!(client.base_url(), "http://localhost:5000");
        assert_eq!(client.url("/chats"), "http://localhost:5000/chats");
    }

    #[test]
    fn chat_request_omits_missing_chat_id() {
        let body = serde_json::to_value(ChatRequest {
            message: "hi",
            chat_id: None,
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({"message": "hi"}));

        let body = serde_json::to_value(ChatRequest {
            message: "hi",
            chat_id: Some(ChatId::new(3)),
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({"message": "hi", "chatId": 3}));
    }
}
