//! Chat service port interface

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::chat::{ChatDetail, ChatId, ChatReply, ChatSummary, TranscribeReply};
use crate::domain::recording::AudioBlob;

/// Chat service errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChatError {
    #[error("Request timed out")]
    Timeout,

    #[error("Request failed: {0}")]
    Transport(String),

    #[error("Server returned HTTP {status}: {message}")]
    Server { status: u16, message: String },

    #[error("Server error: {0}")]
    Api(String),

    #[error("Failed to parse server response: {0}")]
    Parse(String),

    #[error("Chat {0} not found")]
    NotFound(ChatId),
}

/// Port for the remote chat service
#[async_trait]
pub trait ChatService: Send + Sync {
    /// Upload a recording for transcription and an assistant reply.
    ///
    /// # Arguments
    /// * `audio` - The assembled recording
    /// * `chat_id` - Conversation to continue, or `None` for a new one
    async fn transcribe(
        &self,
        audio: &AudioBlob,
        chat_id: Option<ChatId>,
    ) -> Result<TranscribeReply, ChatError>;

    /// Send a text message.
    async fn send_message(
        &self,
        message: &str,
        chat_id: Option<ChatId>,
    ) -> Result<ChatReply, ChatError>;

    /// List conversations, most recently updated first.
    async fn list_chats(&self) -> Result<Vec<ChatSummary>, ChatError>;

    /// Fetch one conversation with its messages.
    async fn get_chat(&self, id: ChatId) -> Result<ChatDetail, ChatError>;
}
