//! Replies from the transcription and chat endpoints

use serde::{Deserialize, Serialize};

use super::chat::ChatId;

/// Details the server reports about the uploaded file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub size_bytes: Option<u64>,
}

/// Reply to a voice upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscribeReply {
    #[serde(default)]
    pub transcription: String,
    #[serde(default)]
    pub response: String,
    #[serde(default, rename = "chatId")]
    pub chat_id: Option<ChatId>,
    #[serde(default)]
    pub file_info: Option<FileInfo>,
}

impl TranscribeReply {
    /// Whether the server heard any speech
    pub fn has_transcription(&self) -> bool {
        !self.transcription.trim().is_empty()
    }
}

/// Reply to a text message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatReply {
    #[serde(default)]
    pub response: String,
    #[serde(default, rename = "chatId")]
    pub chat_id: Option<ChatId>,
}
