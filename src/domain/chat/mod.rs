//! Chat domain module

mod chat;
mod reply;

pub use chat::{ChatDetail, ChatId, ChatMessage, ChatSummary, Role};
pub use reply::{ChatReply, FileInfo, TranscribeReply};
