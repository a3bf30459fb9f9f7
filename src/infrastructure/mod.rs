//! Infrastructure layer - Adapter implementations
//!
//! Contains concrete implementations of the port interfaces,
//! integrating with the audio platform (cpal), the chat server (HTTP)
//! and the config file.

pub mod chat;
pub mod config;
pub mod media;

// Re-export adapters
pub use chat::HttpChatClient;
pub use config::XdgConfigStore;
pub use media::CpalBackend;
