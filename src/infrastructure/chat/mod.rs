//! Chat server infrastructure module

mod http;

pub use http::HttpChatClient;
