//! voice-chat - talk to a chat server by voice from the terminal
//!
//! This crate records a spoken message from the microphone, uploads it to a
//! chat server for transcription and an assistant reply, and manages the
//! resulting conversations.
//!
//! # Architecture
//!
//! The crate follows hexagonal (ports & adapters) architecture:
//!
//! - **Domain**: Value objects, the capture lifecycle, chat entities, and errors
//! - **Application**: The recorder, the voice turn use case, and port interfaces (traits)
//! - **Infrastructure**: Adapter implementations (cpal, HTTP chat client, config file)
//! - **CLI**: Command-line interface, argument parsing, and stop triggers

pub mod application;
pub mod cli;
pub mod domain;
pub mod infrastructure;
