//! CLI argument definitions using Clap

use clap::{Parser, Subcommand};

use crate::domain::chat::ChatId;
use crate::domain::recording::Duration;

/// Environment variable overriding the chat server URL
pub const SERVER_URL_ENV: &str = "VOICE_CHAT_SERVER_URL";

/// voice-chat - talk to a chat server from the terminal
#[derive(Parser, Debug)]
#[command(name = "voice-chat")]
#[command(version)]
#[command(about = "Record a voice message, send it to a chat server and print the reply")]
#[command(long_about = None)]
pub struct Cli {
    /// Chat server base URL (overrides VOICE_CHAT_SERVER_URL)
    #[arg(short = 's', long, value_name = "URL", global = true)]
    pub server: Option<String>,

    /// Enable debug logging (RUST_LOG overrides)
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Record a voice message and send it
    Record {
        /// Continue an existing conversation
        #[arg(short = 'c', long, value_name = "ID")]
        chat: Option<ChatId>,

        /// Stop automatically after this long (e.g., 30s, 1m, 2m30s)
        #[arg(short = 'm', long, value_name = "TIME")]
        max_duration: Option<String>,

        /// Give up waiting for the server after this long
        #[arg(short = 't', long, value_name = "TIME")]
        timeout: Option<String>,
    },
    /// Send a text message
    Send {
        /// Message text
        message: String,

        /// Continue an existing conversation
        #[arg(short = 'c', long, value_name = "ID")]
        chat: Option<ChatId>,
    },
    /// List conversations
    Chats,
    /// Show a conversation
    Show {
        /// Conversation id
        id: ChatId,
    },
    /// List audio input devices
    Devices,
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config action subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Create config file with defaults
    Init,
    /// Set a config value
    Set {
        /// Config key
        key: String,
        /// Config value
        value: String,
    },
    /// Get a config value
    Get {
        /// Config key
        key: String,
    },
    /// List all config values
    List,
    /// Show config file path
    Path,
}

/// Parsed options for a voice turn
#[derive(Debug, Clone)]
pub struct RecordOptions {
    pub server_url: String,
    pub chat_id: Option<ChatId>,
    pub max_duration: Duration,
    pub upload_timeout: Duration,
    pub input_device: Option<String>,
}

/// Valid config keys
pub const VALID_CONFIG_KEYS: &[&str] = &[
    "server_url",
    "max_duration",
    "upload_timeout",
    "input_device",
];

/// Check if a config key is valid
pub fn is_valid_config_key(key: &str) -> bool {
    VALID_CONFIG_KEYS.contains(&key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_parses_record_defaults() {
        let cli = Cli::parse_from(["voice-chat", "record"]);
        assert!(!cli.verbose);
        if let Commands::Record {
            chat,
            max_duration,
            timeout,
        } = cli.command
        {
            assert!(chat.is_none());
            assert!(max_duration.is_none());
            assert!(timeout.is_none());
        } else {
            panic!("Expected Record command");
        }
    }

    #[test]
    fn cli_parses_record_options() {
        let cli = Cli::parse_from([
            "voice-chat", "record", "--chat", "7", "-m", "2m", "--timeout", "45s",
        ]);
        if let Commands::Record {
            chat,
            max_duration,
            timeout,
        } = cli.command
        {
            assert_eq!(chat, Some(ChatId::new(7)));
            assert_eq!(max_duration.as_deref(), Some("2m"));
            assert_eq!(timeout.as_deref(), Some("45s"));
        } else {
            panic!("Expected Record command");
        }
    }

    #[test]
    fn cli_rejects_bad_chat_id() {
        assert!(Cli::try_parse_from(["voice-chat", "show", "abc"]).is_err());
        assert!(Cli::try_parse_from(["voice-chat", "show", "0"]).is_err());
    }

    #[test]
    fn cli_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["voice-chat", "chats", "-v", "--server", "http://x:1"]);
        assert!(cli.verbose);
        assert_eq!(cli.server.as_deref(), Some("http://x:1"));
        assert!(matches!(cli.command, Commands::Chats));
    }

    #[test]
    fn cli_parses_send() {
        let cli = Cli::parse_from(["voice-chat", "send", "hello there", "-c", "3"]);
        if let Commands::Send { message, chat } = cli.command {
            assert_eq!(message, "hello there");
            assert_eq!(chat, Some(ChatId::new(3)));
        } else {
            panic!("Expected Send command");
        }
    }

    #[test]
    fn cli_parses_config_set() {
        let cli = Cli::parse_from(["voice-chat", "config", "set", "max_duration", "2m"]);
        if let Commands::Config {
            action: ConfigAction::Set { key, value },
        } = cli.command
        {
            assert_eq!(key, "max_duration");
            assert_eq!(value, "2m");
        } else {
            panic!("Expected Config Set command");
        }
    }

    #[test]
    fn valid_config_keys() {
        assert!(is_valid_config_key("server_url"));
        assert!(is_valid_config_key("upload_timeout"));
        assert!(!is_valid_config_key("api_key"));
    }

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }
}
