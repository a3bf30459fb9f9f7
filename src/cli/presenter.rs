//! CLI presenter for output formatting

use std::time::Duration as StdDuration;

use colored::*;
use indicatif::{ProgressBar, ProgressStyle};

use crate::domain::chat::{ChatDetail, ChatSummary, Role, TranscribeReply};
use crate::domain::recording::{Elapsed, InputDevice};

/// Presenter for CLI output formatting
pub struct Presenter {
    spinner: Option<ProgressBar>,
}

impl Presenter {
    /// Create a new presenter
    pub fn new() -> Self {
        Self { spinner: None }
    }

    /// Start a spinner with message
    pub fn start_spinner(&mut self, message: &str) {
        let style = ProgressStyle::default_spinner()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(style);
        spinner.set_message(message.to_string());
        spinner.enable_steady_tick(StdDuration::from_millis(80));
        self.spinner = Some(spinner);
    }

    /// Handle to the active spinner, for updates from callbacks
    pub fn spinner_handle(&self) -> Option<ProgressBar> {
        self.spinner.clone()
    }

    /// Mark spinner as success and finish
    pub fn spinner_success(&mut self, message: &str) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_with_message(format!("{} {}", "✓".green(), message));
        }
    }

    /// Mark spinner as failed and finish
    pub fn spinner_fail(&mut self, message: &str) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_with_message(format!("{} {}", "✗".red(), message));
        }
    }

    /// Print info message to stderr
    pub fn info(&self, message: &str) {
        eprintln!("{} {}", "ℹ".cyan(), message);
    }

    /// Print success message to stderr
    pub fn success(&self, message: &str) {
        eprintln!("{} {}", "✓".green(), message);
    }

    /// Print warning message to stderr
    pub fn warn(&self, message: &str) {
        eprintln!("{} {}", "⚠".yellow(), message);
    }

    /// Print error message to stderr
    pub fn error(&self, message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    /// Output text to stdout
    pub fn output(&self, text: &str) {
        println!("{}", text);
    }

    /// Format recording progress as a bar with MM:SS times
    pub fn format_progress(elapsed_ms: u64, total_ms: u64) -> String {
        let percent = if total_ms > 0 {
            (elapsed_ms as f64 / total_ms as f64 * 100.0).min(100.0)
        } else {
            0.0
        };

        let bar_width = 20;
        let filled = ((percent / 100.0) * bar_width as f64) as usize;
        let empty = bar_width - filled;

        format!(
            "[{}{}] {} / {}",
            "█".repeat(filled).cyan(),
            "░".repeat(empty),
            Elapsed::new(StdDuration::from_millis(elapsed_ms)),
            Elapsed::new(StdDuration::from_millis(total_ms)),
        )
    }

    /// Print the outcome of a voice or text turn
    pub fn reply(&self, transcription: Option<&str>, response: &str) {
        if let Some(text) = transcription {
            println!("{} {}", "You:".bold().cyan(), text);
        }
        println!("{} {}", "Assistant:".bold().green(), response);
    }

    /// Print a transcription reply, noting when nothing was heard
    pub fn transcribe_reply(&self, reply: &TranscribeReply) {
        if reply.has_transcription() {
            self.reply(Some(reply.transcription.trim()), &reply.response);
        } else {
            self.warn("Could not transcribe audio");
            if !reply.response.is_empty() {
                self.reply(None, &reply.response);
            }
        }
        if let Some(id) = reply.chat_id {
            self.info(&format!("Conversation #{}", id));
        }
    }

    /// Print the chat list
    pub fn chat_list(&self, chats: &[ChatSummary]) {
        if chats.is_empty() {
            self.info("No conversations yet");
            return;
        }
        for chat in chats {
            println!(
                "{:>5}  {}  {}",
                chat.id.to_string().cyan(),
                chat.updated_at.as_deref().unwrap_or("-").dimmed(),
                chat.title.as_deref().unwrap_or("(untitled)")
            );
        }
    }

    /// Print a chat transcript
    pub fn chat_detail(&self, chat: &ChatDetail) {
        println!("{} #{}", chat.display_title().bold(), chat.id);
        for message in &chat.messages {
            let label = match message.role {
                Role::User => "You:".bold().cyan(),
                Role::Assistant => "Assistant:".bold().green(),
                Role::Other => format!("{}:", message.role).bold(),
            };
            println!("{} {}", label, message.content);
        }
    }

    /// Print input devices
    pub fn devices(&self, devices: &[InputDevice]) {
        if devices.is_empty() {
            self.warn("No audio input devices found");
            return;
        }
        for device in devices {
            let label = if device.has_label() {
                device.label.as_str()
            } else {
                "(unnamed)"
            };
            println!("{:>3}  {}", device.id.cyan(), label);
        }
    }

    /// Print a key-value pair (for config list)
    pub fn key_value(&self, key: &str, value: &str) {
        println!("{}: {}", key.cyan(), value);
    }
}

impl Default for Presenter {
    fn default() -> Self {
        Self::new()
    }
}
