//! Command runners

use std::env;
use std::process::ExitCode;
use std::sync::Arc;

use crate::application::ports::{ChatService, ConfigStore, MediaBackend, RecorderEvent};
use crate::application::{Recorder, VoiceTurnCallbacks, VoiceTurnConfig, VoiceTurnUseCase};
use crate::domain::chat::ChatId;
use crate::domain::config::AppConfig;
use crate::domain::recording::MIN_UPLOAD_BYTES;
use crate::infrastructure::{CpalBackend, HttpChatClient, XdgConfigStore};

use super::args::{RecordOptions, SERVER_URL_ENV};
use super::presenter::Presenter;
use super::signals::{cancel_requested, stop_requested};

/// Exit codes
pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_ERROR: u8 = 1;
pub const EXIT_USAGE_ERROR: u8 = 2;

/// Record one voice message and print the server's reply
pub async fn run_record(options: RecordOptions) -> ExitCode {
    let mut presenter = Presenter::new();

    let backend = CpalBackend::with_device(options.input_device.clone());
    if !Recorder::is_supported(&backend) {
        presenter.error("Audio recording is not supported on this system");
        return ExitCode::from(EXIT_ERROR);
    }
    if !Recorder::has_microphone_permission(&backend).await {
        presenter.warn("Microphone access may be unavailable; trying anyway");
    }

    let recorder = match Recorder::new(backend) {
        Ok(recorder) => Arc::new(recorder),
        Err(e) => {
            presenter.error(&e.to_string());
            return ExitCode::from(EXIT_ERROR);
        }
    };

    let (init_id, mut init_events) = recorder.subscribe_channel();
    let initialized = recorder.init().await;
    recorder.unsubscribe(init_id);
    if !initialized {
        let message = match init_events.try_recv() {
            Ok(RecorderEvent::Error(e)) => e.to_string(),
            _ => "Failed to initialize recorder".to_string(),
        };
        presenter.error(&message);
        return ExitCode::from(EXIT_ERROR);
    }
    if let Some(format) = recorder.format().filter(|f| f.degraded) {
        presenter.warn(&format!("Recording with fallback format {}", format));
    }

    let use_case = VoiceTurnUseCase::new(
        Arc::clone(&recorder),
        HttpChatClient::new(&options.server_url),
        VoiceTurnConfig {
            max_duration: options.max_duration,
            upload_timeout: options.upload_timeout,
            min_audio_bytes: MIN_UPLOAD_BYTES,
        },
    );

    presenter.start_spinner("Starting microphone...");
    let callbacks = recording_callbacks(&presenter);
    let result = use_case
        .execute(
            options.chat_id,
            async {
                stop_requested().await;
            },
            async {
                cancel_requested().await;
            },
            callbacks,
        )
        .await;
    recorder.release();

    match result {
        Ok(output) => {
            presenter.spinner_success(&format!("Sent {}", output.audio_size));
            presenter.transcribe_reply(&output.reply);
            ExitCode::from(EXIT_SUCCESS)
        }
        Err(e) => {
            presenter.spinner_fail(&e.to_string());
            ExitCode::from(EXIT_ERROR)
        }
    }
}

fn recording_callbacks(presenter: &Presenter) -> VoiceTurnCallbacks {
    let Some(spinner) = presenter.spinner_handle() else {
        return VoiceTurnCallbacks::default();
    };

    let on_start = spinner.clone();
    let on_progress = spinner.clone();
    let on_end = spinner.clone();
    VoiceTurnCallbacks {
        on_recording_start: Some(Box::new(move || {
            on_start.set_message("Recording... press Enter to stop");
        })),
        on_progress: Some(Arc::new(move |elapsed, total| {
            on_progress.set_message(format!(
                "Recording... {}  press Enter to stop",
                Presenter::format_progress(elapsed, total)
            ));
        })),
        on_recording_end: Some(Box::new(move |size: &str| {
            on_end.set_message(format!("Recorded {}", size));
        })),
        on_upload_start: Some(Box::new(move || {
            spinner.set_message("Waiting for transcription...");
        })),
    }
}

/// Send a text message
pub async fn run_send(server_url: &str, message: &str, chat_id: Option<ChatId>) -> ExitCode {
    let presenter = Presenter::new();
    let client = HttpChatClient::new(server_url);

    match client.send_message(message, chat_id).await {
        Ok(reply) => {
            presenter.reply(None, &reply.response);
            if let Some(id) = reply.chat_id {
                presenter.info(&format!("Conversation #{}", id));
            }
            ExitCode::from(EXIT_SUCCESS)
        }
        Err(e) => {
            presenter.error(&e.to_string());
            ExitCode::from(EXIT_ERROR)
        }
    }
}

/// List conversations
pub async fn run_chats(server_url: &str) -> ExitCode {
    let presenter = Presenter::new();
    let client = HttpChatClient::new(server_url);

    match client.list_chats().await {
        Ok(chats) => {
            presenter.chat_list(&chats);
            ExitCode::from(EXIT_SUCCESS)
        }
        Err(e) => {
            presenter.error(&e.to_string());
            ExitCode::from(EXIT_ERROR)
        }
    }
}

/// Print one conversation
pub async fn run_show(server_url: &str, id: ChatId) -> ExitCode {
    let presenter = Presenter::new();
    let client = HttpChatClient::new(server_url);

    match client.get_chat(id).await {
        Ok(chat) => {
            presenter.chat_detail(&chat);
            ExitCode::from(EXIT_SUCCESS)
        }
        Err(e) => {
            presenter.error(&e.to_string());
            ExitCode::from(EXIT_ERROR)
        }
    }
}

/// List input devices along with the support and permission probes
pub async fn run_devices(input_device: Option<String>) -> ExitCode {
    let presenter = Presenter::new();
    let backend = CpalBackend::with_device(input_device);

    let supported = Recorder::is_supported(&backend);
    let permission = Recorder::has_microphone_permission(&backend).await;
    presenter.key_value("supported", &supported.to_string());
    presenter.key_value("microphone permission", &permission.to_string());

    match backend.enumerate_inputs().await {
        Ok(devices) => {
            presenter.devices(&devices);
            ExitCode::from(EXIT_SUCCESS)
        }
        Err(e) => {
            presenter.error(&e.to_string());
            ExitCode::from(EXIT_ERROR)
        }
    }
}

/// Load and merge configuration from file, env, and CLI
pub async fn load_merged_config(cli_config: AppConfig) -> AppConfig {
    let store = XdgConfigStore::new();
    let file_config = store.load().await.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Ignoring unreadable config file");
        AppConfig::empty()
    });

    let env_config = AppConfig {
        server_url: env::var(SERVER_URL_ENV).ok().filter(|s| !s.is_empty()),
        ..Default::default()
    };

    // Merge: defaults < file < env < cli
    AppConfig::defaults()
        .merge(file_config)
        .merge(env_config)
        .merge(cli_config)
}
