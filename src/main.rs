//! voice-chat CLI entry point

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use voice_chat::cli::{
    app::{
        load_merged_config, run_chats, run_devices, run_record, run_send, run_show, EXIT_ERROR,
        EXIT_USAGE_ERROR,
    },
    args::{Cli, Commands, RecordOptions},
    config_cmd::handle_config_command,
    presenter::Presenter,
};
use voice_chat::domain::config::AppConfig;
use voice_chat::domain::recording::Duration;
use voice_chat::infrastructure::XdgConfigStore;

fn init_tracing(verbose: bool) {
    let default = if verbose { "voice_chat=debug" } else { "voice_chat=warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn parse_duration(
    presenter: &Presenter,
    name: &str,
    value: Option<&str>,
    default: Duration,
) -> Option<Duration> {
    match value {
        Some(s) => match s.parse::<Duration>() {
            Ok(d) => Some(d),
            Err(e) => {
                presenter.error(&format!("Invalid {}: {}", name, e));
                None
            }
        },
        None => Some(default),
    }
}

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let presenter = Presenter::new();

    let (max_duration, upload_timeout) = match &cli.command {
        Commands::Record {
            max_duration,
            timeout,
            ..
        } => (max_duration.clone(), timeout.clone()),
        _ => (None, None),
    };
    let cli_config = AppConfig {
        server_url: cli.server.clone(),
        max_duration,
        upload_timeout,
        input_device: None,
    };

    match cli.command {
        Commands::Config { action } => {
            let store = XdgConfigStore::new();
            if let Err(e) = handle_config_command(action, &store, &presenter).await {
                presenter.error(&e.to_string());
                return ExitCode::from(EXIT_ERROR);
            }
            ExitCode::SUCCESS
        }
        Commands::Record { chat, .. } => {
            let config = load_merged_config(cli_config).await;

            let Some(max_duration) = parse_duration(
                &presenter,
                "max-duration",
                config.max_duration.as_deref(),
                Duration::default_max_duration(),
            ) else {
                return ExitCode::from(EXIT_USAGE_ERROR);
            };
            let Some(upload_timeout) = parse_duration(
                &presenter,
                "timeout",
                config.upload_timeout.as_deref(),
                Duration::default_upload_timeout(),
            ) else {
                return ExitCode::from(EXIT_USAGE_ERROR);
            };

            run_record(RecordOptions {
                server_url: config.server_url_or_default(),
                chat_id: chat,
                max_duration,
                upload_timeout,
                input_device: config.input_device().map(str::to_string),
            })
            .await
        }
        Commands::Send { message, chat } => {
            let config = load_merged_config(cli_config).await;
            run_send(&config.server_url_or_default(), &message, chat).await
        }
        Commands::Chats => {
            let config = load_merged_config(cli_config).await;
            run_chats(&config.server_url_or_default()).await
        }
        Commands::Show { id } => {
            let config = load_merged_config(cli_config).await;
            run_show(&config.server_url_or_default(), id).await
        }
        Commands::Devices => {
            let config = load_merged_config(cli_config).await;
            run_devices(config.input_device().map(str::to_string)).await
        }
    }
}
