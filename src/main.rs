use apod_relay::acquisition::Acquisition;
use apod_relay::config::{BotConfig, Config, RetryPolicy, SourceConfig};
use apod_relay::notifier::{AnyNotifier, ChatNotifier, LogNotifier, Notifier};
use apod_relay::runner::{RunOutcome, run};
use apod_relay::senders::BackendSender;
use apod_relay::sources::apod_api::DEMO_API_KEY;
use apod_relay::sources::{ApodApiSource, ApodPageSource};
use apod_relay::status::JsonFileStatus;
use apod_relay::transport::HttpTransport;
use apod_relay::types::Backend;
use chrono::Local;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};

const APP_NAME: &str = "apod-relay";

#[derive(Parser)]
#[command(name = "apod-relay")]
#[command(about = "Send NASA's Astronomy Picture of the Day to a Telegram or TamTam chat")]
#[command(version)]
struct Cli {
    /// Bot API token
    #[arg(long, env = "APOD_RELAY_TOKEN", hide_env_values = true)]
    token: String,

    /// Destination chat id
    #[arg(long, env = "APOD_RELAY_CHAT", allow_negative_numbers = true)]
    chat: i64,

    /// Backend: tg (Telegram) or tt (TamTam)
    #[arg(long, env = "APOD_RELAY_SERVICE", default_value = "tt")]
    service: Backend,

    /// Chat for error notifications
    #[arg(long, env = "APOD_RELAY_ERR_CHAT", allow_negative_numbers = true)]
    err_chat: Option<i64>,

    /// api.nasa.gov key
    #[arg(long, env = "APOD_RELAY_API_KEY", default_value = DEMO_API_KEY, hide_env_values = true)]
    api_key: String,

    /// Last sent dates (default: status.json next to the executable)
    #[arg(long, env = "APOD_RELAY_STATUS_FILE")]
    status_file: Option<PathBuf>,
}

impl Cli {
    fn into_config(self) -> anyhow::Result<Config> {
        let status_file = match self.status_file {
            Some(path) => path,
            None => JsonFileStatus::default_path()?,
        };
        let config = Config {
            bot: BotConfig {
                backend: self.service,
                token: self.token,
                chat_id: self.chat,
                error_chat_id: self.err_chat.filter(|&id| id != 0),
                retry: RetryPolicy::default(),
            },
            source: SourceConfig {
                api_key: self.api_key,
            },
            status_file,
        };
        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "apod_relay=info".into()),
        )
        .init();

    let config = match Cli::parse().into_config() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Wrong arguments");
            return ExitCode::FAILURE;
        }
    };

    let transport = Arc::new(HttpTransport::new());
    let notifier = match config.bot.error_chat_id {
        Some(chat_id) => AnyNotifier::Chat(ChatNotifier::new(
            BackendSender::new(&config.bot, Arc::clone(&transport)),
            chat_id,
        )),
        None => AnyNotifier::Log(LogNotifier),
    };
    let acquisition = Acquisition::new(
        ApodApiSource::new(Arc::clone(&transport), config.source.api_key.clone()),
        ApodPageSource::new(Arc::clone(&transport)),
    );
    let status = JsonFileStatus::new(config.status_file.clone());
    let today = Local::now().date_naive();

    info!(backend = %config.bot.backend, date = %today, "Starting run");
    match run(
        &config.bot,
        transport,
        &acquisition,
        &status,
        &notifier,
        today,
    )
    .await
    {
        Ok(RunOutcome::AlreadySent) => ExitCode::SUCCESS,
        Ok(RunOutcome::Delivered { source, warnings }) => {
            info!(%source, warnings = warnings.len(), "Run completed");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Run failed");
            notifier
                .notify_or_log(&format!("Error from `{}`: {}", APP_NAME, e))
                .await;
            ExitCode::FAILURE
        }
    }
}
