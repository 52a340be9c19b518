use crate::config::BotConfig;
use crate::error::{Error, Result};
use crate::transport::{Response, Transport};
use crate::types::{Backend, MediaType, Record, Warning};
use std::sync::Arc;

pub mod tamtam;
pub mod telegram;

pub use tamtam::TamTamSender;
pub use telegram::TelegramSender;

/// What a successful delivery left behind.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub warnings: Vec<Warning>,
}

// ============================================================================
// Sender trait
// ============================================================================

#[allow(async_fn_in_trait)]
pub trait Sender: Send + Sync {
    fn backend(&self) -> Backend;

    fn supports(&self, media_type: MediaType) -> bool;

    /// Compose and send the record to the configured chat.
    async fn send(&self, record: &Record) -> Result<DeliveryReport>;

    /// Send a plain text message, used for notifications.
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<()>;
}

// ============================================================================
// BackendSender: the sender picked from configuration
// ============================================================================

pub enum BackendSender<T> {
    Telegram(TelegramSender<T>),
    TamTam(TamTamSender<T>),
}

impl<T: Transport> BackendSender<T> {
    pub fn new(bot: &BotConfig, transport: Arc<T>) -> Self {
        match bot.backend {
            Backend::Telegram => Self::Telegram(TelegramSender::new(
                transport,
                bot.token.clone(),
                bot.chat_id,
            )),
            Backend::TamTam => Self::TamTam(TamTamSender::new(
                transport,
                bot.token.clone(),
                bot.chat_id,
                bot.retry,
            )),
        }
    }
}

impl<T: Transport> Sender for BackendSender<T> {
    fn backend(&self) -> Backend {
        match self {
            Self::Telegram(s) => s.backend(),
            Self::TamTam(s) => s.backend(),
        }
    }

    fn supports(&self, media_type: MediaType) -> bool {
        match self {
            Self::Telegram(s) => s.supports(media_type),
            Self::TamTam(s) => s.supports(media_type),
        }
    }

    async fn send(&self, record: &Record) -> Result<DeliveryReport> {
        match self {
            Self::Telegram(s) => s.send(record).await,
            Self::TamTam(s) => s.send(record).await,
        }
    }

    async fn send_text(&self, chat_id: i64, text: &str) -> Result<()> {
        match self {
            Self::Telegram(s) => s.send_text(chat_id, text).await,
            Self::TamTam(s) => s.send_text(chat_id, text).await,
        }
    }
}

/// Pick the sender for the configured backend, rejecting media it can't send.
pub fn route<T: Transport>(
    bot: &BotConfig,
    transport: Arc<T>,
    media_type: MediaType,
) -> Result<BackendSender<T>> {
    let sender = BackendSender::new(bot, transport);
    if !sender.supports(media_type) {
        return Err(Error::UnsupportedMedia {
            backend: bot.backend,
            media_type,
        });
    }
    Ok(sender)
}

pub(crate) fn ensure_success(backend: Backend, resp: Response) -> Result<Response> {
    if resp.status.is_success() {
        Ok(resp)
    } else {
        Err(Error::Delivery {
            backend,
            status: resp.status,
            body: resp.text(),
        })
    }
}
