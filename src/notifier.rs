use crate::error::Result;
use crate::senders::Sender;
use tracing::{info, warn};

/// Out-of-band channel for warnings and the terminal error of a run.
#[allow(async_fn_in_trait)]
pub trait Notifier: Send + Sync {
    async fn notify(&self, text: &str) -> Result<()>;

    /// Notify, logging instead of failing when the channel itself is down.
    async fn notify_or_log(&self, text: &str) {
        if let Err(e) = self.notify(text).await {
            warn!(error = %e, text, "Failed to send notification");
        }
    }
}

/// Sends notifications as plain messages to a dedicated chat.
pub struct ChatNotifier<S> {
    sender: S,
    chat_id: i64,
}

impl<S: Sender> ChatNotifier<S> {
    pub fn new(sender: S, chat_id: i64) -> Self {
        Self { sender, chat_id }
    }
}

impl<S: Sender> Notifier for ChatNotifier<S> {
    async fn notify(&self, text: &str) -> Result<()> {
        self.sender.send_text(self.chat_id, text).await
    }
}

/// Used when no error chat is configured; warnings are already in the log.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    async fn notify(&self, text: &str) -> Result<()> {
        info!(text, "No error chat configured, notification not sent");
        Ok(())
    }
}

/// Either of the above, chosen from configuration.
pub enum AnyNotifier<S> {
    Chat(ChatNotifier<S>),
    Log(LogNotifier),
}

impl<S: Sender> Notifier for AnyNotifier<S> {
    async fn notify(&self, text: &str) -> Result<()> {
        match self {
            Self::Chat(n) => n.notify(text).await,
            Self::Log(n) => n.notify(text).await,
        }
    }
}
