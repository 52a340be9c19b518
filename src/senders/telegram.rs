use crate::error::{Error, Result};
use crate::normalizer::first_sentences;
use crate::senders::{DeliveryReport, Sender, ensure_success};
use crate::transport::{Body, MultipartForm, Request, Transport, file_name_from_url};
use crate::types::{Backend, MediaType, Record, Warning};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

const HOST: &str = "https://api.telegram.org";
const PARSE_MODE_MARKDOWN: &str = "Markdown";

/// Bots can send files of up to 50 MB.
/// https://core.telegram.org/bots/api#senddocument
pub const MAX_DOCUMENT_SIZE: u64 = 50 * 1024 * 1024;
const MAX_CAPTION_CHARS: usize = 1024;
const CAPTION_SENTENCES: usize = 2;
const ELLIPSIS: char = '…';

#[derive(Serialize)]
struct TextMessage<'a> {
    chat_id: i64,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parse_mode: Option<&'a str>,
}

#[derive(Serialize)]
struct PhotoMessage<'a> {
    chat_id: i64,
    caption: &'a str,
    photo: &'a str,
    parse_mode: &'a str,
}

pub struct TelegramSender<T> {
    transport: Arc<T>,
    token: String,
    chat_id: i64,
}

impl<T: Transport> TelegramSender<T> {
    pub fn new(transport: Arc<T>, token: String, chat_id: i64) -> Self {
        Self {
            transport,
            token,
            chat_id,
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", HOST, self.token, method)
    }

    async fn post_json(&self, method: &str, message: impl Serialize) -> Result<()> {
        let body = serde_json::to_value(message)?;
        let resp = self
            .transport
            .execute(Request::post(self.method_url(method), Body::Json(body)))
            .await?;
        info!(method, status = %resp.status, "Telegram response");
        let resp = ensure_success(Backend::Telegram, resp)?;
        debug!(method, body = %resp.text(), "Telegram response body");
        Ok(())
    }

    /// Photo with a short caption, then the full-resolution file as a silent document.
    pub async fn send_picture(&self, record: &Record) -> Result<DeliveryReport> {
        let caption = photo_caption(record);
        // The display URL is used because Telegram sometimes refuses full-size images.
        self.post_json(
            "sendPhoto",
            PhotoMessage {
                chat_id: self.chat_id,
                caption: &caption,
                photo: &record.url,
                parse_mode: PARSE_MODE_MARKDOWN,
            },
        )
        .await?;

        let mut report = DeliveryReport::default();
        let Some(full_image_url) = record.full_image_url.as_deref() else {
            info!("No full-resolution image, skipping document");
            return Ok(report);
        };

        let content_length = self.content_length(full_image_url).await;
        info!(content_length = ?content_length, "Full image size");
        if let Some(length) = content_length.filter(|&l| l >= MAX_DOCUMENT_SIZE) {
            let warning = Warning::AttachmentTooLarge {
                url: full_image_url.to_string(),
                length,
            };
            warn!(%warning, "Skipping document");
            report.warnings.push(warning);
            return Ok(report);
        }

        self.send_document(full_image_url, &document_caption(record))
            .await?;
        Ok(report)
    }

    /// Markdown link to the video followed by the full explanation.
    pub async fn send_video(&self, record: &Record) -> Result<DeliveryReport> {
        let text = format!("[{}]({})\n{}", record.title, record.url, record.explanation);
        self.post_json(
            "sendMessage",
            TextMessage {
                chat_id: self.chat_id,
                text: &text,
                parse_mode: Some(PARSE_MODE_MARKDOWN),
            },
        )
        .await?;
        Ok(DeliveryReport::default())
    }

    // The image host is not Telegram: a failed size check means the size is unknown.
    async fn content_length(&self, url: &str) -> Option<u64> {
        match self.transport.execute(Request::head(url)).await {
            Ok(head) if head.status.is_success() => head.content_length,
            Ok(head) => {
                warn!(url, status = %head.status, "Can't check full image size");
                None
            }
            Err(e) => {
                warn!(url, error = %e, "Can't check full image size");
                None
            }
        }
    }

    // Uploading the bytes as multipart is more reliable than passing the remote URL.
    async fn send_document(&self, file_url: &str, caption: &str) -> Result<()> {
        let source = self.transport.execute(Request::get(file_url)).await?;
        if !source.status.is_success() {
            return Err(Error::Download {
                url: file_url.to_string(),
                status: source.status,
            });
        }

        let form = MultipartForm::new("document", &file_name_from_url(file_url), source.body)
            .text("chat_id", self.chat_id.to_string())
            .text("caption", caption)
            .text("disable_notification", "true");

        let resp = self
            .transport
            .execute(Request::post(
                self.method_url("sendDocument"),
                Body::Multipart(form),
            ))
            .await?;
        info!(status = %resp.status, "Telegram document response");
        ensure_success(Backend::Telegram, resp)?;
        Ok(())
    }
}

impl<T: Transport> Sender for TelegramSender<T> {
    fn backend(&self) -> Backend {
        Backend::Telegram
    }

    fn supports(&self, media_type: MediaType) -> bool {
        matches!(media_type, MediaType::Image | MediaType::Video)
    }

    async fn send(&self, record: &Record) -> Result<DeliveryReport> {
        match record.media_type {
            MediaType::Image => self.send_picture(record).await,
            MediaType::Video => self.send_video(record).await,
        }
    }

    async fn send_text(&self, chat_id: i64, text: &str) -> Result<()> {
        self.post_json(
            "sendMessage",
            TextMessage {
                chat_id,
                text,
                parse_mode: None,
            },
        )
        .await
    }
}

/// `*title*`, the first sentences of the explanation and the permalink,
/// shortened to fit Telegram's caption limit.
///
/// The excerpt is shortened first; the title only when the title and the
/// permalink alone are over the limit. The permalink is never cut.
fn photo_caption(record: &Record) -> String {
    let mut excerpt = first_sentences(&record.explanation, CAPTION_SENTENCES).to_string();
    if excerpt.len() < record.explanation.len() {
        excerpt.push(ELLIPSIS);
    }

    let caption = format!("*{}*\n{}\n{}", record.title, excerpt, record.link);
    if caption.chars().count() <= MAX_CAPTION_CHARS {
        return caption;
    }

    // Two asterisks and two newlines.
    let markup = 4;
    let budget = MAX_CAPTION_CHARS.saturating_sub(record.link.chars().count() + markup);
    let title = shorten(&record.title, budget);
    let excerpt = shorten(&excerpt, budget.saturating_sub(title.chars().count()));
    format!("*{}*\n{}\n{}", title, excerpt, record.link)
}

/// `text` cut to at most `max_chars` characters, ending in `…` when cut.
fn shorten(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    if max_chars == 0 {
        return String::new();
    }
    let mut shortened: String = text.chars().take(max_chars - 1).collect();
    shortened.truncate(shortened.trim_end().len());
    shortened.push(ELLIPSIS);
    shortened
}

fn document_caption(record: &Record) -> String {
    record
        .copyright
        .as_deref()
        .map(|c| format!("© {}", c))
        .unwrap_or_default()
}
