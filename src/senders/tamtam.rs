//! TamTam delivery: every attachment goes through the two-phase upload
//! (request an upload URL, post the bytes, keep the returned token) before it
//! can be referenced from a message.

use crate::config::RetryPolicy;
use crate::error::{Error, Result, UploadStage};
use crate::senders::{DeliveryReport, Sender};
use crate::transport::{Body, MultipartForm, Request, Transport, file_name_from_url};
use crate::types::{Backend, MediaType, Record, Warning};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

const HOST: &str = "https://botapi.tamtam.chat";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentType {
    File,
    Image,
}

impl fmt::Display for AttachmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File => write!(f, "file"),
            Self::Image => write!(f, "image"),
        }
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
struct Message<'a> {
    text: &'a str,
    attachments: Vec<Attachment>,
    notify: bool,
}

#[derive(Debug, Serialize)]
struct Attachment {
    #[serde(rename = "type")]
    kind: AttachmentType,
    payload: AttachmentPayload,
}

#[derive(Debug, Serialize)]
struct AttachmentPayload {
    token: String,
}

#[derive(Deserialize)]
struct UploadUrlResponse {
    url: Option<String>,
}

/// Image uploads return one token per generated photo size, keyed by an
/// arbitrary size label.
#[derive(Deserialize)]
struct ImageUploadResponse {
    #[serde(default)]
    photos: BTreeMap<String, PhotoToken>,
}

#[derive(Deserialize)]
struct PhotoToken {
    token: Option<String>,
}

#[derive(Deserialize)]
struct FileUploadResponse {
    token: Option<String>,
}

/// Result of posting a message that was not rejected outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostOutcome {
    Sent { retries: u32 },
    RetriesExhausted { retries: u32 },
}

// ============================================================================
// TamTamSender
// ============================================================================

pub struct TamTamSender<T> {
    transport: Arc<T>,
    token: String,
    chat_id: i64,
    retry: RetryPolicy,
}

impl<T: Transport> TamTamSender<T> {
    pub fn new(transport: Arc<T>, token: String, chat_id: i64, retry: RetryPolicy) -> Self {
        Self {
            transport,
            token,
            chat_id,
            retry,
        }
    }

    fn uploads_url(&self, kind: AttachmentType) -> String {
        format!(
            "{}/uploads?access_token={}&type={}",
            HOST,
            urlencoding::encode(&self.token),
            kind
        )
    }

    fn messages_url(&self, chat_id: i64) -> String {
        format!(
            "{}/messages?access_token={}&chat_id={}",
            HOST,
            urlencoding::encode(&self.token),
            chat_id
        )
    }

    /// Run the two-phase upload for `source_url` and return the attachment token.
    pub async fn upload(&self, source_url: &str, kind: AttachmentType) -> Result<String> {
        let resp = self
            .transport
            .execute(Request::post(self.uploads_url(kind), Body::Empty))
            .await?;
        debug!(%kind, body = %resp.text(), "Upload URL response");
        if !resp.status.is_success() {
            return Err(Error::upload(
                UploadStage::RequestUrl,
                format!("{}: {}", resp.status, resp.text()),
            ));
        }
        let upload_url = serde_json::from_slice::<UploadUrlResponse>(&resp.body)
            .ok()
            .and_then(|r| r.url)
            .filter(|u| !u.is_empty())
            .ok_or_else(|| Error::upload(UploadStage::RequestUrl, "response has no upload URL"))?;

        let source = self.transport.execute(Request::get(source_url)).await?;
        if !source.status.is_success() {
            return Err(Error::upload(
                UploadStage::Download,
                format!("{} returned {}", source_url, source.status),
            ));
        }

        let form = MultipartForm::new("data", &file_name_from_url(source_url), source.body);
        let resp = self
            .transport
            .execute(Request::post(upload_url, Body::Multipart(form)))
            .await?;
        debug!(%kind, body = %resp.text(), "Upload attachment response");
        if !resp.status.is_success() {
            return Err(Error::upload(
                UploadStage::Transfer,
                format!("{}: {}", resp.status, resp.text()),
            ));
        }

        extract_token(kind, &resp.body)
    }

    /// Post a message, retrying while TamTam answers 400 (the attachment is
    /// often still being processed).
    async fn post_message(&self, chat_id: i64, message: &Message<'_>) -> Result<PostOutcome> {
        let body = serde_json::to_value(message)?;
        let url = self.messages_url(chat_id);
        let mut retries = 0;

        loop {
            let resp = self
                .transport
                .execute(Request::post(url.clone(), Body::Json(body.clone())))
                .await?;
            info!(retries, status = %resp.status, "Post message response");

            if resp.status == StatusCode::BAD_REQUEST {
                if retries >= self.retry.max_retries {
                    warn!(retries, body = %resp.text(), "Max send retries exceeded");
                    return Ok(PostOutcome::RetriesExhausted { retries });
                }
                retries += 1;
                tokio::time::sleep(self.retry.delay).await;
                continue;
            }

            if !resp.status.is_success() {
                return Err(Error::Delivery {
                    backend: Backend::TamTam,
                    status: resp.status,
                    body: resp.text(),
                });
            }

            debug!(body = %resp.text(), "Post message response body");
            return Ok(PostOutcome::Sent { retries });
        }
    }

    async fn post_tracked(
        &self,
        message: &Message<'_>,
        report: &mut DeliveryReport,
    ) -> Result<()> {
        if let PostOutcome::RetriesExhausted { retries } =
            self.post_message(self.chat_id, message).await?
        {
            report.warnings.push(Warning::RetriesExhausted { retries });
        }
        Ok(())
    }

    /// Image message with title and permalink, then the full-resolution file
    /// with the copyright line.
    pub async fn send_picture(&self, record: &Record) -> Result<DeliveryReport> {
        let image_token = self.upload(&record.url, AttachmentType::Image).await?;
        let file_token = match record.full_image_url.as_deref() {
            Some(url) => Some(self.upload(url, AttachmentType::File).await?),
            None => None,
        };

        let mut report = DeliveryReport::default();
        let text = format!("{}\n{}", record.title, record.link);
        self.post_tracked(
            &Message {
                text: &text,
                attachments: vec![attachment(AttachmentType::Image, image_token)],
                notify: true,
            },
            &mut report,
        )
        .await?;

        if let Some(token) = file_token {
            self.post_tracked(
                &Message {
                    text: record.copyright.as_deref().unwrap_or_default(),
                    attachments: vec![attachment(AttachmentType::File, token)],
                    notify: false,
                },
                &mut report,
            )
            .await?;
        }

        Ok(report)
    }
}

impl<T: Transport> Sender for TamTamSender<T> {
    fn backend(&self) -> Backend {
        Backend::TamTam
    }

    fn supports(&self, media_type: MediaType) -> bool {
        media_type == MediaType::Image
    }

    async fn send(&self, record: &Record) -> Result<DeliveryReport> {
        match record.media_type {
            MediaType::Image => self.send_picture(record).await,
            media_type => Err(Error::UnsupportedMedia {
                backend: Backend::TamTam,
                media_type,
            }),
        }
    }

    async fn send_text(&self, chat_id: i64, text: &str) -> Result<()> {
        let message = Message {
            text,
            attachments: Vec::new(),
            notify: true,
        };
        if let PostOutcome::RetriesExhausted { retries } =
            self.post_message(chat_id, &message).await?
        {
            warn!(retries, "Notification dropped after retries");
        }
        Ok(())
    }
}

fn attachment(kind: AttachmentType, token: String) -> Attachment {
    Attachment {
        kind,
        payload: AttachmentPayload { token },
    }
}

fn extract_token(kind: AttachmentType, body: &[u8]) -> Result<String> {
    let token_error = || {
        Error::upload(
            UploadStage::Token,
            format!("can't extract token from {}", String::from_utf8_lossy(body)),
        )
    };

    let token = match kind {
        AttachmentType::Image => serde_json::from_slice::<ImageUploadResponse>(body)
            .map_err(|_| token_error())?
            .photos
            .into_values()
            .find_map(|photo| photo.token.filter(|t| !t.is_empty())),
        AttachmentType::File => serde_json::from_slice::<FileUploadResponse>(body)
            .map_err(|_| token_error())?
            .token
            .filter(|t| !t.is_empty()),
    };

    token.ok_or_else(token_error)
}
