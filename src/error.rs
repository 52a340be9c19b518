//! Error types shared by the sources, the normalizer and the senders.

use crate::types::{Adapter, Backend, MediaType};
use reqwest::StatusCode;
use std::fmt;
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Step of the two-phase attachment upload that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStage {
    RequestUrl,
    Download,
    Transfer,
    Token,
}

impl fmt::Display for UploadStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RequestUrl => write!(f, "upload URL request"),
            Self::Download => write!(f, "source download"),
            Self::Transfer => write!(f, "transfer"),
            Self::Token => write!(f, "token extraction"),
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("{adapter} source returned {status}: {body}")]
    Fetch {
        adapter: Adapter,
        status: StatusCode,
        body: String,
    },
    #[error("Failed to parse {field} from {adapter} source")]
    Parse {
        adapter: Adapter,
        field: &'static str,
    },
    #[error("Picture's date {actual} doesn't match current date {expected}")]
    Validation { expected: String, actual: String },
    #[error("Unsupported {backend} media_type {media_type}")]
    UnsupportedMedia {
        backend: Backend,
        media_type: MediaType,
    },
    #[error("Attachment upload failed at {stage}: {detail}")]
    Upload { stage: UploadStage, detail: String },
    #[error("{backend} returned {status}: {body}")]
    Delivery {
        backend: Backend,
        status: StatusCode,
        body: String,
    },
    #[error("Failed to download {url}: {status}")]
    Download { url: String, status: StatusCode },
    #[error("Invalid URL {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn upload(stage: UploadStage, detail: impl Into<String>) -> Self {
        Self::Upload {
            stage,
            detail: detail.into(),
        }
    }
}
