use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Image,
    Video,
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Image => write!(f, "image"),
            Self::Video => write!(f, "video"),
        }
    }
}

/// A picture entry as returned by one of the sources, before normalization.
///
/// Field names follow the APOD API so the structured source decodes straight
/// into this type.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RawRecord {
    #[serde(default)]
    pub copyright: Option<String>,
    pub date: NaiveDate,
    pub explanation: String,
    pub title: String,
    pub media_type: MediaType,
    #[serde(rename = "hdurl", default)]
    pub full_image_url: Option<String>,
    pub url: String,
}

/// The normalized picture of the day. Only `normalizer::normalize` builds one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub copyright: Option<String>,
    pub date: NaiveDate,
    pub explanation: String,
    pub title: String,
    pub media_type: MediaType,
    pub full_image_url: Option<String>,
    pub url: String,
    pub link: String,
}

/// Which source adapter produced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Adapter {
    Structured,
    Html,
}

impl fmt::Display for Adapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Structured => write!(f, "structured"),
            Self::Html => write!(f, "html"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    Telegram,
    TamTam,
}

impl Backend {
    /// Identifier used on the command line and as the status file key.
    pub fn id(&self) -> &'static str {
        match self {
            Self::Telegram => "tg",
            Self::TamTam => "tt",
        }
    }
}

impl FromStr for Backend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tg" => Ok(Self::Telegram),
            "tt" => Ok(Self::TamTam),
            other => anyhow::bail!("Invalid service: {}. Valid values are: tg, tt", other),
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Telegram => write!(f, "Telegram"),
            Self::TamTam => write!(f, "TamTam"),
        }
    }
}

/// Something that went wrong without aborting the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    StructuredSourceFailed(String),
    AttachmentTooLarge { url: String, length: u64 },
    RetriesExhausted { retries: u32 },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StructuredSourceFailed(reason) => {
                write!(f, "APOD API failed, falling back to the web page: {}", reason)
            }
            Self::AttachmentTooLarge { url, length } => {
                write!(f, "Picture is too big for Telegram ({} bytes): {}", length, url)
            }
            Self::RetriesExhausted { retries } => {
                write!(f, "Max send retries exceeded ({} retries)", retries)
            }
        }
    }
}
