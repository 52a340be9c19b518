use crate::error::Result;
use crate::types::Backend;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::warn;

const STATUS_FILE_NAME: &str = "status.json";

// ============================================================================
// StatusStore trait
// ============================================================================

/// Last successfully delivered date per backend.
#[allow(async_fn_in_trait)]
pub trait StatusStore: Send + Sync {
    async fn last_sent(&self, backend: Backend) -> Result<Option<NaiveDate>>;
    async fn record_sent(&self, backend: Backend, date: NaiveDate) -> Result<()>;
}

// ============================================================================
// JsonFileStatus: `{"tg": {"LastSentDate": "2020-04-04"}}`
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct BackendStatus {
    #[serde(rename = "LastSentDate", default)]
    last_sent_date: String,
}

pub struct JsonFileStatus {
    path: PathBuf,
}

impl JsonFileStatus {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// `status.json` next to the running executable.
    pub fn default_path() -> Result<PathBuf> {
        let exe = std::env::current_exe()?;
        let dir = exe.parent().unwrap_or_else(|| Path::new("."));
        Ok(dir.join(STATUS_FILE_NAME))
    }

    // A missing or corrupt file reads as empty so the first run still sends.
    async fn read(&self) -> BTreeMap<String, BackendStatus> {
        let body = match tokio::fs::read(&self.path).await {
            Ok(body) => body,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Can't read status file");
                return BTreeMap::new();
            }
        };
        serde_json::from_slice(&body).unwrap_or_else(|e| {
            warn!(
                path = %self.path.display(),
                error = %e,
                "Can't parse status file, its entries will be lost on the next write"
            );
            BTreeMap::new()
        })
    }
}

impl StatusStore for JsonFileStatus {
    async fn last_sent(&self, backend: Backend) -> Result<Option<NaiveDate>> {
        let status = self.read().await;
        Ok(status
            .get(backend.id())
            .and_then(|s| NaiveDate::parse_from_str(&s.last_sent_date, "%F").ok()))
    }

    async fn record_sent(&self, backend: Backend, date: NaiveDate) -> Result<()> {
        let mut status = self.read().await;
        status.insert(
            backend.id().to_string(),
            BackendStatus {
                last_sent_date: date.format("%F").to_string(),
            },
        );
        let body = serde_json::to_vec(&status)?;
        tokio::fs::write(&self.path, body).await?;
        Ok(())
    }
}

// ============================================================================
// Test utilities: InMemoryStatus for in-crate tests
// ============================================================================
