use crate::error::Result;
use crate::normalizer::normalize;
use crate::sources::PictureSource;
use crate::types::{Adapter, Record, Warning};
use chrono::NaiveDate;
use tracing::{info, warn};

/// Outcome of a successful acquisition.
#[derive(Debug)]
pub struct Acquired {
    pub record: Record,
    pub source: Adapter,
    pub warnings: Vec<Warning>,
}

/// Tries the primary source, then the fallback exactly once.
pub struct Acquisition<P, F> {
    primary: P,
    fallback: F,
}

impl<P: PictureSource, F: PictureSource> Acquisition<P, F> {
    pub fn new(primary: P, fallback: F) -> Self {
        Self { primary, fallback }
    }

    pub async fn acquire(&self, date: NaiveDate) -> Result<Acquired> {
        let mut warnings = Vec::new();

        let (raw, source) = match self.primary.fetch(date).await {
            Ok(raw) => (raw, self.primary.adapter()),
            Err(e) => {
                warn!(source = %self.primary.adapter(), error = %e, "Primary source failed, trying fallback");
                warnings.push(Warning::StructuredSourceFailed(e.to_string()));
                (self.fallback.fetch(date).await?, self.fallback.adapter())
            }
        };

        let record = normalize(raw, source, date)?;
        info!(%source, media_type = %record.media_type, title = %record.title, "Picture acquired");

        Ok(Acquired {
            record,
            source,
            warnings,
        })
    }
}
