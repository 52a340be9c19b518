use crate::error::Result;
use crate::types::{Adapter, RawRecord};
use chrono::NaiveDate;

pub mod apod_api;
pub mod apod_page;

pub use apod_api::ApodApiSource;
pub use apod_page::ApodPageSource;

pub const SITE_URL: &str = "https://apod.nasa.gov/apod/";

/// Date scheme of the page path, also used to compare record dates.
pub const SHORT_DATE_FORMAT: &str = "%y%m%d";

// ============================================================================
// PictureSource trait
// ============================================================================

#[allow(async_fn_in_trait)]
pub trait PictureSource: Send + Sync {
    fn adapter(&self) -> Adapter;

    /// Fetch the raw picture record published for `date`.
    async fn fetch(&self, date: NaiveDate) -> Result<RawRecord>;
}

/// Public page for a date, e.g. `https://apod.nasa.gov/apod/ap200128.html`.
pub fn page_url(date: NaiveDate) -> String {
    format!("{}ap{}.html", SITE_URL, date.format(SHORT_DATE_FORMAT))
}
