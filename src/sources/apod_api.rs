use crate::error::{Error, Result};
use crate::sources::PictureSource;
use crate::transport::{Request, Transport};
use crate::types::{Adapter, RawRecord};
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{debug, info};

const HOST: &str = "https://api.nasa.gov";
const PATH: &str = "/planetary/apod";

pub const DEMO_API_KEY: &str = "DEMO_KEY";

/// The structured APOD API (`api.nasa.gov`).
pub struct ApodApiSource<T> {
    transport: Arc<T>,
    api_key: String,
}

impl<T: Transport> ApodApiSource<T> {
    pub fn new(transport: Arc<T>, api_key: String) -> Self {
        Self { transport, api_key }
    }

    fn url(&self, date: NaiveDate) -> String {
        format!(
            "{}{}?api_key={}&date={}",
            HOST,
            PATH,
            urlencoding::encode(&self.api_key),
            date.format("%F")
        )
    }
}

impl<T: Transport> PictureSource for ApodApiSource<T> {
    fn adapter(&self) -> Adapter {
        Adapter::Structured
    }

    async fn fetch(&self, date: NaiveDate) -> Result<RawRecord> {
        let resp = self.transport.execute(Request::get(self.url(date))).await?;
        info!(status = %resp.status, "APOD API response");

        if !resp.status.is_success() {
            return Err(Error::Fetch {
                adapter: Adapter::Structured,
                status: resp.status,
                body: resp.text(),
            });
        }

        debug!(body = %resp.text(), "APOD API body");
        serde_json::from_slice(&resp.body).map_err(|_| Error::Parse {
            adapter: Adapter::Structured,
            field: "body",
        })
    }
}
