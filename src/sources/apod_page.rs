//! Fallback source: scrape the public APOD page for the day.
//!
//! The page has no semantic markup, so values are picked by position. This
//! breaks whenever the site layout changes.

use crate::error::{Error, Result};
use crate::normalizer::collapse_whitespace;
use crate::sources::{PictureSource, SITE_URL, page_url};
use crate::transport::{Request, Transport};
use crate::types::{Adapter, MediaType, RawRecord};
use chrono::NaiveDate;
use scraper::{ElementRef, Html, Selector};
use std::sync::Arc;
use tracing::info;
use url::Url;

const TITLE: &str = "body > center:nth-of-type(2) > b:nth-of-type(1)";
const EXPLANATION: &str = "body > p:nth-of-type(1)";
const MEDIA_BLOCK: &str = "body > center:nth-of-type(1) > p:nth-of-type(2)";
const IMAGE: &str = "body > center:nth-of-type(1) > p:nth-of-type(2) > a > img";
const VIDEO: &str = "body > center:nth-of-type(1) > p:nth-of-type(2) > iframe";

const EXPLANATION_LABEL: &str = "Explanation:";
const PAGE_DATE_FORMAT: &str = "%Y %B %d";

pub struct ApodPageSource<T> {
    transport: Arc<T>,
}

impl<T: Transport> ApodPageSource<T> {
    pub fn new(transport: Arc<T>) -> Self {
        Self { transport }
    }
}

impl<T: Transport> PictureSource for ApodPageSource<T> {
    fn adapter(&self) -> Adapter {
        Adapter::Html
    }

    async fn fetch(&self, date: NaiveDate) -> Result<RawRecord> {
        let resp = self.transport.execute(Request::get(page_url(date))).await?;
        info!(status = %resp.status, "APOD page response");

        if !resp.status.is_success() {
            return Err(Error::Fetch {
                adapter: Adapter::Html,
                status: resp.status,
                body: resp.text(),
            });
        }

        parse_page(&resp.text())
    }
}

/// Extract a raw record from an APOD day page.
pub fn parse_page(html: &str) -> Result<RawRecord> {
    let document = Html::parse_document(html);

    let title = select_first(&document, TITLE, "title")?
        .ok_or(parse_error("title"))
        .map(inner_text)?;

    let explanation = select_first(&document, EXPLANATION, "explanation")?
        .ok_or(parse_error("explanation"))
        .map(inner_text)?
        .replacen(EXPLANATION_LABEL, "", 1);

    let (media_type, url, full_image_url) = match select_first(&document, IMAGE, "image")? {
        Some(img) => {
            let (url, full) = image_urls(img)?;
            (MediaType::Image, url, Some(full))
        }
        None => {
            let iframe = select_first(&document, VIDEO, "media")?.ok_or(parse_error("media"))?;
            let src = iframe
                .value()
                .attr("src")
                .ok_or(parse_error("media"))?
                .to_string();
            (MediaType::Video, src, None)
        }
    };

    let date_text = select_first(&document, MEDIA_BLOCK, "date")?
        .ok_or(parse_error("date"))
        .map(inner_text)?;
    let date = NaiveDate::parse_from_str(&collapse_whitespace(&date_text), PAGE_DATE_FORMAT)
        .map_err(|_| parse_error("date"))?;

    Ok(RawRecord {
        copyright: None,
        date,
        explanation,
        title,
        media_type,
        full_image_url,
        url,
    })
}

/// Thumbnail URL from the `<img>` and full-resolution URL from its enclosing link.
fn image_urls(img: ElementRef<'_>) -> Result<(String, String)> {
    let src = img.value().attr("src").ok_or(parse_error("image"))?;
    let href = img
        .parent()
        .and_then(ElementRef::wrap)
        .and_then(|link| link.value().attr("href"))
        .ok_or(parse_error("image"))?;

    Ok((resolve(src)?, resolve(href)?))
}

fn resolve(path: &str) -> Result<String> {
    Url::parse(SITE_URL)
        .and_then(|base| base.join(path))
        .map(String::from)
        .map_err(|source| Error::InvalidUrl {
            url: path.to_string(),
            source,
        })
}

fn select_first<'a>(
    document: &'a Html,
    css: &str,
    field: &'static str,
) -> Result<Option<ElementRef<'a>>> {
    let selector = selector(css, field)?;
    Ok(document.select(&selector).next())
}

fn selector(css: &str, field: &'static str) -> Result<Selector> {
    Selector::parse(css).map_err(|_| parse_error(field))
}

fn inner_text(element: ElementRef<'_>) -> String {
    element.text().collect()
}

fn parse_error(field: &'static str) -> Error {
    Error::Parse {
        adapter: Adapter::Html,
        field,
    }
}
