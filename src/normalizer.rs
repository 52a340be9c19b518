use crate::error::{Error, Result};
use crate::sources::{SHORT_DATE_FORMAT, page_url};
use crate::types::{Adapter, RawRecord, Record};
use chrono::NaiveDate;

/// Three spaces in a row mark where the API appends its advertising footer.
/// This is a guess tuned to the current API output and would also cut
/// legitimate text that happens to contain wide spacing.
const AD_MARKER: &str = "   ";

const SENTENCE_TERMINATORS: [char; 3] = ['.', '?', '!'];

/// Turn a raw source record into the canonical record for `processing_date`.
pub fn normalize(raw: RawRecord, source: Adapter, processing_date: NaiveDate) -> Result<Record> {
    let mut explanation = raw.explanation;
    if source == Adapter::Structured {
        strip_ads(&mut explanation);
    }

    let copyright = raw
        .copyright
        .map(|c| c.replace(['\r', '\n'], " ").trim().to_string())
        .filter(|c| !c.is_empty());

    let expected = processing_date.format(SHORT_DATE_FORMAT).to_string();
    let actual = raw.date.format(SHORT_DATE_FORMAT).to_string();
    if actual != expected {
        return Err(Error::Validation { expected, actual });
    }

    Ok(Record {
        copyright,
        date: raw.date,
        explanation: collapse_whitespace(&explanation),
        title: collapse_whitespace(&raw.title),
        media_type: raw.media_type,
        full_image_url: raw.full_image_url,
        url: raw.url,
        link: page_url(raw.date),
    })
}

/// Truncate at the first run of three or more spaces.
pub fn strip_ads(explanation: &mut String) {
    if let Some(index) = explanation.find(AD_MARKER) {
        explanation.truncate(index);
    }
}

/// Replace every run of whitespace with a single space and trim the ends.
pub fn collapse_whitespace(s: &str) -> String {
    s.split_ascii_whitespace().collect::<Vec<_>>().join(" ")
}

/// The first `count` sentences of `text`, terminators included. Returns the
/// whole text when it has fewer sentences.
pub fn first_sentences(text: &str, count: usize) -> &str {
    if count == 0 {
        return "";
    }
    text.match_indices(SENTENCE_TERMINATORS)
        .nth(count - 1)
        .map(|(index, terminator)| &text[..index + terminator.len()])
        .unwrap_or(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::apod_page::parse_page;
    use crate::types::MediaType;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 1, day).unwrap()
    }

    fn make_raw(explanation: &str) -> RawRecord {
        RawRecord {
            copyright: Some("\nAdam Block\n".to_string()),
            date: date(28),
            explanation: explanation.to_string(),
            title: "  The   Cone\nNebula ".to_string(),
            media_type: MediaType::Image,
            full_image_url: Some("https://apod.nasa.gov/apod/image/2001/big.jpg".to_string()),
            url: "https://apod.nasa.gov/apod/image/2001/small.jpg".to_string(),
        }
    }

    #[test]
    fn strip_ads_cuts_at_three_spaces() {
        let mut text = "Good text   Ad text".to_string();
        strip_ads(&mut text);
        assert_eq!(text, "Good text");
    }

    #[test]
    fn strip_ads_keeps_double_spaces() {
        let mut text = "Good  text".to_string();
        strip_ads(&mut text);
        assert_eq!(text, "Good  text");
    }

    #[test]
    fn collapse_whitespace_trims_and_joins() {
        assert_eq!(collapse_whitespace("  a \n\t b  c "), "a b c");
        assert_eq!(collapse_whitespace(" \n "), "");
    }

    #[test]
    fn first_sentences_includes_terminators() {
        assert_eq!(first_sentences("A. B. C.", 2), "A. B.");
        assert_eq!(first_sentences("Why? Because! Done.", 1), "Why?");
        assert_eq!(first_sentences("No terminator", 2), "No terminator");
        assert_eq!(first_sentences("One. Two.", 5), "One. Two.");
        assert_eq!(first_sentences("One.", 0), "");
    }

    #[test]
    fn normalize_structured_record() {
        let record = normalize(
            make_raw("Good text   Ad text"),
            Adapter::Structured,
            date(28),
        )
        .unwrap();

        assert_eq!(record.explanation, "Good text");
        assert_eq!(record.title, "The Cone Nebula");
        assert_eq!(record.copyright.as_deref(), Some("Adam Block"));
        assert_eq!(record.link, "https://apod.nasa.gov/apod/ap200128.html");
    }

    #[test]
    fn normalize_html_record_keeps_wide_spacing() {
        let record = normalize(make_raw("Good text   more text"), Adapter::Html, date(28)).unwrap();
        assert_eq!(record.explanation, "Good text more text");
    }

    #[test]
    fn normalize_blank_copyright_becomes_none() {
        let mut raw = make_raw("x");
        raw.copyright = Some("\n".to_string());
        let record = normalize(raw, Adapter::Structured, date(28)).unwrap();
        assert_eq!(record.copyright, None);
    }

    #[test]
    fn normalize_rejects_stale_date() {
        let err = normalize(make_raw("x"), Adapter::Structured, date(29)).unwrap_err();
        match err {
            Error::Validation { expected, actual } => {
                assert_eq!(expected, "200129");
                assert_eq!(actual, "200128");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    fn structured_fixture(json: &str) -> RawRecord {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn image_sources_normalize_to_same_record() {
        let api = normalize(
            structured_fixture(include_str!("../testdata/api-2020-01-28.json")),
            Adapter::Structured,
            date(28),
        )
        .unwrap();
        let html = normalize(
            parse_page(include_str!("../testdata/ap200128.html")).unwrap(),
            Adapter::Html,
            date(28),
        )
        .unwrap();

        assert_eq!(api.copyright.as_deref(), Some("Adam Block"));
        assert_eq!(html.copyright, None);
        assert_eq!(Record { copyright: None, ..api }, html);
    }

    #[test]
    fn video_sources_normalize_to_same_record() {
        let api = normalize(
            structured_fixture(include_str!("../testdata/api-2020-01-21.json")),
            Adapter::Structured,
            date(21),
        )
        .unwrap();
        let html = normalize(
            parse_page(include_str!("../testdata/ap200121.html")).unwrap(),
            Adapter::Html,
            date(21),
        )
        .unwrap();

        assert_eq!(api, html);
        assert_eq!(api.media_type, MediaType::Video);
    }
}
