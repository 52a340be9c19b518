//! One daily run: skip if already delivered, acquire, route, deliver, record.

use crate::acquisition::Acquisition;
use crate::config::BotConfig;
use crate::error::Result;
use crate::notifier::Notifier;
use crate::senders::{Sender, route};
use crate::sources::PictureSource;
use crate::status::StatusStore;
use crate::transport::Transport;
use crate::types::{Adapter, Warning};
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, PartialEq, Eq)]
pub enum RunOutcome {
    AlreadySent,
    Delivered {
        source: Adapter,
        warnings: Vec<Warning>,
    },
}

/// Deliver today's picture unless the status store says it already went out.
///
/// The status store is only written after the sender finished without error,
/// so a failed run is retried from scratch by the next invocation.
pub async fn run<T, P, F, S, N>(
    bot: &BotConfig,
    transport: Arc<T>,
    acquisition: &Acquisition<P, F>,
    status: &S,
    notifier: &N,
    today: NaiveDate,
) -> Result<RunOutcome>
where
    T: Transport,
    P: PictureSource,
    F: PictureSource,
    S: StatusStore,
    N: Notifier,
{
    let last_sent = status.last_sent(bot.backend).await?;
    info!(backend = %bot.backend, last_sent = ?last_sent, "Last sent date");
    if last_sent == Some(today) {
        info!("Nothing to do");
        return Ok(RunOutcome::AlreadySent);
    }

    let acquired = acquisition.acquire(today).await?;
    let mut warnings = acquired.warnings;
    forward(notifier, &warnings).await;

    let sender = route(bot, transport, acquired.record.media_type)?;
    let report = sender.send(&acquired.record).await?;
    forward(notifier, &report.warnings).await;
    warnings.extend(report.warnings);

    status.record_sent(bot.backend, today).await?;
    info!(backend = %bot.backend, date = %today, "Picture delivered");

    Ok(RunOutcome::Delivered {
        source: acquired.source,
        warnings,
    })
}

async fn forward<N: Notifier>(notifier: &N, warnings: &[Warning]) {
    for warning in warnings {
        warn!(%warning, "Run warning");
        notifier.notify_or_log(&warning.to_string()).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetryPolicy;
    use crate::error::Error;
    use crate::notifier::test_utils::RecordingNotifier;
    use crate::sources::{ApodApiSource, ApodPageSource};
    use crate::status::test_utils::InMemoryStatus;
    use crate::test_utils::FakeTransport;
    use crate::types::{Backend, MediaType};

    const API_IMAGE: &str = include_str!("../testdata/api-2020-01-28.json");
    const API_VIDEO: &str = include_str!("../testdata/api-2020-01-21.json");
    const PAGE_VIDEO: &str = include_str!("../testdata/ap200121.html");

    type FakeAcquisition = Acquisition<ApodApiSource<FakeTransport>, ApodPageSource<FakeTransport>>;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 1, d).unwrap()
    }

    fn bot(backend: Backend) -> BotConfig {
        BotConfig {
            backend,
            token: "token".to_string(),
            chat_id: 42,
            error_chat_id: None,
            retry: RetryPolicy::default(),
        }
    }

    fn acquisition(transport: &Arc<FakeTransport>) -> FakeAcquisition {
        Acquisition::new(
            ApodApiSource::new(Arc::clone(transport), "DEMO_KEY".to_string()),
            ApodPageSource::new(Arc::clone(transport)),
        )
    }

    #[tokio::test]
    async fn run_skips_when_already_sent_today() {
        let transport = Arc::new(FakeTransport::new());
        let status = InMemoryStatus::new().with_date(Backend::Telegram, day(21));
        let notifier = RecordingNotifier::default();

        let outcome = run(
            &bot(Backend::Telegram),
            Arc::clone(&transport),
            &acquisition(&transport),
            &status,
            &notifier,
            day(21),
        )
        .await
        .unwrap();

        assert_eq!(outcome, RunOutcome::AlreadySent);
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn run_delivers_and_records_date() {
        let transport = Arc::new(
            FakeTransport::new()
                .respond("api.nasa.gov", 200, API_VIDEO)
                .respond("sendMessage", 200, r#"{"ok":true}"#),
        );
        let status = InMemoryStatus::new().with_date(Backend::Telegram, day(20));
        let notifier = RecordingNotifier::default();

        let outcome = run(
            &bot(Backend::Telegram),
            Arc::clone(&transport),
            &acquisition(&transport),
            &status,
            &notifier,
            day(21),
        )
        .await
        .unwrap();

        assert_eq!(
            outcome,
            RunOutcome::Delivered {
                source: Adapter::Structured,
                warnings: Vec::new()
            }
        );
        assert_eq!(status.get(Backend::Telegram), Some(day(21)));
        assert!(notifier.messages().is_empty());
    }

    #[tokio::test]
    async fn run_forwards_fallback_warning() {
        let transport = Arc::new(
            FakeTransport::new()
                .respond("api.nasa.gov", 500, "Internal Server Error")
                .respond("ap200121.html", 200, PAGE_VIDEO)
                .respond("sendMessage", 200, r#"{"ok":true}"#),
        );
        let status = InMemoryStatus::new();
        let notifier = RecordingNotifier::default();

        let outcome = run(
            &bot(Backend::Telegram),
            Arc::clone(&transport),
            &acquisition(&transport),
            &status,
            &notifier,
            day(21),
        )
        .await
        .unwrap();

        assert!(matches!(
            outcome,
            RunOutcome::Delivered {
                source: Adapter::Html,
                ..
            }
        ));
        let messages = notifier.messages();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("falling back"));
        assert_eq!(status.get(Backend::Telegram), Some(day(21)));
    }

    #[tokio::test]
    async fn run_stale_record_aborts_before_delivery() {
        let transport = Arc::new(FakeTransport::new().respond("api.nasa.gov", 200, API_IMAGE));
        let status = InMemoryStatus::new();
        let notifier = RecordingNotifier::default();

        let err = run(
            &bot(Backend::Telegram),
            Arc::clone(&transport),
            &acquisition(&transport),
            &status,
            &notifier,
            day(29),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, Error::Validation { .. }));
        assert_eq!(transport.request_count(), 1);
        assert_eq!(status.get(Backend::Telegram), None);
    }

    #[tokio::test]
    async fn run_unsupported_media_leaves_status_untouched() {
        let transport = Arc::new(FakeTransport::new().respond("api.nasa.gov", 200, API_VIDEO));
        let status = InMemoryStatus::new();
        let notifier = RecordingNotifier::default();

        let err = run(
            &bot(Backend::TamTam),
            Arc::clone(&transport),
            &acquisition(&transport),
            &status,
            &notifier,
            day(21),
        )
        .await
        .unwrap_err();

        assert!(matches!(
            err,
            Error::UnsupportedMedia {
                backend: Backend::TamTam,
                media_type: MediaType::Video
            }
        ));
        assert_eq!(status.get(Backend::TamTam), None);
    }

    #[tokio::test]
    async fn run_delivery_failure_leaves_status_untouched() {
        let transport = Arc::new(
            FakeTransport::new()
                .respond("api.nasa.gov", 200, API_VIDEO)
                .respond("sendMessage", 403, r#"{"ok":false}"#),
        );
        let status = InMemoryStatus::new().with_date(Backend::Telegram, day(20));
        let notifier = RecordingNotifier::default();

        let err = run(
            &bot(Backend::Telegram),
            Arc::clone(&transport),
            &acquisition(&transport),
            &status,
            &notifier,
            day(21),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, Error::Delivery { .. }));
        assert_eq!(status.get(Backend::Telegram), Some(day(20)));
    }
}
