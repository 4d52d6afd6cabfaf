// src/batch/mod.rs

use anyhow::{anyhow, Context, Result};
use futures::FutureExt;
use std::{any::Any, fmt, panic::AssertUnwindSafe, time::Duration};
use tracing::{info, instrument, warn};

use crate::browser::{within_frame, Browser, Locator};
use crate::extract::extract;
use crate::fetch::build_detail_url;
use crate::record::{ArticleFields, ArticleRecord, WorklistRow};

/// Where a row's pipeline was when it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Navigating,
    FrameWait,
    Extracting,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Navigating => "navigating",
            Stage::FrameWait => "waiting for frame",
            Stage::Extracting => "extracting",
        })
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

/// Navigate → wait for the content frame → extract inside it.
async fn process_row<B: Browser + ?Sized>(browser: &B, url: &str, timeout: Duration) -> Result<ArticleFields> {
    browser.navigate(url).await.context(Stage::Navigating)?;

    let frame = browser
        .wait_for(&Locator::tag("iframe"), timeout)
        .await
        .context(Stage::FrameWait)?
        .ok_or_else(|| anyhow!("no iframe within {:?}", timeout))
        .context(Stage::FrameWait)?;

    within_frame(browser, frame, || extract(browser, timeout))
        .await
        .context(Stage::Extracting)
}

/// Fetches and extracts every worklist row in order, one at a time, on the
/// shared session. Always returns exactly one record per row: a row whose
/// pipeline fails (or panics) becomes [`ArticleRecord::failed`].
#[instrument(level = "info", skip_all, fields(rows = rows.len()))]
pub async fn run<B: Browser + ?Sized>(
    browser: &B,
    rows: &[WorklistRow],
    timeout: Duration,
) -> Vec<ArticleRecord> {
    let total = rows.len();
    let mut records = Vec::with_capacity(total);
    let mut failed = 0usize;

    for (i, row) in rows.iter().enumerate() {
        let url = build_detail_url(&row.article_id);
        info!(row = i + 1, total, article = %row.article_id, %url, "fetching article");

        let outcome = AssertUnwindSafe(process_row(browser, &url, timeout))
            .catch_unwind()
            .await;

        let record = match outcome {
            Ok(Ok(fields)) => ArticleRecord::extracted(row, fields),
            Ok(Err(e)) => {
                failed += 1;
                warn!(article = %row.article_id, error = %format!("{:#}", e), "article failed");
                ArticleRecord::failed(row)
            }
            Err(panic) => {
                failed += 1;
                warn!(article = %row.article_id, panic = %panic_message(&*panic), "article panicked");
                ArticleRecord::failed(row)
            }
        };
        records.push(record);
    }

    info!(total, failed, "batch finished");
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::{SnapshotBrowser, SnapshotPage};
    use crate::extract::tests::{article_frame, WAIT};
    use crate::record::ERROR_MARKER;
    use tracing_subscriber::{EnvFilter, FmtSubscriber};

    fn init_tracing() {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
            )
            .with_test_writer()
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }

    fn row(number: &str, id: &str) -> WorklistRow {
        WorklistRow {
            number: number.to_string(),
            article_id: id.to_string(),
        }
    }

    const SECTIONS: &str = "<table><tr><td>回答</td></tr><tr><td>a</td></tr></table>";

    fn browser_with(ids: &[(&str, &str)]) -> SnapshotBrowser {
        let b = SnapshotBrowser::new();
        for (id, title) in ids {
            b.add_page(
                build_detail_url(id),
                SnapshotPage::framed(article_frame(title, SECTIONS)),
            );
        }
        b
    }

    #[tokio::test]
    async fn one_record_per_row_in_order() {
        init_tracing();
        let b = browser_with(&[("a-1", "first"), ("c-3", "third")]);
        b.add_page(
            build_detail_url("d-4"),
            SnapshotPage::new("<html><body>no frame here</body></html>"),
        );
        let rows = vec![
            row("1", "a-1"),
            row("2", "b-2"),
            row("", "c-3"),
            row("4", "d-4"),
            row("5", "a-1"),
        ];

        let out = run(&b, &rows, WAIT).await;

        assert_eq!(out.len(), rows.len());
        for (rec, row) in out.iter().zip(&rows) {
            assert_eq!(rec.number, row.number);
            assert_eq!(rec.article_id, row.article_id);
        }
        let titles: Vec<_> = out.iter().map(|r| r.fields.title.as_str()).collect();
        assert_eq!(titles, ["first", ERROR_MARKER, "third", ERROR_MARKER, "first"]);
        assert_eq!(out[0].fields.answer, "a");
        assert!(!b.in_frame());
    }

    #[tokio::test]
    async fn unreachable_article_becomes_error_record() {
        init_tracing();
        let b = SnapshotBrowser::new();
        let out = run(&b, &[row("7", "AB-123")], WAIT).await;

        assert_eq!(out, vec![ArticleRecord::failed(&row("7", "AB-123"))]);
        let rec = &out[0];
        assert_eq!(rec.fields.title, ERROR_MARKER);
        assert_eq!(
            rec.fields,
            ArticleFields {
                title: ERROR_MARKER.to_string(),
                ..Default::default()
            }
        );
    }

    #[tokio::test]
    async fn failure_does_not_leak_into_next_row() {
        init_tracing();
        let b = browser_with(&[("ok", "fine")]);
        let out = run(&b, &[row("1", "missing"), row("2", "ok")], WAIT).await;
        assert_eq!(out[0].fields.title, ERROR_MARKER);
        assert_eq!(out[1].fields.title, "fine");
        assert_eq!(out[1].fields.article_number, "KB-000123");
    }

    #[tokio::test]
    async fn empty_worklist_gives_empty_output() {
        let b = SnapshotBrowser::new();
        assert!(run(&b, &[], WAIT).await.is_empty());
    }

    #[test]
    fn stage_names() {
        let err = Err::<(), _>(anyhow!("timeout")).context(Stage::FrameWait).unwrap_err();
        assert_eq!(format!("{:#}", err), "waiting for frame: timeout");
    }

    #[test]
    fn panic_payloads() {
        let boxed: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(&*boxed), "static");
        let boxed: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(&*boxed), "owned");
        let boxed: Box<dyn Any + Send> = Box::new(3u8);
        assert_eq!(panic_message(&*boxed), "unknown panic");
    }
}
