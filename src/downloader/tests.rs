//! Tests for the downloader module.

use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use chrono::NaiveDate;
use serde_json::json;

use super::*;
use crate::types::SeedResponse;

/// Counting [`InvoiceApi`] that serves `content-of-{filename}` after a short delay.
#[derive(Default)]
struct MockApi {
    failing: HashSet<String>,
    delay: Duration,
    requested: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockApi {
    fn new(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    fn failing(mut self, filename: &str) -> Self {
        self.failing.insert(filename.to_string());
        self
    }

    fn requested(&self) -> Vec<String> {
        let mut names = self.requested.lock().unwrap().clone();
        names.sort();
        names
    }
}

#[async_trait::async_trait]
impl InvoiceApi for MockApi {
    async fn fetch_seed(&self) -> Result<SeedResponse> {
        unreachable!("downloader never requests the seed")
    }

    async fn fetch_invoice(&self, filename: &str) -> Result<Vec<u8>> {
        self.requested.lock().unwrap().push(filename.to_string());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        tokio::time::sleep(self.delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing.contains(filename) {
            return Err(Error::Remote {
                status: 404,
                body: "Not Found".into(),
            });
        }
        Ok(format!("content-of-{filename}").into_bytes())
    }
}

fn record(url: &str) -> InvoiceRecord {
    InvoiceRecord::new(
        None,
        NaiveDate::from_ymd_opt(2030, 1, 1).unwrap(),
        url,
        json!({ "invoice": url }).as_object().cloned().unwrap(),
    )
}

fn records(n: usize) -> Vec<InvoiceRecord> {
    (1..=n)
        .map(|i| record(&format!("http://example.com/invoices/invoice{i}.pdf")))
        .collect()
}

// -----------------------------------------------------------------------
// derive_filename
// -----------------------------------------------------------------------

#[test]
fn derive_filename_trims_trailing_space() {
    assert_eq!(
        derive_filename("http://host/invoices/Invoice123.pdf "),
        "Invoice123.pdf"
    );
}

#[test]
fn derive_filename_handles_relative_and_bare_names() {
    assert_eq!(derive_filename("/invoices/7.jpg"), "7.jpg");
    assert_eq!(derive_filename("  plain.pdf\t"), "plain.pdf");
    assert_eq!(derive_filename("http://host/invoices/"), "");
}

#[test]
fn check_filename_rejects_traversal_and_empty() {
    assert!(check_filename("").is_err());
    assert!(check_filename(".").is_err());
    assert!(check_filename("..").is_err());
    assert!(check_filename("..\\secret").is_err());
    assert!(check_filename("Invoice123.pdf").is_ok());
}

// -----------------------------------------------------------------------
// download_all
// -----------------------------------------------------------------------

#[tokio::test]
async fn one_request_per_record_and_files_written() {
    let dir = tempfile::tempdir().unwrap();
    let api = Arc::new(MockApi::new(Duration::from_millis(5)));
    let downloader = Downloader::new(api.clone(), dir.path(), 3);
    assert_eq!(downloader.invoice_dir(), dir.path());

    let report = downloader.download_all(&records(7)).await;

    assert_eq!(report.attempted, 7);
    assert_eq!(report.downloaded.len(), 7);
    assert!(report.is_complete());
    assert_eq!(api.requested().len(), 7, "exactly one GET per record");

    let content = std::fs::read(dir.path().join("invoice4.pdf")).unwrap();
    assert_eq!(content, b"content-of-invoice4.pdf");
}

#[tokio::test]
async fn never_exceeds_concurrency_limit() {
    let dir = tempfile::tempdir().unwrap();
    let api = Arc::new(MockApi::new(Duration::from_millis(30)));
    let downloader = Downloader::new(api.clone(), dir.path(), 3);

    downloader.download_all(&records(12)).await;

    let peak = api.max_in_flight.load(Ordering::SeqCst);
    assert!(peak <= 3, "peak in-flight was {peak}");
    assert!(peak > 1, "downloads should overlap, peak was {peak}");
}

#[tokio::test]
async fn zero_concurrency_is_clamped_to_one() {
    let dir = tempfile::tempdir().unwrap();
    let api = Arc::new(MockApi::new(Duration::from_millis(1)));
    let downloader = Downloader::new(api.clone(), dir.path(), 0);

    let report = downloader.download_all(&records(3)).await;

    assert_eq!(report.downloaded.len(), 3);
    assert_eq!(api.max_in_flight.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn one_failure_among_five_keeps_the_other_four() {
    let dir = tempfile::tempdir().unwrap();
    let api = Arc::new(MockApi::new(Duration::from_millis(5)).failing("invoice3.pdf"));
    let downloader = Downloader::new(api.clone(), dir.path(), 5);

    let report = downloader.download_all(&records(5)).await;

    assert_eq!(api.requested().len(), 5, "failure must not cancel siblings");
    assert_eq!(report.downloaded.len(), 4);
    for i in [1, 2, 4, 5] {
        assert!(
            dir.path().join(format!("invoice{i}.pdf")).exists(),
            "invoice{i}.pdf should be on disk"
        );
    }
    assert!(!dir.path().join("invoice3.pdf").exists());

    let err = report.into_result().unwrap_err();
    match err {
        Error::Download(DownloadError::Incomplete { attempted, failures }) => {
            assert_eq!(attempted, 5);
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].filename, "invoice3.pdf");
            assert!(failures[0].cause.contains("404"), "cause: {}", failures[0].cause);
        }
        other => panic!("expected incomplete download error, got {other:?}"),
    }
}

#[tokio::test]
async fn existing_file_is_overwritten() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("invoice1.pdf"), b"stale and much longer content").unwrap();
    let api = Arc::new(MockApi::new(Duration::ZERO));
    let downloader = Downloader::new(api, dir.path(), 2);

    downloader.download_all(&records(1)).await.into_result().unwrap();

    let content = std::fs::read(dir.path().join("invoice1.pdf")).unwrap();
    assert_eq!(content, b"content-of-invoice1.pdf");
}

#[tokio::test]
async fn unusable_filename_fails_without_request() {
    let dir = tempfile::tempdir().unwrap();
    let api = Arc::new(MockApi::new(Duration::ZERO));
    let downloader = Downloader::new(api.clone(), dir.path(), 2);

    let report = downloader
        .download_all(&[record("http://example.com/invoices/"), record("/invoices/..")])
        .await;

    assert_eq!(report.attempted, 2);
    assert_eq!(report.failures.len(), 2);
    assert!(api.requested().is_empty());
}

#[tokio::test]
async fn missing_directory_is_reported_per_unit() {
    let dir = tempfile::tempdir().unwrap();
    let api = Arc::new(MockApi::new(Duration::ZERO));
    let downloader = Downloader::new(api, dir.path().join("absent"), 2);

    let report = downloader.download_all(&records(2)).await;

    assert_eq!(report.failures.len(), 2);
    assert!(report.failures[0].cause.contains("Failed to write"));
}

#[tokio::test]
async fn empty_record_set_is_complete() {
    let dir = tempfile::tempdir().unwrap();
    let api = Arc::new(MockApi::new(Duration::ZERO));
    let downloader = Downloader::new(api, dir.path(), 4);

    let report = downloader.download_all(&[]).await;

    assert_eq!(report.attempted, 0);
    assert!(report.into_result().is_ok());
}

#[tokio::test]
async fn events_are_published_per_unit() {
    let dir = tempfile::tempdir().unwrap();
    let api = Arc::new(MockApi::new(Duration::ZERO).failing("invoice2.pdf"));
    let (tx, mut rx) = broadcast::channel(16);
    let downloader = Downloader::new(api, dir.path(), 1).with_events(tx);

    downloader.download_all(&records(2)).await;

    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    assert!(events.contains(&Event::InvoiceDownloaded {
        filename: "invoice1.pdf".into(),
        size_bytes: "content-of-invoice1.pdf".len() as u64,
    }));
    assert!(events.iter().any(|e| matches!(
        e,
        Event::InvoiceFailed { filename, .. } if filename == "invoice2.pdf"
    )));
}
