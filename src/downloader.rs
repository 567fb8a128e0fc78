//! Concurrent invoice downloader.
//!
//! Each filtered record becomes one independent download unit. Units run through
//! a buffered stream capped at the configured concurrency; a failing unit never
//! cancels its siblings, and the stage only returns once every unit finished.

use crate::client::InvoiceApi;
use crate::error::{DownloadError, Error, FailedDownload, Result};
use crate::types::{DownloadedInvoice, Event, InvoiceRecord};
use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Derive the local and remote filename of an invoice from its URL.
///
/// Takes the last `/`-separated segment and trims surrounding whitespace, so
/// `"http://host/invoices/Invoice123.pdf "` becomes `"Invoice123.pdf"`.
///
/// # Examples
///
/// ```
/// use invoice_dl::downloader::derive_filename;
///
/// assert_eq!(derive_filename("/invoices/1.jpg"), "1.jpg");
/// assert_eq!(derive_filename("http://host/invoices/Invoice123.pdf "), "Invoice123.pdf");
/// ```
#[must_use]
pub fn derive_filename(invoice_url: &str) -> &str {
    invoice_url.rsplit('/').next().unwrap_or_default().trim()
}

/// Outcome of the download stage
#[derive(Clone, Debug, Default)]
pub struct DownloadReport {
    /// Units dispatched, one per record
    pub attempted: usize,
    /// Invoices written to disk
    pub downloaded: Vec<DownloadedInvoice>,
    /// Units that failed
    pub failures: Vec<FailedDownload>,
}

impl DownloadReport {
    /// True when every unit succeeded
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Turn a report with failures into [`DownloadError::Incomplete`]
    pub fn into_result(self) -> Result<Self> {
        if self.is_complete() {
            return Ok(self);
        }
        Err(Error::Download(DownloadError::Incomplete {
            attempted: self.attempted,
            failures: self.failures,
        }))
    }
}

/// Bounded-concurrency invoice downloader
pub struct Downloader {
    api: Arc<dyn InvoiceApi>,
    invoice_dir: PathBuf,
    concurrency: usize,
    event_tx: Option<broadcast::Sender<Event>>,
}

impl Downloader {
    /// Create a downloader writing into `invoice_dir` (which must already exist).
    ///
    /// A concurrency of zero is treated as one.
    pub fn new(api: Arc<dyn InvoiceApi>, invoice_dir: impl Into<PathBuf>, concurrency: usize) -> Self {
        Self {
            api,
            invoice_dir: invoice_dir.into(),
            concurrency: concurrency.max(1),
            event_tx: None,
        }
    }

    /// Publish per-invoice events on `event_tx`
    pub fn with_events(mut self, event_tx: broadcast::Sender<Event>) -> Self {
        self.event_tx = Some(event_tx);
        self
    }

    /// Directory invoices are written to
    pub fn invoice_dir(&self) -> &Path {
        &self.invoice_dir
    }

    /// Download every record's invoice, draining all units before returning.
    ///
    /// Failures are collected in the report rather than returned; use
    /// [`DownloadReport::into_result`] to fail the run on any of them.
    pub async fn download_all(&self, records: &[InvoiceRecord]) -> DownloadReport {
        info!(
            count = records.len(),
            concurrency = self.concurrency,
            "downloading invoices"
        );

        let results: Vec<_> = stream::iter(records)
            .map(|record| self.download_one(record.invoice_url()))
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let mut report = DownloadReport {
            attempted: results.len(),
            ..DownloadReport::default()
        };
        for result in results {
            match result {
                Ok(invoice) => report.downloaded.push(invoice),
                Err(failure) => report.failures.push(failure),
            }
        }

        info!(
            downloaded = report.downloaded.len(),
            failed = report.failures.len(),
            "invoice downloads drained"
        );
        report
    }

    /// A single download unit
    async fn download_one(
        &self,
        invoice_url: &str,
    ) -> std::result::Result<DownloadedInvoice, FailedDownload> {
        let filename = derive_filename(invoice_url).to_string();

        let result = match check_filename(&filename) {
            Ok(()) => self.fetch_and_save(&filename).await,
            Err(cause) => Err(cause),
        };

        match result {
            Ok(invoice) => {
                debug!(filename = %invoice.filename, size = invoice.size_bytes, "invoice saved");
                self.emit(Event::InvoiceDownloaded {
                    filename: invoice.filename.clone(),
                    size_bytes: invoice.size_bytes,
                });
                Ok(invoice)
            }
            Err(cause) => {
                warn!(filename = %filename, url = %invoice_url, error = %cause, "invoice download failed");
                self.emit(Event::InvoiceFailed {
                    filename: filename.clone(),
                    error: cause.clone(),
                });
                Err(FailedDownload { filename, cause })
            }
        }
    }

    async fn fetch_and_save(&self, filename: &str) -> std::result::Result<DownloadedInvoice, String> {
        let content = self
            .api
            .fetch_invoice(filename)
            .await
            .map_err(|e| e.to_string())?;

        let path = self.invoice_dir.join(filename);
        tokio::fs::write(&path, &content)
            .await
            .map_err(|e| format!("Failed to write '{}': {}", path.display(), e))?;

        Ok(DownloadedInvoice {
            filename: filename.to_string(),
            path,
            size_bytes: content.len() as u64,
        })
    }

    fn emit(&self, event: Event) {
        if let Some(tx) = &self.event_tx {
            tx.send(event).ok();
        }
    }
}

/// Reject derived names that would not address a file inside the invoice directory
fn check_filename(filename: &str) -> std::result::Result<(), String> {
    match filename {
        "" => Err("invoice URL has no filename segment".to_string()),
        "." | ".." => Err(format!("refusing to write to '{filename}'")),
        name if name.contains('\\') => Err(format!("refusing to write to '{name}'")),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests;
