//! Pipeline orchestrator: fetch → filter → download → export.

use crate::client::{HttpInvoiceApi, InvoiceApi};
use crate::config::Config;
use crate::downloader::Downloader;
use crate::error::{Error, Result};
use crate::types::{Event, RunSummary};
use crate::{export, fetcher, filter};
use chrono::NaiveDate;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::broadcast;
use tracing::{debug, info};

/// Capacity of the progress event channel
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Sequences the pipeline stages for one configuration
pub struct Pipeline {
    config: Arc<Config>,
    api: Arc<dyn InvoiceApi>,
    event_tx: broadcast::Sender<Event>,
}

impl Pipeline {
    /// Create a pipeline talking to the service through `api`
    ///
    /// # Errors
    /// Returns a configuration error if `config` does not validate.
    pub fn new(config: Config, api: Arc<dyn InvoiceApi>) -> Result<Self> {
        config.validate()?;
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Ok(Self {
            config: Arc::new(config),
            api,
            event_tx,
        })
    }

    /// Create a pipeline using the HTTP client described by `config.api`
    pub fn from_config(config: Config) -> Result<Self> {
        let api = HttpInvoiceApi::new(&config.api)?;
        Self::new(config, Arc::new(api))
    }

    /// Subscribe to progress events
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// The validated configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run the pipeline with today's local date as the reference date
    pub async fn run(&self) -> Result<RunSummary> {
        self.run_with_reference_date(chrono::Local::now().date_naive())
            .await
    }

    /// Run the pipeline against an explicit reference date.
    ///
    /// Stages run strictly in order and any stage error is returned unchanged: a
    /// failed fetch or filter leaves no downloads and no export behind, and a
    /// failed download stage (after every unit drained) skips the export.
    pub async fn run_with_reference_date(&self, reference_date: NaiveDate) -> Result<RunSummary> {
        let started = Instant::now();
        info!(%reference_date, "starting invoice run");

        let raw = fetcher::fetch_records(self.api.as_ref()).await?;
        self.emit(Event::RecordsFetched { count: raw.len() });

        let records =
            filter::filter_by_due_date(&raw, reference_date, self.config.filter.on_malformed)?;
        info!(
            fetched = raw.len(),
            retained = records.len(),
            "records filtered by due date"
        );
        self.emit(Event::RecordsFiltered {
            reference_date,
            retained: records.len(),
            dropped: raw.len() - records.len(),
        });

        let invoice_dir = &self.config.download.invoice_dir;
        tokio::fs::create_dir_all(invoice_dir).await.map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!(
                    "Failed to create invoice directory '{}': {}",
                    invoice_dir.display(),
                    e
                ),
            ))
        })?;

        let downloader = Downloader::new(
            Arc::clone(&self.api),
            invoice_dir.clone(),
            self.config.download.max_concurrent_downloads,
        )
        .with_events(self.event_tx.clone());
        let report = downloader.download_all(&records).await.into_result()?;

        let exported_rows = export::write_export(&records, &self.config.export)?;
        self.emit(Event::ExportWritten {
            path: self.config.export.path.clone(),
            rows: exported_rows,
        });

        let elapsed = started.elapsed();
        info!(elapsed_ms = elapsed.as_millis() as u64, "invoice run completed");
        self.emit(Event::Completed { elapsed });

        Ok(RunSummary {
            fetched: raw.len(),
            retained: records.len(),
            downloaded: report.downloaded.len(),
            export_path: self.config.export.path.clone(),
            exported_rows,
            elapsed,
        })
    }

    fn emit(&self, event: Event) {
        // No subscribers is fine
        if self.event_tx.send(event).is_err() {
            debug!("no event subscribers");
        }
    }
}
