//! # invoice-dl
//!
//! Fetches invoice records from a remote service, keeps those that are not yet
//! past due, downloads every referenced invoice document concurrently and writes
//! a delimited summary of the kept records.
//!
//! ## Pipeline
//!
//! 1. **Fetch** - one `POST seed` request returns the full record set
//! 2. **Filter** - records due on or after the reference date are kept
//! 3. **Download** - one `GET invoices/{filename}` per record, bounded concurrency
//! 4. **Export** - header plus one row per record, written atomically
//!
//! ## Quick Start
//!
//! ```no_run
//! use invoice_dl::{Config, Pipeline};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let pipeline = Pipeline::from_config(Config::default())?;
//!
//!     let mut events = pipeline.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let summary = pipeline.run().await?;
//!     println!("{} invoices in {:?}", summary.downloaded, summary.elapsed);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Transport to the invoice service
pub mod client;
/// Configuration types
pub mod config;
/// Concurrent invoice downloads
pub mod downloader;
/// Error types
pub mod error;
/// Export file writer
pub mod export;
/// Seed record fetching
pub mod fetcher;
/// Due-date filtering
pub mod filter;
/// Logging setup for the binary
pub mod logging;
/// Stage orchestration
pub mod pipeline;
/// Core types and events
pub mod types;

// Re-export commonly used types
pub use client::{HttpInvoiceApi, InvoiceApi};
pub use config::{Config, ExportColumn, MalformedRecordPolicy};
pub use downloader::{DownloadReport, Downloader};
pub use error::{DownloadError, Error, FailedDownload, Result};
pub use pipeline::Pipeline;
pub use types::{DownloadedInvoice, Event, InvoiceRecord, RawRecord, RunSummary};
