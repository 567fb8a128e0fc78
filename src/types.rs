//! Core types for invoice-dl

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::PathBuf;
use std::time::Duration;

/// Textual format of the `duedate` field (`dd-mm-yyyy`)
pub const DUE_DATE_FORMAT: &str = "%d-%m-%Y";

/// One element of the seed payload, passed through untouched
pub type RawRecord = Map<String, Value>;

/// Body of the seed endpoint's response
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SeedResponse {
    /// Invoice records in service order
    pub data: Vec<RawRecord>,
}

/// An invoice record that passed due-date parsing
///
/// Immutable once built; the original seed object is kept so export columns can
/// read any field the service sent.
#[derive(Clone, Debug, PartialEq)]
pub struct InvoiceRecord {
    id: Option<i64>,
    due_date: NaiveDate,
    invoice_url: String,
    fields: RawRecord,
}

impl InvoiceRecord {
    /// Build a record from its parsed parts and the raw seed object
    pub fn new(
        id: Option<i64>,
        due_date: NaiveDate,
        invoice_url: impl Into<String>,
        fields: RawRecord,
    ) -> Self {
        Self {
            id,
            due_date,
            invoice_url: invoice_url.into(),
            fields,
        }
    }

    /// Numeric record id, when the service sent one
    pub fn id(&self) -> Option<i64> {
        self.id
    }

    /// Parsed due date
    pub fn due_date(&self) -> NaiveDate {
        self.due_date
    }

    /// URL of the invoice document, exactly as sent
    pub fn invoice_url(&self) -> &str {
        &self.invoice_url
    }

    /// The raw seed object
    pub fn fields(&self) -> &RawRecord {
        &self.fields
    }

    /// Render a named field as a cell value.
    ///
    /// Strings are returned verbatim, scalars through `Display`, nested values as
    /// compact JSON. Absent and `null` fields yield `None`.
    pub fn field(&self, name: &str) -> Option<String> {
        match self.fields.get(name)? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Number(n) => Some(n.to_string()),
            nested => Some(nested.to_string()),
        }
    }
}

/// Read a record id that may arrive as a JSON integer or a numeric string
pub(crate) fn parse_id(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// An invoice written to the output directory
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DownloadedInvoice {
    /// Derived filename
    pub filename: String,
    /// Where the file was written
    pub path: PathBuf,
    /// Number of bytes written
    pub size_bytes: u64,
}

/// Outcome of a successful pipeline run
#[derive(Clone, Debug)]
pub struct RunSummary {
    /// Records in the seed payload
    pub fetched: usize,
    /// Records that passed the due-date filter
    pub retained: usize,
    /// Invoices written to the output directory
    pub downloaded: usize,
    /// Path of the export file
    pub export_path: PathBuf,
    /// Data rows in the export file
    pub exported_rows: usize,
    /// Wall-clock duration of the whole run
    pub elapsed: Duration,
}

/// Progress events emitted by the pipeline
///
/// Subscribe via [`Pipeline::subscribe`](crate::Pipeline::subscribe). Delivery is
/// best-effort: slow subscribers may observe `RecvError::Lagged`.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// The seed payload arrived
    RecordsFetched {
        /// Number of raw records
        count: usize,
    },

    /// The due-date filter finished
    RecordsFiltered {
        /// Reference date used for the comparison
        reference_date: NaiveDate,
        /// Records kept
        retained: usize,
        /// Records dropped (past due or skipped as malformed)
        dropped: usize,
    },

    /// An invoice was written to disk
    InvoiceDownloaded {
        /// Derived filename
        filename: String,
        /// Bytes written
        size_bytes: u64,
    },

    /// An invoice download unit failed
    InvoiceFailed {
        /// Derived filename
        filename: String,
        /// Failure description
        error: String,
    },

    /// The export file was written
    ExportWritten {
        /// Export file path
        path: PathBuf,
        /// Data rows written
        rows: usize,
    },

    /// The run finished successfully
    Completed {
        /// Wall-clock duration of the whole run
        elapsed: Duration,
    },
}
