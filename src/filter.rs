//! Due-date filter.
//!
//! Turns raw seed objects into [`InvoiceRecord`]s and keeps those due on or after
//! the reference date. The reference date is always passed in so one run compares
//! every record against the same day.

use crate::config::MalformedRecordPolicy;
use crate::error::{Error, Result};
use crate::types::{DUE_DATE_FORMAT, InvoiceRecord, RawRecord, parse_id};
use chrono::NaiveDate;
use serde_json::Value;
use tracing::{debug, warn};

/// Keep records whose due date is on or after `reference_date`.
///
/// Input order is preserved. A record with a missing or unparsable `duedate`, or a
/// retained record without an `invoice` URL, is handled according to `policy`:
/// `Abort` returns [`Error::MalformedRecord`], `Skip` logs a warning and drops it.
/// Past-due records are dropped before their `invoice` field is looked at.
pub fn filter_by_due_date(
    raw: &[RawRecord],
    reference_date: NaiveDate,
    policy: MalformedRecordPolicy,
) -> Result<Vec<InvoiceRecord>> {
    let mut retained = Vec::with_capacity(raw.len());

    for (index, fields) in raw.iter().enumerate() {
        let due_date = match parse_due_date(fields) {
            Ok(due_date) => due_date,
            Err(reason) => {
                reject(index, reason, policy)?;
                continue;
            }
        };

        if due_date < reference_date {
            debug!(index, %due_date, "record past due");
            continue;
        }

        // Only retained records need a document to download
        match invoice_url(fields) {
            Ok(url) => retained.push(InvoiceRecord::new(
                parse_id(fields.get("id")),
                due_date,
                url,
                fields.clone(),
            )),
            Err(reason) => reject(index, reason, policy)?,
        }
    }

    Ok(retained)
}

/// Apply the malformed-record policy to the record at `index`
fn reject(index: usize, reason: String, policy: MalformedRecordPolicy) -> Result<()> {
    match policy {
        MalformedRecordPolicy::Abort => Err(Error::MalformedRecord { index, reason }),
        MalformedRecordPolicy::Skip => {
            warn!(index, reason = %reason, "skipping malformed record");
            Ok(())
        }
    }
}

fn parse_due_date(fields: &RawRecord) -> std::result::Result<NaiveDate, String> {
    match fields.get("duedate") {
        Some(Value::String(s)) => NaiveDate::parse_from_str(s.trim(), DUE_DATE_FORMAT)
            .map_err(|e| format!("due date '{s}' is not dd-mm-yyyy: {e}")),
        Some(other) => Err(format!("due date {other} is not a string")),
        None => Err("missing duedate".to_string()),
    }
}

fn invoice_url(fields: &RawRecord) -> std::result::Result<String, String> {
    match fields.get("invoice") {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(format!("invoice URL {other} is not a string")),
        None => Err("missing invoice URL".to_string()),
    }
}
