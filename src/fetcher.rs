//! Record fetcher: one seed request, no retry.

use crate::client::InvoiceApi;
use crate::error::Result;
use crate::types::RawRecord;
use tracing::info;

/// Fetch the full invoice record set from the seed endpoint.
///
/// Transport failures surface as [`Error::Transport`](crate::Error::Transport) and
/// non-2xx answers as [`Error::Remote`](crate::Error::Remote). A single failed
/// attempt is final.
pub async fn fetch_records(api: &dyn InvoiceApi) -> Result<Vec<RawRecord>> {
    let seed = api.fetch_seed().await?;
    info!(count = seed.data.len(), "fetched seed records");
    Ok(seed.data)
}
