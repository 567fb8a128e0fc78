//! Transport to the remote invoice service.
//!
//! [`InvoiceApi`] is the seam every stage talks through; [`HttpInvoiceApi`] is the
//! production implementation on top of reqwest.

use crate::config::ApiConfig;
use crate::error::{Error, Result};
use crate::types::SeedResponse;
use std::borrow::Cow;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Abstraction over the invoice service, enabling testability.
#[async_trait::async_trait]
pub trait InvoiceApi: Send + Sync {
    /// Request the full seed record set (`POST seed`)
    async fn fetch_seed(&self) -> Result<SeedResponse>;

    /// Download the document stored under `filename` (`GET invoices/{filename}`)
    async fn fetch_invoice(&self, filename: &str) -> Result<Vec<u8>>;
}

/// Production [`InvoiceApi`] backed by a pooled reqwest client.
#[derive(Clone, Debug)]
pub struct HttpInvoiceApi {
    client: reqwest::Client,
    seed_url: Url,
    invoices_url: Url,
    seed_timeout: Duration,
    request_timeout: Duration,
}

impl HttpInvoiceApi {
    /// Create a client for the service described by `config`
    ///
    /// # Errors
    /// Returns a configuration error if the base URL cannot be parsed, or a
    /// transport error if the HTTP client cannot be built.
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let base = base_url(&config.base_url)?;
        let seed_url = base
            .join("seed")
            .map_err(|e| Error::config(format!("invalid seed URL: {e}"), "api.base_url"))?;
        let invoices_url = base
            .join("invoices/")
            .map_err(|e| Error::config(format!("invalid invoice URL: {e}"), "api.base_url"))?;

        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .build()?;

        Ok(Self {
            client,
            seed_url,
            invoices_url,
            seed_timeout: config.seed_timeout,
            request_timeout: config.request_timeout,
        })
    }

    /// Endpoint of the seed request
    pub fn seed_url(&self) -> &Url {
        &self.seed_url
    }

    /// Endpoint a given invoice is downloaded from
    ///
    /// `filename` is a single path segment. Names derived from URLs may already
    /// carry `%XX` escapes, so they are decoded once before the segment is
    /// re-encoded.
    pub fn invoice_url(&self, filename: &str) -> Result<Url> {
        let segment = urlencoding::decode(filename).unwrap_or(Cow::Borrowed(filename));

        let mut url = self.invoices_url.clone();
        url.path_segments_mut()
            .map_err(|()| Error::config("base URL cannot carry a path", "api.base_url"))?
            .pop_if_empty()
            .push(&segment);
        Ok(url)
    }
}

#[async_trait::async_trait]
impl InvoiceApi for HttpInvoiceApi {
    async fn fetch_seed(&self) -> Result<SeedResponse> {
        debug!(url = %self.seed_url, "requesting seed records");

        let response = self
            .client
            .post(self.seed_url.clone())
            .form(&[("sendHash", "false")])
            .timeout(self.seed_timeout)
            .send()
            .await?;
        let body = success_body(response).await?;

        Ok(serde_json::from_slice(&body)?)
    }

    async fn fetch_invoice(&self, filename: &str) -> Result<Vec<u8>> {
        let url = self.invoice_url(filename)?;
        debug!(url = %url, "requesting invoice");

        let response = self
            .client
            .get(url)
            .timeout(self.request_timeout)
            .send()
            .await?;

        success_body(response).await
    }
}

/// Base URL with a trailing slash so relative joins append instead of replacing
/// the last path segment.
fn base_url(raw: &str) -> Result<Url> {
    let mut raw = raw.trim().to_string();
    if !raw.ends_with('/') {
        raw.push('/');
    }
    Url::parse(&raw).map_err(|e| Error::config(format!("invalid base URL: {e}"), "api.base_url"))
}

/// Read the body of a 2xx response, or turn any other status into [`Error::Remote`]
async fn success_body(response: reqwest::Response) -> Result<Vec<u8>> {
    let status = response.status();
    if !status.is_success() {
        return Err(Error::Remote {
            status: status.as_u16(),
            body: response.text().await.unwrap_or_default(),
        });
    }

    Ok(response.bytes().await?.to_vec())
}
