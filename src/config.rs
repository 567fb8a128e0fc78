//! Configuration types for invoice-dl

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{path::Path, path::PathBuf, time::Duration};

/// Environment variable naming a JSON configuration file
pub const CONFIG_PATH_ENV: &str = "INVOICE_DL_CONFIG";

/// Environment variable overriding [`ApiConfig::base_url`]
pub const API_URL_ENV: &str = "INVOICE_DL_API_URL";

/// Remote invoice service settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the service; `seed` and `invoices/{filename}` are resolved against it
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Timeout for each invoice download request (default: 10 seconds)
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    pub request_timeout: Duration,

    /// Timeout for the seed request (default: 30 seconds)
    #[serde(default = "default_seed_timeout", with = "duration_serde")]
    pub seed_timeout: Duration,

    /// User-Agent header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout: default_request_timeout(),
            seed_timeout: default_seed_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

/// Invoice download settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Directory receiving one file per downloaded invoice (default: "./faturas")
    #[serde(default = "default_invoice_dir")]
    pub invoice_dir: PathBuf,

    /// Maximum invoice downloads in flight at once (default: 8)
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_downloads: usize,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            invoice_dir: default_invoice_dir(),
            max_concurrent_downloads: default_max_concurrent(),
        }
    }
}

/// What the due-date filter does with a record it cannot parse
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MalformedRecordPolicy {
    /// Fail the whole run (default)
    #[default]
    Abort,
    /// Log a warning and drop the record
    Skip,
}

/// Due-date filter settings
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Handling of records with an unparsable due date or missing invoice URL
    #[serde(default)]
    pub on_malformed: MalformedRecordPolicy,
}

/// A single export column: the header label and the record field it reads
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportColumn {
    /// Header label written in the first row
    pub label: String,
    /// Seed record field rendered into this column
    pub field: String,
}

impl ExportColumn {
    /// Create a column reading `field` under the header `label`
    pub fn new(label: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            field: field.into(),
        }
    }
}

/// Export file settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Destination of the export file (default: "./faturas.csv")
    #[serde(default = "default_export_path")]
    pub path: PathBuf,

    /// Column delimiter (default: ';')
    #[serde(default = "default_delimiter")]
    pub delimiter: char,

    /// Text encoding of the export file; only "utf-8" is supported
    #[serde(default = "default_encoding")]
    pub encoding: String,

    /// Columns in output order
    #[serde(default = "default_columns")]
    pub columns: Vec<ExportColumn>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            path: default_export_path(),
            delimiter: default_delimiter(),
            encoding: default_encoding(),
            columns: default_columns(),
        }
    }
}

impl ExportConfig {
    /// Header labels in column order
    pub fn header(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.label.as_str()).collect()
    }
}

/// Main configuration for the invoice pipeline
///
/// Built once at startup, validated, and shared with every stage.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Remote service settings
    #[serde(default)]
    pub api: ApiConfig,

    /// Download stage settings
    #[serde(default)]
    pub download: DownloadConfig,

    /// Filter stage settings
    #[serde(default)]
    pub filter: FilterConfig,

    /// Export stage settings
    #[serde(default)]
    pub export: ExportConfig,
}

impl Config {
    /// Load configuration for the binary.
    ///
    /// Reads the JSON file named by `INVOICE_DL_CONFIG` when set, otherwise starts
    /// from defaults. `INVOICE_DL_API_URL` then overrides the base URL. The result
    /// is validated before it is returned.
    pub fn load() -> Result<Self> {
        let mut config = match std::env::var_os(CONFIG_PATH_ENV) {
            Some(path) => Self::read_json_file(Path::new(&path))?,
            None => Self::default(),
        };

        if let Ok(url) = std::env::var(API_URL_ENV)
            && !url.trim().is_empty()
        {
            config.api.base_url = url.trim().to_string();
        }

        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON configuration file
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let config = Self::read_json_file(path)?;
        config.validate()?;
        Ok(config)
    }

    fn read_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to read config file '{}': {}", path.display(), e),
            ))
        })?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Check every setting the pipeline relies on
    pub fn validate(&self) -> Result<()> {
        let base = url::Url::parse(&self.api.base_url)
            .map_err(|e| Error::config(format!("invalid base URL: {e}"), "api.base_url"))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(Error::config(
                format!("unsupported URL scheme '{}'", base.scheme()),
                "api.base_url",
            ));
        }

        if self.api.request_timeout.is_zero() {
            return Err(Error::config(
                "request timeout must be greater than zero",
                "api.request_timeout",
            ));
        }
        if self.api.seed_timeout.is_zero() {
            return Err(Error::config(
                "seed timeout must be greater than zero",
                "api.seed_timeout",
            ));
        }

        if self.download.max_concurrent_downloads == 0 {
            return Err(Error::config(
                "must allow at least one concurrent download",
                "download.max_concurrent_downloads",
            ));
        }

        let delimiter = self.export.delimiter;
        if !delimiter.is_ascii() || matches!(delimiter, '"' | '\n' | '\r') {
            return Err(Error::config(
                format!("unusable delimiter {delimiter:?}"),
                "export.delimiter",
            ));
        }

        let encoding = self.export.encoding.to_ascii_lowercase();
        if encoding != "utf-8" && encoding != "utf8" {
            return Err(Error::config(
                format!("unsupported encoding '{}'", self.export.encoding),
                "export.encoding",
            ));
        }

        if self.export.columns.is_empty() {
            return Err(Error::config(
                "at least one column is required",
                "export.columns",
            ));
        }
        if let Some(column) = self
            .export
            .columns
            .iter()
            .find(|c| c.label.is_empty() || c.field.is_empty())
        {
            return Err(Error::config(
                format!("column {column:?} needs both a label and a field"),
                "export.columns",
            ));
        }

        Ok(())
    }
}

fn default_base_url() -> String {
    "https://rpachallengeocr.azurewebsites.net".to_string()
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_seed_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_user_agent() -> String {
    concat!("invoice-dl/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_invoice_dir() -> PathBuf {
    PathBuf::from("./faturas")
}

fn default_max_concurrent() -> usize {
    8
}

fn default_export_path() -> PathBuf {
    PathBuf::from("./faturas.csv")
}

fn default_delimiter() -> char {
    ';'
}

fn default_encoding() -> String {
    "utf-8".to_string()
}

fn default_columns() -> Vec<ExportColumn> {
    vec![
        ExportColumn::new("Invoice Number", "id"),
        ExportColumn::new("Invoice Date", "duedate"),
        ExportColumn::new("Invoice URL", "invoice"),
    ]
}

// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
