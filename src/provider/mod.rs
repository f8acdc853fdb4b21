pub mod cleaner;
pub mod http_client;
pub mod parsers;

use crate::config::ProviderConfig;
use crate::models::{DividendHistory, DividendLookup};
use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;
use url::Url;

use self::cleaner::latest_dividend;
use self::http_client::HttpClient;
use self::parsers::parse_chart_dividends;

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("provider returned HTTP {0}")]
    Status(u16),

    #[error("provider error {code}: {description}")]
    Provider { code: String, description: String },

    #[error("could not decode provider response: {0}")]
    Decode(String),

    #[error("invalid provider url: {0}")]
    Url(#[from] url::ParseError),
}

// ── Source trait ──────────────────────────────────────────────────────────────

/// Swappable dividend data source.
#[async_trait]
pub trait DividendSource: Send + Sync {
    async fn dividend_history(&self, symbol: &str) -> Result<DividendHistory, LookupError>;
}

/// Fetch a symbol's history and reduce it to the latest dividend.
pub async fn lookup_latest(
    source: &dyn DividendSource,
    symbol: &str,
) -> Result<DividendLookup, LookupError> {
    let history = source.dividend_history(symbol).await?;
    debug!("{}: {} dividend events", symbol, history.events.len());
    Ok(latest_dividend(symbol, &history))
}

// ── Yahoo Finance ─────────────────────────────────────────────────────────────

pub struct YahooDividendSource {
    client: HttpClient,
    base_url: String,
}

impl YahooDividendSource {
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        Ok(Self {
            client: HttpClient::new(config)?,
            base_url: config.base_url.clone(),
        })
    }

    /// e.g. ITC.NS → {base}/ITC.NS?range=max&interval=1mo&events=div
    fn chart_url(&self, symbol: &str) -> Result<Url, LookupError> {
        let mut url = Url::parse(&self.base_url)?;
        url.path_segments_mut()
            .map_err(|_| LookupError::Url(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .pop_if_empty()
            .push(symbol.trim());
        url.query_pairs_mut()
            .append_pair("range", "max")
            .append_pair("interval", "1mo")
            .append_pair("events", "div");
        Ok(url)
    }
}

#[async_trait]
impl DividendSource for YahooDividendSource {
    async fn dividend_history(&self, symbol: &str) -> Result<DividendHistory, LookupError> {
        let url = self.chart_url(symbol)?;
        let (status, body) = self.client.get_text(url.as_str()).await?;

        match parse_chart_dividends(&body) {
            Ok(history) if status.is_success() => Ok(history),
            // Yahoo answers unknown symbols with 404 + a JSON error body
            Err(err @ LookupError::Provider { .. }) => Err(err),
            Ok(_) => Err(LookupError::Status(status.as_u16())),
            Err(_) if !status.is_success() => Err(LookupError::Status(status.as_u16())),
            Err(err) => Err(err),
        }
    }
}
