use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CurrencyError {
    #[error("no exchange rate from {from} to {to}")]
    RateUnavailable { from: String, to: String },

    #[error("exchange rate provider unavailable: {0}")]
    ProviderUnavailable(String),
}

/// Rates of other currencies against one base currency.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RateTable {
    #[serde(default)]
    pub base: String,
    #[serde(default)]
    pub date: String,
    pub rates: HashMap<String, f64>,
}

impl RateTable {
    /// Usable rate for `code`. Zero, negative and non-finite rates count as missing.
    pub fn rate(&self, code: &str) -> Option<f64> {
        self.rates
            .get(code)
            .copied()
            .filter(|rate| rate.is_finite() && *rate > 0.0)
    }
}

/// Source of exchange-rate tables.
#[async_trait]
pub trait RateProvider: Send + Sync {
    /// Current rates against `base`.
    async fn latest(&self, base: &str) -> Result<RateTable, CurrencyError>;

    /// Rates against `base` as published on `date`.
    async fn historical(&self, base: &str, date: NaiveDate) -> Result<RateTable, CurrencyError>;
}

/// Rate provider speaking the exchangerate-api v4 JSON shape over HTTP.
#[derive(Debug, Clone)]
pub struct HttpRateProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpRateProvider {
    pub const DEFAULT_BASE_URL: &'static str = "https://api.exchangerate-api.com/v4";

    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, CurrencyError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| CurrencyError::ProviderUnavailable(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn fetch(&self, url: String, query: &[(&str, &str)]) -> Result<RateTable, CurrencyError> {
        let mut req = self.client.get(&url).query(query);
        if let Some(key) = &self.api_key {
            req = req.query(&[("apiKey", key.as_str())]);
        }

        let resp = req.send().await.map_err(|e| {
            tracing::warn!(%url, error = %e, "rate provider request failed");
            CurrencyError::ProviderUnavailable(e.to_string())
        })?;

        let status = resp.status();
        if !status.is_success() {
            tracing::warn!(%url, status = status.as_u16(), "rate provider returned an error status");
            return Err(CurrencyError::ProviderUnavailable(format!(
                "{url} returned HTTP {}",
                status.as_u16()
            )));
        }

        resp.json::<RateTable>().await.map_err(|e| {
            tracing::warn!(%url, error = %e, "rate provider returned an unreadable body");
            CurrencyError::ProviderUnavailable(e.to_string())
        })
    }
}

#[async_trait]
impl RateProvider for HttpRateProvider {
    async fn latest(&self, base: &str) -> Result<RateTable, CurrencyError> {
        let url = format!("{}/latest/{}", self.base_url, base);
        self.fetch(url, &[]).await
    }

    async fn historical(&self, base: &str, date: NaiveDate) -> Result<RateTable, CurrencyError> {
        let url = format!("{}/{}", self.base_url, date.format("%Y-%m-%d"));
        self.fetch(url, &[("base", base)]).await
    }
}
