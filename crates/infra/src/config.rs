//! Configuration loading from the process environment.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use invoicer_core::validate::is_currency_code;
use invoicer_observability::LogFormat;

use crate::currency::{CurrencyError, HttpRateProvider};
use crate::import::ImportDefaults;
use crate::services::InvoiceNumberPolicy;

pub const DB_PATH: &str = "INVOICER_DB_PATH";
pub const RATES_URL: &str = "INVOICER_RATES_URL";
pub const RATES_API_KEY: &str = "INVOICER_RATES_API_KEY";
pub const RATES_TIMEOUT_SECS: &str = "INVOICER_RATES_TIMEOUT_SECS";
pub const DEFAULT_CURRENCY: &str = "INVOICER_DEFAULT_CURRENCY";
pub const INVOICE_NUMBERS: &str = "INVOICER_INVOICE_NUMBERS";
pub const LOG_FORMAT: &str = "INVOICER_LOG_FORMAT";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("{key} is not set and no default is available: {message}")]
    MissingValue { key: String, message: String },
}

/// Exchange-rate provider settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RatesConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout: Option<Duration>,
}

impl Default for RatesConfig {
    fn default() -> Self {
        Self {
            base_url: HttpRateProvider::DEFAULT_BASE_URL.to_string(),
            api_key: None,
            timeout: None,
        }
    }
}

impl RatesConfig {
    pub fn provider(&self) -> Result<HttpRateProvider, CurrencyError> {
        HttpRateProvider::new(self.base_url.clone(), self.api_key.clone(), self.timeout)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoicerConfig {
    pub db_path: PathBuf,
    pub rates: RatesConfig,
    pub default_currency: String,
    pub invoice_numbers: InvoiceNumberPolicy,
    pub log_format: LogFormat,
}

impl InvoicerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from any key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let db_path = match get(DB_PATH) {
            Some(path) => PathBuf::from(path),
            None => default_db_path()?,
        };

        let timeout = get(RATES_TIMEOUT_SECS)
            .map(|raw| match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
                _ => Err(invalid(
                    RATES_TIMEOUT_SECS,
                    format!("expected a positive number of seconds, got '{raw}'"),
                )),
            })
            .transpose()?;

        let rates = RatesConfig {
            base_url: get(RATES_URL)
                .unwrap_or_else(|| HttpRateProvider::DEFAULT_BASE_URL.to_string()),
            api_key: get(RATES_API_KEY),
            timeout,
        };

        let default_currency = get(DEFAULT_CURRENCY)
            .map(|c| c.to_ascii_uppercase())
            .unwrap_or_else(|| "USD".to_string());
        if !is_currency_code(&default_currency) {
            return Err(invalid(
                DEFAULT_CURRENCY,
                format!("'{default_currency}' is not a three-letter currency code"),
            ));
        }

        let invoice_numbers = get(INVOICE_NUMBERS)
            .map(|raw| {
                raw.parse::<InvoiceNumberPolicy>()
                    .map_err(|msg| invalid(INVOICE_NUMBERS, msg))
            })
            .transpose()?
            .unwrap_or_default();

        let log_format = get(LOG_FORMAT)
            .map(|raw| {
                raw.parse::<LogFormat>()
                    .map_err(|msg| invalid(LOG_FORMAT, msg))
            })
            .transpose()?
            .unwrap_or_default();

        Ok(Self {
            db_path,
            rates,
            default_currency,
            invoice_numbers,
            log_format,
        })
    }

    pub fn import_defaults(&self) -> ImportDefaults {
        ImportDefaults {
            currency: self.default_currency.clone(),
        }
    }
}

fn invalid(key: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        message: message.into(),
    }
}

fn default_db_path() -> Result<PathBuf, ConfigError> {
    dirs::data_dir()
        .map(|dir| dir.join("invoicer").join("invoicer.db"))
        .ok_or_else(|| ConfigError::MissingValue {
            key: DB_PATH.to_string(),
            message: "no platform data directory".to_string(),
        })
}
