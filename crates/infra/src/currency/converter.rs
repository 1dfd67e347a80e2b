use chrono::NaiveDate;
use serde::Serialize;

use invoicer_invoicing::Invoice;

use super::provider::{CurrencyError, RateProvider};

/// Result of converting one amount. Nothing here is persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversion {
    pub amount: f64,
    pub from: String,
    pub to: String,
    pub rate: f64,
    pub converted: f64,
    /// Requested rate date; `None` means latest rates.
    pub as_of: Option<NaiveDate>,
}

#[derive(Debug, Clone)]
pub struct CurrencyConverter<P> {
    provider: P,
}

impl<P: RateProvider> CurrencyConverter<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Convert `amount` from one currency to another at the latest or a historical rate.
    ///
    /// Converting a currency into itself never calls the provider.
    pub async fn convert(
        &self,
        amount: f64,
        from: &str,
        to: &str,
        as_of: Option<NaiveDate>,
    ) -> Result<Conversion, CurrencyError> {
        let from = from.trim().to_ascii_uppercase();
        let to = to.trim().to_ascii_uppercase();

        let rate = if from == to {
            1.0
        } else {
            let table = match as_of {
                Some(date) => self.provider.historical(&from, date).await?,
                None => self.provider.latest(&from).await?,
            };
            table
                .rate(&to)
                .ok_or_else(|| CurrencyError::RateUnavailable {
                    from: from.clone(),
                    to: to.clone(),
                })?
        };

        tracing::debug!(amount, %from, %to, rate, "converted amount");
        Ok(Conversion {
            amount,
            converted: amount * rate,
            from,
            to,
            rate,
            as_of,
        })
    }

    /// Convert an invoice's grand total out of the invoice currency.
    pub async fn convert_invoice(
        &self,
        invoice: &Invoice,
        to: &str,
        as_of: Option<NaiveDate>,
    ) -> Result<Conversion, CurrencyError> {
        self.convert(invoice.grand_total(), invoice.currency(), to, as_of)
            .await
    }
}
