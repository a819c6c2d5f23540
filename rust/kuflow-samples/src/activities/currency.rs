//! Currency conversion through a public exchange-rate API.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use durable_kuflow::activities::{Activity, ActivityContext, ActivityResult};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Activity name.
pub const CONVERT: &str = "CurrencyConversion_convert";

/// Input of [`CONVERT`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertRequest {
    pub amount: String,
    pub from: String,
    pub to: String,
}

/// Output of [`CONVERT`]: the converted amount as a plain decimal string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertResponse {
    pub amount: String,
}

/// Why a conversion failed.
#[derive(Error, Debug)]
pub enum CurrencyError {
    #[error("Unsupported currency {0}")]
    UnsupportedCurrency(String),

    #[error("Invalid amount '{0}'")]
    InvalidAmount(String),

    #[error("No conversion rate from {from} to {to}")]
    RateUnavailable { from: String, to: String },

    #[error("Currency API request failed: {0}")]
    Http(#[from] reqwest::Error),
}

impl CurrencyError {
    /// Only transport failures can succeed on a later attempt.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Http(_))
    }
}

/// Map a currency code through the allow-list to the API's lowercase code.
pub fn api_currency_code(currency: &str) -> Result<&'static str, CurrencyError> {
    match currency {
        "EUR" => Ok("eur"),
        "USD" => Ok("usd"),
        "GBP" => Ok("gbp"),
        other => Err(CurrencyError::UnsupportedCurrency(other.to_string())),
    }
}

/// Parse a decimal written either plainly or in scientific notation.
pub fn parse_decimal(text: &str) -> Option<Decimal> {
    let text = text.trim();
    Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .ok()
}

/// Client of the exchange-rate API, shared by the activity and the REST
/// loan sample.
#[derive(Debug, Clone)]
pub struct CurrencyConverter {
    http: reqwest::Client,
    api_base: String,
}

impl CurrencyConverter {
    pub fn new(api_base: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            api_base: api_base.into().trim_end_matches('/').to_string(),
        })
    }

    /// Convert `amount` from one currency to another.
    ///
    /// Rates are read from `{api_base}/{from}.json`, whose body maps the
    /// source code to a table of target rates. Converting a currency to
    /// itself returns the amount without calling the API.
    pub async fn convert(&self, amount: &str, from: &str, to: &str) -> Result<String, CurrencyError> {
        let value = parse_decimal(amount).ok_or_else(|| CurrencyError::InvalidAmount(amount.to_string()))?;
        let from_code = api_currency_code(from)?;
        let to_code = api_currency_code(to)?;

        if from_code == to_code {
            return Ok(value.to_string());
        }

        let url = format!("{}/{from_code}.json", self.api_base);
        let body: serde_json::Value = self
            .http
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let rate = body
            .get(from_code)
            .and_then(|table| table.get(to_code))
            .and_then(|rate| match rate {
                serde_json::Value::Number(n) => parse_decimal(&n.to_string()),
                serde_json::Value::String(s) => parse_decimal(s),
                _ => None,
            })
            .ok_or_else(|| CurrencyError::RateUnavailable {
                from: from.to_string(),
                to: to.to_string(),
            })?;

        let converted = value
            .checked_mul(rate)
            .ok_or_else(|| CurrencyError::InvalidAmount(amount.to_string()))?;
        tracing::debug!(%value, from, to, %rate, %converted, "Converted amount");
        Ok(converted.to_string())
    }
}

/// `CurrencyConversion_convert` activity.
#[derive(Debug, Clone)]
pub struct CurrencyConversionActivity {
    converter: CurrencyConverter,
}

impl CurrencyConversionActivity {
    #[must_use]
    pub fn new(converter: CurrencyConverter) -> Self {
        Self { converter }
    }
}

#[async_trait]
impl Activity for CurrencyConversionActivity {
    fn name(&self) -> &'static str {
        CONVERT
    }

    async fn execute(&self, _ctx: &ActivityContext, input: serde_json::Value) -> ActivityResult {
        let request: ConvertRequest = match ActivityResult::parse_input(input) {
            Ok(r) => r,
            Err(failure) => return failure,
        };

        match self
            .converter
            .convert(&request.amount, &request.from, &request.to)
            .await
        {
            Ok(amount) => ActivityResult::success(ConvertResponse { amount }),
            Err(e) => ActivityResult::failure(e.to_string(), e.is_retryable()),
        }
    }
}
