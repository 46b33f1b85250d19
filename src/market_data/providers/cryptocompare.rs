//! CryptoCompare batched price provider.
//!
//! Uses the `pricemulti` endpoint, which prices any number of symbols in any
//! number of currencies with one request.
//! Docs: https://min-api.cryptocompare.com/

use std::collections::HashMap;

use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::error::ValuationError;
use crate::market_data::{PriceSource, QuoteTable};

const CRYPTOCOMPARE_API_BASE: &str = "https://min-api.cryptocompare.com";

/// Error envelope CryptoCompare returns with a 200 status.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    #[serde(rename = "Response")]
    response: String,
    #[serde(rename = "Message")]
    message: Option<String>,
}

/// CryptoCompare price provider.
pub struct CryptoComparePriceSource {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl CryptoComparePriceSource {
    /// Create a provider against the public API without an API key.
    pub fn new() -> Self {
        Self::with_client(Client::new())
    }

    /// Create a provider sharing an existing reqwest client.
    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            base_url: CRYPTOCOMPARE_API_BASE.to_string(),
            api_key: None,
        }
    }

    /// Point the provider at another host (used by tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    fn pricemulti_url(&self) -> String {
        format!("{}/data/pricemulti", self.base_url)
    }
}

impl Default for CryptoComparePriceSource {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse a `pricemulti` body into a quote table.
fn parse_pricemulti(body: &str) -> Result<QuoteTable, ValuationError> {
    let value: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| ValuationError::price_fetch(format!("malformed response: {e}")))?;

    if let Ok(envelope) = ErrorEnvelope::deserialize(&value) {
        if envelope.response.eq_ignore_ascii_case("error") {
            let message = envelope
                .message
                .unwrap_or_else(|| "unknown error".to_string());
            return Err(ValuationError::price_fetch(format!(
                "CryptoCompare API error: {message}"
            )));
        }
    }

    HashMap::<String, HashMap<String, f64>>::deserialize(&value)
        .map_err(|e| ValuationError::price_fetch(format!("unexpected response shape: {e}")))
}

#[async_trait::async_trait]
impl PriceSource for CryptoComparePriceSource {
    async fn fetch_quotes(
        &self,
        symbols: &[String],
        currencies: &[String],
    ) -> Result<QuoteTable, ValuationError> {
        let fsyms = symbols.join(",");
        let tsyms = currencies.join(",");
        debug!(fsyms = %fsyms, tsyms = %tsyms, "requesting CryptoCompare prices");

        let mut request = self
            .client
            .get(self.pricemulti_url())
            .query(&[("fsyms", &fsyms), ("tsyms", &tsyms)])
            .header("Accept", "application/json");
        if let Some(key) = &self.api_key {
            request = request.header("authorization", format!("Apikey {key}"));
        }

        let response = request
            .send()
            .await
            .map_err(|e| ValuationError::price_fetch(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ValuationError::price_fetch(format!(
                "CryptoCompare API error: {status} - {body}"
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ValuationError::price_fetch(format!("failed to read response: {e}")))?;
        parse_pricemulti(&body)
    }

    fn name(&self) -> &str {
        "cryptocompare"
    }
}
