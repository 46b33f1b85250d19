use std::collections::HashMap;

use tracing::debug;

use super::{PriceSource, QuoteTable, REFERENCE_CURRENCY};
use crate::error::ValuationError;

/// Price of one unit of a holding.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitPrice {
    /// Price in [`REFERENCE_CURRENCY`].
    pub reference: f64,
    /// Price in the user's local currency.
    pub local: f64,
}

/// Prices for every requested symbol, from exactly one fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSnapshot {
    local_currency: String,
    prices: HashMap<String, UnitPrice>,
}

impl PriceSnapshot {
    /// Reconcile a raw quote table against the request.
    ///
    /// Every symbol must be quoted in both the reference and the local
    /// currency; anything missing fails the whole snapshot.
    pub fn from_quotes(
        symbols: &[String],
        local_currency: &str,
        quotes: &QuoteTable,
    ) -> Result<Self, ValuationError> {
        let local_currency = local_currency.trim().to_uppercase();
        let normalized: HashMap<String, HashMap<String, f64>> = quotes
            .iter()
            .map(|(symbol, by_currency)| {
                let by_currency = by_currency
                    .iter()
                    .map(|(currency, price)| (currency.to_uppercase(), *price))
                    .collect();
                (symbol.to_uppercase(), by_currency)
            })
            .collect();

        let mut prices = HashMap::with_capacity(symbols.len());
        for symbol in symbols {
            let symbol = symbol.to_uppercase();
            let by_currency = normalized.get(&symbol).ok_or_else(|| {
                ValuationError::price_fetch(format!("response has no quote for {symbol}"))
            })?;
            let lookup = |currency: &str| {
                by_currency.get(currency).copied().ok_or_else(|| {
                    ValuationError::price_fetch(format!(
                        "response has no {currency} price for {symbol}"
                    ))
                })
            };
            let price = UnitPrice {
                reference: lookup(REFERENCE_CURRENCY)?,
                local: lookup(&local_currency)?,
            };
            prices.insert(symbol, price);
        }

        Ok(Self {
            local_currency,
            prices,
        })
    }

    pub fn get(&self, symbol: &str) -> Option<UnitPrice> {
        self.prices.get(&symbol.to_uppercase()).copied()
    }

    pub fn local_currency(&self) -> &str {
        &self.local_currency
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }
}

/// Target currencies for one batched request: reference first, then local.
pub fn target_currencies(local_currency: &str) -> Vec<String> {
    let local = local_currency.trim().to_uppercase();
    if local == REFERENCE_CURRENCY {
        vec![local]
    } else {
        vec![REFERENCE_CURRENCY.to_string(), local]
    }
}

/// Fetch a complete snapshot for `symbols` with a single request.
///
/// Duplicate symbols (the same coin held in several places) are requested
/// once.
pub async fn fetch_snapshot(
    source: &dyn PriceSource,
    symbols: &[String],
    local_currency: &str,
) -> Result<PriceSnapshot, ValuationError> {
    let mut unique: Vec<String> = Vec::with_capacity(symbols.len());
    for symbol in symbols {
        let symbol = symbol.trim().to_uppercase();
        if !unique.contains(&symbol) {
            unique.push(symbol);
        }
    }
    if unique.is_empty() {
        return Err(ValuationError::price_fetch("no symbols requested"));
    }

    let currencies = target_currencies(local_currency);
    debug!(
        source = source.name(),
        symbols = unique.len(),
        currencies = ?currencies,
        "fetching price snapshot"
    );
    let quotes = source.fetch_quotes(&unique, &currencies).await?;
    PriceSnapshot::from_quotes(&unique, local_currency, &quotes)
}
