//! One refresh cycle: fetch prices, resolve ledger quantities, compute net
//! worth.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::error::ValuationError;
use crate::ledger::LedgerBalanceSource;
use crate::market_data::{fetch_snapshot, PriceSource, REFERENCE_CURRENCY};
use crate::models::{LocalCurrency, Setup};

/// Result of one valuation cycle as seen by readers.
pub type ValuationOutcome = Result<ValuationResult, ValuationError>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HoldingValuation {
    pub symbol: String,
    /// Quantity used, after ledger resolution.
    pub quantity: f64,
    /// Unit price in [`REFERENCE_CURRENCY`].
    pub reference_price: f64,
    /// Unit price in the local currency.
    pub local_price: f64,
    /// `quantity * local_price`.
    pub net_worth: f64,
}

/// Immutable valuation of every holding, in configured order.
///
/// The total is derived on demand so it can never disagree with the list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValuationResult {
    pub as_of: DateTime<Utc>,
    pub reference_currency: &'static str,
    pub local_currency: Arc<LocalCurrency>,
    pub holdings: Vec<HoldingValuation>,
}

impl ValuationResult {
    pub fn total_net_worth(&self) -> f64 {
        self.holdings.iter().map(|h| h.net_worth).sum()
    }
}

/// A single, stateless valuation pass over a setup.
///
/// Built fresh for each refresh. A setup that failed to load is carried as
/// the error and returned without touching the network.
#[derive(Debug, Clone)]
pub struct ValuationJob {
    setup: Result<Arc<Setup>, ValuationError>,
}

impl ValuationJob {
    pub fn new(setup: Result<Arc<Setup>, ValuationError>) -> Self {
        Self { setup }
    }

    pub async fn run(
        &self,
        prices: &dyn PriceSource,
        ledger: &dyn LedgerBalanceSource,
    ) -> ValuationOutcome {
        let setup = self.setup.as_ref().map_err(|err| err.clone())?;
        let local_currency = &setup.local_currency;

        let snapshot = fetch_snapshot(prices, &setup.symbols(), &local_currency.id).await?;

        let mut holdings = Vec::with_capacity(setup.holdings.len());
        for holding in &setup.holdings {
            let quantity = match &holding.ledger_account {
                Some(account) => {
                    let balance = ledger.native_balance(account).await?;
                    debug!(
                        symbol = %holding.symbol,
                        ledger = ledger.name(),
                        balance,
                        "resolved ledger balance"
                    );
                    balance
                }
                None => holding.amount,
            };

            let price = snapshot.get(&holding.symbol).ok_or_else(|| {
                ValuationError::price_fetch(format!("snapshot has no price for {}", holding.symbol))
            })?;

            holdings.push(HoldingValuation {
                symbol: holding.symbol.clone(),
                quantity,
                reference_price: price.reference,
                local_price: price.local,
                net_worth: quantity * price.local,
            });
        }

        Ok(ValuationResult {
            as_of: Utc::now(),
            reference_currency: REFERENCE_CURRENCY,
            local_currency: Arc::clone(local_currency),
            holdings,
        })
    }
}
