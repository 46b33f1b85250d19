#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use cryptocharts::error::ValuationError;
use cryptocharts::ledger::LedgerBalanceSource;
use cryptocharts::market_data::{PriceSource, QuoteTable};
use cryptocharts::models::{LocalCurrency, OwnedHolding, Setup};
use cryptocharts::valuation::ValuationOutcome;
use tokio::sync::Semaphore;

/// Price source answering from a fixed table.
#[derive(Default)]
pub struct StaticPrices {
    quotes: QuoteTable,
    calls: AtomicUsize,
    requests: Mutex<Vec<(Vec<String>, Vec<String>)>>,
}

impl StaticPrices {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quote(mut self, symbol: &str, currency: &str, price: f64) -> Self {
        self.quotes
            .entry(symbol.to_string())
            .or_default()
            .insert(currency.to_string(), price);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Symbols and currencies of every request, in order.
    pub fn requests(&self) -> Vec<(Vec<String>, Vec<String>)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl PriceSource for StaticPrices {
    async fn fetch_quotes(
        &self,
        symbols: &[String],
        currencies: &[String],
    ) -> Result<QuoteTable, ValuationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests
            .lock()
            .unwrap()
            .push((symbols.to_vec(), currencies.to_vec()));
        Ok(self.quotes.clone())
    }

    fn name(&self) -> &str {
        "static"
    }
}

/// Price source whose every price equals the 1-based number of the call.
///
/// With a gate, each call first takes one permit, so tests decide when
/// fetches may finish.
#[derive(Default)]
pub struct CountingPrices {
    calls: AtomicUsize,
    gate: Option<Arc<Semaphore>>,
}

impl CountingPrices {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gated(gate: Arc<Semaphore>) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            gate: Some(gate),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PriceSource for CountingPrices {
    async fn fetch_quotes(
        &self,
        symbols: &[String],
        currencies: &[String],
    ) -> Result<QuoteTable, ValuationError> {
        if let Some(gate) = &self.gate {
            gate.acquire()
                .await
                .map_err(|_| ValuationError::price_fetch("gate closed"))?
                .forget();
        }
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;

        Ok(symbols
            .iter()
            .map(|symbol| {
                let prices = currencies
                    .iter()
                    .map(|currency| (currency.clone(), call as f64))
                    .collect();
                (symbol.clone(), prices)
            })
            .collect())
    }

    fn name(&self) -> &str {
        "counting"
    }
}

/// Ledger with canned answers per account, recording every lookup.
#[derive(Default)]
pub struct FakeLedger {
    balances: HashMap<String, Result<f64, String>>,
    lookups: Mutex<Vec<String>>,
}

impl FakeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_balance(mut self, account: &str, balance: f64) -> Self {
        self.balances.insert(account.to_string(), Ok(balance));
        self
    }

    pub fn with_failure(mut self, account: &str, message: &str) -> Self {
        self.balances
            .insert(account.to_string(), Err(message.to_string()));
        self
    }

    pub fn lookups(&self) -> Vec<String> {
        self.lookups.lock().unwrap().clone()
    }
}

#[async_trait]
impl LedgerBalanceSource for FakeLedger {
    async fn native_balance(&self, account_id: &str) -> Result<f64, ValuationError> {
        self.lookups.lock().unwrap().push(account_id.to_string());
        match self.balances.get(account_id) {
            Some(Ok(balance)) => Ok(*balance),
            Some(Err(message)) => Err(ValuationError::external_lookup(account_id, message.clone())),
            None => Err(ValuationError::external_lookup(
                account_id,
                "account does not exist",
            )),
        }
    }

    fn name(&self) -> &str {
        "fake"
    }
}

pub fn setup(currency: &str, locale: &str, holdings: Vec<OwnedHolding>) -> Arc<Setup> {
    Arc::new(Setup::new(LocalCurrency::new(currency, locale), holdings).unwrap())
}

/// Local price of the first holding, for outcomes from [`CountingPrices`].
pub fn first_price(outcome: &ValuationOutcome) -> f64 {
    match outcome {
        Ok(result) => result.holdings[0].local_price,
        Err(err) => panic!("valuation failed: {err}"),
    }
}
