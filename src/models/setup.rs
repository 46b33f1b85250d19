use std::sync::Arc;

use serde::Serialize;

use super::{LocalCurrency, OwnedHolding};
use crate::ledger::LEDGER_ASSET_SYMBOL;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SetupError {
    #[error("local currency id {0:?} is not a currency symbol")]
    InvalidCurrency(String),
    #[error("at least one holding must be configured")]
    NoHoldings,
    #[error("holding #{index} has an empty symbol")]
    EmptySymbol { index: usize },
    #[error("holding symbol {0:?} must be ASCII letters and digits only")]
    InvalidSymbol(String),
    #[error("holding {symbol} has invalid amount {amount}")]
    InvalidAmount { symbol: String, amount: f64 },
    #[error(
        "holding {symbol} has a ledger account, but only {} balances can be read from a ledger",
        LEDGER_ASSET_SYMBOL
    )]
    UnexpectedLedgerAccount { symbol: String },
    #[error("holding {symbol} has an empty ledger account id")]
    EmptyLedgerAccount { symbol: String },
    #[error("ledger account id {account:?} for {symbol} must be ASCII letters and digits only")]
    InvalidLedgerAccount { symbol: String, account: String },
}

/// What the user owns and how to report it. Loaded once, then read-only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Setup {
    pub local_currency: Arc<LocalCurrency>,
    pub holdings: Vec<OwnedHolding>,
}

fn is_plain_id(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric())
}

impl Setup {
    pub fn new(
        local_currency: LocalCurrency,
        holdings: Vec<OwnedHolding>,
    ) -> Result<Self, SetupError> {
        let id = &local_currency.id;
        if !is_plain_id(id) {
            return Err(SetupError::InvalidCurrency(id.clone()));
        }
        if holdings.is_empty() {
            return Err(SetupError::NoHoldings);
        }

        for (index, holding) in holdings.iter().enumerate() {
            if holding.symbol.is_empty() {
                return Err(SetupError::EmptySymbol { index });
            }
            // Symbols and account ids end up in request URLs.
            if !is_plain_id(&holding.symbol) {
                return Err(SetupError::InvalidSymbol(holding.symbol.clone()));
            }
            if !holding.amount.is_finite() || holding.amount < 0.0 {
                return Err(SetupError::InvalidAmount {
                    symbol: holding.symbol.clone(),
                    amount: holding.amount,
                });
            }
            if let Some(account) = &holding.ledger_account {
                if holding.symbol != LEDGER_ASSET_SYMBOL {
                    return Err(SetupError::UnexpectedLedgerAccount {
                        symbol: holding.symbol.clone(),
                    });
                }
                if account.trim().is_empty() {
                    return Err(SetupError::EmptyLedgerAccount {
                        symbol: holding.symbol.clone(),
                    });
                }
                if !is_plain_id(account) {
                    return Err(SetupError::InvalidLedgerAccount {
                        symbol: holding.symbol.clone(),
                        account: account.clone(),
                    });
                }
            }
        }

        Ok(Self {
            local_currency: Arc::new(local_currency),
            holdings,
        })
    }

    /// Symbols of every holding, in configured order.
    pub fn symbols(&self) -> Vec<String> {
        self.holdings.iter().map(|h| h.symbol.clone()).collect()
    }
}
