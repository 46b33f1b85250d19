use serde::Serialize;

/// One configured position.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OwnedHolding {
    pub symbol: String,
    /// Statically configured quantity. Ignored when `ledger_account` is set.
    pub amount: f64,
    /// Ledger account whose native balance is the live quantity.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ledger_account: Option<String>,
}

impl OwnedHolding {
    pub fn new(symbol: impl Into<String>, amount: f64) -> Self {
        Self {
            symbol: symbol.into().trim().to_uppercase(),
            amount,
            ledger_account: None,
        }
    }

    pub fn with_ledger_account(mut self, account: impl Into<String>) -> Self {
        self.ledger_account = Some(account.into());
        self
    }

    pub fn is_ledger_backed(&self) -> bool {
        self.ledger_account.is_some()
    }
}
