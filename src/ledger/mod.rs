//! Live quantities for holdings kept in an on-chain account.

mod horizon;

pub use horizon::{first_native_balance, BalanceEntry, HorizonLedger};

use crate::error::ValuationError;

/// Symbol of the one asset whose quantity can be read from a ledger account.
pub const LEDGER_ASSET_SYMBOL: &str = "XLM";

/// Asset-type tag of the chain's native asset in balance entries.
pub const NATIVE_ASSET_TYPE: &str = "native";

#[async_trait::async_trait]
pub trait LedgerBalanceSource: Send + Sync {
    /// Current balance of the native asset held by `account_id`.
    async fn native_balance(&self, account_id: &str) -> Result<f64, ValuationError>;

    fn name(&self) -> &str;
}
