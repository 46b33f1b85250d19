//! Stellar Horizon account lookups.
//!
//! `GET /accounts/{id}` returns every balance held by the account, each tagged
//! with an `asset_type`. Lumens are the entry tagged `native`.

use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use tracing::debug;

use super::{LedgerBalanceSource, NATIVE_ASSET_TYPE};
use crate::error::ValuationError;

const HORIZON_PUBLIC_BASE: &str = "https://horizon.stellar.org";

#[derive(Debug, Deserialize)]
struct AccountResponse {
    balances: Vec<BalanceEntry>,
}

/// One balance line of a ledger account.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BalanceEntry {
    /// Decimal string, e.g. `"1520.0000000"`.
    pub balance: String,
    pub asset_type: String,
    #[serde(default)]
    pub asset_code: Option<String>,
}

/// Balance of the first entry tagged as the native asset.
///
/// `None` when the account holds no native entry; an unparsable balance is an
/// error rather than zero.
pub fn first_native_balance(entries: &[BalanceEntry]) -> Option<Result<f64, String>> {
    entries
        .iter()
        .find(|entry| entry.asset_type == NATIVE_ASSET_TYPE)
        .map(|entry| {
            entry
                .balance
                .trim()
                .parse::<f64>()
                .map_err(|e| format!("invalid native balance {:?}: {e}", entry.balance))
        })
}

/// Horizon client, constructed once and shared by every refresh.
#[derive(Debug, Clone)]
pub struct HorizonLedger {
    client: Client,
    base_url: String,
}

impl HorizonLedger {
    /// Client for the public Stellar network.
    pub fn new() -> Self {
        Self::with_client(Client::new())
    }

    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            base_url: HORIZON_PUBLIC_BASE.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

impl HorizonLedger {
    /// `{base}/accounts/{id}`, with the id encoded as a single path segment.
    fn account_url(&self, account_id: &str) -> Result<Url, String> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| format!("invalid ledger endpoint {:?}: {e}", self.base_url))?;
        url.path_segments_mut()
            .map_err(|_| format!("ledger endpoint {:?} cannot take a path", self.base_url))?
            .pop_if_empty()
            .push("accounts")
            .push(account_id);
        Ok(url)
    }
}

impl Default for HorizonLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl LedgerBalanceSource for HorizonLedger {
    async fn native_balance(&self, account_id: &str) -> Result<f64, ValuationError> {
        let lookup_err = |message: String| ValuationError::external_lookup(account_id, message);

        let url = self.account_url(account_id).map_err(lookup_err)?;
        debug!(url = %url, "requesting ledger account");

        let response = self
            .client
            .get(url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| lookup_err(format!("request failed: {e}")))?;

        match response.status() {
            StatusCode::NOT_FOUND => return Err(lookup_err("account does not exist".to_string())),
            status if !status.is_success() => {
                let body = response.text().await.unwrap_or_default();
                return Err(lookup_err(format!("Horizon API error: {status} - {body}")));
            }
            _ => {}
        }

        let account: AccountResponse = response
            .json()
            .await
            .map_err(|e| lookup_err(format!("malformed account response: {e}")))?;

        match first_native_balance(&account.balances) {
            Some(balance) => balance.map_err(lookup_err),
            None => Err(lookup_err("account holds no native balance".to_string())),
        }
    }

    fn name(&self) -> &str {
        "horizon"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(balance: &str, asset_type: &str) -> BalanceEntry {
        BalanceEntry {
            balance: balance.to_string(),
            asset_type: asset_type.to_string(),
            asset_code: None,
        }
    }

    #[test]
    fn parse_account_response() {
        let json = r#"{
            "id": "GBX",
            "sequence": "123",
            "balances": [
                {
                    "balance": "25.5000000",
                    "limit": "922337203685.4775807",
                    "asset_type": "credit_alphanum4",
                    "asset_code": "USDC",
                    "asset_issuer": "GA5Z"
                },
                { "balance": "1520.0000000", "asset_type": "native" }
            ]
        }"#;

        let account: AccountResponse = serde_json::from_str(json).unwrap();
        assert_eq!(account.balances.len(), 2);
        assert_eq!(account.balances[0].asset_code.as_deref(), Some("USDC"));
        assert_eq!(first_native_balance(&account.balances), Some(Ok(1520.0)));
    }

    #[test]
    fn account_id_stays_one_path_segment() {
        let ledger = HorizonLedger::new().with_base_url("http://localhost:8000/horizon/");
        assert_eq!(
            ledger.account_url("GABC").unwrap().as_str(),
            "http://localhost:8000/horizon/accounts/GABC"
        );
        assert_eq!(
            ledger.account_url("GABC/../../other").unwrap().as_str(),
            "http://localhost:8000/horizon/accounts/GABC%2F..%2F..%2Fother"
        );
    }

    #[test]
    fn first_native_entry_wins() {
        let entries = [entry("1", "native"), entry("2", "native")];
        assert_eq!(first_native_balance(&entries), Some(Ok(1.0)));
    }

    #[test]
    fn no_native_entry_is_none_not_zero() {
        let entries = [entry("10", "credit_alphanum12")];
        assert_eq!(first_native_balance(&entries), None);
        assert_eq!(first_native_balance(&[]), None);
    }

    #[test]
    fn unparsable_native_balance_is_error() {
        let entries = [entry("n/a", "native")];
        assert!(matches!(first_native_balance(&entries), Some(Err(_))));
    }
}
