use std::collections::HashMap;

use crate::error::ValuationError;

/// Prices keyed by source symbol, then by target currency.
pub type QuoteTable = HashMap<String, HashMap<String, f64>>;

/// A ticker service that can price many symbols in one round trip.
#[async_trait::async_trait]
pub trait PriceSource: Send + Sync {
    /// Fetch the price of every symbol in every currency with a single request.
    ///
    /// Implementations return what the service answered; completeness is
    /// checked by [`super::fetch_snapshot`].
    async fn fetch_quotes(
        &self,
        symbols: &[String],
        currencies: &[String],
    ) -> Result<QuoteTable, ValuationError>;

    fn name(&self) -> &str;
}
