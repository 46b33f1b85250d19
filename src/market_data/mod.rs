//! Batched price lookup for every configured holding.

mod snapshot;
mod source;
pub mod providers;

pub use snapshot::{fetch_snapshot, target_currencies, PriceSnapshot, UnitPrice};
pub use source::{PriceSource, QuoteTable};

/// Currency every holding's raw unit price is shown in, regardless of the
/// user's local currency.
pub const REFERENCE_CURRENCY: &str = "USD";
