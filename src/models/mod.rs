mod holding;
mod local_currency;
mod setup;

pub use holding::OwnedHolding;
pub use local_currency::LocalCurrency;
pub use setup::{Setup, SetupError};
