use std::path::PathBuf;

/// Failure of a single valuation cycle.
///
/// Outcomes are shared between the refresh worker and every reader of the
/// current result, so the error carries rendered messages rather than source
/// errors and is cheap to clone.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValuationError {
    /// The setup could not be loaded at startup. Reported by every cycle for
    /// the lifetime of the process.
    #[error("Failed to load setup from {}: {message}", path.display())]
    ConfigLoad { path: PathBuf, message: String },

    /// Transport failure, non-success status, malformed body, or a response
    /// missing one of the requested symbols.
    #[error("Price fetch failed: {0}")]
    PriceFetch(String),

    /// The ledger account is unreachable, unknown, or holds no native balance.
    #[error("Ledger lookup failed for account {account}: {message}")]
    ExternalLookup { account: String, message: String },

    /// The refresh worker exited before the job produced an outcome.
    #[error("Refresh worker stopped before the valuation completed")]
    WorkerStopped,
}

impl ValuationError {
    pub fn price_fetch(message: impl Into<String>) -> Self {
        Self::PriceFetch(message.into())
    }

    pub fn external_lookup(account: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ExternalLookup {
            account: account.into(),
            message: message.into(),
        }
    }

    /// Short machine-friendly name of the error class.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ConfigLoad { .. } => "config_load",
            Self::PriceFetch(_) => "price_fetch",
            Self::ExternalLookup { .. } => "external_lookup",
            Self::WorkerStopped => "worker_stopped",
        }
    }
}
