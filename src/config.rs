use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::duration::deserialize_duration;
use crate::error::ValuationError;
use crate::models::{LocalCurrency, OwnedHolding, Setup};

const DEFAULT_CONFIG_FILE: &str = "cryptocharts.toml";

/// Default refresh period (10 minutes).
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(10 * 60);

fn default_locale() -> String {
    "en-US".to_string()
}

fn default_refresh_interval() -> Duration {
    DEFAULT_REFRESH_INTERVAL
}

fn default_prices_endpoint() -> String {
    "https://min-api.cryptocompare.com".to_string()
}

fn default_ledger_endpoint() -> String {
    "https://horizon.stellar.org".to_string()
}

/// Local currency as written in the config file.
#[derive(Debug, Clone, Deserialize)]
pub struct LocalCurrencyConfig {
    /// Exchange symbol, e.g. "EUR".
    pub id: String,

    /// Locale tag used for number formatting, e.g. "de-DE".
    #[serde(default = "default_locale", alias = "language_tag")]
    pub locale: String,
}

/// One holding as written in the config file.
#[derive(Debug, Clone, Deserialize)]
pub struct HoldingConfig {
    pub symbol: String,

    /// Quantity owned. Placeholder for ledger-backed holdings.
    #[serde(default)]
    pub amount: f64,

    /// Stellar account id whose native balance replaces `amount`.
    #[serde(default, alias = "stellar_account_id")]
    pub ledger_account: Option<String>,
}

/// Refresh scheduling configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    /// Time between scheduled valuations.
    #[serde(
        default = "default_refresh_interval",
        deserialize_with = "deserialize_duration"
    )]
    pub interval: Duration,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval: default_refresh_interval(),
        }
    }
}

/// Remote services queried on every refresh.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EndpointsConfig {
    /// CryptoCompare-compatible pricing API base URL.
    #[serde(default = "default_prices_endpoint")]
    pub prices: String,

    /// Stellar Horizon base URL.
    #[serde(default = "default_ledger_endpoint")]
    pub ledger: String,

    /// Optional pricing API key.
    pub prices_api_key: Option<String>,
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            prices: default_prices_endpoint(),
            ledger: default_ledger_endpoint(),
            prices_api_key: None,
        }
    }
}

/// Config file contents.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub local_currency: LocalCurrencyConfig,

    pub holdings: Vec<HoldingConfig>,

    #[serde(default)]
    pub refresh: RefreshConfig,

    #[serde(default)]
    pub endpoints: EndpointsConfig,
}

impl Config {
    /// Load config from a TOML file, or JSON when the extension is `.json`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        let config: Config = if is_json {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        };

        Ok(config)
    }

    /// Build the validated setup.
    pub fn to_setup(&self) -> Result<Setup> {
        let local_currency = LocalCurrency::new(&self.local_currency.id, &self.local_currency.locale);
        let holdings = self
            .holdings
            .iter()
            .map(|h| {
                let holding = OwnedHolding::new(&h.symbol, h.amount);
                match &h.ledger_account {
                    Some(account) => holding.with_ledger_account(account.trim()),
                    None => holding,
                }
            })
            .collect();

        Ok(Setup::new(local_currency, holdings)?)
    }
}

/// Loaded configuration with the setup validated.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub path: PathBuf,
    pub setup: Arc<Setup>,
    pub refresh: RefreshConfig,
    pub endpoints: EndpointsConfig,
}

/// Returns the default config file path.
///
/// Resolution order:
/// 1. `./cryptocharts.toml` if it exists in current directory
/// 2. `~/.local/share/cryptocharts/cryptocharts.toml` (XDG data directory)
pub fn default_config_path() -> PathBuf {
    let local_config = PathBuf::from(DEFAULT_CONFIG_FILE);
    if local_config.exists() {
        return local_config;
    }

    if let Some(data_dir) = dirs::data_dir() {
        return data_dir.join("cryptocharts").join(DEFAULT_CONFIG_FILE);
    }

    local_config
}

impl ResolvedConfig {
    /// Load and validate a config file.
    ///
    /// Failures are reported as [`ValuationError::ConfigLoad`] so the engine
    /// can surface them as the outcome of every valuation.
    pub fn load(path: &Path) -> Result<Self, ValuationError> {
        Self::load_inner(path).map_err(|err| ValuationError::ConfigLoad {
            path: path.to_path_buf(),
            message: format!("{err:#}"),
        })
    }

    fn load_inner(path: &Path) -> Result<Self> {
        let config = Config::load(path)?;
        let setup = config
            .to_setup()
            .with_context(|| format!("Invalid setup in {}", path.display()))?;

        Ok(Self {
            path: path.to_path_buf(),
            setup: Arc::new(setup),
            refresh: config.refresh,
            endpoints: config.endpoints,
        })
    }
}
