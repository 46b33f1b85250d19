pub mod config;
pub mod duration;
pub mod error;
pub mod format;
pub mod ledger;
pub mod market_data;
pub mod models;
pub mod render;
pub mod scheduler;
pub mod valuation;
