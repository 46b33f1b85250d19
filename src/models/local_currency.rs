use serde::Serialize;

use crate::format::CurrencyFormatter;

/// The currency net worth is reported in.
///
/// Owns its formatter so every refresh cycle reuses the same instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocalCurrency {
    pub id: String,
    pub locale: String,
    #[serde(skip)]
    formatter: CurrencyFormatter,
}

impl LocalCurrency {
    pub fn new(id: impl Into<String>, locale: impl Into<String>) -> Self {
        let id = id.into().trim().to_uppercase();
        let locale = locale.into();
        let formatter = CurrencyFormatter::new(&id, &locale);
        Self {
            id,
            locale,
            formatter,
        }
    }

    pub fn formatter(&self) -> &CurrencyFormatter {
        &self.formatter
    }

    pub fn format(&self, amount: f64) -> String {
        self.formatter.format(amount)
    }
}
