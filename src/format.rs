//! Magnitude-adaptive currency formatting.
//!
//! Small prices (fractions of a cent for low-cap coins) need many decimal
//! places while large net worth figures read better without any, so the
//! number of fraction digits is picked from the magnitude of each amount.

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::market_data::REFERENCE_CURRENCY;

/// Locale used for the reference-currency formatter.
pub const REFERENCE_LOCALE: &str = "en-US";

const NBSP: char = '\u{a0}';

/// Where the currency symbol goes relative to the number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolPosition {
    Before,
    After,
}

/// Separator and symbol placement rules for a locale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocaleConventions {
    pub decimal_separator: char,
    pub grouping_separator: char,
    pub symbol_position: SymbolPosition,
    /// Character between symbol and number, if any.
    pub symbol_spacing: Option<char>,
}

impl LocaleConventions {
    const ENGLISH: Self = Self {
        decimal_separator: '.',
        grouping_separator: ',',
        symbol_position: SymbolPosition::Before,
        symbol_spacing: None,
    };

    const CONTINENTAL: Self = Self {
        decimal_separator: ',',
        grouping_separator: '.',
        symbol_position: SymbolPosition::After,
        symbol_spacing: Some(' '),
    };

    const CONTINENTAL_PREFIX: Self = Self {
        decimal_separator: ',',
        grouping_separator: '.',
        symbol_position: SymbolPosition::Before,
        symbol_spacing: Some(' '),
    };

    const SWISS: Self = Self {
        decimal_separator: '.',
        grouping_separator: '\'',
        symbol_position: SymbolPosition::Before,
        symbol_spacing: Some(' '),
    };

    const SPACE_GROUPED: Self = Self {
        decimal_separator: ',',
        grouping_separator: NBSP,
        symbol_position: SymbolPosition::After,
        symbol_spacing: Some(NBSP),
    };

    /// Resolve conventions from a BCP 47 style tag such as `de-DE` or `pt_BR`.
    ///
    /// Unknown languages fall back to English conventions.
    pub fn for_tag(tag: &str) -> Self {
        let mut parts = tag.trim().split(|c| c == '-' || c == '_');
        let language = parts.next().unwrap_or_default().to_ascii_lowercase();
        let region = parts
            .find(|p| p.len() == 2 && p.chars().all(|c| c.is_ascii_alphabetic()))
            .map(|r| r.to_ascii_uppercase());

        match (language.as_str(), region.as_deref()) {
            ("de", Some("CH")) => Self::SWISS,
            ("pt", Some("BR")) | ("nl", _) => Self::CONTINENTAL_PREFIX,
            ("de" | "it" | "es" | "da" | "el" | "pt", _) => Self::CONTINENTAL,
            ("fr" | "ru" | "pl" | "sv" | "nb" | "no" | "fi" | "cs", _) => Self::SPACE_GROUPED,
            _ => Self::ENGLISH,
        }
    }
}

/// Display symbol for an ISO currency code, if it has a well-known one.
pub fn currency_symbol(code: &str) -> Option<&'static str> {
    let symbol = match code.to_ascii_uppercase().as_str() {
        "USD" => "$",
        "EUR" => "€",
        "GBP" => "£",
        "JPY" | "CNY" => "¥",
        "KRW" => "₩",
        "INR" => "₹",
        "BRL" => "R$",
        "RUB" => "₽",
        "TRY" => "₺",
        "PLN" => "zł",
        "SEK" | "NOK" | "DKK" => "kr",
        _ => return None,
    };
    Some(symbol)
}

/// Number of fraction digits shown for an amount of this magnitude.
pub fn fraction_digits(amount: f64) -> u32 {
    let magnitude = amount.abs();
    if magnitude < 0.0001 {
        6
    } else if magnitude < 0.001 {
        5
    } else if magnitude < 0.01 {
        4
    } else if magnitude < 0.1 {
        3
    } else if magnitude < 10.0 {
        2
    } else if magnitude < 100.0 {
        1
    } else {
        0
    }
}

/// Formats amounts of one currency for one locale.
///
/// Immutable after construction, so a single instance can be shared freely
/// between the refresh worker and the rendering thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrencyFormatter {
    currency: String,
    symbol: String,
    conventions: LocaleConventions,
}

impl CurrencyFormatter {
    pub fn new(currency: &str, locale_tag: &str) -> Self {
        let currency = currency.trim().to_ascii_uppercase();
        let symbol = currency_symbol(&currency)
            .map(str::to_string)
            .unwrap_or_else(|| currency.clone());
        Self {
            currency,
            symbol,
            conventions: LocaleConventions::for_tag(locale_tag),
        }
    }

    /// Formatter for raw unit prices in the reference currency.
    pub fn reference() -> Self {
        Self::new(REFERENCE_CURRENCY, REFERENCE_LOCALE)
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn conventions(&self) -> LocaleConventions {
        self.conventions
    }

    pub fn format(&self, amount: f64) -> String {
        if !amount.is_finite() {
            return self.decorate(false, &amount.to_string());
        }

        let digits = fraction_digits(amount);
        let (negative, plain) = match Decimal::from_f64(amount) {
            Some(value) => {
                let rounded =
                    value.round_dp_with_strategy(digits, RoundingStrategy::MidpointNearestEven);
                (
                    rounded.is_sign_negative() && !rounded.is_zero(),
                    rounded.abs().to_string(),
                )
            }
            // Beyond Decimal's range; f64 formatting is exact enough there.
            None => (amount < 0.0, format!("{:.*}", digits as usize, amount.abs())),
        };

        let body = self.layout_number(&plain, digits);
        self.decorate(negative, &body)
    }

    /// Pad the fraction to `digits` and apply the locale's separators.
    fn layout_number(&self, plain: &str, digits: u32) -> String {
        let (int_part, frac_part) = plain.split_once('.').unwrap_or((plain, ""));

        let mut out = String::with_capacity(int_part.len() + digits as usize + 4);
        let len = int_part.len();
        for (i, ch) in int_part.chars().enumerate() {
            out.push(ch);
            let remaining = len - (i + 1);
            if remaining > 0 && remaining % 3 == 0 {
                out.push(self.conventions.grouping_separator);
            }
        }

        if digits > 0 {
            out.push(self.conventions.decimal_separator);
            let mut written = 0;
            for ch in frac_part.chars().take(digits as usize) {
                out.push(ch);
                written += 1;
            }
            for _ in written..digits as usize {
                out.push('0');
            }
        }
        out
    }

    fn decorate(&self, negative: bool, body: &str) -> String {
        let spacing = self.conventions.symbol_spacing.or_else(|| {
            // ISO codes used as symbols never touch the digits.
            (self.symbol.len() > 1 && self.symbol.chars().all(|c| c.is_ascii_alphabetic()))
                .then_some(' ')
        });

        let mut out = String::with_capacity(body.len() + self.symbol.len() + 3);
        if negative {
            out.push('-');
        }
        match self.conventions.symbol_position {
            SymbolPosition::Before => {
                out.push_str(&self.symbol);
                out.extend(spacing);
                out.push_str(body);
            }
            SymbolPosition::After => {
                out.push_str(body);
                out.extend(spacing);
                out.push_str(&self.symbol);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fraction_digits_follow_half_open_bounds() {
        let cases = [
            (0.0, 6),
            (0.00009999, 6),
            (0.0001, 5),
            (0.00099, 5),
            (0.001, 4),
            (0.0099, 4),
            (0.01, 3),
            (0.099, 3),
            (0.1, 2),
            (9.999, 2),
            (10.0, 1),
            (99.999, 1),
            (100.0, 0),
            (123456.0, 0),
        ];
        for (amount, expected) in cases {
            assert_eq!(fraction_digits(amount), expected, "amount {amount}");
        }
    }

    #[test]
    fn fraction_digits_use_absolute_value() {
        assert_eq!(fraction_digits(-0.05), 3);
        assert_eq!(fraction_digits(-250.0), 0);
    }

    #[test]
    fn reference_formatter_uses_us_conventions() {
        let f = CurrencyFormatter::reference();
        assert_eq!(f.currency(), "USD");
        assert_eq!(f.format(50000.0), "$50,000");
        assert_eq!(f.format(3000.0), "$3,000");
        assert_eq!(f.format(0.5), "$0.50");
        assert_eq!(f.format(42.25), "$42.2");
        assert_eq!(f.format(0.00001234), "$0.000012");
    }

    #[test]
    fn rounding_is_half_even() {
        let f = CurrencyFormatter::reference();
        assert_eq!(f.format(1234.5), "$1,234");
        assert_eq!(f.format(1235.5), "$1,236");
    }

    #[test]
    fn negative_sign_precedes_symbol() {
        let f = CurrencyFormatter::reference();
        assert_eq!(f.format(-1500.0), "-$1,500");
    }

    #[test]
    fn tiny_negative_rounding_to_zero_drops_sign() {
        let f = CurrencyFormatter::reference();
        assert_eq!(f.format(-0.0000001), "$0.000000");
    }

    #[test]
    fn german_locale_puts_symbol_after() {
        let f = CurrencyFormatter::new("eur", "de-DE");
        assert_eq!(f.format(92000.0), "92.000 €");
        assert_eq!(f.format(119600.0), "119.600 €");
        assert_eq!(f.format(12.34), "12,3 €");
    }

    #[test]
    fn french_locale_groups_with_no_break_space() {
        let f = CurrencyFormatter::new("EUR", "fr_FR");
        assert_eq!(f.format(1234567.0), "1\u{a0}234\u{a0}567\u{a0}€");
    }

    #[test]
    fn swiss_locale_uses_apostrophe_grouping() {
        let f = CurrencyFormatter::new("CHF", "de-CH");
        assert_eq!(f.format(1234.0), "CHF 1'234");
    }

    #[test]
    fn unknown_currency_code_is_spaced_from_number() {
        let f = CurrencyFormatter::new("XYZ", "en-US");
        assert_eq!(f.format(12.5), "XYZ 12.5");
    }

    #[test]
    fn unknown_locale_falls_back_to_english() {
        assert_eq!(
            LocaleConventions::for_tag("tlh-QO"),
            LocaleConventions::for_tag("en-US")
        );
    }

    #[test]
    fn brazilian_portuguese_differs_from_portugal() {
        let br = CurrencyFormatter::new("BRL", "pt-BR");
        let pt = CurrencyFormatter::new("EUR", "pt-PT");
        assert_eq!(br.format(1500.0), "R$ 1.500");
        assert_eq!(pt.format(1500.0), "1.500 €");
    }

    #[test]
    fn non_finite_amounts_are_rendered_verbatim() {
        let f = CurrencyFormatter::reference();
        assert_eq!(f.format(f64::NAN), "$NaN");
    }
}
