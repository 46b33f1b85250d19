//! Text and JSON presentation of valuation outcomes.

use serde_json::{json, Value};

use crate::format::CurrencyFormatter;
use crate::valuation::{ValuationOutcome, ValuationResult};

/// One line per holding followed by the total, or a single `Error:` line.
///
/// Unit prices are shown in the reference currency, net worth in the local
/// currency:
///
/// ```text
/// BTC/USD: $50,000 — BTC Net Worth: 92.000 €
/// Total Net Worth: 119.600 €
/// ```
pub fn summary_lines(outcome: &ValuationOutcome, reference: &CurrencyFormatter) -> Vec<String> {
    match outcome {
        Ok(result) => result_lines(result, reference),
        Err(err) => vec![format!("Error: {err}")],
    }
}

fn result_lines(result: &ValuationResult, reference: &CurrencyFormatter) -> Vec<String> {
    let local = result.local_currency.formatter();

    let mut lines: Vec<String> = result
        .holdings
        .iter()
        .map(|h| {
            format!(
                "{symbol}/{reference_code}: {price} — {symbol} Net Worth: {worth}",
                symbol = h.symbol,
                reference_code = reference.currency(),
                price = reference.format(h.reference_price),
                worth = local.format(h.net_worth),
            )
        })
        .collect();

    lines.push(format!(
        "Total Net Worth: {}",
        local.format(result.total_net_worth())
    ));
    lines
}

/// Machine-readable form of an outcome.
pub fn outcome_json(outcome: &ValuationOutcome) -> Value {
    match outcome {
        Ok(result) => {
            let local = result.local_currency.formatter();
            json!({
                "as_of": result.as_of,
                "reference_currency": result.reference_currency,
                "local_currency": result.local_currency.id,
                "holdings": result.holdings,
                "total_net_worth": result.total_net_worth(),
                "total_net_worth_display": local.format(result.total_net_worth()),
            })
        }
        Err(err) => json!({
            "error": {
                "kind": err.kind(),
                "message": err.to_string(),
            }
        }),
    }
}
