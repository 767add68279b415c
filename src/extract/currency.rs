use crate::config::toml_config::CurrencyConfig;
use crate::domain::model::RatePair;
use crate::extract::locate::{compile_selector, locate, parse_document, Fragment, Row};
use crate::extract::parse_decimal_comma;
use crate::utils::error::{EtlError, Result};

/// Reads the buy/sell pair from the first table whose caption contains
/// `caption_marker`, using the first row of that table mentioning
/// `currency_marker`. Later matching tables or rows are never looked at.
pub fn extract_rate(fragments: &[Fragment<'_>], config: &CurrencyConfig) -> Result<RatePair> {
    let table = fragments
        .iter()
        .find(|f| {
            f.caption_text()
                .is_some_and(|caption| caption.contains(&config.caption_marker))
        })
        .ok_or_else(|| {
            EtlError::missing_rate(format!("no table captioned '{}'", config.caption_marker))
        })?;

    let row = table
        .rows(None)
        .into_iter()
        .find(|r| r.contains_text(&config.currency_marker))
        .ok_or_else(|| {
            EtlError::missing_rate(format!("no row for '{}'", config.currency_marker))
        })?;

    let buy = read_rate(&row, config.buy_column, "buy")?;
    let sell = read_rate(&row, config.sell_column, "sell")?;
    Ok(RatePair::new(buy, sell))
}

fn read_rate(row: &Row, column: usize, side: &str) -> Result<f64> {
    let raw = row.cell_text(column).ok_or_else(|| {
        EtlError::missing_rate(format!(
            "currency row has {} cells, {} rate expected in cell {}",
            row.cells.len(),
            side,
            column + 1
        ))
    })?;

    match parse_decimal_comma(raw) {
        Some(rate) if rate > 0.0 => Ok(rate),
        _ => Err(EtlError::value_parse(raw, format!("{} rate", side))),
    }
}

pub fn extract_rate_document(html: &str, config: &CurrencyConfig) -> Result<RatePair> {
    let selector = compile_selector(&config.table_selector)?;
    let document = parse_document(html);
    let fragments = locate(&document, &selector);
    extract_rate(&fragments, config)
}
