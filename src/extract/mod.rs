//! Table extraction engine.
//!
//! Everything here is synchronous and works on an already fetched page. Pages
//! are parsed into a [`scraper::Html`] tree inside the `*_document` entry
//! points, so no parsed tree ever lives across an `.await`.

pub mod currency;
pub mod locate;
pub mod salary;
pub mod unemployment;

pub use locate::{compile_selector, locate, parse_document, Cell, Fragment, Row};

/// Reads a salary cell. `,` is a thousands separator and is dropped.
pub fn parse_grouped_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw.trim().chars().filter(|c| *c != ',').collect();
    parse_finite(&cleaned)
}

/// Reads a rate or percentage published with a decimal comma (`41,25`).
pub fn parse_decimal_comma(raw: &str) -> Option<f64> {
    parse_finite(&raw.trim().replace(',', "."))
}

fn parse_finite(s: &str) -> Option<f64> {
    if s.is_empty() {
        return None;
    }
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_grouped_number() {
        assert_eq!(parse_grouped_number("12,345"), Some(12345.0));
        assert_eq!(parse_grouped_number(" 4 567.5 "), None);
        assert_eq!(parse_grouped_number("  4567.5\n"), Some(4567.5));
        assert_eq!(parse_grouped_number("1000,5"), Some(10005.0));
        assert_eq!(parse_grouped_number("—"), None);
        assert_eq!(parse_grouped_number(""), None);
        assert_eq!(parse_grouped_number("inf"), None);
    }

    #[test]
    fn test_parse_decimal_comma() {
        assert_eq!(parse_decimal_comma("27,9125"), Some(27.9125));
        assert_eq!(parse_decimal_comma("9.5"), Some(9.5));
        assert_eq!(parse_decimal_comma("n/a"), None);
        assert_eq!(parse_decimal_comma("1,2,3"), None);
    }
}
